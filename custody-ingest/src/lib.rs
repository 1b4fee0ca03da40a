//! The ingest pipeline: file-status state machine, class detection,
//! per-class metadata assembly, the "private" attribute hoist rule, and
//! the project model a discovered file is attributed against.
//!
//! It sits downstream of `custody-cid`, `custody-keystore`,
//! `custody-attest-client`, `custody-verify-pgp`, and `custody-verify-wacz`,
//! and is driven by the webhook server (`custody-webhook`) and the
//! directory watcher (`custody-watch`).

pub mod attributes;
pub mod db;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod project;

pub use db::{FileRow, FileStatus};
pub use error::IngestError;
pub use metadata::{detect_class, should_include_file, FileClass};
pub use pipeline::{add_relationship, ingest_path, IngestContext, IngestOutcome, ProjectContext};
pub use project::{find_owning_project, AllowedKey, Project};
