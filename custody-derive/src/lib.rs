//! Derived-artifact processors: takes an already-custodied asset and
//! produces a second, related asset from it.
//!
//! It owns two flows:
//!
//! - [`encrypt`]: whole-file authenticated streaming encryption.
//! - [`provenance`]: C2PA-style manifest injection via an external tool.
//!
//! Both flows read their source from the same files directory the ingest
//! pipeline writes into, and both record their output back through
//! `custody-attest-client` the same way it does: a relationship edge plus
//! an attribute on the source, then the new file moved into place under
//! its own CID.

pub mod context;
pub mod encrypt;
pub mod error;
pub mod provenance;

pub use context::DeriveContext;
pub use encrypt::encrypt_cid;
pub use error::DeriveError;
pub use provenance::inject_provenance;
