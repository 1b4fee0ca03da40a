//! Directory watcher and startup scheduler: walks a sync root once at
//! start, then watches it forever for new or renamed-in files, dispatching
//! each to the ingest pipeline (`custody-ingest`) under a cached,
//! miss-refreshed project index.
//!
//! This is the directory-sync entry point of the content-integrity
//! pipeline.

pub mod dispatch;
pub mod index;
pub mod paths;
pub mod scan;
pub mod watcher;

use std::{path::PathBuf, sync::Arc};

use custody_cid::walk::WalkConfig;
use custody_ingest::IngestContext;

pub use index::ProjectIndex;

/// Runs the full watch lifecycle: initial scan, then watch forever. Never
/// returns under normal operation; the caller cancels the future (e.g. on
/// `ctrl_c`) to shut the watcher down.
pub async fn run(ctx: Arc<IngestContext>, sync_root: PathBuf, walk_config: WalkConfig) -> anyhow::Result<()> {
    let index = ProjectIndex::load(ctx.pool.clone()).await?;

    scan::initial_scan(ctx.clone(), &index, &sync_root, &walk_config).await?;
    watcher::watch_forever(ctx, index, sync_root).await
}
