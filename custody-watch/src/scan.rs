use std::{path::Path, sync::Arc};

use custody_cid::walk::{walk_dir, WalkConfig};
use custody_ingest::IngestContext;

use crate::{dispatch::maybe_dispatch, index::ProjectIndex};

/// The startup scan: walks the whole sync root once and dispatches every
/// path that passes the exclusion rules, before the watcher starts
/// picking up live filesystem events.
pub async fn initial_scan(
    ctx: Arc<IngestContext>,
    index: &ProjectIndex,
    sync_root: &Path,
    walk_config: &WalkConfig,
) -> anyhow::Result<()> {
    let files = walk_dir(sync_root, walk_config)?;
    log::info!("watch: initial scan found {} candidate files under {}", files.len(), sync_root.display());

    for path in files {
        maybe_dispatch(ctx.clone(), index, sync_root, &path).await;
    }

    Ok(())
}
