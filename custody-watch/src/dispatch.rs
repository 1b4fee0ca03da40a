use std::{path::Path, sync::Arc};

use custody_ingest::{
    metadata::should_include_file, pipeline::ProjectContext, IngestContext,
};

use crate::{index::ProjectIndex, paths};

/// Resolves `path`'s project, runs the exclusion rules, and — if the file
/// should be ingested — spawns the ingest as its own task so a slow
/// upload never blocks the scan or the watcher's event loop.
pub async fn maybe_dispatch(
    ctx: Arc<IngestContext>,
    index: &ProjectIndex,
    sync_root: &Path,
    path: &Path,
) {
    let Some(relative_path) = paths::relative_to_root(sync_root, path) else {
        log::warn!("watch: {} is outside the sync root, ignoring", path.display());
        return;
    };

    let project = match index.find(&relative_path).await {
        Ok(p) => p,
        Err(e) => {
            log::warn!("watch: failed to resolve project for {relative_path}: {e}");
            return;
        }
    };

    let file_name = paths::file_name(path);
    if !should_include_file(&file_name, project.as_ref()) {
        return;
    }

    let path = path.to_path_buf();
    tokio::spawn(async move {
        let project_context = project.as_ref().map(|project| ProjectContext { project, relative_path: relative_path.clone() });

        log::info!("watch: ingesting {}", path.display());
        match custody_ingest::ingest_path(&ctx, &path, project_context.as_ref()).await {
            Ok(outcome) => log::info!("watch: {} -> {}", path.display(), outcome.cid),
            Err(e) => log::warn!("watch: ingest failed for {}: {e}", path.display()),
        }
    });
}
