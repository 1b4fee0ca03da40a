//! `custody preprocessor-folder` (one-shot scan) and `custody sync` (scan
//! then watch forever).

use std::path::Path;

use anyhow::Result;
use custody_cid::walk::WalkConfig;
use custody_watch::ProjectIndex;

use crate::context::AppContext;

pub async fn preprocessor_folder(ctx: &AppContext, path: &Path) -> Result<()> {
    let index = ProjectIndex::load(ctx.ingest.pool.clone()).await?;
    custody_watch::scan::initial_scan(ctx.ingest.clone(), &index, path, &WalkConfig::default()).await
}

pub async fn sync(ctx: &AppContext, path: &Path) -> Result<()> {
    custody_watch::run(ctx.ingest.clone(), path.to_path_buf(), WalkConfig::default()).await
}
