use std::{path::PathBuf, sync::Arc};

use notify::{
    event::{CreateKind, EventKind, RenameMode},
    Event, RecursiveMode, Watcher,
};
use tokio::sync::mpsc;

use custody_ingest::IngestContext;

use crate::{dispatch::maybe_dispatch, index::ProjectIndex};

/// True for the CREATE/RENAME-into events this watcher subscribes to —
/// new files and files renamed/moved into the tree.
fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(CreateKind::File) | EventKind::Create(CreateKind::Any) | EventKind::Modify(notify::event::ModifyKind::Name(RenameMode::To))
    )
}

/// Subscribes to filesystem events under `sync_root` and, forever, dispatches
/// each relevant one to the ingest pipeline. Runs until the channel closes
/// (the watcher, and the forwarding thread behind it, are dropped).
pub async fn watch_forever(ctx: Arc<IngestContext>, index: ProjectIndex, sync_root: PathBuf) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let _ = tx.send(event);
        }
        Err(e) => log::warn!("watch: filesystem watcher error: {e}"),
    })?;

    watcher.watch(&sync_root, RecursiveMode::Recursive)?;
    log::info!("watch: subscribed to {}", sync_root.display());

    while let Some(event) = rx.recv().await {
        if !is_relevant(&event.kind) {
            continue;
        }
        for path in event.paths {
            if path.is_file() {
                maybe_dispatch(ctx.clone(), &index, &sync_root, &path).await;
            }
        }
    }

    // Keeping the watcher alive for the duration of the loop; dropping it
    // here (after the channel closed) stops the underlying OS subscription.
    drop(watcher);
    Ok(())
}
