use std::path::Path;

use flume::Receiver;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::Result;

/// Signals modifications of the config file. Events arriving while a change
/// is still pending are folded into it.
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    changes: Receiver<()>,
}

impl ConfigWatcher {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let (change_tx, changes) = flume::bounded(1);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    debug!("config event: {:?}", event);
                    let _ = change_tx.try_send(());
                }
                Ok(_) => {}
                Err(e) => warn!("watch error: {:?}", e),
            }
        })?;
        watcher.watch(path.as_ref(), RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            changes,
        })
    }

    pub fn changes(&self) -> &Receiver<()> {
        &self.changes
    }
}
