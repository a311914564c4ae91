//! Configuration file watcher for hot reload.
//!
//! The config file's directory is watched rather than the file itself:
//! editors often save by renaming a temp file over the original, which a
//! file-level watch loses. Schema files usually live next to the config, so
//! editing one reloads too. Bursts of events are debounced into one reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ProxyConfig;

/// Quiet period after the last file event before reloading.
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches the configuration and emits each successfully loaded revision.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
}

/// Keeps the OS watch alive. Dropping it stops reloads.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ConfigWatcher {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            debounce: DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// Configurations that fail to load or validate are logged and skipped.
    pub fn spawn(self) -> Result<(WatchHandle, mpsc::UnboundedReceiver<ProxyConfig>), notify::Error> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();
        let (config_tx, config_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_relevant(&event) => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, dir = ?dir, "Config watcher started");

        let path = self.path;
        let debounce = self.debounce;
        let task = tokio::spawn(async move {
            while event_rx.recv().await.is_some() {
                // Swallow the rest of the burst.
                loop {
                    match tokio::time::timeout(debounce, event_rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }

                tracing::info!("Config change detected, reloading...");
                match load_config(&path) {
                    Ok(config) => {
                        if config_tx.send(config).is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to reload config: {}. Keeping current routes.", e);
                    }
                }
            }
        });

        Ok((
            WatchHandle {
                _watcher: watcher,
                task,
            },
            config_rx,
        ))
    }
}

/// Content changes to files that are not editor scratch files.
fn is_relevant(event: &Event) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
        return false;
    }
    event.paths.iter().any(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| !name.starts_with('.') && !name.ends_with('~'))
    })
}
