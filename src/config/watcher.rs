//! File watcher for configuration hierarchies.
//!
//! Watches the directories of every layer file of a loaded hierarchy. When a
//! layer file changes, the hierarchy is reloaded and rebuilt with the caller's
//! build function (typically validation). The new value is swapped in
//! atomically and a [`ReloadEvent`] is published through a tokio watch
//! channel. A failed reload keeps the previous configuration.
//!
//! Uses debouncing to coalesce rapid file changes.

use super::layers::Hierarchy;
use super::loader::YamlLoader;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use notify_debouncer_mini::{DebouncedEvent, DebouncedEventKind, new_debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Events emitted after a layer file changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// The hierarchy was reloaded; `changed` lists the files that triggered it.
    Reloaded {
        changed: Vec<PathBuf>,
        files: Vec<PathBuf>,
    },
    /// Reloading or rebuilding failed; the previous configuration stays active.
    Failed { error: String },
}

impl ReloadEvent {
    pub fn is_success(&self) -> bool {
        matches!(self, ReloadEvent::Reloaded { .. })
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Debounce duration for coalescing rapid changes.
    pub debounce_duration: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
        }
    }
}

type BuildFn<T> = Box<dyn Fn(&Hierarchy) -> Result<T> + Send>;

/// Reloads a hierarchy and publishes the rebuilt value.
///
/// Owned by the watcher thread; usable on its own to trigger reloads by hand.
pub struct Reloader<T> {
    loader: YamlLoader,
    entry: PathBuf,
    build: BuildFn<T>,
    current: Arc<ArcSwap<T>>,
    events: watch::Sender<Option<ReloadEvent>>,
    files: Vec<PathBuf>,
    /// Set while the last reload failed. The layer list is stale then, so
    /// any change in a watched directory (such as a missing parent being
    /// created) triggers the next attempt.
    failed: bool,
}

impl<T: Send + Sync + 'static> Reloader<T> {
    /// Load and build once. Fails if the initial configuration is invalid.
    pub fn new<F>(loader: YamlLoader, entry: &Path, build: F) -> Result<(Self, watch::Receiver<Option<ReloadEvent>>)>
    where
        F: Fn(&Hierarchy) -> Result<T> + Send + 'static,
    {
        let hierarchy = loader
            .load_hierarchy(entry)
            .with_context(|| format!("Failed to load {}", entry.display()))?;
        let value = build(&hierarchy)?;
        let files = owned_files(&hierarchy);
        let (tx, rx) = watch::channel(None);

        Ok((
            Self {
                loader,
                entry: entry.to_path_buf(),
                build: Box::new(build),
                current: Arc::new(ArcSwap::from_pointee(value)),
                events: tx,
                files,
                failed: false,
            },
            rx,
        ))
    }

    /// Shared handle to the active configuration.
    pub fn current(&self) -> Arc<ArcSwap<T>> {
        Arc::clone(&self.current)
    }

    /// Layer files of the active configuration.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Whether the most recent reload failed.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Reload the hierarchy, publish the outcome and return it.
    pub fn reload(&mut self, changed: Vec<PathBuf>) -> ReloadEvent {
        let event = match self.try_reload() {
            Ok(files) => {
                info!("Reloaded configuration from {}", self.entry.display());
                ReloadEvent::Reloaded { changed, files }
            }
            Err(e) => {
                error!("Config reload failed, keeping previous configuration: {:#}", e);
                ReloadEvent::Failed {
                    error: format!("{:#}", e),
                }
            }
        };
        self.failed = !event.is_success();
        // No receivers left is not an error for the reloader itself.
        let _ = self.events.send(Some(event.clone()));
        event
    }

    fn try_reload(&mut self) -> Result<Vec<PathBuf>> {
        let hierarchy = self.loader.load_hierarchy(&self.entry)?;
        let value = (self.build)(&hierarchy)?;
        self.current.store(Arc::new(value));
        self.files = owned_files(&hierarchy);
        Ok(self.files.clone())
    }
}

/// Handle to a running config watcher.
pub struct ConfigWatcher<T> {
    current: Arc<ArcSwap<T>>,
    /// Receiver for reload events. Starts at `None`.
    pub events: watch::Receiver<Option<ReloadEvent>>,
    /// The thread exits on the first file event after every event receiver
    /// has been dropped.
    _thread: std::thread::JoinHandle<()>,
}

impl<T> ConfigWatcher<T> {
    /// The active configuration.
    pub fn current(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Shared handle to the active configuration, for handing to other components.
    pub fn handle(&self) -> Arc<ArcSwap<T>> {
        Arc::clone(&self.current)
    }

    /// Wait for the next reload event.
    pub async fn wait_for_change(&mut self) -> Option<ReloadEvent> {
        // Skip the initial None value
        loop {
            if self.events.changed().await.is_err() {
                return None; // Sender dropped
            }
            let event = self.events.borrow().clone();
            if event.is_some() {
                return event;
            }
        }
    }

    /// Get the latest event without waiting.
    pub fn latest_event(&self) -> Option<ReloadEvent> {
        self.events.borrow().clone()
    }
}

/// Load `entry`, build the initial value and start watching its layer files.
///
/// # Example
/// ```ignore
/// let watcher = watch_config(
///     Path::new("config/prod.yaml"),
///     YamlLoader::default(),
///     WatcherConfig::default(),
///     move |hierarchy| Ok(schema.validate(&hierarchy.merged)?),
/// )?;
/// let config = watcher.current();
/// ```
pub fn watch_config<T, F>(
    entry: &Path,
    loader: YamlLoader,
    config: WatcherConfig,
    build: F,
) -> Result<ConfigWatcher<T>>
where
    T: Send + Sync + 'static,
    F: Fn(&Hierarchy) -> Result<T> + Send + 'static,
{
    let (reloader, events) = Reloader::new(loader, entry, build)?;
    let current = reloader.current();

    let (notify_tx, notify_rx) = mpsc::channel();
    let mut debouncer = new_debouncer(config.debounce_duration, notify_tx)?;

    let mut watched_dirs = BTreeSet::new();
    for dir in watch_dirs(reloader.files()) {
        info!("Watching config directory: {}", dir.display());
        debouncer
            .watcher()
            .watch(&dir, notify::RecursiveMode::NonRecursive)?;
        watched_dirs.insert(dir);
    }

    let thread = std::thread::Builder::new()
        .name("yamlconf-watcher".to_string())
        .spawn(move || {
            let mut reloader = reloader;
            let mut watched_dirs = watched_dirs;
            while let Ok(result) = notify_rx.recv() {
                if reloader.events.is_closed() {
                    break;
                }
                match result {
                    Ok(events) => {
                        let changed =
                            relevant_changes(events, reloader.files(), reloader.is_failed());
                        if changed.is_empty() {
                            continue;
                        }
                        debug!("Config change detected: {:?}", changed);
                        if reloader.reload(changed).is_success() {
                            // A reload may have pulled in new parent files.
                            for dir in watch_dirs(reloader.files()) {
                                if watched_dirs.contains(&dir) {
                                    continue;
                                }
                                match debouncer
                                    .watcher()
                                    .watch(&dir, notify::RecursiveMode::NonRecursive)
                                {
                                    Ok(()) => {
                                        info!("Watching config directory: {}", dir.display());
                                        watched_dirs.insert(dir);
                                    }
                                    Err(e) => warn!("Cannot watch {}: {}", dir.display(), e),
                                }
                            }
                        }
                    }
                    Err(e) => {
                        error!("File watcher error: {}", e);
                        let _ = reloader.events.send(Some(ReloadEvent::Failed {
                            error: e.to_string(),
                        }));
                    }
                }
            }
            info!("Config watcher stopping");
        })
        .context("Failed to spawn config watcher thread")?;

    Ok(ConfigWatcher {
        current,
        events,
        _thread: thread,
    })
}

fn owned_files(hierarchy: &Hierarchy) -> Vec<PathBuf> {
    hierarchy.files().into_iter().map(Path::to_path_buf).collect()
}

/// Canonical form used to compare event paths with layer paths.
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Distinct directories containing the given files.
fn watch_dirs(files: &[PathBuf]) -> BTreeSet<PathBuf> {
    files
        .iter()
        .map(|file| {
            let dir = match file.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            canonical(dir)
        })
        .collect()
}

/// Layer files touched by a batch of debounced events. With `any_path`,
/// every event counts.
fn relevant_changes(events: Vec<DebouncedEvent>, files: &[PathBuf], any_path: bool) -> Vec<PathBuf> {
    let layer_files: BTreeSet<PathBuf> = files.iter().map(|f| canonical(f)).collect();
    let mut changed: Vec<PathBuf> = events
        .into_iter()
        .filter(|event| {
            matches!(
                event.kind,
                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
            )
        })
        .map(|event| canonical(&event.path))
        .filter(|path| any_path || layer_files.contains(path))
        .collect();
    changed.sort();
    changed.dedup();
    changed
}
