//! Rebuild on change.
//!
//! [`run`] builds once, then watches the input directory, the config file,
//! and the configured extra targets. Events are debounced: a rebuild starts
//! once no relevant change has arrived for `watch.debounce_ms`. A failed
//! rebuild is logged and the loop keeps going, so fixing the file is enough
//! to recover.
//!
//! The config file is reloaded before every rebuild. If the new config is
//! invalid the previous one stays in effect. A valid one also moves the
//! watched directories when `dir.input` or the watch targets changed.

use crate::config::{self, ConfigError, GLOB_OPTIONS, SiteConfig};
use crate::mode::BuildContext;
use crate::scan::relative_path;
use crate::site::{self, BuildError, BuildOptions, BuildReport};
use chrono::Local;
use glob::Pattern;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("watcher error: {0}")]
    Notify(#[from] notify::Error),
    #[error("watch target '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Decides which changed paths trigger a rebuild.
pub struct ChangeFilter {
    root: PathBuf,
    input: PathBuf,
    output: PathBuf,
    config_file: PathBuf,
    targets: Vec<Pattern>,
}

impl ChangeFilter {
    pub fn new(root: &Path, config_file: &Path, config: &SiteConfig) -> Result<Self, WatchError> {
        let targets = config
            .watch
            .targets
            .iter()
            .map(|pattern| {
                Pattern::new(pattern.trim_start_matches("./")).map_err(|source| WatchError::Glob {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            root: root.to_path_buf(),
            input: config.dir.input_dir(root),
            output: config.dir.output_dir(root),
            config_file: config_file.to_path_buf(),
            targets,
        })
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        if is_editor_temp(path) || path.starts_with(&self.output) {
            return false;
        }
        path == self.config_file
            || path.starts_with(&self.input)
            || (path.starts_with(&self.root) && self.matches_target(&relative_path(path, &self.root)))
    }

    fn matches_target(&self, rel: &str) -> bool {
        self.targets.iter().any(|p| p.matches_with(rel, GLOB_OPTIONS))
    }

    /// Directories to register with the watcher, with their recursion mode.
    fn watch_roots(&self, config: &SiteConfig) -> Vec<(PathBuf, RecursiveMode)> {
        let mut roots = vec![(self.input.clone(), RecursiveMode::Recursive)];
        if let Some(parent) = self.config_file.parent() {
            roots.push((parent.to_path_buf(), RecursiveMode::NonRecursive));
        }
        for pattern in &config.watch.targets {
            let base = self.root.join(glob_base(pattern));
            if base.is_dir() && !base.starts_with(&self.input) {
                roots.push((base, RecursiveMode::Recursive));
            }
        }
        roots.sort_by(|a, b| a.0.cmp(&b.0));
        roots.dedup_by(|a, b| a.0 == b.0);
        roots
    }
}

/// Leading path of a glob before its first wildcard component.
fn glob_base(pattern: &str) -> PathBuf {
    Path::new(pattern.trim_start_matches("./"))
        .components()
        .take_while(|c| match c {
            Component::Normal(part) => !part.to_string_lossy().contains(['*', '?', '[']),
            _ => true,
        })
        .collect()
}

fn is_editor_temp(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    name.ends_with('~')
        || name.ends_with(".swp")
        || name.ends_with(".swx")
        || name.ends_with(".tmp")
        || name.starts_with(".#")
}

/// Collects changed paths until the stream goes quiet.
pub struct Debouncer {
    quiet: Duration,
    changed: BTreeSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            changed: BTreeSet::new(),
            last_event: None,
        }
    }

    pub fn add(&mut self, path: PathBuf, now: Instant) {
        self.changed.insert(path);
        self.last_event = Some(now);
    }

    /// The collected paths, once `quiet` has passed since the last one.
    pub fn take_if_ready(&mut self, now: Instant) -> Option<Vec<PathBuf>> {
        let last = self.last_event?;
        if now.duration_since(last) < self.quiet || self.changed.is_empty() {
            return None;
        }
        self.last_event = None;
        Some(std::mem::take(&mut self.changed).into_iter().collect())
    }

    /// How long to block waiting for the next event.
    pub fn wait_time(&self, now: Instant) -> Duration {
        match self.last_event {
            Some(last) => self
                .quiet
                .saturating_sub(now.duration_since(last))
                .max(Duration::from_millis(1)),
            None => Duration::from_secs(3600),
        }
    }
}

type WatchRoots = Vec<(PathBuf, RecursiveMode)>;

/// Roots in `old` that `new` no longer has, and roots `new` adds.
fn diff_roots(old: &[(PathBuf, RecursiveMode)], new: &[(PathBuf, RecursiveMode)]) -> (WatchRoots, WatchRoots) {
    let removed = old.iter().filter(|r| !new.contains(r)).cloned().collect();
    let added = new.iter().filter(|r| !old.contains(r)).cloned().collect();
    (removed, added)
}

/// Move `watcher` from `current` to `wanted`, skipping directories that do
/// not exist. Returns the roots now registered.
fn rewatch<W: Watcher>(
    watcher: &mut W,
    current: &[(PathBuf, RecursiveMode)],
    wanted: WatchRoots,
) -> Result<WatchRoots, notify::Error> {
    let (removed, added) = diff_roots(current, &wanted);
    for (dir, _) in &removed {
        if let Err(err) = watcher.unwatch(dir) {
            tracing::debug!(dir = %dir.display(), error = %err, "unwatch failed");
        }
    }
    let mut registered: WatchRoots = current.iter().filter(|r| !removed.contains(r)).cloned().collect();
    for (dir, mode) in added {
        if dir.exists() {
            watcher.watch(&dir, mode)?;
            tracing::debug!(dir = %dir.display(), "watching");
            registered.push((dir, mode));
        }
    }
    Ok(registered)
}

fn is_content_event(event: &Event) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(kind) => !matches!(kind, notify::event::ModifyKind::Metadata(_)),
        _ => false,
    }
}

fn build_once(
    root: &Path,
    config: &SiteConfig,
    ctx: &BuildContext,
    options: BuildOptions,
) -> Result<BuildReport, BuildError> {
    let ctx = ctx.clone().with_build_time(Local::now());
    site::build(root, config, &ctx, options)
}

/// Build, then rebuild on every debounced batch of relevant changes.
///
/// `after_build` sees the result of every build, the first one included.
/// Only an invalid initial config or a watcher setup failure ends the loop
/// with an error.
pub fn run<F>(
    root: &Path,
    config_file: &Path,
    ctx: &BuildContext,
    options: BuildOptions,
    mut after_build: F,
) -> Result<(), WatchError>
where
    F: FnMut(Result<&BuildReport, &BuildError>),
{
    let mut config = config::load_config(config_file)?;
    let result = build_once(root, &config, ctx, options);
    after_build(result.as_ref());

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })?;
    let mut filter = ChangeFilter::new(root, config_file, &config)?;
    let mut watched = rewatch(&mut watcher, &[], filter.watch_roots(&config))?;
    tracing::info!(input = %config.dir.input_dir(root).display(), "watching for changes");

    let mut debouncer = Debouncer::new(Duration::from_millis(config.watch.debounce_ms));
    loop {
        match rx.recv_timeout(debouncer.wait_time(Instant::now())) {
            Ok(Ok(event)) => {
                if !is_content_event(&event) {
                    continue;
                }
                for path in event.paths {
                    if filter.is_relevant(&path) {
                        tracing::debug!(path = %path.display(), kind = ?event.kind, "change");
                        debouncer.add(path, Instant::now());
                    }
                }
            }
            Ok(Err(err)) => tracing::warn!(error = %err, "watch error"),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        let Some(changed) = debouncer.take_if_ready(Instant::now()) else {
            continue;
        };
        tracing::info!(changed = changed.len(), "rebuilding");

        if changed.iter().any(|p| p == config_file) {
            match config::load_config(config_file) {
                Ok(reloaded) => match ChangeFilter::new(root, config_file, &reloaded) {
                    Ok(new_filter) => {
                        let wanted = new_filter.watch_roots(&reloaded);
                        match rewatch(&mut watcher, &watched, wanted) {
                            Ok(now) => watched = now,
                            Err(err) => tracing::warn!(error = %err, "could not watch new directories"),
                        }
                        filter = new_filter;
                        config = reloaded;
                    }
                    Err(err) => tracing::error!(error = %err, "keeping previous config"),
                },
                Err(err) => tracing::error!(error = %err, "keeping previous config"),
            }
        }

        // Rebuilds keep the output in place; stale files go on the next clean build.
        let result = build_once(root, &config, ctx, BuildOptions { clean: false });
        if let Err(err) = &result {
            tracing::error!(error = %err, "rebuild failed");
        }
        after_build(result.as_ref());
    }
    Ok(())
}
