//! Run modes and the per-process build context.
//!
//! A process runs in exactly one [`RunMode`]. Before the first build,
//! [`BuildContext::apply_run_mode`] turns drafts on for the continuous modes
//! (watch and serve) so authors see unfinished posts locally while one-shot
//! builds keep them out of the published site.
//!
//! The context is created once in `main` and passed by reference into every
//! build; nothing reads the environment after that point.

use chrono::{DateTime, Local};
use std::fmt;

/// Environment variable that enables drafts for any run mode.
pub const BUILD_DRAFTS_ENV: &str = "BUILD_DRAFTS";

/// How the generator was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One-shot build.
    Build,
    /// Build, then rebuild on changes.
    Watch,
    /// Watch and serve the output over HTTP.
    Serve,
}

impl RunMode {
    /// Continuous modes keep the process alive and rebuild on change.
    pub fn is_continuous(self) -> bool {
        matches!(self, RunMode::Watch | RunMode::Serve)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Build => "build",
            RunMode::Watch => "watch",
            RunMode::Serve => "serve",
        })
    }
}

/// Values fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct BuildContext {
    drafts_enabled: bool,
    run_mode: RunMode,
    /// Captured once so every page of a build sees the same clock.
    pub build_time: DateTime<Local>,
}

impl BuildContext {
    /// Create a context with an explicit initial draft setting.
    pub fn new(drafts_enabled: bool) -> Self {
        Self {
            drafts_enabled,
            run_mode: RunMode::Build,
            build_time: Local::now(),
        }
    }

    /// Create a context from the value of [`BUILD_DRAFTS_ENV`].
    ///
    /// Any non-empty value enables drafts.
    pub fn from_env_value(value: Option<&str>) -> Self {
        Self::new(value.is_some_and(|v| !v.is_empty()))
    }

    /// Read [`BUILD_DRAFTS_ENV`] from the process environment.
    ///
    /// Call once, at process entry.
    pub fn from_env() -> Self {
        let value = std::env::var(BUILD_DRAFTS_ENV).ok();
        Self::from_env_value(value.as_deref())
    }

    /// Record the run mode; watch and serve enable drafts.
    ///
    /// Only ever turns drafts on.
    pub fn apply_run_mode(&mut self, mode: RunMode) {
        self.run_mode = mode;
        if mode.is_continuous() {
            self.drafts_enabled = true;
        }
    }

    /// Enable drafts explicitly (the `--drafts` flag).
    pub fn enable_drafts(&mut self) {
        self.drafts_enabled = true;
    }

    pub fn drafts_enabled(&self) -> bool {
        self.drafts_enabled
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    /// Replace the build clock. Used by tests for deterministic output.
    pub fn with_build_time(mut self, time: DateTime<Local>) -> Self {
        self.build_time = time;
        self
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new(false)
    }
}
