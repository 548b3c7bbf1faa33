//! External command execution.
//!
//! The stylesheet compiler and script bundler are separate programs. This
//! module resolves them on `PATH`, runs them with captured output, and turns
//! failures into errors carrying the tool's own stderr.
//!
//! ```ignore
//! let css = Cmd::from_slice(&["sass"])
//!     .args(["--no-source-map", "style.scss"])
//!     .cwd(root)
//!     .run()?;
//! ```

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("empty command")]
    EmptyCommand,
    #[error("`{program}` not found on PATH: {source}")]
    NotFound {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}:\n{stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// Command builder for external tools.
#[derive(Debug, Default, Clone)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array, e.g. `["npx", "sass"]`.
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        Self {
            program,
            args: iter.map(|s| s.as_ref().to_owned()).collect(),
            cwd: None,
        }
    }

    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Run to completion and return stdout.
    pub fn run(&self) -> Result<Vec<u8>, ExecError> {
        if self.program.is_empty() {
            return Err(ExecError::EmptyCommand);
        }
        let program = self.program_name();
        let resolved = which::which(&self.program).map_err(|source| ExecError::NotFound {
            program: program.clone(),
            source,
        })?;

        let mut command = Command::new(resolved);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(program = %program, args = ?self.args, "running external tool");
        let output = command.output().map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                program,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }

    /// Run and decode stdout as UTF-8 (lossily).
    pub fn run_to_string(&self) -> Result<String, ExecError> {
        self.run()
            .map(|out| String::from_utf8_lossy(&out).into_owned())
    }
}
