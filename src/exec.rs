//! External command execution.
//!
//! ```ignore
//! Cmd::new("rsvg-convert").args(["-h", "240", "-o", out, src]).run()?;
//! let diff = Cmd::new("git").args(["diff", "v1.0.0", "HEAD", "--name-status"]).run()?;
//! Cmd::new("bundle").args(["exec", "jekyll", "build"]).inherit(true).run()?;
//! ```

use crate::{debug, log};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("`{0}` not found in PATH")]
    NotFound(String),

    #[error("failed to execute `{0}`")]
    Spawn(String, #[source] std::io::Error),

    #[error("`{program}` exited with code {code}{}", stderr_suffix(.stderr))]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("`{0}` was terminated by a signal")]
    Killed(String),
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(":\n{stderr}")
    }
}

/// Command builder for external process execution.
#[derive(Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    inherit: bool,
}

impl Cmd {
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
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
        self.args.extend(args.into_iter().map(|a| a.as_ref().to_owned()));
        self
    }

    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Let the child write straight to this process's stdout/stderr.
    pub fn inherit(mut self, enable: bool) -> Self {
        self.inherit = enable;
        self
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Fail early with a readable error when the program is not installed.
    pub fn ensure_available(&self) -> Result<(), ToolError> {
        which::which(&self.program)
            .map(|_| ())
            .map_err(|_| ToolError::NotFound(self.program_name()))
    }

    /// Run to completion. A non-zero exit status is an error.
    pub fn run(self) -> Result<Output, ToolError> {
        let name = self.program_name();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        debug!("exec"; "{} {}", name, self.display_args());

        let output = if self.inherit {
            let status = cmd
                .stdin(Stdio::null())
                .status()
                .map_err(|e| ToolError::Spawn(name.clone(), e))?;
            Output {
                status,
                stdout: Vec::new(),
                stderr: Vec::new(),
            }
        } else {
            cmd.output().map_err(|e| ToolError::Spawn(name.clone(), e))?
        };

        match output.status.code() {
            Some(0) => Ok(output),
            Some(code) => {
                log!("error"; "`{}` exited with code {}", name, code);
                Err(ToolError::Failed {
                    program: name,
                    code,
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            None => Err(ToolError::Killed(name)),
        }
    }

    fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
