use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Trimmed standard output of one invocation plus whether it exited cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub ok: bool,
}

impl CommandOutput {
    pub fn failed() -> Self {
        CommandOutput { stdout: String::new(), ok: false }
    }

    /// Output of a successful run, `None` if the run failed or printed nothing.
    pub fn non_empty(self) -> Option<String> {
        if self.ok && !self.stdout.is_empty() {
            Some(self.stdout)
        } else {
            None
        }
    }
}

/// Runs the version-control tool. Never fails: launch errors and non-zero
/// exits both come back as `ok == false` so callers apply one fallback policy.
pub trait CommandRunner {
    fn run(&self, dir: &Path, args: &[&str]) -> CommandOutput;
}

/// The `git` executable, invoked once per query with stderr discarded.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        GitCli { program: program.into() }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        GitCli::new("git")
    }
}

impl CommandRunner for GitCli {
    fn run(&self, dir: &Path, args: &[&str]) -> CommandOutput {
        log::debug!("{} {}", self.program.display(), args.join(" "));
        // no timeout: a hung tool hangs the build step
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        match output {
            Ok(output) => CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                ok: output.status.success(),
            },
            Err(e) => {
                log::debug!("failed to launch {}: {}", self.program.display(), e);
                CommandOutput::failed()
            }
        }
    }
}
