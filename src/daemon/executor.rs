use crate::error::Result;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Output, Stdio};
use tokio::process::Command;
use tracing::debug;

/// A program plus arguments taken from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl RoleCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command sharing the parent's standard streams; killed if the handle is dropped.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        cmd
    }
}

impl fmt::Display for RoleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Runs one-shot bundle commands to completion.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Runs with inherited stdio and waits for exit.
    pub async fn run(&self, command: &RoleCommand) -> Result<ExitStatus> {
        debug!("Running command: {}", command);
        let status = command.command().status().await?;
        debug!("Command finished with exit code: {:?}", status.code());
        Ok(status)
    }

    /// Runs with captured output, for probes whose chatter should stay out of the logs.
    pub async fn output(&self, command: &RoleCommand) -> Result<Output> {
        let output = command
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;
        Ok(output)
    }
}
