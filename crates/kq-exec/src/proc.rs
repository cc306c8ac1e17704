use std::{path::PathBuf, process::Stdio};

use async_trait::async_trait;
use kq_core::{Operation, OperationError};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::ExecError;

/// Process configuration baked into an operation.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcConfig {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Return an error when the exit code is not zero.
    pub fail_on_non_zero: bool,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
            fail_on_non_zero: true,
        }
    }
}

impl ProcConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Runs a subprocess to completion; a non-zero exit is a failure.
///
/// The child is killed when the operation is aborted (task timeout).
#[derive(Clone, Debug)]
pub struct ExecOperation {
    cfg: ProcConfig,
}

impl ExecOperation {
    pub fn new(cfg: ProcConfig) -> Result<Self, ExecError> {
        if cfg.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ProcConfig {
        &self.cfg
    }

    async fn execute(&self) -> Result<(), ExecError> {
        trace!(target: "kq.exec.proc", program = %self.cfg.program, args = ?self.cfg.args, "spawn");

        let output = self
            .cfg
            .command()
            .output()
            .await
            .map_err(|e| ExecError::Spawn(e.to_string()))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            trace!(target: "kq.exec.proc.out", program = %self.cfg.program, %line);
        }

        if output.status.success() || !self.cfg.fail_on_non_zero {
            debug!(target: "kq.exec.proc", program = %self.cfg.program, "exit success");
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr)
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string());
        match output.status.code() {
            Some(code) => Err(ExecError::NonZeroExit { code, stderr }),
            None => Err(ExecError::KilledBySignal),
        }
    }
}

#[async_trait]
impl Operation for ExecOperation {
    async fn call(&self) -> Result<(), OperationError> {
        self.execute().await.map_err(Into::into)
    }
}
