//! Command execution
//!
//! A command string from a task or hook is either a reference to another
//! task or an OS command. OS commands are tokenized and spawned on a worker
//! thread; their result comes back through a one-shot channel.

use crate::config::TaskTable;
use crate::error::{ExecutionError, Result};
use crate::runner::{expand_env, run_isolated, tokenize, Context};
use std::process::{Command as StdCommand, Stdio};
use tracing::debug;

/// A command string classified against the task table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// The string names another task
    TaskReference(String),

    /// An OS command, already expanded and tokenized
    Shell(Vec<String>),
}

impl CommandLine {
    /// Classify `raw`: an exact task name wins, anything else is tokenized
    pub fn classify(raw: &str, tasks: &TaskTable, ctx: &Context) -> Result<Self> {
        if tasks.contains_key(raw) {
            return Ok(CommandLine::TaskReference(raw.to_string()));
        }

        let argv = tokenize(&expand_env(raw, ctx))?;
        if argv.is_empty() {
            return Err(ExecutionError::EmptyCommand.into());
        }

        Ok(CommandLine::Shell(argv))
    }
}

/// Captured output of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Standard output followed by standard error
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Spawn `argv` in the project root and wait for it on a worker thread
pub fn execute_command(argv: Vec<String>, ctx: &Context) -> Result<CommandOutput> {
    if argv.is_empty() {
        return Err(ExecutionError::EmptyCommand.into());
    }

    let working_dir = ctx.working_dir.clone();
    let exports: Vec<(String, String)> = ctx
        .exports()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let label = argv[0].clone();

    run_isolated(&label, move || {
        let program = &argv[0];
        debug!(program = %program, args = ?&argv[1..], "spawning process");

        let output = StdCommand::new(program)
            .args(&argv[1..])
            .current_dir(&working_dir)
            .envs(exports)
            .stdin(Stdio::null())
            .output()
            .map_err(|error| ExecutionError::Spawn {
                program: program.clone(),
                error,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ExecutionError::CommandFailed {
                command: argv.join(" "),
                code: output.status.code(),
                stderr,
            }
            .into());
        }

        Ok(CommandOutput { stdout, stderr })
    })
}

/// Run a command line and return its trimmed standard output
pub fn capture(line: &str, ctx: &Context) -> Result<String> {
    let argv = tokenize(line)?;
    let output = execute_command(argv, ctx)?;
    Ok(output.stdout.trim().to_string())
}
