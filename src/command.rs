use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;
use which::which;

/// One external process invocation: program, arguments, and an optional
/// payload piped to the child's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Captured result of a finished invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    /// A run counts as clean only when the process exited zero and wrote
    /// nothing to stderr.
    pub fn clean(&self) -> bool {
        self.success && self.stderr.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("required tool '{0}' not found on PATH")]
    MissingTool(String),
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write to stdin of {program}: {source}")]
    Stdin {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to collect output of {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Narrow seam over external process execution so the operations can be
/// exercised against a scripted fake.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Runs each command as a real child process and blocks until it exits.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        if which(&spec.program).is_err() {
            return Err(CommandError::MissingTool(spec.program.clone()));
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        let mut child = command.spawn().map_err(|source| CommandError::Launch {
            program: spec.program.clone(),
            source,
        })?;

        if let Some(input) = &spec.stdin {
            // Write the payload, then drop the pipe so the child sees EOF.
            if let Some(mut pipe) = child.stdin.take() {
                pipe.write_all(input.as_bytes())
                    .map_err(|source| CommandError::Stdin {
                        program: spec.program.clone(),
                        source,
                    })?;
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| CommandError::Wait {
                program: spec.program.clone(),
                source,
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}
