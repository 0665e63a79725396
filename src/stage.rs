use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::command::{CommandOutput, CommandRunner, CommandSpec};

/// Pipeline phase a failure belongs to. The string forms are shared by the
/// FAIL environment variable, the status file, and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageMarker {
    PreBuild,
    Build,
    PostBuild,
}

impl StageMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageMarker::PreBuild => "PRE_BUILD",
            StageMarker::Build => "BUILD",
            StageMarker::PostBuild => "POST_BUILD",
        }
    }

    pub fn parse(raw: &str) -> Option<StageMarker> {
        match raw {
            "PRE_BUILD" => Some(StageMarker::PreBuild),
            "BUILD" => Some(StageMarker::Build),
            "POST_BUILD" => Some(StageMarker::PostBuild),
            _ => None,
        }
    }
}

impl fmt::Display for StageMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed pipeline operation: which stage broke, and the cause taken from
/// the failing command's stderr.
#[derive(Debug, Error)]
#[error("{stage} failed: {message}")]
pub struct StageFailure {
    pub stage: StageMarker,
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: StageMarker, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    pub fn from_output(stage: StageMarker, output: &CommandOutput) -> Self {
        let stderr = output.stderr.trim();
        let message = if stderr.is_empty() {
            "command exited with non-zero status".to_string()
        } else {
            stderr.to_string()
        };
        Self { stage, message }
    }
}

/// Run one command and flatten launch errors and unclean output into a
/// failure for the given stage.
pub fn checked_run(
    runner: &dyn CommandRunner,
    stage: StageMarker,
    spec: &CommandSpec,
) -> Result<CommandOutput, StageFailure> {
    let output = runner
        .run(spec)
        .map_err(|err| StageFailure::new(stage, err.to_string()))?;
    if output.clean() {
        Ok(output)
    } else {
        Err(StageFailure::from_output(stage, &output))
    }
}
