use std::fs;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stage::{StageFailure, StageMarker};

/// Sentinel accepted in the FAIL environment variable when no stage has
/// failed. Any of the stage marker strings reports that stage as failed.
pub const NO_ERROR: &str = "NO_ERROR";

const FAIL_VAR: &str = "FAIL";
const STATE_DIR_VAR: &str = "CODEBUILD_HELPER_STATE_DIR";

/// The most recent stage failure. A later failure overwrites an earlier
/// one; failures are never aggregated.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FailureRecord {
    pub stage: StageMarker,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&StageFailure> for FailureRecord {
    fn from(failure: &StageFailure) -> Self {
        Self {
            stage: failure.stage,
            message: failure.message.clone(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone)]
struct Status {
    #[serde(default)]
    failure: Option<FailureRecord>,
}

/// Resolve the active failure, if any. The FAIL environment variable wins
/// over the status file: a marker value reports that stage as failed, the
/// NO_ERROR sentinel masks any recorded failure, and anything else falls
/// through to the file.
pub fn load_status() -> anyhow::Result<Option<FailureRecord>> {
    if let Ok(value) = std::env::var(FAIL_VAR) {
        if value == NO_ERROR {
            return Ok(None);
        }
        if let Some(stage) = StageMarker::parse(&value) {
            return Ok(Some(FailureRecord {
                stage,
                message: format!("{FAIL_VAR} environment variable is set"),
                timestamp: Utc::now(),
            }));
        }
    }

    read_status_file()
}

/// Overwrite the failure slot on disk.
pub fn save_failure(record: &FailureRecord) -> anyhow::Result<()> {
    write_status(&Status {
        failure: Some(record.clone()),
    })
}

/// Translate the resolved status into a process exit code. An active marker
/// prints the diagnostic and maps to exit 1; the no-failure case is silent
/// and maps to exit 0. Never mutates the recorded status.
pub fn error_handler(failure: Option<&FailureRecord>) -> i32 {
    match failure {
        Some(record) => {
            println!("FAIL {}: {}", record.stage, record.message);
            1
        }
        None => 0,
    }
}

fn read_status_file() -> anyhow::Result<Option<FailureRecord>> {
    let path = status_file_path()?;
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("reading status file at {}", path.display()))?;
    let status: Status = serde_json::from_str(&data)
        .with_context(|| format!("parsing status file at {}", path.display()))?;
    Ok(status.failure)
}

fn write_status(status: &Status) -> anyhow::Result<()> {
    let path = status_file_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating status directory {}", parent.display()))?;
    }

    let tmp_path = path.with_extension("tmp");
    let data = serde_json::to_string_pretty(status)?;
    fs::write(&tmp_path, data)
        .with_context(|| format!("writing temp status file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("committing status file to {}", path.display()))?;
    Ok(())
}

fn status_file_path() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(STATE_DIR_VAR) {
        return Ok(PathBuf::from(dir).join("status.json"));
    }

    let base = dirs::data_dir()
        .ok_or_else(|| anyhow!("could not determine platform data directory"))?
        .join("codebuild-helper");
    Ok(base.join("status.json"))
}

#[cfg(test)]
mod tests {
    use super::{FailureRecord, error_handler, load_status, save_failure};
    use crate::stage::{StageFailure, StageMarker};

    fn record(stage: StageMarker, message: &str) -> FailureRecord {
        FailureRecord::from(&StageFailure::new(stage, message))
    }

    #[test]
    fn fail_variable_reports_that_stage() {
        temp_env::with_var("FAIL", Some("BUILD"), || {
            let status = load_status().unwrap();
            assert_eq!(status.unwrap().stage, StageMarker::Build);
        });
    }

    #[test]
    fn no_error_sentinel_masks_recorded_failure() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                ("FAIL", Some("NO_ERROR")),
                (
                    "CODEBUILD_HELPER_STATE_DIR",
                    Some(dir.path().to_str().unwrap()),
                ),
            ],
            || {
                save_failure(&record(StageMarker::PreBuild, "login denied")).unwrap();
                assert!(load_status().unwrap().is_none());
            },
        );
    }

    #[test]
    fn unknown_fail_value_falls_through_to_file() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                ("FAIL", Some("SOMETHING_ELSE")),
                (
                    "CODEBUILD_HELPER_STATE_DIR",
                    Some(dir.path().to_str().unwrap()),
                ),
            ],
            || {
                save_failure(&record(StageMarker::PostBuild, "trigger denied")).unwrap();
                let status = load_status().unwrap();
                assert_eq!(status.unwrap().stage, StageMarker::PostBuild);
            },
        );
    }

    #[test]
    fn later_failure_overwrites_earlier_one() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                ("FAIL", None::<&str>),
                (
                    "CODEBUILD_HELPER_STATE_DIR",
                    Some(dir.path().to_str().unwrap()),
                ),
            ],
            || {
                save_failure(&record(StageMarker::PreBuild, "first")).unwrap();
                save_failure(&record(StageMarker::Build, "second")).unwrap();

                let status = load_status().unwrap().unwrap();
                assert_eq!(status.stage, StageMarker::Build);
                assert_eq!(status.message, "second");
            },
        );
    }

    #[test]
    fn missing_state_means_no_failure() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                ("FAIL", None::<&str>),
                (
                    "CODEBUILD_HELPER_STATE_DIR",
                    Some(dir.path().to_str().unwrap()),
                ),
            ],
            || {
                assert!(load_status().unwrap().is_none());
            },
        );
    }

    #[test]
    fn error_handler_is_idempotent_on_no_failure() {
        let dir = tempfile::tempdir().unwrap();
        temp_env::with_vars(
            [
                ("FAIL", None::<&str>),
                (
                    "CODEBUILD_HELPER_STATE_DIR",
                    Some(dir.path().to_str().unwrap()),
                ),
            ],
            || {
                save_failure(&record(StageMarker::Build, "push denied")).unwrap();

                // Repeated no-failure handling never touches the recorded
                // status and never reports failure.
                assert_eq!(error_handler(None), 0);
                assert_eq!(error_handler(None), 0);

                let status = load_status().unwrap().unwrap();
                assert_eq!(status.stage, StageMarker::Build);
                assert_eq!(status.message, "push denied");
            },
        );
    }

    #[test]
    fn error_handler_maps_active_marker_to_exit_one() {
        let active = record(StageMarker::PreBuild, "login denied");
        assert_eq!(error_handler(Some(&active)), 1);
    }
}
