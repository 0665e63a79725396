use crate::command::{CommandRunner, CommandSpec};
use crate::stage::{StageFailure, StageMarker, checked_run};

/// Start the downstream CodeBuild job, optionally substituting the
/// container image the job runs in.
pub fn trigger_codebuild(
    runner: &dyn CommandRunner,
    project_name: &str,
    image_override: Option<&str>,
) -> Result<(), StageFailure> {
    if project_name.trim().is_empty() {
        return Err(StageFailure::new(
            StageMarker::PostBuild,
            "project name must not be empty",
        ));
    }

    let mut args = vec!["codebuild", "start-build", "--project-name", project_name];
    // An empty override means no override.
    if let Some(image) = image_override.filter(|image| !image.is_empty()) {
        args.push("--image-override");
        args.push(image);
    }

    println!("Triggering CodeBuild project {project_name}");
    checked_run(runner, StageMarker::PostBuild, &CommandSpec::new("aws", &args))?;
    println!("Build triggered");
    Ok(())
}
