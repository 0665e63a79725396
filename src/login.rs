use crate::command::{CommandRunner, CommandSpec};
use crate::stage::{StageFailure, StageMarker, checked_run};

pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Log in to a container registry. The password travels over stdin so it
/// never shows up in a process listing.
pub fn registry_login(
    runner: &dyn CommandRunner,
    username: &str,
    password: &str,
    registry: &str,
) -> Result<(), StageFailure> {
    if username.trim().is_empty() {
        return Err(StageFailure::new(
            StageMarker::PreBuild,
            "username must not be empty",
        ));
    }
    if password.trim().is_empty() {
        return Err(StageFailure::new(
            StageMarker::PreBuild,
            "password must not be empty",
        ));
    }

    println!("Logging in to {registry} as {username}");
    let spec = CommandSpec::new(
        "docker",
        &["login", "--username", username, "--password-stdin", registry],
    )
    .with_stdin(password);

    let output = checked_run(runner, StageMarker::PreBuild, &spec)?;
    if !output.stdout.trim().is_empty() {
        println!("{}", output.stdout.trim_end());
    }
    println!("Login succeeded");
    Ok(())
}
