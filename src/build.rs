use std::collections::BTreeSet;

use crate::command::{CommandRunner, CommandSpec};
use crate::stage::{StageFailure, StageMarker, checked_run};

/// Directory handed to the container engine as the build context. The
/// Dockerfile is resolved inside it.
pub const BUILD_CONTEXT: &str = "docker";
pub const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Build one image covering every tag in a single invocation, then push the
/// tags one by one. The registry copy of `<image>:latest` seeds the layer
/// cache when it exists; failing to fetch it is ignored by policy.
pub fn build_image(
    runner: &dyn CommandRunner,
    image_name: &str,
    tags_list: &[String],
    dockerfile: &str,
    build_arg: &str,
) -> Result<(), StageFailure> {
    if image_name.trim().is_empty() {
        return Err(StageFailure::new(
            StageMarker::Build,
            "image name must not be empty",
        ));
    }

    let refs = tag_refs(image_name, tags_list);
    let cache_ref = format!("{image_name}:latest");
    let dockerfile_path = format!("{BUILD_CONTEXT}/{dockerfile}");

    println!("Building {image_name} from {dockerfile_path}");
    warm_cache(runner, &cache_ref);

    let mut args: Vec<&str> = vec!["build", "--quiet", "--cache-from", &cache_ref];
    if !build_arg.is_empty() {
        args.push("--build-arg");
        args.push(build_arg);
    }
    for image_ref in &refs {
        args.push("--tag");
        args.push(image_ref);
    }
    args.push("--file");
    args.push(&dockerfile_path);
    args.push(BUILD_CONTEXT);

    checked_run(runner, StageMarker::Build, &CommandSpec::new("docker", &args))?;
    println!("Build succeeded, pushing {} tags", refs.len());

    // Sequential pushes; the first failure abandons the rest. Tags already
    // pushed stay in the registry.
    for image_ref in &refs {
        println!("Pushing {image_ref}");
        checked_run(
            runner,
            StageMarker::Build,
            &CommandSpec::new("docker", &["push", image_ref]),
        )?;
    }

    println!("Pushed {} tags of {image_name}", refs.len());
    Ok(())
}

/// Full image references to build and push: the fixed "latest" tag plus any
/// caller-supplied tags, duplicates collapsed.
fn tag_refs(image_name: &str, tags_list: &[String]) -> Vec<String> {
    let mut tags: BTreeSet<&str> = BTreeSet::from(["latest"]);
    tags.extend(tags_list.iter().map(|tag| tag.as_str()));
    tags.iter()
        .map(|tag| format!("{image_name}:{tag}"))
        .collect()
}

/// Best-effort cache seeding: probe the registry for the latest image and
/// pull it when present. Failures here are ignored by policy; the build
/// simply proceeds without a warm cache.
fn warm_cache(runner: &dyn CommandRunner, cache_ref: &str) {
    let probe = CommandSpec::new("docker", &["manifest", "inspect", cache_ref]);
    match runner.run(&probe) {
        Ok(output) if output.clean() => {}
        _ => {
            println!("No {cache_ref} in the registry, building without cache");
            return;
        }
    }

    let pull = CommandSpec::new("docker", &["pull", "--quiet", cache_ref]);
    match runner.run(&pull) {
        Ok(output) if output.clean() => println!("Pulled {cache_ref} for the layer cache"),
        _ => println!("Cache pull failed, building without cache"),
    }
}
