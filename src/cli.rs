use clap::{ArgGroup, Parser};

use crate::build::{DEFAULT_DOCKERFILE, build_image};
use crate::command::ProcessRunner;
use crate::login::{DEFAULT_REGISTRY, registry_login};
use crate::stage::StageFailure;
use crate::status::{self, FailureRecord};
use crate::trigger::trigger_codebuild;

#[derive(Debug, Parser)]
#[command(
    name = "codebuild-helper",
    version,
    about = "Build-step helper for container CI pipelines"
)]
#[command(group(
    ArgGroup::new("operation")
        .required(true)
        .args(["registry_login", "build_docker", "trigger_codebuild"])
))]
pub struct Cli {
    /// Log in to the container registry
    #[arg(long = "registry_login")]
    registry_login: bool,
    /// Build, tag and push the image
    #[arg(long = "build_docker")]
    build_docker: bool,
    /// Trigger the downstream CodeBuild project
    #[arg(long = "trigger_codebuild")]
    trigger_codebuild: bool,
    /// Registry host
    #[arg(short = 'r', long, default_value = DEFAULT_REGISTRY)]
    registry: String,
    /// Registry username
    #[arg(short = 'u', long)]
    username: Option<String>,
    /// Registry password
    #[arg(short = 'w', long)]
    password: Option<String>,
    /// Image to build, push and check
    #[arg(short = 'i', long = "image_name")]
    image_name: Option<String>,
    /// Image override for the triggered build job
    #[arg(short = 'o', long = "image_override")]
    image_override: Option<String>,
    /// Target CodeBuild project
    #[arg(short = 'p', long = "project_name")]
    project_name: Option<String>,
    /// Single build-time argument passed to the image build
    #[arg(short = 'a', long = "build_arg", default_value = "")]
    build_arg: String,
    /// Dockerfile name, resolved inside the docker/ build context
    #[arg(short = 'd', long, default_value = DEFAULT_DOCKERFILE)]
    dockerfile: String,
    /// Additional tags beyond "latest"
    #[arg(short = 't', long = "tags_list", num_args = 0.., value_name = "TAG")]
    tags_list: Vec<String>,
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    execute(&cli)
}

fn execute(cli: &Cli) -> i32 {
    // A failure recorded by an earlier invocation of this helper (or
    // injected through the FAIL variable) short-circuits the whole run.
    let prior = match status::load_status() {
        Ok(prior) => prior,
        Err(err) => {
            eprintln!("error: {err:#}");
            return 1;
        }
    };
    if prior.is_some() {
        return status::error_handler(prior.as_ref());
    }

    let runner = ProcessRunner;
    let result = if cli.registry_login {
        registry_login(
            &runner,
            cli.username.as_deref().unwrap_or_default(),
            cli.password.as_deref().unwrap_or_default(),
            &cli.registry,
        )
    } else if cli.build_docker {
        build_image(
            &runner,
            cli.image_name.as_deref().unwrap_or_default(),
            &cli.tags_list,
            &cli.dockerfile,
            &cli.build_arg,
        )
    } else {
        trigger_codebuild(
            &runner,
            cli.project_name.as_deref().unwrap_or_default(),
            cli.image_override.as_deref(),
        )
    };

    match result {
        Ok(()) => 0,
        Err(failure) => report_failure(&failure),
    }
}

fn report_failure(failure: &StageFailure) -> i32 {
    let record = FailureRecord::from(failure);
    let code = status::error_handler(Some(&record));
    if let Err(err) = status::save_failure(&record) {
        eprintln!("error: could not record failure status: {err:#}");
    }
    code
}
