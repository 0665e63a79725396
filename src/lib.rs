pub mod build;
pub mod cli;
pub mod command;
pub mod login;
pub mod stage;
pub mod status;
pub mod trigger;

/// Run the command line interface and return an exit code.
pub fn run_cli() -> i32 {
    cli::run()
}
