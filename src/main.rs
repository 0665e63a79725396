fn main() {
    let code = codebuild_helper::run_cli();
    if code != 0 {
        std::process::exit(code);
    }
}
