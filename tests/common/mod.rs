use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Sandbox for driving the binary: fake external tools on PATH, an isolated
/// state directory, and a log file the fakes append their argv to.
pub struct TestEnv {
    pub root: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("bin")).unwrap();
        fs::create_dir_all(root.path().join("state")).unwrap();
        Self { root }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.path().join("state")
    }

    pub fn status_file(&self) -> PathBuf {
        self.state_dir().join("status.json")
    }

    #[allow(dead_code)]
    pub fn log_file(&self) -> PathBuf {
        self.root.path().join("tools.log")
    }

    #[allow(dead_code)]
    pub fn logged_lines(&self) -> Vec<String> {
        match fs::read_to_string(self.log_file()) {
            Ok(data) => data.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Install a fake tool that appends its argv to the log and exits clean.
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn install_logging_tool(&self, name: &str) {
        self.install_tool(
            name,
            &format!("echo \"{name} $@\" >> \"{}\"\nexit 0", self.log_file().display()),
        );
    }

    /// Install a fake tool with the given shell body.
    #[cfg(unix)]
    #[allow(dead_code)]
    pub fn install_tool(&self, name: &str, body: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.bin_dir().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// PATH with the fake tools in front of the real ones.
    pub fn path(&self) -> String {
        format!(
            "{}:{}",
            self.bin_dir().display(),
            std::env::var("PATH").unwrap_or_default()
        )
    }
}
