use std::path::PathBuf;
use std::process::Command;
use tempfile::TempDir;

/// Test context that sets up a temporary kiln home environment
struct TestContext {
    temp_dir: TempDir,
    kiln_home: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let kiln_home = temp_dir.path().join(".kiln");
        std::fs::create_dir_all(&kiln_home).expect("failed to create kiln home");

        Self {
            temp_dir,
            kiln_home,
        }
    }

    fn write_package(&self, name: &str, declaration: &str) -> PathBuf {
        let dir = self.temp_dir.path().join("packages").join(name);
        std::fs::create_dir_all(&dir).expect("failed to create package dir");
        std::fs::write(dir.join("package.toml"), declaration).expect("failed to write declaration");
        dir
    }

    fn packages_dir(&self) -> PathBuf {
        self.temp_dir.path().join("packages")
    }

    fn kiln_cmd(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_kiln");
        let mut cmd = Command::new(bin_path);
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("KILN_HOME", &self.kiln_home);
        cmd.arg("--offline");
        cmd
    }
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx
        .kiln_cmd()
        .arg("--help")
        .output()
        .expect("failed to run kiln");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx
        .kiln_cmd()
        .arg("--version")
        .output()
        .expect("failed to run kiln");
    assert!(output.status.success());
}

#[test]
fn test_list_without_snapshot() {
    let ctx = TestContext::new();
    let output = ctx
        .kiln_cmd()
        .arg("list")
        .output()
        .expect("failed to run kiln list");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No packages"));
}

#[test]
fn test_list_shows_scanned_local_package() {
    let ctx = TestContext::new();
    ctx.write_package("alpha", "[package]\nversion = \"1.0.0\"\n");

    let output = ctx
        .kiln_cmd()
        .arg("--local-dir")
        .arg(ctx.packages_dir())
        .arg("list")
        .output()
        .expect("failed to run kiln list");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("alpha 1.0.0+local"));
    assert!(stdout.contains("(local)"));
}

#[test]
fn test_build_writes_cache_directory() {
    let ctx = TestContext::new();
    let dir = ctx.write_package("alpha", "[package]\nversion = \"1.0.0\"\n");

    let output = ctx
        .kiln_cmd()
        .arg("--local-dir")
        .arg(ctx.packages_dir())
        .arg("build")
        .arg("alpha")
        .output()
        .expect("failed to run kiln build");

    assert!(output.status.success());
    assert!(dir.join(".build.alpha/built.bin").is_file());
}

#[test]
fn test_path_for_non_local_requires_version() {
    let ctx = TestContext::new();
    let output = ctx
        .kiln_cmd()
        .arg("path")
        .arg("kappa")
        .output()
        .expect("failed to run kiln path");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("version"));
}
