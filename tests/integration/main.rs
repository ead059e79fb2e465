//! Integration tests for lazyinstall

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn lazyinstall(workspace: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("lazyinstall");
        cmd.arg("--workspace")
            .arg(workspace)
            .env("LAZYINSTALL_PLAIN", "1")
            .env_remove("LAZYINSTALL_CONFIG");
        cmd
    }

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Workspace whose install command appends the package directory name to
    /// `install.log` in the workspace root
    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "lazyinstall.toml",
            r#"
[install]
command = ["sh", "-c", "basename \"$(pwd)\" >> ../install.log"]
"#,
        );
        write(
            dir.path(),
            "pkgA/package.json",
            r#"{ "dependencies": { "pkgB": "file:../pkgB" } }"#,
        );
        write(
            dir.path(),
            "pkgB/package.json",
            r#"{ "devDependencies": { "jest": "^29.0.0" } }"#,
        );
        write(dir.path(), "pkgB/index.js", "module.exports = 1");
        write(dir.path(), "lazyinstall.json", r#"{ "pkgA": 1, "pkgB": 1 }"#);
        dir
    }

    fn install_log(dir: &TempDir) -> Vec<String> {
        let mut lines: Vec<String> = fs::read_to_string(dir.path().join("install.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        let _ = fs::remove_file(dir.path().join("install.log"));
        lines
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("lazyinstall")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("reinstall workspace dependencies"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("lazyinstall")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("lazyinstall"));
    }

    #[test]
    fn install_then_skip() {
        let dir = workspace();

        lazyinstall(dir.path())
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::contains("pkgA").and(predicate::str::contains("Updated 2")));
        assert_eq!(install_log(&dir), vec!["pkgA", "pkgB"]);
        assert!(dir.path().join(".lazyinstall-state.json").exists());

        // Nothing changed: no installs and no summary
        lazyinstall(dir.path())
            .arg("install")
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
        assert!(install_log(&dir).is_empty());
    }

    #[test]
    fn token_bump_and_local_change() {
        let dir = workspace();
        lazyinstall(dir.path()).arg("install").assert().success();
        install_log(&dir);

        write(dir.path(), "lazyinstall.json", r#"{ "pkgA": 1, "pkgB": 2 }"#);
        lazyinstall(dir.path()).arg("install").assert().success();
        assert_eq!(install_log(&dir), vec!["pkgB"]);

        write(dir.path(), "pkgB/index.js", "module.exports = 2");
        lazyinstall(dir.path()).arg("install").assert().success();
        assert_eq!(install_log(&dir), vec!["pkgA"]);
    }

    #[test]
    fn removed_package_is_pruned() {
        let dir = workspace();
        lazyinstall(dir.path()).arg("install").assert().success();

        write(dir.path(), "lazyinstall.json", r#"{ "pkgA": 1 }"#);
        lazyinstall(dir.path()).arg("install").assert().success();

        let state: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join(".lazyinstall-state.json")).unwrap(),
        )
        .unwrap();
        assert!(state["packages"].get("pkgA").is_some());
        assert!(state["packages"].get("pkgB").is_none());
    }

    #[test]
    fn clean_forces_full_reinstall() {
        let dir = workspace();
        lazyinstall(dir.path()).arg("install").assert().success();
        install_log(&dir);

        lazyinstall(dir.path())
            .args(["clean", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Deleted"));
        assert!(!dir.path().join(".lazyinstall-state.json").exists());

        // Cleaning twice is not an error
        lazyinstall(dir.path())
            .args(["clean", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No install state"));

        lazyinstall(dir.path()).arg("install").assert().success();
        assert_eq!(install_log(&dir), vec!["pkgA", "pkgB"]);
    }

    #[test]
    fn failed_install_reports_and_keeps_state() {
        let dir = workspace();
        write(
            dir.path(),
            "lazyinstall.toml",
            "[install]\ncommand = [\"sh\", \"-c\", \"exit 7\"]\n",
        );

        lazyinstall(dir.path())
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("exit code 7"));
        assert!(!dir.path().join(".lazyinstall-state.json").exists());
    }

    #[test]
    fn install_command_flag_overrides_config() {
        let dir = workspace();

        lazyinstall(dir.path())
            .args(["install", "--install-command", "sh", "-c", "touch flag.marker"])
            .assert()
            .success();
        assert!(dir.path().join("pkgA/flag.marker").exists());
        assert!(dir.path().join("pkgB/flag.marker").exists());
        assert!(install_log(&dir).is_empty());
    }

    #[test]
    fn check_lists_pending_packages() {
        let dir = workspace();

        lazyinstall(dir.path())
            .args(["check", "--format", "plain"])
            .assert()
            .success()
            .stdout("pkgA\npkgB\n");
        assert!(install_log(&dir).is_empty());

        lazyinstall(dir.path()).arg("install").assert().success();

        lazyinstall(dir.path())
            .args(["check", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"reason\": null"));
    }

    #[test]
    fn missing_package_list_warns() {
        let dir = TempDir::new().unwrap();

        lazyinstall(dir.path())
            .arg("install")
            .assert()
            .success()
            .stderr(predicate::str::contains("not found"));
    }

    #[test]
    fn missing_settings_file_is_logged() {
        let dir = workspace();
        fs::remove_file(dir.path().join("lazyinstall.toml")).unwrap();

        lazyinstall(dir.path())
            .args(["-vv", "check", "--format", "plain"])
            .assert()
            .success()
            .stderr(predicate::str::contains("lazyinstall.toml not found, using defaults"));
    }

    #[test]
    fn workspace_root_as_local_dependency_is_stable() {
        let dir = workspace();
        write(
            dir.path(),
            "pkgA/package.json",
            r#"{ "dependencies": { "root": "file:.." } }"#,
        );

        lazyinstall(dir.path())
            .args(["install", "--install-command", "true"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Updated 2"));

        // Saving the state file must not make the root look changed
        lazyinstall(dir.path())
            .args(["install", "--install-command", "true"])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn corrupt_state_is_fatal() {
        let dir = workspace();
        write(dir.path(), ".lazyinstall-state.json", "{ broken");

        lazyinstall(dir.path())
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid install state"))
            .stderr(predicate::str::contains("lazyinstall clean"));
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let dir = workspace();
        write(dir.path(), "lazyinstall.json", r#"{ "pkgA": 1, "ghost": 1 }"#);

        lazyinstall(dir.path())
            .arg("install")
            .assert()
            .failure()
            .stderr(predicate::str::contains("ghost"));
    }
}
