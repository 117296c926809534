//! Integration tests for linkpost

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    // Header and payload are base64url JSON; the payload is {"user": "u42"}
    const TOKEN: &str = "eyJhbGciOiAiSFMyNTYiLCAidHlwIjogIkpXVCJ9.eyJ1c2VyIjogInU0MiJ9.sig";

    fn linkpost() -> Command {
        cargo_bin_cmd!("linkpost")
    }

    /// Config pointing at a closed local port with the session kept in `dir`
    fn write_config(dir: &Path) -> PathBuf {
        let path = dir.join("config.toml");
        let session = dir.join("session.json");
        let content = format!(
            "[api]\nbase_url = \"http://127.0.0.1:9\"\ntimeout_secs = 2\n\n[session]\npath = {:?}\n",
            session.display().to_string()
        );
        std::fs::write(&path, content).unwrap();
        path
    }

    fn write_session(dir: &Path) {
        let content = format!(
            "{{\"userToken\": \"{}\", \"saved_at\": \"2025-01-01T00:00:00Z\"}}",
            TOKEN
        );
        std::fs::write(dir.join("session.json"), content).unwrap();
    }

    fn with_config(dir: &TempDir) -> Command {
        let mut cmd = linkpost();
        cmd.env_remove("LINKPOST_PASSWORD")
            .env_remove("LINKPOST_NEW_PASSWORD")
            .env_remove("LINKPOST_API_URL")
            .env_remove("LINKPOST_TIMEOUT_SECS")
            .arg("--config")
            .arg(write_config(dir.path()));
        cmd
    }

    #[test]
    fn help_displays() {
        linkpost()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("linked-posts feed"));
    }

    #[test]
    fn version_displays() {
        linkpost()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("linkpost"));
    }

    #[test]
    fn config_path_follows_flag() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[api]"))
            .stdout(predicate::str::contains("http://127.0.0.1:9"));
    }

    #[test]
    fn config_set_then_show() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .args(["config", "set", "api.feed_limit", "7"])
            .assert()
            .success();

        // Reuse the file written by the previous call
        linkpost()
            .arg("--config")
            .arg(temp.path().join("config.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("feed_limit = 7"));
    }

    #[test]
    fn config_set_unknown_key() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn whoami_logged_out() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not logged in"));
    }

    #[test]
    fn whoami_reads_stored_token() {
        let temp = TempDir::new().unwrap();
        write_session(temp.path());
        with_config(&temp)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("u42"));
    }

    #[test]
    fn logout_forgets_token() {
        let temp = TempDir::new().unwrap();
        write_session(temp.path());
        with_config(&temp)
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged out"));

        with_config(&temp)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not logged in"));
    }

    #[test]
    fn feed_requires_login() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .arg("feed")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not authenticated"))
            .stderr(predicate::str::contains("linkpost login"));
    }

    #[test]
    fn login_rejects_bad_email_before_network() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .args(["login", "--email", "not-an-email", "--password", "Secret1!x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid email address"));
    }

    #[test]
    fn login_without_password_needs_flag() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .args(["login", "--email", "ada@example.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--password is required"));
    }

    #[test]
    fn login_reports_unreachable_server() {
        let temp = TempDir::new().unwrap();
        with_config(&temp)
            .args(["login", "--email", "ada@example.com", "--password", "Secret1!x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Network error"));
    }

    #[test]
    fn empty_post_is_rejected() {
        let temp = TempDir::new().unwrap();
        write_session(temp.path());
        with_config(&temp)
            .args(["post", "create", "   "])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Please write text or add an image"));
    }

    #[test]
    fn empty_comment_is_rejected() {
        let temp = TempDir::new().unwrap();
        write_session(temp.path());
        with_config(&temp)
            .args(["comment", "add", "p1", ""])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Comment cannot be empty"));
    }

    #[test]
    fn missing_photo_file() {
        let temp = TempDir::new().unwrap();
        write_session(temp.path());
        with_config(&temp)
            .args(["photo", "does-not-exist.png"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }
}
