//! Integration tests for finchcred and docker-credential-finch

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Isolated home with a config that keeps sockets and state inside it
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new(engine: &str, engine_args: &[&str]) -> Self {
            let dir = TempDir::new().unwrap();
            let args: Vec<String> = engine_args.iter().map(|a| format!("{:?}", a)).collect();
            let config = format!(
                "[general]\naudit_log = false\n\n[credential]\nsocket_path = {:?}\n\n[build]\nengine = {:?}\nengine_args = [{}]\n",
                dir.path().join("run").join("cred.sock"),
                engine,
                args.join(", "),
            );
            std::fs::write(dir.path().join("config.toml"), config).unwrap();
            Self { dir }
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn home(&self) -> &Path {
            self.dir.path()
        }

        fn finchcred(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("finchcred");
            cmd.env("HOME", self.home())
                .env_remove("XDG_STATE_HOME")
                .env_remove("XDG_CONFIG_HOME")
                .env_remove("FINCH_BUILD_ID")
                .env("FINCHCRED_CONFIG", self.config_path());
            cmd
        }
    }

    fn helper() -> Command {
        let mut cmd = cargo_bin_cmd!("docker-credential-finch");
        cmd.env_remove("FINCH_BUILD_ID");
        cmd
    }

    const AUTH_JSON: &str = r#"{"ghcr.io":{"username":"alice","password":"hunter2"}}"#;

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("finchcred")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("registry credentials"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("finchcred")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("finchcred"));
    }

    #[test]
    fn config_path_honours_override() {
        let sandbox = Sandbox::new("true", &[]);
        sandbox
            .finchcred()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new("buildctl", &["build"]);
        sandbox
            .finchcred()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[credential]"))
            .stdout(predicate::str::contains("buildctl"));
    }

    #[test]
    fn config_set_rejects_unknown_key() {
        let sandbox = Sandbox::new("true", &[]);
        sandbox
            .finchcred()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn invalid_config_shows_hint() {
        let sandbox = Sandbox::new("true", &[]);
        std::fs::write(sandbox.config_path(), "[credential\n").unwrap();
        sandbox
            .finchcred()
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn build_without_auth_runs_engine_without_build_id() {
        let sandbox = Sandbox::new("sh", &["-c", r#"test -z "$FINCH_BUILD_ID""#]);
        sandbox
            .finchcred()
            .env("FINCH_BUILD_ID", "inherited")
            .args(["build", "."])
            .assert()
            .success();
    }

    #[test]
    fn build_exit_status_mirrors_engine() {
        let sandbox = Sandbox::new("sh", &["-c", "exit 7"]);
        sandbox.finchcred().args(["build", "."]).assert().code(7);
    }

    #[test]
    fn build_rejects_malformed_header() {
        let sandbox = Sandbox::new("true", &[]);
        sandbox
            .finchcred()
            .args(["build", "--registry-config-header", "%%%", "."])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid registry config"));
    }

    #[test]
    fn build_exports_scope_to_engine() {
        let sandbox = Sandbox::new(
            "sh",
            &["-c", r#"test -n "$FINCH_BUILD_ID" && test -S "$FINCH_CREDENTIAL_SOCKET""#],
        );
        let auth = sandbox.home().join("auth.json");
        std::fs::write(&auth, AUTH_JSON).unwrap();

        sandbox
            .finchcred()
            .arg("build")
            .arg("--registry-config")
            .arg(&auth)
            .arg(".")
            .assert()
            .success();

        assert!(!sandbox.home().join("run").join("cred.sock").exists());
    }

    #[test]
    fn helper_spawned_by_engine_receives_credentials() {
        // finchcred -> sh (engine) -> docker-credential-finch
        let sandbox = Sandbox::new("sh", &["-c", r#"printf ghcr.io | "$HELPER" get"#]);
        let auth = sandbox.home().join("auth.json");
        std::fs::write(&auth, AUTH_JSON).unwrap();

        sandbox
            .finchcred()
            .env("HELPER", env!("CARGO_BIN_EXE_docker-credential-finch"))
            .arg("-v")
            .arg("build")
            .arg("--registry-config")
            .arg(&auth)
            .arg(".")
            .assert()
            .success()
            .stderr(predicate::str::contains(r#""Username":"alice""#))
            .stderr(predicate::str::contains(r#""Secret":"hunter2""#));
    }

    #[test]
    fn helper_without_build_id_is_not_found() {
        helper()
            .arg("get")
            .write_stdin("https://ghcr.io\n")
            .assert()
            .code(1)
            .stdout(predicate::str::diff(
                "credentials not found in native keychain\n",
            ));
    }

    #[test]
    fn helper_unreachable_socket_is_not_found() {
        let dir = TempDir::new().unwrap();
        helper()
            .env("FINCH_BUILD_ID", "feedface")
            .env("FINCH_CREDENTIAL_SOCKET", dir.path().join("absent.sock"))
            .arg("get")
            .write_stdin("ghcr.io")
            .assert()
            .code(1)
            .stdout(predicate::str::contains(
                "credentials not found in native keychain",
            ));
    }

    #[test]
    fn helper_refuses_writes() {
        helper()
            .arg("store")
            .write_stdin(r#"{"ServerURL":"ghcr.io","Username":"u","Secret":"s"}"#)
            .assert()
            .failure()
            .stdout(predicate::str::contains("not implemented"));

        helper()
            .arg("list")
            .assert()
            .failure()
            .stdout(predicate::str::contains("not implemented"));
    }

    #[test]
    fn helper_version() {
        helper()
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("docker-credential-finch"));
    }

    #[test]
    fn helper_requires_action() {
        helper().assert().failure().stderr(predicate::str::contains("Usage"));
    }
}
