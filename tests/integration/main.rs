//! Integration tests for Persist

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn persist() -> Command {
        cargo_bin_cmd!("persist")
    }

    #[test]
    fn help_displays() {
        persist()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("artifact cache"));
    }

    #[test]
    fn version_displays() {
        persist()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("persist"));
    }

    #[test]
    fn unknown_subcommand_fails() {
        persist().arg("sync").assert().failure();
    }
}

mod phase_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const AMBIENT: &[&str] = &[
        "GITHUB_STATE",
        "GITHUB_OUTPUT",
        "GITHUB_REPOSITORY",
        "GITHUB_REF_NAME",
        "GITHUB_RUN_ID",
        "GITHUB_WORKSPACE",
        "INPUT_MODE",
        "INPUT_FILES",
        "INPUT_STORE",
        "INPUT_SCOPE",
        "INPUT_LINK",
        "INPUT_VERBOSE",
        "INPUT_TRACE",
        "INPUT_DRY-RUN",
        "STATE_preChecked",
        "STATE_destRoot",
        "STATE_runRoot",
        "STATE_scope",
        "STATE_dryRun",
        "STATE_verbose",
        "STATE_trace",
        "STATE_cleanup",
    ];

    /// One simulated job: a store, a workspace, and the runner's env files
    struct Job {
        temp: TempDir,
        store: PathBuf,
        workspace: PathBuf,
        state_file: PathBuf,
        output_file: PathBuf,
    }

    impl Job {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let store = temp.path().join("store");
            let workspace = temp.path().join("ws");
            fs::create_dir_all(&store).unwrap();
            fs::create_dir_all(&workspace).unwrap();
            let state_file = temp.path().join("state.env");
            let output_file = temp.path().join("output.env");
            Self {
                temp,
                store,
                workspace,
                state_file,
                output_file,
            }
        }

        fn cmd(&self, phase: &str, inputs: &[(&str, &str)]) -> Command {
            let mut cmd = cargo_bin_cmd!("persist");
            for var in AMBIENT {
                cmd.env_remove(var);
            }
            cmd.arg(phase)
                .env("PERSIST_CONFIG", self.temp.path().join("absent.toml"))
                .env("GITHUB_REPOSITORY", "org/app")
                .env("GITHUB_REF_NAME", "main")
                .env("GITHUB_RUN_ID", "1234")
                .env("GITHUB_WORKSPACE", &self.workspace)
                .env("GITHUB_STATE", &self.state_file)
                .env("GITHUB_OUTPUT", &self.output_file)
                .env("INPUT_STORE", &self.store);
            for (name, value) in inputs {
                cmd.env(format!("INPUT_{}", name.to_uppercase()), value);
            }
            // Saved state comes back as STATE_<key>, as the runner does
            for (key, value) in read_env_file(&self.state_file) {
                cmd.env(format!("STATE_{key}"), value);
            }
            cmd
        }

        fn outputs(&self) -> HashMap<String, String> {
            read_env_file(&self.output_file)
        }

        fn write_ws(&self, rel: &str, contents: &str) {
            let path = self.workspace.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
    }

    /// Parse `key<<delimiter` records from a runner env file
    fn read_env_file(path: &Path) -> HashMap<String, String> {
        let mut values = HashMap::new();
        let Ok(content) = fs::read_to_string(path) else {
            return values;
        };
        let mut lines = content.lines();
        while let Some(header) = lines.next() {
            let Some((key, delimiter)) = header.split_once("<<") else {
                continue;
            };
            let mut value = Vec::new();
            for line in lines.by_ref() {
                if line == delimiter {
                    break;
                }
                value.push(line);
            }
            values.insert(key.to_string(), value.join("\n"));
        }
        values
    }

    #[test]
    fn pre_fails_on_missing_store() {
        let job = Job::new();
        let missing = job.temp.path().join("not-mounted");
        job.cmd("pre", &[("mode", "save")])
            .env("INPUT_STORE", &missing)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Store not mounted"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn pre_fails_on_relative_store() {
        let job = Job::new();
        job.cmd("pre", &[("mode", "save")])
            .env("INPUT_STORE", "relative/store")
            .assert()
            .failure()
            .stderr(predicate::str::contains("absolute path"));
    }

    #[test]
    fn pre_records_flags() {
        let job = Job::new();
        job.cmd("pre", &[("mode", "save"), ("verbose", "true")])
            .assert()
            .success()
            .stdout(predicate::str::contains("Store OK"));

        let state = read_env_file(&job.state_file);
        assert_eq!(state["preChecked"], "true");
        assert_eq!(state["verbose"], "true");
        assert_eq!(state["dryRun"], "false");
    }

    #[test]
    fn save_then_restore_hard() {
        let job = Job::new();
        job.write_ws("build/out.bin", "artifact");
        let save = [("mode", "save"), ("scope", "global"), ("files", "build/out.bin")];

        job.cmd("pre", &save).assert().success();
        job.cmd("main", &save).assert().success();

        let dest_root = job.store.join("org__app");
        assert_eq!(
            fs::read_to_string(dest_root.join("build/out.bin")).unwrap(),
            "artifact"
        );
        assert_eq!(
            job.outputs()["dest_root"],
            dest_root.to_string_lossy().into_owned()
        );
        job.cmd("post", &save)
            .assert()
            .success();
        assert!(dest_root.join("build/out.bin").exists());

        // A later job on a clean workspace
        let next = Job::new();
        fs::create_dir_all(next.store.join("org__app/build")).unwrap();
        fs::copy(
            dest_root.join("build/out.bin"),
            next.store.join("org__app/build/out.bin"),
        )
        .unwrap();
        let restore = [
            ("mode", "restore"),
            ("scope", "global"),
            ("link", "hard"),
            ("files", "build/"),
        ];
        next.cmd("main", &restore).assert().success();
        assert_eq!(
            fs::read_to_string(next.workspace.join("build/out.bin")).unwrap(),
            "artifact"
        );
    }

    #[test]
    fn cleanup_deletes_run_root_in_post() {
        let job = Job::new();
        let run_root = job.store.join("org__app/run-1234");
        fs::create_dir_all(run_root.join("tmp")).unwrap();
        fs::write(run_root.join("tmp/scratch"), "x").unwrap();
        let branch_file = job.store.join("org__app/main/keep.txt");
        fs::create_dir_all(branch_file.parent().unwrap()).unwrap();
        fs::write(&branch_file, "keep").unwrap();

        let cleanup = [("mode", "cleanup"), ("verbose", "true")];
        job.cmd("main", &cleanup)
            .assert()
            .success()
            .stdout(predicate::str::contains("deletion happens in post"));
        assert!(run_root.exists());
        assert_eq!(
            job.outputs()["dest_root"],
            run_root.to_string_lossy().into_owned()
        );

        job.cmd("post", &cleanup)
            .assert()
            .success()
            .stdout(predicate::str::contains("sanity report"))
            .stdout(predicate::str::contains("Removing run-scope directory"));
        assert!(!run_root.exists());
        assert!(branch_file.exists());
    }

    #[test]
    fn progress_is_logged_without_verbose() {
        let job = Job::new();
        job.write_ws("build/out.bin", "artifact");

        job.cmd("main", &[("mode", "save"), ("files", "build/out.bin")])
            .assert()
            .success()
            .stdout(predicate::str::contains("save file: build/out.bin"));

        job.cmd("post", &[("mode", "save")])
            .assert()
            .success()
            .stdout(predicate::str::contains("sanity report"))
            .stdout(predicate::str::contains("Removing run-scope directory"));
        assert!(!job.store.join("org__app/run-1234").exists());
    }

    #[test]
    fn unmatched_pattern_is_annotated() {
        let job = Job::new();
        job.cmd("main", &[("mode", "save"), ("files", "nope/*.bin")])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "::warning::No matches for pattern: nope/*.bin",
            ));
    }

    #[test]
    fn cleanup_rejects_global_scope() {
        let job = Job::new();
        job.cmd("main", &[("mode", "cleanup"), ("scope", "global")])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cleanup"));
        assert!(read_env_file(&job.state_file).is_empty());
    }

    #[test]
    fn traversal_pattern_fails_main() {
        let job = Job::new();
        job.cmd("main", &[("mode", "save"), ("files", "../outside")])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid pattern"));
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let job = Job::new();
        job.write_ws("dist/app.js", "js");
        job.cmd(
            "main",
            &[("mode", "save"), ("files", "dist/"), ("dry-run", "true"), ("verbose", "true")],
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("(dry-run) would wipe"));
        assert!(!job.store.join("org__app").exists());
    }

    #[test]
    fn legacy_commands_without_env_files() {
        let job = Job::new();
        job.cmd("main", &[("mode", "save")])
            .env_remove("GITHUB_STATE")
            .env_remove("GITHUB_OUTPUT")
            .assert()
            .success()
            .stdout(predicate::str::contains("::set-output name=dest_root::"))
            .stdout(predicate::str::contains("::save-state name=scope::run"));
    }

    #[test]
    fn post_never_fails() {
        let job = Job::new();
        let bad_config = job.temp.path().join("bad.toml");
        fs::write(&bad_config, "[defaults\nscope = ").unwrap();

        job.cmd("main", &[("mode", "save")])
            .env("PERSIST_CONFIG", &bad_config)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));

        job.cmd("post", &[("mode", "cleanup")])
            .env("PERSIST_CONFIG", &bad_config)
            .assert()
            .success();
    }

    #[test]
    fn report_prints_json_summary() {
        let job = Job::new();
        job.write_ws("a/one.txt", "1");
        job.write_ws("two.txt", "22");

        job.cmd("report", &[])
            .arg(&job.workspace)
            .args(["--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"files\": 2"))
            .stdout(predicate::str::contains("\"dirs\": 1"));
    }

    #[test]
    fn report_missing_path_fails() {
        let job = Job::new();
        job.cmd("report", &[])
            .arg(job.temp.path().join("nope"))
            .assert()
            .failure();
    }
}
