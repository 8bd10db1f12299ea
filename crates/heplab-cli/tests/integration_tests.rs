//! End-to-end tests driving the compiled `heplab` binary against a
//! temporary installation root.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

struct TestContext {
    home: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            home: TempDir::new().expect("tempdir"),
        }
    }

    fn root(&self) -> &Path {
        self.home.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_heplab"))
            .args(args)
            .env("HEPLAB_HOME", self.root())
            .output()
            .expect("failed to run heplab")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn help_lists_all_commands() {
    let ctx = TestContext::new();
    let out = ctx.run(&["--help"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for cmd in ["detect", "install", "activate", "deactivate", "status"] {
        assert!(text.contains(cmd), "help should mention {cmd}");
    }
}

#[test]
fn status_without_snapshot_points_at_detect() {
    let ctx = TestContext::new();
    let out = ctx.run(&["status"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("No snapshot found"));
}

#[test]
fn install_rejects_unknown_package() {
    let ctx = TestContext::new();
    let out = ctx.run(&["install", "pythia"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("unknown package"));
}

#[test]
fn install_rejects_the_toolchain() {
    let ctx = TestContext::new();
    let out = ctx.run(&["install", "cxx"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("toolchain"));
}

#[test]
fn deactivate_rejects_non_variant_packages() {
    let ctx = TestContext::new();
    let out = ctx.run(&["deactivate", "zlib"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("does not belong to a variant pair"));
}

#[test]
fn deactivate_never_installed_variant_is_a_no_op() {
    let ctx = TestContext::new();
    let out = ctx.run(&["deactivate", "fastsim"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("fastsim deactivated"));
    // The updated snapshot was persisted.
    assert!(ctx.root().join("arch-snapshot.json").is_file());
}

#[test]
fn activate_never_installed_variant_is_nothing_to_do() {
    let ctx = TestContext::new();
    let out = ctx.run(&["activate", "fastsim-tuned"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("nothing to do"));
}

#[test]
fn status_renders_a_persisted_snapshot() {
    let ctx = TestContext::new();
    // Deactivating writes an (empty) snapshot we can then render.
    let out = ctx.run(&["deactivate", "fastsim"]);
    assert!(out.status.success());

    let out = ctx.run(&["status"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for pkg in ["cxx", "zlib", "histo", "jetclu", "fastsim", "fastsim-tuned"] {
        assert!(text.contains(pkg), "status should list {pkg}");
    }
}

#[test]
fn detect_honors_a_malformed_overrides_file() {
    let ctx = TestContext::new();
    std::fs::create_dir_all(ctx.root()).unwrap();
    std::fs::write(ctx.root().join("overrides.cfg"), "veto_zlib = maybe\n").unwrap();
    let out = ctx.run(&["detect"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("overrides"));
}
