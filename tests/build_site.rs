//! End-to-end tests that drive the `simple-press` binary against the fixture
//! site. Stylesheet and script compilation are switched off so the tests do
//! not need `sass` or `esbuild` installed.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const QUIET_CONFIG: &str = "\
[styles]
enabled = false

[scripts]
enabled = false
";

fn copy_dir(src: &Path, dst: &Path) {
    for entry in fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let to = dst.join(entry.file_name());
        if entry.path().is_dir() {
            fs::create_dir_all(&to).unwrap();
            copy_dir(&entry.path(), &to);
        } else {
            fs::copy(entry.path(), &to).unwrap();
        }
    }
}

fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    copy_dir(
        &Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site"),
        tmp.path(),
    );
    fs::write(tmp.path().join("config.toml"), QUIET_CONFIG).unwrap();
    tmp
}

fn press(root: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_simple-press"));
    cmd.arg("--root").arg(root).args(args).env_remove("BUILD_DRAFTS");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    let out = cmd.output().unwrap();
    assert!(
        out.status.success(),
        "simple-press failed:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
    out
}

#[test]
fn build_writes_site_without_drafts() {
    let tmp = project();
    let out = run(&mut press(tmp.path(), &["build"]));
    let dist = tmp.path().join("dist");

    assert!(dist.join("index.html").is_file());
    assert!(dist.join("about/index.html").is_file());
    assert!(dist.join("posts/first-post/index.html").is_file());
    assert!(dist.join("blog/second-post/index.html").is_file());
    assert!(dist.join("feed.json").is_file());
    assert!(dist.join("assets/img/logo.svg").is_file());
    assert!(!dist.join("posts/unfinished-idea").exists());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Drafts hidden"));
    assert!(stdout.contains("posts/unfinished-idea.md"));
    assert!(stdout.contains("Built 5 pages"));
}

#[test]
fn build_drafts_env_includes_drafts() {
    let tmp = project();
    run(press(tmp.path(), &["build"]).env("BUILD_DRAFTS", "1"));
    let draft = tmp.path().join("dist/posts/unfinished-idea/index.html");
    assert!(draft.is_file());

    let index = fs::read_to_string(tmp.path().join("dist/index.html")).unwrap();
    assert!(index.contains("/posts/unfinished-idea/"));
}

#[test]
fn drafts_flag_includes_drafts() {
    let tmp = project();
    let out = run(&mut press(tmp.path(), &["build", "--drafts"]));
    assert!(tmp.path().join("dist/posts/unfinished-idea/index.html").is_file());
    assert!(String::from_utf8_lossy(&out.stdout).contains("(drafts included)"));
}

#[test]
fn clean_build_removes_stale_output() {
    let tmp = project();
    let stale = tmp.path().join("dist/old/index.html");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, "old").unwrap();

    run(&mut press(tmp.path(), &["build", "--clean"]));
    assert!(!stale.exists());
    assert!(tmp.path().join("dist/index.html").is_file());
}

#[test]
fn check_writes_nothing() {
    let tmp = project();
    let out = run(&mut press(tmp.path(), &["check"]));
    assert!(!tmp.path().join("dist").exists());
    assert!(String::from_utf8_lossy(&out.stdout).contains("Site is valid: 5 pages would be written"));
}

#[test]
fn check_fails_on_unknown_filter() {
    let tmp = project();
    fs::write(tmp.path().join("src/broken.md"), "{{ title | shout }}").unwrap();
    let out = press(tmp.path(), &["check"]).output().unwrap();
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("broken.md"));
}

#[test]
fn unknown_config_key_is_rejected() {
    let tmp = project();
    fs::write(tmp.path().join("config.toml"), "[styles]\nenabeld = false\n").unwrap();
    let out = press(tmp.path(), &["build"]).output().unwrap();
    assert!(!out.status.success());
    assert!(!tmp.path().join("dist").exists());
}

#[test]
fn gen_config_prints_stock_file() {
    let tmp = TempDir::new().unwrap();
    let out = run(&mut press(tmp.path(), &["gen-config"]));
    let text = String::from_utf8(out.stdout).unwrap();
    let value: toml::Value = toml::from_str(&text).unwrap();
    assert!(value.get("dir").is_some());
    assert!(value.get("styles").is_some());
}

#[test]
fn readme_becomes_a_page() {
    let tmp = project();
    fs::write(tmp.path().join("README.md"), "# Project notes\n").unwrap();
    run(&mut press(tmp.path(), &["readme"]));
    assert!(tmp.path().join("src/README.md").is_file());

    run(&mut press(tmp.path(), &["build"]));
    let page = fs::read_to_string(tmp.path().join("dist/README/index.html")).unwrap();
    assert!(page.contains("Project notes"));

    let index = fs::read_to_string(tmp.path().join("dist/index.html")).unwrap();
    assert!(index.contains(r#"href="/README/""#));
}
