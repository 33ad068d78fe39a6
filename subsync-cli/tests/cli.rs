use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;

use predicates::str::contains;

use subsync_core::store;
use subsync_core::types::{ProjectFile, ProjectName, ProjectState, VideoId};
use tempfile::TempDir;

fn subsync_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("subsync"));
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("SUBSYNC_ACCESS_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

/// A project with one video and one new local subtitle file.
fn project_with_new_file(home: &Path, name: &str) -> PathBuf {
    let mut project = ProjectFile::new(ProjectName::from(name), None);
    project.videos.insert(
        VideoId::from("vid1"),
        ProjectState::new(VideoId::from("vid1"), "Launch video"),
    );
    let dir = store::create_at(home, &mut project).expect("create project");
    fs::write(dir.join("vid1_en.srt"), "1\n00:00:01,000 --> 00:00:02,000\nhi\n")
        .expect("write subtitle");
    store::project_path_at(home, &project.name)
}

#[test]
fn status_with_no_projects() {
    let home = TempDir::new().expect("home");
    subsync_cmd(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("No projects found"));
}

#[test]
fn sync_of_missing_project_fails() {
    let home = TempDir::new().expect("home");
    subsync_cmd(home.path())
        .args(["sync", "ghost"])
        .assert()
        .failure()
        .stderr(contains("project not found"));
}

#[test]
fn dry_run_sync_leaves_project_untouched() {
    let home = TempDir::new().expect("home");
    let path = project_with_new_file(home.path(), "launch");
    let before = fs::read_to_string(&path).expect("read project");

    subsync_cmd(home.path())
        .args(["sync", "launch", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("[dry-run]"))
        .stdout(contains("upload"));

    assert_eq!(fs::read_to_string(&path).expect("read project"), before);
}

#[test]
fn declined_prompt_aborts_cleanly() {
    let home = TempDir::new().expect("home");
    let path = project_with_new_file(home.path(), "launch");
    let before = fs::read_to_string(&path).expect("read project");

    subsync_cmd(home.path())
        .args(["sync", "launch"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(contains("Proceed?"))
        .stdout(contains("operation aborted"));

    assert_eq!(fs::read_to_string(&path).expect("read project"), before);
}

#[test]
fn sync_without_token_reports_auth_failure() {
    let home = TempDir::new().expect("home");
    project_with_new_file(home.path(), "launch");

    subsync_cmd(home.path())
        .args(["sync", "launch", "--yes"])
        .assert()
        .failure()
        .stderr(contains("authentication failed"));
}

#[test]
fn create_with_unknown_channel_fails() {
    let home = TempDir::new().expect("home");
    subsync_cmd(home.path())
        .args(["project", "create", "launch", "--channel", "nope"])
        .assert()
        .failure()
        .stderr(contains("not configured"));

    assert!(!store::project_path_at(home.path(), &ProjectName::from("launch")).exists());
}

#[test]
fn upload_rejects_unparseable_names() {
    let home = TempDir::new().expect("home");
    subsync_cmd(home.path())
        .args(["upload", "subtitles.srt", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("cannot infer video and language"));
}

#[test]
fn oversized_cache_freshness_does_not_crash() {
    let home = TempDir::new().expect("home");
    let path = project_with_new_file(home.path(), "launch");
    let config = home.path().join(".subsync").join("config.yaml");
    fs::write(&config, "cache_freshness_secs: 100000000000000000\n").expect("write config");
    let before = fs::read_to_string(&path).expect("read project");

    subsync_cmd(home.path())
        .args(["sync", "launch", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("[dry-run]"));

    assert_eq!(fs::read_to_string(&path).expect("read project"), before);
}

#[test]
fn report_with_unknown_channel_fails() {
    let home = TempDir::new().expect("home");
    let output = home.path().join("report.csv");
    subsync_cmd(home.path())
        .args(["report", "nope", "--output"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(contains("not configured"));
    assert!(!output.exists());
}
