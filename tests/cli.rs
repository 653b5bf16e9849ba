#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use anyhow::Result;
use assert_cmd::Command;
use serde_json::Value;
use tempfile::tempdir;

fn taskforge(data_dir: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("taskforge")?;
    cmd.env("TASKFORGE_DATA_DIR", data_dir)
        .env("TASKFORGE_LOG", "off")
        .env_remove("TASKFORGE_STREAK_MODE")
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY");
    Ok(cmd)
}

fn run_json(data_dir: &Path, args: &[&str]) -> Result<Value> {
    let output = taskforge(data_dir)?.args(args).output()?;
    assert!(
        output.status.success(),
        "taskforge {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

#[test]
fn init_seeds_demo_content_once() -> Result<()> {
    let dir = tempdir()?;
    let first = run_json(dir.path(), &["init"])?;
    assert_eq!(first["seeded"].as_array().map(Vec::len), Some(4));
    assert!(dir.path().join("store.json").exists());

    let second = run_json(dir.path(), &["init"])?;
    assert_eq!(second["seeded"], serde_json::json!([]));

    let tasks = run_json(dir.path(), &["task", "list"])?;
    assert_eq!(tasks.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn task_lifecycle() -> Result<()> {
    let dir = tempdir()?;
    run_json(dir.path(), &["init", "--empty"])?;

    let created = run_json(
        dir.path(),
        &[
            "task", "add", "--title", "Write report", "--priority", "high", "--due", "2024-05-01",
            "--category", "Work",
        ],
    )?;
    let id = created["id"].as_str().expect("id").to_string();
    assert_eq!(created["priority"], "High");
    assert_eq!(created["status"], "To Do");
    assert_eq!(created["dueDate"], "2024-05-01");

    let updated = run_json(dir.path(), &["task", "set-status", &id, "done"])?;
    assert_eq!(updated["status"], "Done");

    let found = run_json(dir.path(), &["task", "list", "--search", "REPORT"])?;
    assert_eq!(found.as_array().map(Vec::len), Some(1));
    let other = run_json(dir.path(), &["task", "list", "--category", "Health"])?;
    assert_eq!(other.as_array().map(Vec::len), Some(0));

    let deleted = run_json(dir.path(), &["task", "delete", &id])?;
    assert_eq!(deleted["removed"], true);
    let tasks = run_json(dir.path(), &["task", "list"])?;
    assert_eq!(tasks, serde_json::json!([]));
    Ok(())
}

#[test]
fn habit_toggle_and_stats() -> Result<()> {
    let dir = tempdir()?;
    run_json(dir.path(), &["init", "--empty"])?;
    let habit = run_json(dir.path(), &["habit", "add", "--title", "Meditate"])?;
    let id = habit["id"].as_str().expect("id").to_string();

    for date in ["2024-05-01", "2024-05-02", "2024-05-03"] {
        run_json(dir.path(), &["habit", "toggle", &id, "--date", date])?;
    }
    let toggled = run_json(dir.path(), &["habit", "toggle", &id, "--date", "2024-05-02"])?;
    assert_eq!(toggled["streak"], 2);
    assert_eq!(toggled["history"]["2024-05-01"], true);
    assert!(toggled["history"].get("2024-05-02").is_none());

    let stats = run_json(dir.path(), &["stats"])?;
    assert_eq!(stats["topStreak"], 2);
    assert_eq!(stats["habitStreaks"][0]["title"], "Meditate");

    let reset = run_json(dir.path(), &["habit", "reset"])?;
    assert_eq!(reset[0]["streak"], 0);
    Ok(())
}

#[test]
fn roadmap_step_toggle_updates_progress() -> Result<()> {
    let dir = tempdir()?;
    run_json(dir.path(), &["init"])?;

    let before = run_json(dir.path(), &["roadmap", "list"])?;
    assert_eq!(before[0]["progress"]["percent"], 33);

    run_json(dir.path(), &["roadmap", "toggle-step", "1", "s2"])?;
    let after = run_json(dir.path(), &["roadmap", "list"])?;
    assert_eq!(after[0]["progress"]["percent"], 67);
    Ok(())
}

#[test]
fn export_to_file_and_profile_update() -> Result<()> {
    let dir = tempdir()?;
    run_json(dir.path(), &["init"])?;
    let profile = run_json(
        dir.path(),
        &["profile", "set", "--username", "Ada", "--dark-mode", "true"],
    )?;
    assert_eq!(profile["username"], "Ada");
    assert_eq!(profile["darkMode"], true);

    let out = dir.path().join("backup.json");
    run_json(dir.path(), &["export", "--out", out.to_str().unwrap()])?;
    let exported: Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(exported["profile"]["username"], "Ada");
    assert_eq!(exported["tasks"].as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn plan_without_key_fails_cleanly() -> Result<()> {
    let dir = tempdir()?;
    let output = taskforge(dir.path())?
        .args([
            "plan", "--goal", "Learn Go", "--duration", "2 weeks", "--time-per-day", "1 hour",
            "--skill-level", "Beginner",
        ])
        .output()?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PLAN/CONFIG"), "stderr: {stderr}");

    let roadmaps = run_json(dir.path(), &["roadmap", "list"])?;
    assert_eq!(roadmaps.as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn bad_streak_mode_is_rejected() -> Result<()> {
    let dir = tempdir()?;
    let output = taskforge(dir.path())?
        .env("TASKFORGE_STREAK_MODE", "weekly")
        .args(["stats"])
        .output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("CONFIG/STREAK_MODE"));
    Ok(())
}
