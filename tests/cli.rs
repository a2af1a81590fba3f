use assert_cmd::Command;
use predicates::prelude::*;

// nothing listens on the discard port, so every request fails fast
const DEAD_API: &str = "http://127.0.0.1:9";

fn lastmile(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("lastmile").unwrap();
    cmd.current_dir(dir.path()).env_remove("LASTMILE_API_TOKEN");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    lastmile(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("route"))
        .stdout(predicate::str::contains("reorder"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("fleet"));
}

#[test]
fn test_reorder_rejects_malformed_move() {
    let dir = tempfile::tempdir().unwrap();
    lastmile(&dir)
        .args(["reorder", "--driver", "3", "--move", "2:sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid direction"));
}

#[test]
fn test_fleet_survives_unreachable_backend() {
    let dir = tempfile::tempdir().unwrap();
    lastmile(&dir)
        .args(["fleet", "--driver", "1", "--driver", "2", "--api-url", DEAD_API])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 reporting"))
        .stdout(predicate::str::contains("Total distance: 0.0 km"))
        .stdout(predicate::str::contains("-0.0").not())
        .stdout(predicate::str::contains("Total ETA:      n/a"));
}

#[test]
fn test_scan_station_recovers_from_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    lastmile(&dir)
        .args(["scan", "--sorter", "20", "--api-url", DEAD_API])
        .write_stdin("PKG-1\n\n\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT FOUND"))
        .stdout(predicate::str::contains("Scanned today: 0"));
}

#[test]
fn test_scan_station_undo_only_after_success() {
    let dir = tempfile::tempdir().unwrap();
    lastmile(&dir)
        .args(["scan", "--sorter", "20", "--api-url", DEAD_API])
        .write_stdin("PKG-1\nu\n\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("NOT FOUND: transport error"))
        .stdout(predicate::str::contains("(press Enter to continue)"))
        .stdout(predicate::str::contains("Scanned today: 0"));
}

#[test]
fn test_config_file_is_read() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join(".lastmile.toml"),
        format!("api_url = \"{}\"\nshift_goal = 42\n", DEAD_API),
    )
    .unwrap();
    lastmile(&dir)
        .args(["scan", "--sorter", "20"])
        .write_stdin("q\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Today: 0 / 42"));
}
