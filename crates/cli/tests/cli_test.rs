use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn warmstash(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("warmstash").unwrap();
    cmd.arg("--dir")
        .arg(dir.path())
        .env_remove("WARMSTASH_DIR")
        .env_remove("WARMSTASH_DEFAULT_TTL")
        .env_remove("WARMSTASH_PRECOMPILE")
        .env("RUST_LOG", "warn");
    cmd
}

#[test]
fn test_set_then_get_prints_compact_json() {
    let dir = TempDir::new().unwrap();

    warmstash(&dir)
        .args(["set", "profile", r#"{ "name": "Ada", "id": 1 }"#])
        .assert()
        .success();

    warmstash(&dir)
        .args(["get", "profile"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name":"Ada""#));
}

#[test]
fn test_get_missing_key_fails() {
    let dir = TempDir::new().unwrap();

    warmstash(&dir)
        .args(["get", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no live item"));
}

#[test]
fn test_set_rejects_invalid_json() {
    let dir = TempDir::new().unwrap();

    warmstash(&dir)
        .args(["set", "key", "{not json"])
        .assert()
        .failure();
}

#[test]
fn test_has_and_delete() {
    let dir = TempDir::new().unwrap();

    warmstash(&dir).args(["set", "key", "42"]).assert().success();
    warmstash(&dir)
        .args(["has", "key"])
        .assert()
        .success()
        .stdout("true\n");

    warmstash(&dir).args(["delete", "key"]).assert().success();
    warmstash(&dir)
        .args(["has", "key"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn test_zero_ttl_removes_key() {
    let dir = TempDir::new().unwrap();

    warmstash(&dir).args(["set", "key", "1"]).assert().success();
    warmstash(&dir)
        .args(["set", "key", "2", "--ttl", "0"])
        .assert()
        .success();

    warmstash(&dir)
        .args(["has", "key"])
        .assert()
        .stdout("false\n");
}

#[test]
fn test_path_prints_sharded_location() {
    let dir = TempDir::new().unwrap();
    let expected = dir.path().join("a/4/bdf4e564564cf8bbea0d63a05165e3");

    warmstash(&dir)
        .args(["path", "key"])
        .assert()
        .success()
        .stdout(format!("{}\n", expected.display()));
}

#[test]
fn test_reserved_key_is_rejected() {
    let dir = TempDir::new().unwrap();

    warmstash(&dir)
        .args(["set", "a:b", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("a:b"));
}

#[test]
fn test_clear_empties_root() {
    let dir = TempDir::new().unwrap();

    warmstash(&dir).args(["set", "one", "1"]).assert().success();
    warmstash(&dir).args(["set", "two", "2"]).assert().success();
    warmstash(&dir).arg("clear").assert().success();
    warmstash(&dir).arg("prune").assert().success();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
