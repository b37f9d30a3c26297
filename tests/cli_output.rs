use std::process::Command;

#[test]
fn stdout_is_only_the_json_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let missing_repo = dir.path().join("no-such-checkout");

    let out = Command::new(env!("CARGO_BIN_EXE_ci-runner"))
        .env("HOME", dir.path())
        .args(["--server", "localhost", "--client", "localhost"])
        .arg("--repository")
        .arg(&missing_repo)
        .args(["--branch", "dev", "--libos", "catnap", "--delay", "0"])
        .arg("--output-dir")
        .arg(dir.path())
        .output()
        .unwrap();

    let response: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(response["success"], false);
    assert_eq!(response["data"]["stages"]["checkout"], false);
    assert_eq!(out.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("[FAILED]"), "{}", stderr);
}
