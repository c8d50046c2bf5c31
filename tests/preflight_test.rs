//! Local inputs are validated before the first connection is attempted,
//! so a bad source path or targets file fails fast with a fatal error
//! instead of burning a connect timeout per host.

use std::time::{Duration, Instant};

use fssh::commands::fetch::{fetch_file, FetchParams};
use fssh::commands::run::{run_command, RunParams};
use fssh::commands::script::{run_script, ScriptParams};
use fssh::commands::transfer::{transfer_file, TransferParams};
use fssh::config::RunConfig;

#[tokio::test]
async fn test_missing_transfer_source_fails_before_connecting() {
    let dir = tempfile::tempdir().expect("temp dir");
    let targets = dir.path().join("hosts.txt");
    std::fs::write(&targets, "192.0.2.1\n").expect("write targets");

    let params = TransferParams {
        local_source: dir.path().join("missing.bin"),
        remote_dest: "/opt/drop".to_string(),
        targets_file: targets,
        username: "admin".to_string(),
        password: "pw".to_string(),
        port: 22,
    };

    let start = Instant::now();
    let err = transfer_file(params, &RunConfig::default())
        .await
        .expect_err("missing source must fail");

    assert!(err.to_string().contains("missing.bin"), "got: {err:#}");
    // The default connect timeout is 30s; failing well under that shows
    // no connection was attempted.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_missing_targets_file_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");

    let params = RunParams {
        targets_file: dir.path().join("absent-hosts.txt"),
        username: "admin".to_string(),
        password: "pw".to_string(),
        command: "id".to_string(),
        port: 22,
    };

    let err = run_command(params, &RunConfig::default())
        .await
        .expect_err("missing targets file must fail");

    assert!(err.to_string().contains("targets file"), "got: {err:#}");
    assert!(err.to_string().contains("absent-hosts.txt"), "got: {err:#}");
}

#[tokio::test]
async fn test_missing_script_fails_before_connecting() {
    let dir = tempfile::tempdir().expect("temp dir");
    let targets = dir.path().join("hosts.txt");
    std::fs::write(&targets, "192.0.2.1\n").expect("write targets");

    let params = ScriptParams {
        local_script: dir.path().join("absent.sh"),
        targets_file: targets,
        username: "admin".to_string(),
        password: "pw".to_string(),
        port: 22,
    };

    let start = Instant::now();
    let err = run_script(params, &RunConfig::default())
        .await
        .expect_err("missing script must fail");

    assert!(err.to_string().contains("absent.sh"), "got: {err:#}");
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_fetch_rejects_remote_path_without_file_name() {
    let dir = tempfile::tempdir().expect("temp dir");
    let targets = dir.path().join("hosts.txt");
    std::fs::write(&targets, "192.0.2.1\n").expect("write targets");

    let params = FetchParams {
        remote_source: "/var/log/".to_string(),
        local_dest: dir.path().join("out"),
        targets_file: targets,
        username: "admin".to_string(),
        password: "pw".to_string(),
        port: 22,
    };

    let err = fetch_file(params, &RunConfig::default())
        .await
        .expect_err("directory remote path must fail");

    assert!(err.to_string().contains("no file name"), "got: {err:#}");
}

#[tokio::test]
async fn test_empty_targets_file_completes_without_connections() {
    let dir = tempfile::tempdir().expect("temp dir");
    let targets = dir.path().join("hosts.txt");
    std::fs::write(&targets, "\n   \n\n").expect("write targets");
    let source = dir.path().join("payload.bin");
    std::fs::write(&source, b"data").expect("write payload");
    let report = dir.path().join("report.json");

    let params = TransferParams {
        local_source: source,
        remote_dest: "/opt/drop".to_string(),
        targets_file: targets,
        username: "admin".to_string(),
        password: "pw".to_string(),
        port: 22,
    };
    let config = RunConfig {
        json_path: Some(report.clone()),
        ..Default::default()
    };

    let start = Instant::now();
    transfer_file(params, &config)
        .await
        .expect("an empty target list is not an error");

    assert!(start.elapsed() < Duration::from_secs(5));
    let contents = std::fs::read_to_string(&report).expect("report must still be written");
    assert!(contents.is_empty(), "no targets means no records");
}
