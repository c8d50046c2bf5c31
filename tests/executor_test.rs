// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Fan-out behavior against unreachable endpoints.
//!
//! No SSH server is involved: these tests only rely on connections being
//! refused or timing out, and check that every target still comes back
//! with exactly one result, in target order, without aborting the run.

use std::time::{Duration, Instant};

use fssh::config::{Action, CommandJob, Credential, RunConfig};
use fssh::executor::{FanoutExecutor, Outcome};
use fssh::target::Target;

/// A localhost port nothing listens on, so connects are refused at once.
fn refused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}

fn test_config(max_parallel: usize) -> RunConfig {
    RunConfig {
        max_parallel,
        connect_timeout: Duration::from_secs(5),
        command_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn echo_action() -> Action {
    Action::Command(CommandJob {
        command: "echo test".to_string(),
    })
}

#[tokio::test]
async fn test_refused_connection_yields_connect_failed() {
    let targets = vec![Target::new("127.0.0.1", refused_port())];
    let executor = FanoutExecutor::new(
        targets,
        Credential::new("admin", "pw"),
        echo_action(),
        &test_config(1),
    );

    let results = executor.execute().await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::ConnectFailed);
    assert!(!results[0].is_success());
    assert!(
        !results[0].message.is_empty(),
        "failure must carry a cause: {:?}",
        results[0]
    );
}

#[tokio::test]
async fn test_unroutable_host_respects_connect_timeout() {
    // TEST-NET-1 is reserved and unroutable; the connect either times out
    // at the configured deadline or errors immediately.
    let targets = vec![Target::new("192.0.2.1", 22)];
    let config = RunConfig {
        max_parallel: 1,
        connect_timeout: Duration::from_secs(1),
        command_timeout: Duration::from_secs(1),
        ..Default::default()
    };
    let executor = FanoutExecutor::new(
        targets,
        Credential::new("admin", "pw"),
        echo_action(),
        &config,
    );

    let start = Instant::now();
    let results = executor.execute().await;

    assert!(
        start.elapsed() < Duration::from_secs(15),
        "connect must be bounded by the timeout, took {:?}",
        start.elapsed()
    );
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::ConnectFailed);
}

#[tokio::test]
async fn test_every_target_gets_a_result_in_order() {
    let targets = vec![
        Target::new("127.0.0.1", refused_port()),
        Target::new("127.0.0.1", refused_port()),
        Target::new("127.0.0.1", refused_port()),
    ];
    let executor = FanoutExecutor::new(
        targets.clone(),
        Credential::new("admin", "pw"),
        echo_action(),
        &test_config(1),
    );

    let results = executor.execute().await;

    assert_eq!(results.len(), targets.len(), "one result per target");
    for (result, target) in results.iter().zip(&targets) {
        assert_eq!(&result.target, target, "results must keep target order");
        assert!(!result.is_success());
    }
}

#[tokio::test]
async fn test_parallel_mode_preserves_target_order() {
    let targets = vec![
        Target::new("127.0.0.1", refused_port()),
        Target::new("127.0.0.1", refused_port()),
        Target::new("127.0.0.1", refused_port()),
        Target::new("127.0.0.1", refused_port()),
    ];
    let executor = FanoutExecutor::new(
        targets.clone(),
        Credential::new("admin", "pw"),
        echo_action(),
        &test_config(4),
    );

    let results = executor.execute().await;

    assert_eq!(results.len(), targets.len());
    for (result, target) in results.iter().zip(&targets) {
        assert_eq!(&result.target, target);
        assert_eq!(result.outcome, Outcome::ConnectFailed);
    }
}

#[tokio::test]
async fn test_empty_target_list_short_circuits() {
    let executor = FanoutExecutor::new(
        Vec::new(),
        Credential::new("admin", "pw"),
        echo_action(),
        &test_config(1),
    );

    let results = executor.execute().await;
    assert!(results.is_empty());
}
