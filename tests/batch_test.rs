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

mod common;

use common::{credentials, CommandScript, HostScript, ScriptedConnector};
use fleetfacts::commands::CommandSpec;
use fleetfacts::error::SessionStage;
use fleetfacts::executor::{execute_batch, Connector, Negotiated};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

async fn negotiated(connector: &ScriptedConnector, address: &str) -> Negotiated {
    let creds = credentials(&["centos"], Duration::from_secs(5));
    let credential = creds.iter().next().unwrap();
    let connection = connector.connect(credential, address).await.unwrap();
    Negotiated {
        connection,
        identity: format!("centos@{address}"),
    }
}

#[tokio::test]
async fn test_all_commands_succeed() {
    let connector = ScriptedConnector::new().host(
        "10.0.0.1",
        HostScript::new()
            .command("uname -rs", CommandScript::ok("Linux 5.14.0\n"))
            .command("cat /etc/redhat-release", CommandScript::ok("  Rocky Linux 9.3  \n")),
    );
    let spec: CommandSpec = [("kernel", "uname -rs"), ("release", "cat /etc/redhat-release")]
        .into_iter()
        .collect();

    let report = execute_batch(negotiated(&connector, "10.0.0.1").await, &spec, None)
        .await
        .unwrap();

    assert!(report.error.is_none());
    assert_eq!(report.facts["kernel"], "Linux 5.14.0");
    assert_eq!(report.facts["release"], "Rocky Linux 9.3");
    assert_eq!(connector.stats.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_one_failing_command_keeps_the_others() {
    let connector = ScriptedConnector::new().host(
        "10.0.0.1",
        HostScript::new()
            .command("echo a", CommandScript::ok("a"))
            .command("false", CommandScript::fail(1, "boom\n"))
            .command("echo c", CommandScript::ok("c")),
    );
    let spec: CommandSpec = [("a", "echo a"), ("b", "false"), ("c", "echo c")]
        .into_iter()
        .collect();

    let report = execute_batch(negotiated(&connector, "10.0.0.1").await, &spec, None)
        .await
        .unwrap();

    assert_eq!(report.facts.len(), 2);
    assert_eq!(report.facts["a"], "a");
    assert_eq!(report.facts["c"], "c");

    let error = report.error.unwrap();
    assert_eq!(error.labels(), vec!["b"]);
    assert_eq!(error.failures[0].exit_status, Some(1));
    assert_eq!(error.failures[0].stderr, "boom");
    assert_eq!(
        error.to_string(),
        "can't collect all facts for centos@10.0.0.1; 'b': exit status 1 (stderr: boom)"
    );
}

#[tokio::test]
async fn test_missing_exit_status_is_a_failure() {
    let connector = ScriptedConnector::new().host(
        "10.0.0.1",
        HostScript::new().command(
            "kill -9 $$",
            CommandScript {
                stdout: "partial".to_string(),
                ..CommandScript::default()
            },
        ),
    );
    let spec: CommandSpec = [("killed", "kill -9 $$")].into_iter().collect();

    let report = execute_batch(negotiated(&connector, "10.0.0.1").await, &spec, None)
        .await
        .unwrap();

    assert!(report.facts.is_empty());
    let error = report.error.unwrap();
    assert_eq!(error.failures[0].exit_status, None);
    assert_eq!(
        error.failures[0].reason,
        "command did not report an exit status"
    );
}

#[tokio::test]
async fn test_refused_session_fails_the_batch() {
    let connector = ScriptedConnector::new().host(
        "10.0.0.1",
        HostScript::new()
            .max_sessions(1)
            .command("echo a", CommandScript::ok("a")),
    );
    let spec: CommandSpec = [("a", "echo a"), ("b", "echo b")].into_iter().collect();

    let err = execute_batch(negotiated(&connector, "10.0.0.1").await, &spec, None)
        .await
        .unwrap_err();

    assert_eq!(err.label, "b");
    assert_eq!(err.stage, SessionStage::Open);
    assert_eq!(err.identity, "centos@10.0.0.1");
    assert_eq!(
        err.to_string(),
        "can't allocate session for 'b' at centos@10.0.0.1: administratively prohibited: open failed"
    );
    assert_eq!(connector.stats.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refused_start_fails_the_batch() {
    let connector = ScriptedConnector::new().host(
        "10.0.0.1",
        HostScript::new().refuse_start("echo a"),
    );
    let spec: CommandSpec = [("a", "echo a")].into_iter().collect();

    let err = execute_batch(negotiated(&connector, "10.0.0.1").await, &spec, None)
        .await
        .unwrap_err();

    assert_eq!(err.stage, SessionStage::Start);
    assert_eq!(err.reason, "exec request failed");
    assert_eq!(connector.stats.closed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_commands_run_concurrently_on_one_connection() {
    let connector = ScriptedConnector::new().host(
        "10.0.0.1",
        HostScript::new()
            .command("a", CommandScript::ok("1").delayed(Duration::from_secs(3)))
            .command("b", CommandScript::ok("2").delayed(Duration::from_secs(3)))
            .command("c", CommandScript::ok("3").delayed(Duration::from_secs(3))),
    );
    let spec: CommandSpec = [("a", "a"), ("b", "b"), ("c", "c")].into_iter().collect();

    let start = Instant::now();
    let report = execute_batch(negotiated(&connector, "10.0.0.1").await, &spec, None)
        .await
        .unwrap();

    assert_eq!(report.facts.len(), 3);
    assert!(start.elapsed() < Duration::from_secs(6));
    assert_eq!(connector.stats.opened.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_abandons_slow_commands() {
    let connector = ScriptedConnector::new().host(
        "10.0.0.1",
        HostScript::new()
            .command("fast", CommandScript::ok("done"))
            .command(
                "slow",
                CommandScript::ok("never").delayed(Duration::from_secs(3600)),
            ),
    );
    let spec: CommandSpec = [("fast", "fast"), ("slow", "slow")].into_iter().collect();

    let deadline = Instant::now() + Duration::from_secs(10);
    let report = execute_batch(
        negotiated(&connector, "10.0.0.1").await,
        &spec,
        Some(deadline),
    )
    .await
    .unwrap();

    assert_eq!(report.facts["fast"], "done");
    assert!(!report.facts.contains_key("slow"));
    let error = report.error.unwrap();
    assert_eq!(error.labels(), vec!["slow"]);
    assert_eq!(error.failures[0].reason, "deadline exceeded");
    assert_eq!(connector.stats.closed.load(Ordering::SeqCst), 1);
}
