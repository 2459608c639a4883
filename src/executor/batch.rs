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

//! Running every labelled command over one negotiated connection.

use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};

use super::negotiator::Negotiated;
use super::transport::SessionOutput;
use crate::commands::CommandSpec;
use crate::error::{AggregateCommandError, CommandFailure, SessionAllocationError, SessionStage};
use crate::target::Facts;

/// Facts collected by a batch, plus the labels that failed.
///
/// A present `error` does not mean `facts` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub facts: Facts,
    pub error: Option<AggregateCommandError>,
}

type PendingCommand = (String, JoinHandle<anyhow::Result<SessionOutput>>);

/// Start every command on its own session, then collect each result.
///
/// All sessions are opened and started before any is waited on, so the
/// commands of one target run concurrently over the single connection.
/// A refused session is fatal for the target: commands already started are
/// abandoned and the connection is closed. The connection is always closed
/// before returning.
pub async fn execute_batch(
    negotiated: Negotiated,
    commands: &CommandSpec,
    deadline: Option<Instant>,
) -> Result<BatchReport, SessionAllocationError> {
    let Negotiated {
        connection,
        identity,
    } = negotiated;

    let mut pending: Vec<PendingCommand> = Vec::with_capacity(commands.len());
    for (label, command) in commands.iter() {
        let allocation_error = |stage, e: anyhow::Error| SessionAllocationError {
            identity: identity.clone(),
            label: label.to_string(),
            stage,
            reason: format!("{e:#}"),
        };

        let mut session = match connection.open_session().await {
            Ok(session) => session,
            Err(e) => {
                abandon(&pending);
                connection.close().await;
                return Err(allocation_error(SessionStage::Open, e));
            }
        };

        if let Err(e) = session.start(command).await {
            abandon(&pending);
            connection.close().await;
            return Err(allocation_error(SessionStage::Start, e));
        }

        pending.push((
            label.to_string(),
            tokio::spawn(async move { session.wait().await }),
        ));
    }

    let mut facts = Facts::new();
    let mut failures = Vec::new();

    // Each command owns its buffers until it is joined here; completion
    // order does not matter.
    for (label, mut handle) in pending {
        let joined = match deadline {
            Some(deadline) => match timeout_at(deadline, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    failures.push(CommandFailure {
                        label,
                        exit_status: None,
                        stderr: String::new(),
                        reason: "deadline exceeded".to_string(),
                    });
                    continue;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(output)) => match output.exit_status {
                Some(0) => {
                    facts.insert(label, output.stdout_string().trim().to_string());
                }
                Some(status) => failures.push(CommandFailure {
                    label,
                    exit_status: Some(status),
                    stderr: output.stderr_string().trim().to_string(),
                    reason: format!("exit status {status}"),
                }),
                None => failures.push(CommandFailure {
                    label,
                    exit_status: None,
                    stderr: output.stderr_string().trim().to_string(),
                    reason: "command did not report an exit status".to_string(),
                }),
            },
            Ok(Err(e)) => failures.push(CommandFailure {
                label,
                exit_status: None,
                stderr: String::new(),
                reason: format!("{e:#}"),
            }),
            Err(e) => failures.push(CommandFailure {
                label,
                exit_status: None,
                stderr: String::new(),
                reason: format!("command task failed: {e}"),
            }),
        }
    }

    connection.close().await;

    let error = if failures.is_empty() {
        None
    } else {
        Some(AggregateCommandError { identity, failures })
    };
    Ok(BatchReport { facts, error })
}

fn abandon(pending: &[PendingCommand]) {
    for (_, handle) in pending {
        handle.abort();
    }
}
