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

//! Per-target pipeline run under the job's concurrency limit.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use super::batch::execute_batch;
use super::negotiator::Negotiator;
use super::observer::JobObserver;
use super::transport::Connector;
use crate::commands::CommandSpec;
use crate::credentials::CredentialSet;
use crate::error::{ConnectFailure, ConnectionError, TargetError};
use crate::target::TargetOutcome;

/// Read-only state shared by every target task of one job.
pub(crate) struct JobContext {
    pub connector: Arc<dyn Connector>,
    pub credentials: Arc<CredentialSet>,
    pub commands: Arc<CommandSpec>,
    pub observer: Arc<dyn JobObserver>,
    pub deadline: Option<Instant>,
}

/// Negotiate a connection for one target and run the command batch on it.
///
/// The semaphore permit is held for the whole pipeline and released when
/// this function returns, whatever the outcome.
pub(crate) async fn collect_facts_task(
    job: Arc<JobContext>,
    target: String,
    addresses: Vec<String>,
    semaphore: Arc<Semaphore>,
) -> TargetOutcome {
    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(e) => {
            return TargetOutcome::failed(TargetError::Internal(format!(
                "Semaphore acquisition failed: {e}"
            )));
        }
    };

    job.observer.target_started(&target);

    let outcome = match job.deadline {
        Some(deadline) if Instant::now() >= deadline => TargetOutcome::failed(
            ConnectionError::new(&addresses, ConnectFailure::DeadlineExceeded),
        ),
        _ => run_pipeline(&job, &target, &addresses).await,
    };

    job.observer.target_finished(&target, &outcome);
    outcome
}

async fn run_pipeline(job: &JobContext, target: &str, addresses: &[String]) -> TargetOutcome {
    let negotiated = match Negotiator::new(job.connector.as_ref(), job.observer.as_ref())
        .with_deadline(job.deadline)
        .negotiate(target, addresses, &job.credentials)
        .await
    {
        Ok(negotiated) => negotiated,
        Err(e) => return TargetOutcome::failed(e),
    };

    match execute_batch(negotiated, &job.commands, job.deadline).await {
        Ok(report) => TargetOutcome {
            facts: report.facts,
            error: report.error.map(TargetError::from),
        },
        Err(e) => TargetOutcome::failed(e),
    }
}
