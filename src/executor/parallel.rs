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

//! Core parallel executor implementation.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use super::aggregate::{aggregate, JobResultRow};
use super::execution_strategy::{collect_facts_task, JobContext};
use super::observer::{JobObserver, NoopObserver};
use super::transport::Connector;
use crate::commands::CommandSpec;
use crate::credentials::CredentialSet;
use crate::error::TargetError;
use crate::target::{Target, TargetOutcome};

/// Parallel executor for collecting facts across many targets.
///
/// One task is spawned per target; at most `max_parallel` of them are
/// negotiating or running commands at any moment. A failing target never
/// stops the others.
pub struct ParallelExecutor {
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) credentials: Arc<CredentialSet>,
    pub(crate) commands: Arc<CommandSpec>,
    pub(crate) max_parallel: usize,
    pub(crate) deadline: Option<Duration>,
    pub(crate) observer: Arc<dyn JobObserver>,
}

impl ParallelExecutor {
    pub fn new(
        connector: Arc<dyn Connector>,
        credentials: CredentialSet,
        commands: CommandSpec,
        max_parallel: usize,
    ) -> Self {
        Self {
            connector,
            credentials: Arc::new(credentials),
            commands: Arc::new(commands),
            max_parallel: max_parallel.clamp(1, Semaphore::MAX_PERMITS),
            deadline: None,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Bound the whole job, measured from the start of [`run`](Self::run).
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn commands(&self) -> &CommandSpec {
        &self.commands
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Process every target and store its outcome in place.
    ///
    /// Returns once all targets are done.
    pub async fn run(&self, targets: &mut [Target]) {
        let job = Arc::new(JobContext {
            connector: Arc::clone(&self.connector),
            credentials: Arc::clone(&self.credentials),
            commands: Arc::clone(&self.commands),
            observer: Arc::clone(&self.observer),
            // A deadline too far away to represent is no deadline at all.
            deadline: self.deadline.and_then(|d| Instant::now().checked_add(d)),
        });
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));

        let tasks: Vec<_> = targets
            .iter()
            .map(|target| {
                tokio::spawn(collect_facts_task(
                    Arc::clone(&job),
                    target.id.clone(),
                    target.addresses.clone(),
                    Arc::clone(&semaphore),
                ))
            })
            .collect();

        let results = join_all(tasks).await;

        for (target, result) in targets.iter_mut().zip(results) {
            target.outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => TargetOutcome::failed(TargetError::Internal(format!(
                    "Task for {} failed: {e}",
                    target.id
                ))),
            };
        }
    }

    /// Run the job and fold the outcomes into result rows, in input order.
    pub async fn collect(&self, mut targets: Vec<Target>) -> Vec<JobResultRow> {
        self.run(&mut targets).await;
        aggregate(&targets, &self.commands)
    }
}
