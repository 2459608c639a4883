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

//! Progress events emitted while a job runs.

use crate::target::TargetOutcome;

/// Receives job events. Every method defaults to doing nothing.
///
/// `target_started` and `target_finished` are called while the target holds
/// its concurrency slot.
pub trait JobObserver: Send + Sync {
    fn target_started(&self, _target: &str) {}

    fn attempt_started(&self, _target: &str, _user: &str, _address: &str) {}

    fn attempt_failed(&self, _target: &str, _user: &str, _address: &str, _reason: &str) {}

    fn connected(&self, _target: &str, _identity: &str) {}

    fn target_finished(&self, _target: &str, _outcome: &TargetOutcome) {}
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn target_started(&self, target: &str) {
        tracing::debug!(host = target, "Processing target");
    }

    fn attempt_started(&self, target: &str, user: &str, address: &str) {
        tracing::debug!(host = target, "Trying {user}@{address}...");
    }

    fn attempt_failed(&self, target: &str, user: &str, address: &str, reason: &str) {
        tracing::debug!(host = target, "Failed to connect {user}@{address}: {reason}");
    }

    fn connected(&self, target: &str, identity: &str) {
        tracing::info!(host = target, "Connected as {identity}");
    }

    fn target_finished(&self, target: &str, outcome: &TargetOutcome) {
        match &outcome.error {
            None => tracing::info!(
                host = target,
                "Collected {} fact(s)",
                outcome.facts.len()
            ),
            Some(e) => tracing::warn!(
                host = target,
                "Collected {} fact(s) with errors: {e}",
                outcome.facts.len()
            ),
        }
    }
}
