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

//! Error types for fact collection.
//!
//! Only [`ConfigError`] aborts a job. Every other error is captured on the
//! target it belongs to and reported next to whatever facts were collected.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems detected before any target is dispatched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid command mapping: {0}")]
    InvalidCommands(String),

    #[error("no SSH credential material: provide SSH_KEY, SSH_KEY_PATH or SSH_AUTH_SOCK")]
    NoCredentials,

    #[error("failed to read SSH key file {}: {source}", .path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid SSH private key: {0}")]
    InvalidKey(String),

    #[error("can't open connection to SSH agent at {}: {source}", .socket.display())]
    Agent {
        socket: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no login users configured")]
    NoUsers,

    #[error("{0} must be at least 1")]
    ZeroValue(&'static str),
}

/// One failed (credential, address) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectAttempt {
    pub user: String,
    pub address: String,
    pub reason: String,
}

impl fmt::Display for ConnectAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}: {}", self.user, self.address, self.reason)
    }
}

/// Why negotiation gave up on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    /// The target has no candidate addresses.
    NoAddresses,
    /// The credential set is empty.
    NoCredentials,
    /// Every (credential, address) pair was tried and failed.
    Exhausted,
    /// The job deadline passed before a pair succeeded.
    DeadlineExceeded,
}

/// No (credential, address) pair yielded a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    pub addresses: Vec<String>,
    pub failure: ConnectFailure,
    pub attempts: Vec<ConnectAttempt>,
}

impl ConnectionError {
    pub fn new(addresses: &[String], failure: ConnectFailure) -> Self {
        Self {
            addresses: addresses.to_vec(),
            failure,
            attempts: Vec::new(),
        }
    }

    pub fn with_attempts(mut self, attempts: Vec<ConnectAttempt>) -> Self {
        self.attempts = attempts;
        self
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addresses = self.addresses.join(", ");
        match self.failure {
            ConnectFailure::NoAddresses => write!(f, "no addresses to connect to")?,
            ConnectFailure::NoCredentials => {
                write!(f, "no credentials to connect to [{addresses}] with")?
            }
            ConnectFailure::Exhausted => {
                write!(f, "can't connect to host with addresses [{addresses}]")?
            }
            ConnectFailure::DeadlineExceeded => write!(
                f,
                "deadline exceeded while connecting to host with addresses [{addresses}]"
            )?,
        }
        for attempt in &self.attempts {
            write!(f, "; {attempt}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConnectionError {}

/// Which step of starting a remote command was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Open,
    Start,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStage::Open => write!(f, "allocate session"),
            SessionStage::Start => write!(f, "start command"),
        }
    }
}

/// The remote side refused a new execution unit on a live connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("can't {stage} for '{label}' at {identity}: {reason}")]
pub struct SessionAllocationError {
    pub identity: String,
    pub label: String,
    pub stage: SessionStage,
    pub reason: String,
}

/// One command label that produced no fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub label: String,
    /// Exit status reported by the remote process, if it reported one.
    pub exit_status: Option<u32>,
    /// Captured standard error, trimmed.
    pub stderr: String,
    pub reason: String,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.label, self.reason)?;
        if !self.stderr.is_empty() {
            write!(f, " (stderr: {})", self.stderr)?;
        }
        Ok(())
    }
}

/// Per-label failures from one command batch.
///
/// This is reported next to the partial facts, never instead of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateCommandError {
    pub identity: String,
    pub failures: Vec<CommandFailure>,
}

impl AggregateCommandError {
    /// Labels that failed, in the order they were reported.
    pub fn labels(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.label.as_str()).collect()
    }
}

impl fmt::Display for AggregateCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "can't collect all facts for {}", self.identity)?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateCommandError {}

/// Error recorded on a single target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    SessionAllocation(#[from] SessionAllocationError),

    #[error(transparent)]
    Commands(#[from] AggregateCommandError),

    /// The task processing the target did not finish normally.
    #[error("internal error: {0}")]
    Internal(String),
}
