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

//! Seam between the executor and the remote-shell protocol.
//!
//! The executor only ever talks to these traits. The russh implementation
//! lives in [`crate::ssh`]; tests plug in scripted doubles.

use anyhow::Result;
use async_trait::async_trait;

use crate::credentials::Credential;

/// Captured result of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the channel closed without reporting an exit status.
    pub exit_status: Option<u32>,
}

impl SessionOutput {
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// Makes a single connection attempt with one credential against one address.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credential: &Credential, address: &str)
        -> Result<Box<dyn Connection>>;
}

/// A live, authenticated connection to one target.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Allocate a new execution unit multiplexed on this connection.
    async fn open_session(&self) -> Result<Box<dyn RemoteSession>>;

    /// Release the connection. Further `open_session` calls fail.
    async fn close(&self);
}

/// One remote command execution.
#[async_trait]
pub trait RemoteSession: Send {
    /// Start `command` without waiting for it to finish.
    async fn start(&mut self, command: &str) -> Result<()>;

    /// Wait for the started command to exit and return what it printed.
    async fn wait(&mut self) -> Result<SessionOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_output_success() {
        let output = SessionOutput {
            stdout: b"Linux 5.10\n".to_vec(),
            stderr: Vec::new(),
            exit_status: Some(0),
        };
        assert!(output.is_success());
        assert_eq!(output.stdout_string(), "Linux 5.10\n");
    }

    #[test]
    fn test_session_output_without_exit_status_is_not_success() {
        let output = SessionOutput {
            stdout: b"partial".to_vec(),
            stderr: "エラー\n".as_bytes().to_vec(),
            exit_status: None,
        };
        assert!(!output.is_success());
        assert_eq!(output.stderr_string(), "エラー\n");
    }
}
