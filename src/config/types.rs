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

//! Configuration type definitions.

use std::path::PathBuf;
use std::time::Duration;

use crate::commands::CommandSpec;
use crate::credentials::CredentialSet;
use crate::ssh::ServerCheckMethod;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_SESSIONS: usize = 10;
pub const DEFAULT_USERS: &str = "centos,ec2-user";
pub const DEFAULT_FACTS: &str =
    r#"{"kernel": "uname -rs","release": "cat /etc/redhat-release || cat /etc/*-release"}"#;

/// Where the private key or agent comes from.
///
/// Inline key material wins over a key path; the agent is used only when
/// neither is given.
#[derive(Clone, Default)]
pub struct KeySource {
    pub inline_key: Option<String>,
    pub key_path: Option<PathBuf>,
    pub key_passphrase: Option<String>,
    pub agent_socket: Option<PathBuf>,
}

impl std::fmt::Debug for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySource")
            .field("inline_key", &self.inline_key.as_ref().map(|_| "<redacted>"))
            .field("key_path", &self.key_path)
            .field(
                "key_passphrase",
                &self.key_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field("agent_socket", &self.agent_socket)
            .finish()
    }
}

/// Unvalidated settings as gathered from flags and environment.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub facts: String,
    pub users: String,
    pub timeout_secs: u64,
    pub max_sessions: usize,
    pub port: u16,
    pub deadline_secs: Option<u64>,
    pub known_hosts: Option<PathBuf>,
    pub keys: KeySource,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            facts: DEFAULT_FACTS.to_string(),
            users: DEFAULT_USERS.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            port: crate::ssh::DEFAULT_SSH_PORT,
            deadline_secs: None,
            known_hosts: None,
            keys: KeySource::default(),
        }
    }
}

/// Validated job configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub commands: CommandSpec,
    pub credentials: CredentialSet,
    pub max_sessions: usize,
    pub port: u16,
    pub deadline: Option<Duration>,
    pub server_check: ServerCheckMethod,
}
