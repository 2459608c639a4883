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

//! Turning raw settings into a validated job configuration.

use std::time::Duration;
use zeroize::Zeroizing;

use super::types::{JobConfig, JobSettings, KeySource};
use super::utils::{expand_tilde, split_users};
use crate::commands::CommandSpec;
use crate::credentials::{AuthMethod, CredentialSet};
use crate::error::ConfigError;
use crate::ssh::ServerCheckMethod;

impl JobConfig {
    /// Validate settings. Any error here aborts the job before dispatch.
    pub fn from_settings(settings: &JobSettings) -> Result<Self, ConfigError> {
        let commands = CommandSpec::from_json(&settings.facts)?;

        if settings.max_sessions == 0 {
            return Err(ConfigError::ZeroValue("max sessions"));
        }
        if settings.timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("timeout"));
        }

        let users = split_users(&settings.users);
        if users.is_empty() {
            return Err(ConfigError::NoUsers);
        }

        let auth = resolve_auth(&settings.keys)?;
        tracing::debug!("Using {} authentication for users {:?}", auth.kind(), users);

        let credentials = CredentialSet::for_users(
            &users,
            auth,
            Duration::from_secs(settings.timeout_secs),
        );

        let server_check = match &settings.known_hosts {
            Some(path) => ServerCheckMethod::KnownHostsFile(expand_tilde(path)),
            None => ServerCheckMethod::NoCheck,
        };

        Ok(Self {
            commands,
            credentials,
            max_sessions: settings.max_sessions,
            port: settings.port,
            deadline: settings.deadline_secs.map(Duration::from_secs),
            server_check,
        })
    }
}

/// Pick the authentication method and check key material up front.
pub fn resolve_auth(keys: &KeySource) -> Result<AuthMethod, ConfigError> {
    let passphrase = keys.key_passphrase.as_deref();

    let key_data = match (&keys.inline_key, &keys.key_path) {
        (Some(key), _) if !key.trim().is_empty() => Some(Zeroizing::new(key.clone())),
        (_, Some(path)) => {
            let path = expand_tilde(path);
            let content = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::KeyFile { path, source })?;
            Some(Zeroizing::new(content))
        }
        _ => None,
    };

    if let Some(key_data) = key_data {
        russh::keys::decode_secret_key(&key_data, passphrase)
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        return Ok(AuthMethod::with_key(&key_data, passphrase));
    }

    agent_auth(keys)?.ok_or(ConfigError::NoCredentials)
}

/// Agent authentication, if a socket is configured and something listens on it.
#[cfg(not(target_os = "windows"))]
fn agent_auth(keys: &KeySource) -> Result<Option<AuthMethod>, ConfigError> {
    let Some(socket) = keys
        .agent_socket
        .as_ref()
        .filter(|socket| !socket.as_os_str().is_empty())
    else {
        return Ok(None);
    };

    std::os::unix::net::UnixStream::connect(socket).map_err(|source| ConfigError::Agent {
        socket: socket.clone(),
        source,
    })?;
    Ok(Some(AuthMethod::with_agent(socket.clone())))
}

#[cfg(target_os = "windows")]
fn agent_auth(_keys: &KeySource) -> Result<Option<AuthMethod>, ConfigError> {
    Ok(None)
}
