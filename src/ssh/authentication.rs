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

//! Login methods shared by every attempt made with one credential.

use russh::client::{Handle, Handler};
use russh::keys::{PrivateKey, PrivateKeyWithHashAlg};
use std::fmt;
use std::path::PathBuf;
#[cfg(not(target_os = "windows"))]
use std::path::Path;
use std::sync::Arc;
use zeroize::Zeroizing;

use super::Error;

/// How a credential proves its identity to a host.
///
/// Key material is zeroized on drop and never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthMethod {
    Password(Zeroizing<String>),
    /// Key material held in memory, e.g. taken from the environment.
    PrivateKey {
        key_data: Zeroizing<String>,
        key_pass: Option<Zeroizing<String>>,
    },
    /// Key read from disk on every attempt.
    PrivateKeyFile {
        key_file_path: PathBuf,
        key_pass: Option<Zeroizing<String>>,
    },
    /// Every identity held by the agent listening on `socket`, in the
    /// agent's order.
    #[cfg(not(target_os = "windows"))]
    Agent { socket: PathBuf },
}

impl AuthMethod {
    pub fn with_password(password: &str) -> Self {
        Self::Password(Zeroizing::new(password.to_string()))
    }

    pub fn with_key(key: &str, passphrase: Option<&str>) -> Self {
        Self::PrivateKey {
            key_data: Zeroizing::new(key.to_string()),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    pub fn with_key_file<T: Into<PathBuf>>(key_file_path: T, passphrase: Option<&str>) -> Self {
        Self::PrivateKeyFile {
            key_file_path: key_file_path.into(),
            key_pass: passphrase.map(|p| Zeroizing::new(p.to_string())),
        }
    }

    #[cfg(not(target_os = "windows"))]
    pub fn with_agent<T: Into<PathBuf>>(socket: T) -> Self {
        Self::Agent {
            socket: socket.into(),
        }
    }

    /// Short description used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Password(_) => "password",
            AuthMethod::PrivateKey { .. } => "private key",
            AuthMethod::PrivateKeyFile { .. } => "private key file",
            #[cfg(not(target_os = "windows"))]
            AuthMethod::Agent { .. } => "agent",
        }
    }

    /// Log `user` in on a freshly handshaken connection.
    pub(super) async fn authenticate<H: Handler>(
        &self,
        handle: &mut Handle<H>,
        user: &str,
    ) -> Result<(), Error> {
        let accepted = match self {
            AuthMethod::Password(password) => handle
                .authenticate_password(user, password.as_str())
                .await?
                .success(),
            AuthMethod::PrivateKey { key_data, key_pass } => {
                let key = russh::keys::decode_secret_key(key_data, passphrase(key_pass))
                    .map_err(Error::Key)?;
                offer_key(handle, user, key).await?
            }
            AuthMethod::PrivateKeyFile {
                key_file_path,
                key_pass,
            } => {
                let key = russh::keys::load_secret_key(key_file_path, passphrase(key_pass))
                    .map_err(Error::Key)?;
                offer_key(handle, user, key).await?
            }
            #[cfg(not(target_os = "windows"))]
            AuthMethod::Agent { socket } => offer_agent_identities(handle, user, socket).await?,
        };

        if accepted {
            Ok(())
        } else {
            Err(Error::Rejected(self.kind()))
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::PrivateKeyFile { key_file_path, .. } => f
                .debug_struct("PrivateKeyFile")
                .field("key_file_path", key_file_path)
                .finish_non_exhaustive(),
            #[cfg(not(target_os = "windows"))]
            AuthMethod::Agent { socket } => {
                f.debug_struct("Agent").field("socket", socket).finish()
            }
            other => write!(f, "AuthMethod({})", other.kind()),
        }
    }
}

fn passphrase(key_pass: &Option<Zeroizing<String>>) -> Option<&str> {
    key_pass.as_ref().map(|p| p.as_str())
}

async fn offer_key<H: Handler>(
    handle: &mut Handle<H>,
    user: &str,
    key: PrivateKey,
) -> Result<bool, Error> {
    let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
    let result = handle
        .authenticate_publickey(user, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
        .await?;
    Ok(result.success())
}

#[cfg(not(target_os = "windows"))]
async fn offer_agent_identities<H: Handler>(
    handle: &mut Handle<H>,
    user: &str,
    socket: &Path,
) -> Result<bool, Error> {
    let agent_error = |reason: String| Error::Agent {
        socket: socket.to_path_buf(),
        reason,
    };

    let mut agent = russh::keys::agent::client::AgentClient::connect_uds(socket)
        .await
        .map_err(|e| agent_error(format!("can't connect: {e}")))?;
    let identities = agent
        .request_identities()
        .await
        .map_err(|e| agent_error(format!("can't list identities: {e}")))?;
    if identities.is_empty() {
        return Err(agent_error("no identities".to_string()));
    }

    let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
    let offered = identities.len();
    for identity in identities {
        let result = handle
            .authenticate_publickey_with(user, identity, hash_alg, &mut agent)
            .await;
        if let Ok(auth_result) = result {
            if auth_result.success() {
                return Ok(true);
            }
        }
    }

    tracing::debug!("None of {offered} agent identities accepted for {user}");
    Ok(false)
}
