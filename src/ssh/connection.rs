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

//! Establishing one authenticated SSH connection.

use russh::client::{Config, Handle, Handler};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use super::authentication::AuthMethod;
use super::Error;

/// Host key policy applied during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ServerCheckMethod {
    /// Accept any host key. Fleet hosts are usually freshly provisioned and
    /// unknown to the collector.
    #[default]
    NoCheck,
    /// Accept only keys listed in this known_hosts file.
    KnownHostsFile(PathBuf),
}

/// An authenticated connection. Channels opened on it share the transport.
#[derive(Clone)]
pub struct Client {
    pub(super) handle: Arc<Handle<HostKeyVerifier>>,
    user: String,
    peer: SocketAddr,
}

impl Client {
    /// Handshake with `address` and log `user` in.
    ///
    /// `address` is an IP, an `ip:port` pair or a hostname; `default_port`
    /// applies when it carries no port. Every resolved socket address is
    /// tried until a handshake succeeds. Authentication is attempted once,
    /// on that first handshake.
    pub async fn connect(
        address: &str,
        default_port: u16,
        user: &str,
        auth: &AuthMethod,
        server_check: &ServerCheckMethod,
        config: Arc<Config>,
    ) -> Result<Self, Error> {
        let candidates = resolve(address, default_port).await?;

        let mut last_error = Error::NoSocketAddress(address.to_string());
        let mut established = None;
        for peer in candidates {
            let verifier = HostKeyVerifier {
                host: address.to_string(),
                port: peer.port(),
                server_check: server_check.clone(),
            };
            match russh::client::connect(Arc::clone(&config), peer, verifier).await {
                Ok(handle) => {
                    established = Some((peer, handle));
                    break;
                }
                Err(e) => {
                    tracing::trace!("Handshake with {peer} failed: {e}");
                    last_error = e;
                }
            }
        }
        let Some((peer, mut handle)) = established else {
            return Err(last_error);
        };

        auth.authenticate(&mut handle, user).await?;

        Ok(Self {
            handle: Arc::new(handle),
            user: user.to_string(),
            peer,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(Error::Ssh)
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("user", &self.user)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}

/// Socket addresses to try for `address`, in resolver order.
async fn resolve(address: &str, default_port: u16) -> Result<Vec<SocketAddr>, Error> {
    if let Ok(peer) = address.parse::<SocketAddr>() {
        return Ok(vec![peer]);
    }
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, default_port)]);
    }

    let peers: Vec<SocketAddr> = tokio::net::lookup_host((address, default_port))
        .await
        .map_err(|source| Error::Resolve {
            address: address.to_string(),
            source,
        })?
        .collect();
    if peers.is_empty() {
        return Err(Error::NoSocketAddress(address.to_string()));
    }
    Ok(peers)
}

/// Checks the server's host key against the configured policy.
#[derive(Debug, Clone)]
pub struct HostKeyVerifier {
    host: String,
    port: u16,
    server_check: ServerCheckMethod,
}

impl Handler for HostKeyVerifier {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        match &self.server_check {
            ServerCheckMethod::NoCheck => Ok(true),
            ServerCheckMethod::KnownHostsFile(path) => {
                let known = russh::keys::check_known_hosts_path(
                    &self.host,
                    self.port,
                    server_public_key,
                    path,
                )
                .map_err(|source| Error::KnownHosts {
                    path: path.clone(),
                    source,
                })?;
                if !known {
                    tracing::warn!("Host key for {}:{} is not known", self.host, self.port);
                }
                Ok(known)
            }
        }
    }
}
