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

//! [`Connector`] backed by russh.

use anyhow::{Context, Result};
use async_trait::async_trait;
use russh::client::Config;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::channel::SshSession;
use super::connection::{Client, ServerCheckMethod};
use crate::credentials::Credential;
use crate::executor::{Connection, Connector, RemoteSession};

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Connects to targets over SSH.
///
/// Timeouts are applied by the caller per attempt, so the russh config
/// carries no connection timeout of its own.
#[derive(Debug, Clone)]
pub struct SshConnector {
    port: u16,
    server_check: ServerCheckMethod,
    config: Arc<Config>,
}

impl SshConnector {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            server_check: ServerCheckMethod::default(),
            config: Arc::new(Config::default()),
        }
    }

    pub fn with_server_check(mut self, server_check: ServerCheckMethod) -> Self {
        self.server_check = server_check;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for SshConnector {
    fn default() -> Self {
        Self::new(DEFAULT_SSH_PORT)
    }
}

#[async_trait]
impl Connector for SshConnector {
    async fn connect(
        &self,
        credential: &Credential,
        address: &str,
    ) -> Result<Box<dyn Connection>> {
        let client = Client::connect(
            address,
            self.port,
            &credential.user,
            &credential.auth,
            &self.server_check,
            Arc::clone(&self.config),
        )
        .await
        .with_context(|| {
            format!(
                "Failed to connect {}@{} using {}",
                credential.user,
                address,
                credential.auth.kind()
            )
        })?;

        tracing::debug!("Connected to {} as {}", client.peer(), client.user());

        Ok(Box::new(SshConnection {
            client,
            closed: AtomicBool::new(false),
        }))
    }
}

/// A negotiated SSH connection. Not pooled: closed once its batch is done.
#[derive(Debug)]
pub struct SshConnection {
    client: Client,
    closed: AtomicBool,
}

#[async_trait]
impl Connection for SshConnection {
    async fn open_session(&self) -> Result<Box<dyn RemoteSession>> {
        if self.closed.load(Ordering::Acquire) || self.client.is_closed() {
            return Err(super::Error::ConnectionClosed.into());
        }
        let channel = self.client.open_channel().await?;
        Ok(Box::new(SshSession::new(channel)))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.client.disconnect().await {
            tracing::debug!("Error while disconnecting from {}: {e}", self.client.peer());
        }
    }
}
