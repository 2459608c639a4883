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

//! SSH channel operations for command execution.

use anyhow::Result;
use async_trait::async_trait;
use russh::client::Msg;
use russh::Channel;

use super::connection::Client;
use crate::executor::{RemoteSession, SessionOutput};

/// Buffer size for SSH command stdout
/// - 8KB matches typical SSH channel window sizes
const SSH_CMD_BUFFER_SIZE: usize = 8192;

/// Buffer size for SSH command stderr, usually a short message
const SSH_RESPONSE_BUFFER_SIZE: usize = 1024;

impl Client {
    /// Open a new session channel on this connection.
    pub async fn open_channel(&self) -> Result<Channel<Msg>, super::Error> {
        self.handle
            .channel_open_session()
            .await
            .map_err(super::Error::Ssh)
    }
}

/// A command running on its own session channel.
pub struct SshSession {
    channel: Channel<Msg>,
}

impl SshSession {
    pub fn new(channel: Channel<Msg>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn start(&mut self, command: &str) -> Result<()> {
        self.channel
            .exec(true, command)
            .await
            .map_err(super::Error::Ssh)?;
        Ok(())
    }

    async fn wait(&mut self) -> Result<SessionOutput> {
        let mut stdout = Vec::with_capacity(SSH_CMD_BUFFER_SIZE);
        let mut stderr = Vec::with_capacity(SSH_RESPONSE_BUFFER_SIZE);
        let mut exit_status: Option<u32> = None;

        while let Some(msg) = self.channel.wait().await {
            match msg {
                russh::ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                russh::ChannelMsg::ExtendedData { ref data, ext } => {
                    if ext == 1 {
                        stderr.extend_from_slice(data)
                    }
                }

                // The exit status may arrive before the last data packet, so
                // keep reading until the channel closes.
                russh::ChannelMsg::ExitStatus {
                    exit_status: status,
                } => exit_status = Some(status),

                // EOF can precede data (RFC 4254 5.3), so it is not an end marker.
                _ => {}
            }
        }

        Ok(SessionOutput {
            stdout,
            stderr,
            exit_status,
        })
    }
}
