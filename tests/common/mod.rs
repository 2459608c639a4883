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

//! Scripted transport used by the integration tests.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fleetfacts::credentials::{AuthMethod, CredentialSet};
use fleetfacts::executor::{Connection, Connector, RemoteSession, SessionOutput};
use fleetfacts::Credential;

/// How a scripted command behaves.
#[derive(Debug, Clone, Default)]
pub struct CommandScript {
    pub stdout: String,
    pub stderr: String,
    pub exit_status: Option<u32>,
    pub delay: Duration,
}

impl CommandScript {
    pub fn ok(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            exit_status: Some(0),
            ..Self::default()
        }
    }

    pub fn fail(status: u32, stderr: &str) -> Self {
        Self {
            stderr: stderr.to_string(),
            exit_status: Some(status),
            ..Self::default()
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// How a scripted address behaves.
#[derive(Debug, Clone, Default)]
pub struct HostScript {
    /// Only this user authenticates. `None` accepts every user.
    pub accept_user: Option<String>,
    /// Connecting never completes.
    pub hang: bool,
    pub connect_delay: Duration,
    pub commands: HashMap<String, CommandScript>,
    /// Sessions after this many are refused.
    pub max_sessions: Option<usize>,
    /// Starting this command is refused.
    pub refuse_start: Option<String>,
}

impl HostScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_user(mut self, user: &str) -> Self {
        self.accept_user = Some(user.to_string());
        self
    }

    pub fn hang(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn command(mut self, command: &str, script: CommandScript) -> Self {
        self.commands.insert(command.to_string(), script);
        self
    }

    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = Some(max);
        self
    }

    pub fn refuse_start(mut self, command: &str) -> Self {
        self.refuse_start = Some(command.to_string());
        self
    }
}

/// Counters shared by every connection of one [`ScriptedConnector`].
///
/// `live` counts targets between the start of a connection attempt and the
/// close (or failure) of that connection.
#[derive(Debug, Default)]
pub struct Stats {
    pub attempts: Mutex<Vec<(String, String)>>,
    pub live: AtomicUsize,
    pub peak: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl Stats {
    pub fn attempts(&self) -> Vec<(String, String)> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Holds one `live` slot; released on drop, including when an attempt is
/// abandoned by a timeout.
struct LiveSlot(Arc<Stats>);

impl LiveSlot {
    fn take(stats: &Arc<Stats>) -> Self {
        let live = stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak.fetch_max(live, Ordering::SeqCst);
        Self(Arc::clone(stats))
    }
}

impl Drop for LiveSlot {
    fn drop(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct ScriptedConnector {
    hosts: HashMap<String, HostScript>,
    pub stats: Arc<Stats>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, address: &str, script: HostScript) -> Self {
        self.hosts.insert(address.to_string(), script);
        self
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        credential: &Credential,
        address: &str,
    ) -> Result<Box<dyn Connection>> {
        self.stats
            .attempts
            .lock()
            .unwrap()
            .push((credential.user.clone(), address.to_string()));
        let slot = LiveSlot::take(&self.stats);

        let Some(script) = self.hosts.get(address) else {
            bail!("connection refused");
        };
        if script.hang {
            std::future::pending::<()>().await;
        }
        if !script.connect_delay.is_zero() {
            tokio::time::sleep(script.connect_delay).await;
        }
        if let Some(user) = &script.accept_user {
            if user != &credential.user {
                bail!("authentication failed for {}", credential.user);
            }
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(ScriptedConnection {
            script: script.clone(),
            stats: Arc::clone(&self.stats),
            sessions: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            slot: Mutex::new(Some(slot)),
        }))
    }
}

struct ScriptedConnection {
    script: HostScript,
    stats: Arc<Stats>,
    sessions: AtomicUsize,
    closed: AtomicBool,
    slot: Mutex<Option<LiveSlot>>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn open_session(&self) -> Result<Box<dyn RemoteSession>> {
        if self.closed.load(Ordering::SeqCst) {
            bail!("connection closed");
        }
        let opened = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(max) = self.script.max_sessions {
            if opened > max {
                bail!("administratively prohibited: open failed");
            }
        }
        Ok(Box::new(ScriptedSession {
            script: self.script.clone(),
            command: None,
        }))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            drop(self.slot.lock().unwrap().take());
            self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct ScriptedSession {
    script: HostScript,
    command: Option<String>,
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn start(&mut self, command: &str) -> Result<()> {
        if self.script.refuse_start.as_deref() == Some(command) {
            bail!("exec request failed");
        }
        self.command = Some(command.to_string());
        Ok(())
    }

    async fn wait(&mut self) -> Result<SessionOutput> {
        let Some(command) = &self.command else {
            bail!("command was never started");
        };
        let script = self
            .script
            .commands
            .get(command)
            .cloned()
            .unwrap_or_else(|| CommandScript::fail(127, "command not found"));

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        Ok(SessionOutput {
            stdout: script.stdout.into_bytes(),
            stderr: script.stderr.into_bytes(),
            exit_status: script.exit_status,
        })
    }
}

pub fn credentials(users: &[&str], timeout: Duration) -> CredentialSet {
    CredentialSet::for_users(users, AuthMethod::with_password("secret"), timeout)
}

pub fn addresses(list: &[&str]) -> Vec<String> {
    list.iter().map(|a| a.to_string()).collect()
}
