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

//! Finding a working (credential, address) pair for a target.

use std::time::Duration;
use tokio::time::{timeout, Instant};

use super::observer::JobObserver;
use super::transport::{Connection, Connector};
use crate::credentials::CredentialSet;
use crate::error::{ConnectAttempt, ConnectFailure, ConnectionError};

/// A live connection together with the `user@address` that opened it.
pub struct Negotiated {
    pub connection: Box<dyn Connection>,
    pub identity: String,
}

impl std::fmt::Debug for Negotiated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Negotiated")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Tries credentials in order and, for each credential, addresses in order.
///
/// Attempts are sequential. The first success wins and nothing after it is
/// tried. Credentials are the outer loop because most hosts of a fleet
/// share one working login.
pub struct Negotiator<'a> {
    connector: &'a dyn Connector,
    observer: &'a dyn JobObserver,
    deadline: Option<Instant>,
}

impl<'a> Negotiator<'a> {
    pub fn new(connector: &'a dyn Connector, observer: &'a dyn JobObserver) -> Self {
        Self {
            connector,
            observer,
            deadline: None,
        }
    }

    /// Stop starting attempts at `deadline` and cut in-flight attempts short there.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn negotiate(
        &self,
        target: &str,
        addresses: &[String],
        credentials: &CredentialSet,
    ) -> Result<Negotiated, ConnectionError> {
        if addresses.is_empty() {
            return Err(ConnectionError::new(addresses, ConnectFailure::NoAddresses));
        }
        if credentials.is_empty() {
            return Err(ConnectionError::new(
                addresses,
                ConnectFailure::NoCredentials,
            ));
        }

        let mut attempts = Vec::new();
        for credential in credentials {
            for address in addresses {
                let Some((budget, capped)) = self.attempt_budget(credential.timeout) else {
                    return Err(ConnectionError::new(
                        addresses,
                        ConnectFailure::DeadlineExceeded,
                    )
                    .with_attempts(attempts));
                };

                self.observer
                    .attempt_started(target, &credential.user, address);

                let reason = match timeout(budget, self.connector.connect(credential, address))
                    .await
                {
                    Ok(Ok(connection)) => {
                        let identity = format!("{}@{}", credential.user, address);
                        self.observer.connected(target, &identity);
                        return Ok(Negotiated {
                            connection,
                            identity,
                        });
                    }
                    Ok(Err(e)) => format!("{e:#}"),
                    Err(_) if capped => "deadline exceeded".to_string(),
                    Err(_) => format!("connection timeout after {}", format_secs(budget)),
                };

                self.observer
                    .attempt_failed(target, &credential.user, address, &reason);
                attempts.push(ConnectAttempt {
                    user: credential.user.clone(),
                    address: address.clone(),
                    reason,
                });
            }
        }

        let failure = match self.deadline {
            Some(deadline) if Instant::now() >= deadline => ConnectFailure::DeadlineExceeded,
            _ => ConnectFailure::Exhausted,
        };
        Err(ConnectionError::new(addresses, failure).with_attempts(attempts))
    }

    /// Time allowed for the next attempt, and whether the deadline capped it.
    /// `None` once the deadline has passed.
    fn attempt_budget(&self, timeout: Duration) -> Option<(Duration, bool)> {
        match self.deadline {
            None => Some((timeout, false)),
            Some(deadline) => {
                let remaining = deadline.checked_duration_since(Instant::now())?;
                if remaining.is_zero() {
                    None
                } else if remaining < timeout {
                    Some((remaining, true))
                } else {
                    Some((timeout, false))
                }
            }
        }
    }
}

fn format_secs(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{secs:.0}s")
    } else {
        format!("{secs:.3}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(Duration::from_secs(5)), "5s");
        assert_eq!(format_secs(Duration::from_millis(1500)), "1.500s");
    }
}
