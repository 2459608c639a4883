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

//! SSH transport built on russh.
//!
//! * Password, private key and agent authentication
//! * Host key checking against known_hosts, or none
//! * One session channel per command on a shared connection

pub mod authentication;
pub mod channel;
pub mod connection;
pub mod connector;
pub mod error;

pub use authentication::AuthMethod;
pub use channel::SshSession;
pub use connection::{Client, HostKeyVerifier, ServerCheckMethod};
pub use connector::{SshConnection, SshConnector, DEFAULT_SSH_PORT};
pub use error::Error;
