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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the russh client layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("can't resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("{0} resolved to no socket addresses")]
    NoSocketAddress(String),

    #[error(transparent)]
    Ssh(#[from] russh::Error),

    #[error("can't load private key: {0}")]
    Key(#[source] russh::keys::Error),

    #[error("can't read known hosts file {}: {source}", .path.display())]
    KnownHosts {
        path: PathBuf,
        #[source]
        source: russh::keys::Error,
    },

    #[error("{0} authentication rejected")]
    Rejected(&'static str),

    #[error("SSH agent at {}: {reason}", .socket.display())]
    Agent { socket: PathBuf, reason: String },

    #[error("connection is closed")]
    ConnectionClosed,
}
