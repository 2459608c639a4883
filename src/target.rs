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

//! Remote hosts a job runs against.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::TargetError;

/// Collected output keyed by command label.
pub type Facts = BTreeMap<String, String>;

/// What a job learned about one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOutcome {
    pub facts: Facts,
    pub error: Option<TargetError>,
}

impl TargetOutcome {
    pub fn failed(error: impl Into<TargetError>) -> Self {
        Self {
            facts: Facts::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// A host identified by one or more candidate addresses.
///
/// Addresses are tried in order, so callers put the preferred route
/// (usually the private address) first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub name: String,
    pub addresses: Vec<String>,
    pub outcome: TargetOutcome,
}

impl Target {
    pub fn new(id: impl Into<String>, name: impl Into<String>, addresses: Vec<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            addresses,
            outcome: TargetOutcome::default(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.id, self.name)
        }
    }
}
