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

//! Folding target outcomes into the result table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::commands::CommandSpec;
use crate::target::Target;

/// Value reported for a label that produced no output.
pub const MISSING_FACT: &str = "";

/// One row of the result table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResultRow {
    #[serde(rename = "InstanceId")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "IPs")]
    pub addresses: Vec<String>,
    /// Every label of the command spec, filled or [`MISSING_FACT`].
    #[serde(rename = "Facts")]
    pub facts: BTreeMap<String, String>,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Build one row per target, in target order, with a complete set of labels.
pub fn aggregate(targets: &[Target], commands: &CommandSpec) -> Vec<JobResultRow> {
    targets
        .iter()
        .map(|target| JobResultRow {
            id: target.id.clone(),
            name: target.name.clone(),
            addresses: target.addresses.clone(),
            facts: commands
                .labels()
                .map(|label| {
                    let value = target
                        .outcome
                        .facts
                        .get(label)
                        .map(String::as_str)
                        .unwrap_or(MISSING_FACT);
                    (label.to_string(), value.to_string())
                })
                .collect(),
            error: target.outcome.error.as_ref().map(ToString::to_string),
        })
        .collect()
}
