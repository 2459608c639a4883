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

//! Sources of targets.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::target::Target;

/// Tag holding a target's display name when no explicit name is given.
const NAME_TAG: &str = "Name";

/// Something that can list the fleet.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    async fn targets(&self) -> Result<Vec<Target>>;
}

/// One host as written in an inventory file.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub private_address: Option<String>,
    #[serde(default)]
    pub public_address: Option<String>,
    /// Extra candidate addresses, tried after the private and public ones.
    #[serde(default)]
    pub addresses: Vec<String>,
}

impl InventoryEntry {
    pub fn into_target(self) -> Target {
        let name = self
            .name
            .or_else(|| self.tags.get(NAME_TAG).cloned())
            .unwrap_or_default();

        let mut addresses: Vec<String> = Vec::new();
        let candidates = self
            .private_address
            .into_iter()
            .chain(self.public_address)
            .chain(self.addresses);
        for address in candidates {
            let address = address.trim();
            if !address.is_empty() && !addresses.iter().any(|a| a == address) {
                addresses.push(address.to_string());
            }
        }

        Target::new(self.id, name, addresses)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InventoryDocument {
    List(Vec<InventoryEntry>),
    Wrapped { targets: Vec<InventoryEntry> },
}

/// YAML (or JSON) inventory file.
///
/// Either a list of entries or a mapping with a `targets` list:
///
/// ```yaml
/// targets:
///   - id: i-0abc
///     tags: { Name: web-1 }
///     private_address: 10.0.0.12
///     public_address: 54.1.2.3
/// ```
#[derive(Debug, Clone)]
pub struct FileInventory {
    path: PathBuf,
}

impl FileInventory {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(content: &str) -> Result<Vec<Target>> {
        let document: InventoryDocument =
            serde_yaml::from_str(content).context("Failed to parse inventory")?;
        let entries = match document {
            InventoryDocument::Wrapped { targets } => targets,
            InventoryDocument::List(entries) => entries,
        };
        Ok(entries.into_iter().map(InventoryEntry::into_target).collect())
    }
}

#[async_trait]
impl InventoryProvider for FileInventory {
    async fn targets(&self) -> Result<Vec<Target>> {
        let content = fs::read_to_string(&self.path).await.with_context(|| {
            format!(
                "Failed to read inventory file at {}",
                self.path.display()
            )
        })?;
        let targets = Self::parse(&content)
            .with_context(|| format!("Invalid inventory file {}", self.path.display()))?;
        tracing::debug!(
            "Inventory: found {} target(s) in {}",
            targets.len(),
            self.path.display()
        );
        Ok(targets)
    }
}
