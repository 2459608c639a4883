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

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fleetfacts::{
    cli::Cli,
    config::JobConfig,
    executor::{ParallelExecutor, TracingObserver},
    inventory::{FileInventory, InventoryProvider},
    ssh::SshConnector,
    utils::{effective_verbosity, init_logging},
};

/// Format a Duration into a human-readable string
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs_f64();

    if total_seconds < 1.0 {
        format!("{:.1} ms", total_seconds * 1000.0)
    } else if total_seconds < 60.0 {
        format!("{total_seconds:.2} s")
    } else {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;

        if seconds == 0 {
            format!("{minutes}m")
        } else {
            format!("{minutes}m {seconds}s")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(effective_verbosity(cli.verbose));

    let config =
        JobConfig::from_settings(&cli.job_settings()).context("Invalid job configuration")?;

    let targets = FileInventory::new(&cli.inventory)
        .targets()
        .await
        .with_context(|| format!("Failed to load inventory {}", cli.inventory.display()))?;

    let labels: Vec<&str> = config.commands.labels().collect();
    eprintln!(
        "Collecting facts ({}) for {} instance(s)...",
        labels.join(", "),
        targets.len()
    );

    let start = Instant::now();
    let connector = SshConnector::new(config.port).with_server_check(config.server_check.clone());
    let target_count = targets.len();

    let executor = ParallelExecutor::new(
        Arc::new(connector),
        config.credentials,
        config.commands,
        config.max_sessions,
    )
    .with_deadline(config.deadline)
    .with_observer(Arc::new(TracingObserver));

    let rows = executor.collect(targets).await;

    let failed = rows.iter().filter(|row| row.error.is_some()).count();
    if failed > 0 {
        tracing::warn!("{failed} of {target_count} instance(s) reported errors");
    }

    let document = serde_json::to_string_pretty(&rows).context("Failed to encode results")?;
    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, format!("{document}\n"))
                .await
                .with_context(|| format!("Failed to write results to {}", path.display()))?;
        }
        None => println!("{document}"),
    }

    eprintln!(
        "Processed {target_count} instance(s) in {}",
        format_duration(start.elapsed())
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250.0 ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.50 s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
