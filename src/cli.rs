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

use clap::Parser;
use std::path::PathBuf;

use crate::config::{
    JobSettings, KeySource, DEFAULT_FACTS, DEFAULT_MAX_SESSIONS, DEFAULT_TIMEOUT_SECS,
    DEFAULT_USERS,
};
use crate::ssh::DEFAULT_SSH_PORT;

#[derive(Parser, Debug)]
#[command(
    name = "fleetfacts",
    version,
    about = "Collect labelled command output from a fleet of hosts over SSH",
    long_about = "fleetfacts runs a fixed set of labelled shell commands on every host of an inventory.\nEach host is tried with every login user against every candidate address until one connection succeeds.\nCommands for one host run concurrently over that single connection; hosts are processed in parallel up to --max-sessions.\nUnreachable hosts and failing commands never stop the job: every host gets a row, missing facts are empty strings.\nEvery option can also be set through the environment variable shown next to it.",
    after_help = "EXAMPLES:\n  Default facts for an inventory:   fleetfacts hosts.yaml\n  Custom facts:                     fleetfacts --facts '{\"uptime\": \"uptime -p\"}' hosts.yaml\n  Key file, 20 hosts at a time:     fleetfacts -i ~/.ssh/fleet --max-sessions 20 hosts.yaml\n  Hard 25 second budget:            DEADLINE=25 fleetfacts hosts.yaml -o facts.json"
)]
pub struct Cli {
    #[arg(
        env = "INVENTORY",
        help = "Inventory file (YAML or JSON) listing targets with their addresses"
    )]
    pub inventory: PathBuf,

    #[arg(
        long,
        env = "FACTS",
        default_value = DEFAULT_FACTS,
        help = "JSON object mapping fact labels to shell commands"
    )]
    pub facts: String,

    #[arg(
        short = 'u',
        long,
        env = "USERS",
        default_value = DEFAULT_USERS,
        help = "Comma-separated login users, tried in order"
    )]
    pub users: String,

    #[arg(
        short = 't',
        long,
        env = "TIMEOUT",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "Timeout in seconds for each connection attempt"
    )]
    pub timeout: u64,

    #[arg(
        short = 'm',
        long,
        env = "MAX_SESSIONS",
        default_value_t = DEFAULT_MAX_SESSIONS,
        help = "Maximum number of hosts processed at the same time"
    )]
    pub max_sessions: usize,

    #[arg(
        short = 'i',
        long,
        env = "SSH_KEY_PATH",
        help = "SSH private key file\nIgnored when SSH_KEY holds key material"
    )]
    pub key_path: Option<PathBuf>,

    #[arg(long, env = "SSH_KEY", hide = true, hide_env_values = true)]
    pub key: Option<String>,

    #[arg(
        long,
        env = "SSH_KEY_PASSPHRASE",
        hide_env_values = true,
        help = "Passphrase for an encrypted private key"
    )]
    pub key_passphrase: Option<String>,

    #[arg(
        long,
        env = "SSH_AUTH_SOCK",
        help = "SSH agent socket, used when no private key is given"
    )]
    pub agent_socket: Option<PathBuf>,

    #[arg(
        short = 'p',
        long,
        env = "SSH_PORT",
        default_value_t = DEFAULT_SSH_PORT,
        help = "SSH port for addresses that do not carry one"
    )]
    pub port: u16,

    #[arg(
        long,
        env = "DEADLINE",
        help = "Overall time budget for the job in seconds\nNo new connection attempt starts after it and running commands are abandoned"
    )]
    pub deadline: Option<u64>,

    #[arg(
        long,
        help = "Verify host keys against this known_hosts file\nHost keys are not checked by default"
    )]
    pub known_hosts: Option<PathBuf>,

    #[arg(short = 'o', long, help = "Write the JSON result to this file instead of stdout")]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'v',
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv, -vvv)"
    )]
    pub verbose: u8,
}

impl Cli {
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            facts: self.facts.clone(),
            users: self.users.clone(),
            timeout_secs: self.timeout,
            max_sessions: self.max_sessions,
            port: self.port,
            deadline_secs: self.deadline,
            known_hosts: self.known_hosts.clone(),
            keys: KeySource {
                inline_key: self.key.clone(),
                key_path: self.key_path.clone(),
                key_passphrase: self.key_passphrase.clone(),
                agent_socket: self.agent_socket.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "INVENTORY",
        "FACTS",
        "USERS",
        "TIMEOUT",
        "MAX_SESSIONS",
        "SSH_KEY_PATH",
        "SSH_KEY",
        "SSH_KEY_PASSPHRASE",
        "SSH_AUTH_SOCK",
        "SSH_PORT",
        "DEADLINE",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let cli = Cli::try_parse_from(["fleetfacts", "hosts.yaml"]).unwrap();
        let settings = cli.job_settings();

        assert_eq!(cli.inventory, PathBuf::from("hosts.yaml"));
        assert_eq!(settings.facts, DEFAULT_FACTS);
        assert_eq!(settings.users, "centos,ec2-user");
        assert_eq!(settings.timeout_secs, 5);
        assert_eq!(settings.max_sessions, 10);
        assert_eq!(settings.port, 22);
        assert_eq!(settings.deadline_secs, None);
        assert!(settings.keys.inline_key.is_none());
    }

    #[test]
    #[serial]
    fn test_environment_overrides_defaults() {
        clear_env();
        std::env::set_var("MAX_SESSIONS", "3");
        std::env::set_var("USERS", "ubuntu");
        std::env::set_var("SSH_AUTH_SOCK", "/tmp/agent.sock");

        let cli = Cli::try_parse_from(["fleetfacts", "hosts.yaml"]).unwrap();
        clear_env();

        let settings = cli.job_settings();
        assert_eq!(settings.max_sessions, 3);
        assert_eq!(settings.users, "ubuntu");
        assert_eq!(
            settings.keys.agent_socket,
            Some(PathBuf::from("/tmp/agent.sock"))
        );
    }

    #[test]
    #[serial]
    fn test_flags_override_environment() {
        clear_env();
        std::env::set_var("TIMEOUT", "9");

        let cli =
            Cli::try_parse_from(["fleetfacts", "--timeout", "2", "--deadline", "25", "hosts.yaml"])
                .unwrap();
        clear_env();

        assert_eq!(cli.timeout, 2);
        assert_eq!(cli.deadline, Some(25));
    }

    #[test]
    #[serial]
    fn test_inventory_required() {
        clear_env();
        assert!(Cli::try_parse_from(["fleetfacts"]).is_err());
    }
}
