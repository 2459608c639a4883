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

use tracing_subscriber::EnvFilter;

/// Create an environment filter based on verbosity level
pub fn create_env_filter(verbosity: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        // RUST_LOG allows debugging russh and other dependencies
        EnvFilter::from_default_env()
    } else {
        match verbosity {
            0 => EnvFilter::new("fleetfacts=warn"),
            1 => EnvFilter::new("fleetfacts=info"),
            // -vv: Include russh debug logs for SSH troubleshooting
            2 => EnvFilter::new("fleetfacts=debug,russh=debug"),
            // -vvv: Full trace including all dependencies
            _ => EnvFilter::new("fleetfacts=trace,russh=trace"),
        }
    }
}

/// Verbosity after applying the `DEBUG` environment switch, which forces
/// at least debug output.
pub fn effective_verbosity(verbosity: u8) -> u8 {
    if std::env::var_os("DEBUG").is_some() {
        verbosity.max(2)
    } else {
        verbosity
    }
}

/// Initialize logging to stderr, keeping stdout for the result document.
pub fn init_logging(verbosity: u8) {
    let filter = create_env_filter(verbosity);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_create_env_filter() {
        let _ = create_env_filter(0);
        let _ = create_env_filter(1);
        let _ = create_env_filter(2);
        let _ = create_env_filter(3);
    }

    #[test]
    #[serial]
    fn test_debug_env_raises_verbosity() {
        std::env::remove_var("DEBUG");
        assert_eq!(effective_verbosity(0), 0);

        std::env::set_var("DEBUG", "1");
        assert_eq!(effective_verbosity(0), 2);
        assert_eq!(effective_verbosity(3), 3);
        std::env::remove_var("DEBUG");
    }
}
