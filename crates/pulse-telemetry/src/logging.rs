// Copyright 2025 eraflo
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

//! Logger initialisation.
//!
//! All Pulse crates log through the `log` facade. Hosts that do not install
//! their own logger can call [`init`] once at startup.

use env_logger::{Builder, Env};

/// Installs `env_logger`, honouring `RUST_LOG` and falling back to `default_filter`.
///
/// Returns an error if a logger was already installed.
pub fn init(default_filter: &str) -> Result<(), log::SetLoggerError> {
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init()
}

/// Installs a test-friendly logger whose output is captured by the test harness.
///
/// Safe to call from every test; only the first call installs the logger.
pub fn init_for_tests() {
    let _ = Builder::from_env(Env::default().default_filter_or("debug"))
        .is_test(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_test_init_is_harmless() {
        init_for_tests();
        init_for_tests();
        log::debug!("logger installed");
        // A second full install must fail instead of panicking.
        assert!(init("info").is_err());
    }
}
