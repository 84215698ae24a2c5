/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dispatch::{DispatchSettings, ResponseMode};
use crate::route::ComponentRoutePolicy;

/// Configuration of one front instance.
///
/// Loaded from TOML in XDG-compliant directories by [`FrontConfig::load`], or
/// built in code. Every section and field has a default, so a partial file is
/// enough.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Routing behaviour
    pub routing: RoutingConfig,
    /// Capacity limits
    pub limits: LimitsConfig,
    /// Service discovery refresher
    pub discovery: DiscoveryConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Default send and push timeout in milliseconds
    pub send_timeout_ms: u64,
    /// Default pop timeout in milliseconds
    pub pop_timeout_ms: u64,
    /// How long shutdown waits for background tasks, in milliseconds
    pub shutdown_timeout_ms: u64,
}

/// Routing behaviour switches
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// How a component route combines agency and component
    pub component_policy: ComponentRoutePolicy,
    /// Whether one send may be answered more than once
    pub response_mode: ResponseMode,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Capacity of each send's response channel
    pub response_buffer: usize,
}

/// Service discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Run the background refresher after `start`
    pub enabled: bool,
    /// Refresh period in milliseconds
    pub refresh_interval_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: 5_000,
            pop_timeout_ms: 60_000,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            response_buffer: 64,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_ms: 10_000,
        }
    }
}

impl FrontConfig {
    /// Default send and push timeout as a Duration
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.send_timeout_ms)
    }

    /// Default pop timeout as a Duration
    #[must_use]
    pub const fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.pop_timeout_ms)
    }

    /// Shutdown timeout as a Duration
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_timeout_ms)
    }

    /// Discovery refresh period as a Duration
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.discovery.refresh_interval_ms)
    }

    pub(crate) const fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            response_mode: self.routing.response_mode,
            response_buffer: self.limits.response_buffer,
            default_timeout: self.send_timeout(),
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns the parse error for malformed documents or mistyped fields.
    pub fn from_toml_str(document: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(document)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `courier/config.toml` under `$XDG_CONFIG_HOME` and then the
    /// XDG config search path. Without a file the defaults are returned; a file
    /// that exists but cannot be read or parsed is logged and the defaults are
    /// returned as well.
    #[must_use]
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("courier") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        if let Some(path) = xdg_dirs.find_config_file("config.toml") {
            Self::load_from_path(&path)
        } else {
            info!("No configuration file found, using defaults");
            Self::default()
        }
    }

    /// Load configuration from an explicit file, falling back to defaults.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        use tracing::{error, info};

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(path) {
            Ok(config_str) => match Self::from_toml_str(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
