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

use std::fmt;

/// Represents every failure a front operation can report.
///
/// Each variant carries a human-readable cause and, where one exists, the
/// offending topic, node, component or service name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrontError {
    /// Malformed or missing routing fields.
    ///
    /// Local and not retryable until the caller fixes its input.
    InvalidAddress(String),

    /// Propagating a topic or component registration to the transport failed.
    ///
    /// The local registry is left exactly as it was before the call.
    RegistrationFailed {
        /// The topic or component name being (un)registered.
        name: String,
        /// The underlying cause reported by the transport.
        cause: String,
    },

    /// No delivery, response or queued message within the bound.
    Timeout(String),

    /// Serializing or propagating this instance's service metadata failed.
    MetadataPublishFailed(String),

    /// The transport rejected the operation outright or has no route for it.
    TransportUnavailable(String),
}

impl FrontError {
    /// Returns the stable numeric code of this error kind.
    ///
    /// The code is what callback-style consumers receive alongside the message.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidAddress(_) => -1001,
            Self::RegistrationFailed { .. } => -1002,
            Self::Timeout(_) => -1003,
            Self::MetadataPublishFailed(_) => -1004,
            Self::TransportUnavailable(_) => -1005,
        }
    }

    /// Returns `true` for kinds a caller may reasonably retry unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistrationFailed { .. } | Self::Timeout(_) | Self::MetadataPublishFailed(_)
        )
    }

    /// Returns `true` if this is a [`FrontError::Timeout`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl fmt::Display for FrontError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress(cause) => write!(f, "Invalid address: {cause}"),
            Self::RegistrationFailed { name, cause } => {
                write!(f, "Registration of '{name}' failed: {cause}")
            }
            Self::Timeout(cause) => write!(f, "Timeout: {cause}"),
            Self::MetadataPublishFailed(cause) => write!(f, "Metadata publish failed: {cause}"),
            Self::TransportUnavailable(cause) => write!(f, "Transport unavailable: {cause}"),
        }
    }
}

impl std::error::Error for FrontError {}

/// Serialization only happens when publishing service metadata.
impl From<serde_json::Error> for FrontError {
    fn from(err: serde_json::Error) -> Self {
        Self::MetadataPublishFailed(err.to_string())
    }
}
