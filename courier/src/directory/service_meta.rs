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

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::message::FrontError;

/// One reachable entry point of a named service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPointMeta {
    /// Logical service name. Matched case-insensitively.
    pub service_name: String,
    /// Host and port, or a URI.
    pub entry_point: String,
    /// Components of the advertising node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<String>,
}

impl EntryPointMeta {
    /// Creates an entry point with no components.
    pub fn new(service_name: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            entry_point: entry_point.into(),
            components: Vec::new(),
        }
    }

    /// Builds a URL for `uri_path` on this entry point.
    ///
    /// The entry point and path are joined by exactly one `/`, and `http://` is
    /// prefixed when the entry point carries no scheme.
    ///
    /// ```rust
    /// use courier::directory::EntryPointMeta;
    ///
    /// let entry = EntryPointMeta::new("svc", "10.0.0.1:8080");
    /// assert_eq!(entry.url("api/v1"), "http://10.0.0.1:8080/api/v1");
    /// assert_eq!(entry.url("/api/v1"), "http://10.0.0.1:8080/api/v1");
    /// assert_eq!(entry.url(""), "http://10.0.0.1:8080");
    /// ```
    #[must_use]
    pub fn url(&self, uri_path: &str) -> String {
        let base = if self.entry_point.contains("://") {
            self.entry_point.clone()
        } else {
            format!("http://{}", self.entry_point)
        };
        if uri_path.trim().is_empty() {
            return base;
        }
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            uri_path.trim_start_matches('/')
        )
    }

    /// Parses one `serviceInfos` entry, requiring a non-blank service name and
    /// entry point. Unknown fields are ignored.
    fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let entry: Self = serde_json::from_value(value)?;
        if entry.service_name.trim().is_empty() {
            return Err(serde::de::Error::custom("serviceName is blank"));
        }
        if entry.entry_point.trim().is_empty() {
            return Err(serde::de::Error::custom("entryPoint is blank"));
        }
        Ok(entry)
    }
}

#[derive(Deserialize)]
struct RawServiceMeta {
    #[serde(rename = "serviceInfos", default)]
    service_infos: Option<Vec<serde_json::Value>>,
}

/// The services one instance advertises.
///
/// Serialized as `{"serviceInfos":[{"serviceName":..,"entryPoint":..}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMeta {
    /// The advertised entry points, in registration order.
    pub service_infos: Vec<EntryPointMeta>,
}

impl ServiceMeta {
    /// Appends an entry point. Existing entries are never replaced.
    pub fn add_entry_point(&mut self, entry: EntryPointMeta) {
        self.service_infos.push(entry);
    }

    /// Serializes the metadata for publication.
    ///
    /// # Errors
    ///
    /// Returns [`FrontError::MetadataPublishFailed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, FrontError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a peer's metadata blob.
    ///
    /// A malformed entry is skipped with a warning; the other entries are kept.
    ///
    /// # Errors
    ///
    /// Fails when the blob as a whole is not a JSON object of this shape.
    pub fn parse(blob: &str) -> Result<Self, serde_json::Error> {
        let raw: RawServiceMeta = serde_json::from_str(blob)?;
        let service_infos = raw
            .service_infos
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match EntryPointMeta::from_value(value) {
                Ok(entry) => Some(entry),
                Err(error) => {
                    warn!(index, %error, "Skipping malformed serviceInfos entry");
                    None
                }
            })
            .collect();
        Ok(Self { service_infos })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_wire_names() {
        let mut meta = ServiceMeta::default();
        meta.add_entry_point(EntryPointMeta::new("svcA", "10.0.0.1:8080"));
        assert_eq!(
            meta.to_json().unwrap(),
            r#"{"serviceInfos":[{"serviceName":"svcA","entryPoint":"10.0.0.1:8080"}]}"#
        );
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let meta = ServiceMeta::parse(
            r#"{"version":2,"serviceInfos":[{"serviceName":"a","entryPoint":"h:1","weight":3}]}"#,
        )
        .unwrap();
        assert_eq!(meta.service_infos, vec![EntryPointMeta::new("a", "h:1")]);
    }

    #[test]
    fn test_parse_skips_only_bad_entries() {
        let meta = ServiceMeta::parse(
            r#"{"serviceInfos":[{"serviceName":"a"},{"serviceName":" ","entryPoint":"x"},{"serviceName":"b","entryPoint":"h:2"}]}"#,
        )
        .unwrap();
        assert_eq!(meta.service_infos, vec![EntryPointMeta::new("b", "h:2")]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ServiceMeta::parse("").is_err());
        assert!(ServiceMeta::parse("[1,2]").is_err());
        assert!(ServiceMeta::parse("{").is_err());
    }

    #[test]
    fn test_parse_tolerates_missing_or_null_infos() {
        assert!(ServiceMeta::parse("{}").unwrap().service_infos.is_empty());
        assert!(ServiceMeta::parse(r#"{"serviceInfos":null}"#)
            .unwrap()
            .service_infos
            .is_empty());
    }

    #[test]
    fn test_url_keeps_existing_scheme() {
        let entry = EntryPointMeta::new("svc", "https://host:1/");
        assert_eq!(entry.url("/status"), "https://host:1/status");
    }
}
