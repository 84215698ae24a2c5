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

use bytes::Bytes;

use super::RouteType;

/// The resolved routing header of one send.
///
/// Built once by [`resolve`](super::resolve), immutable afterwards, and moved
/// into the transport together with the message it routes. It is deliberately
/// not `Clone`: one descriptor belongs to one send.
#[derive(Debug, PartialEq, Eq)]
pub struct RouteDescriptor {
    route_type: RouteType,
    topic: String,
    dst_node: Option<Bytes>,
    dst_inst: Option<String>,
    dst_component: Option<String>,
}

impl RouteDescriptor {
    pub(crate) const fn new(
        route_type: RouteType,
        topic: String,
        dst_node: Option<Bytes>,
        dst_inst: Option<String>,
        dst_component: Option<String>,
    ) -> Self {
        Self {
            route_type,
            topic,
            dst_node,
            dst_inst,
            dst_component,
        }
    }

    /// The addressing mode.
    #[must_use]
    pub const fn route_type(&self) -> RouteType {
        self.route_type
    }

    /// The topic, possibly empty.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// The destination node id, set only for node routes.
    #[must_use]
    pub fn dst_node(&self) -> Option<&[u8]> {
        self.dst_node.as_deref()
    }

    /// The destination agency.
    #[must_use]
    pub fn dst_inst(&self) -> Option<&str> {
        self.dst_inst.as_deref()
    }

    /// The destination component, set only for component routes.
    #[must_use]
    pub fn dst_component(&self) -> Option<&str> {
        self.dst_component.as_deref()
    }

    /// A short description of the destination for logs and error messages.
    #[must_use]
    pub fn target(&self) -> String {
        match self.route_type {
            RouteType::NodeId => format!(
                "node '{}'",
                String::from_utf8_lossy(self.dst_node().unwrap_or_default())
            ),
            RouteType::Agency => format!("agency '{}'", self.dst_inst().unwrap_or_default()),
            RouteType::Component => match self.dst_inst() {
                Some(agency) => format!(
                    "component '{}' in agency '{agency}'",
                    self.dst_component().unwrap_or_default()
                ),
                None => format!("component '{}'", self.dst_component().unwrap_or_default()),
            },
            RouteType::Topic => format!(
                "topic '{}' in agency '{}'",
                self.topic,
                self.dst_inst().unwrap_or_default()
            ),
        }
    }
}
