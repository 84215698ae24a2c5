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

use super::{RouteDescriptor, RouteType};

/// How a component route combines its agency and component fields.
///
/// The resolver always records both fields; which one wins when selecting
/// the final hop is decided by the transport, using this policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRoutePolicy {
    /// The agency, when given, narrows the search to that agency's nodes.
    #[default]
    Scoped,
    /// The component alone selects the node; the agency is ignored.
    ComponentOnly,
}

impl ComponentRoutePolicy {
    /// Returns the agency a component route is restricted to under this policy.
    ///
    /// Non-component routes return their destination agency unchanged.
    #[must_use]
    pub fn agency_scope<'a>(&self, descriptor: &'a RouteDescriptor) -> Option<&'a str> {
        match (descriptor.route_type(), self) {
            (RouteType::Component, Self::ComponentOnly) => None,
            _ => descriptor.dst_inst(),
        }
    }
}
