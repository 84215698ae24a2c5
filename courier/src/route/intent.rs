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

use bytes::Bytes;

use crate::message::FrontError;

/// The addressing mode of a message, as carried on the wire.
///
/// Discriminants follow the routing table ordering used by gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RouteType {
    /// Deliver to one specific node.
    NodeId = 0,
    /// Deliver to a node hosting a logical component.
    Component = 1,
    /// Deliver to a node of an agency.
    Agency = 2,
    /// Deliver to the nodes of an agency that registered a topic.
    Topic = 3,
}

impl RouteType {
    /// Returns the wire discriminant.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for RouteType {
    type Error = FrontError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NodeId),
            1 => Ok(Self::Component),
            2 => Ok(Self::Agency),
            3 => Ok(Self::Topic),
            other => Err(FrontError::InvalidAddress(format!(
                "unsupported route type {other}"
            ))),
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NodeId => "node",
            Self::Component => "component",
            Self::Agency => "agency",
            Self::Topic => "topic",
        };
        f.write_str(name)
    }
}

/// How a caller wants a message addressed.
///
/// Each variant holds exactly the fields its addressing mode needs, so a
/// route can never be built with a required field left unset. Blank values
/// are still representable and are rejected by [`resolve`](super::resolve).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteIntent {
    /// Address one node by its id.
    Node(Bytes),
    /// Address an agency (institution).
    Agency(String),
    /// Address a logical component, optionally restricted to one agency.
    Component {
        /// Agency the component should be looked up in, if any.
        agency: Option<String>,
        /// The component name.
        component: String,
    },
    /// Address the nodes of an agency that registered `topic`.
    Topic {
        /// Destination agency.
        agency: String,
        /// Routing topic.
        topic: String,
    },
}

impl RouteIntent {
    /// Routes to the node with id `node_id`.
    pub fn node(node_id: impl Into<Bytes>) -> Self {
        Self::Node(node_id.into())
    }

    /// Routes to `agency`.
    pub fn agency(agency: impl Into<String>) -> Self {
        Self::Agency(agency.into())
    }

    /// Routes to any node hosting `component`, in any agency.
    pub fn component(component: impl Into<String>) -> Self {
        Self::Component {
            agency: None,
            component: component.into(),
        }
    }

    /// Routes to a node of `agency` hosting `component`.
    pub fn component_in(agency: impl Into<String>, component: impl Into<String>) -> Self {
        Self::Component {
            agency: Some(agency.into()),
            component: component.into(),
        }
    }

    /// Routes to the nodes of `agency` that registered `topic`.
    pub fn topic(agency: impl Into<String>, topic: impl Into<String>) -> Self {
        Self::Topic {
            agency: agency.into(),
            topic: topic.into(),
        }
    }

    /// Returns the addressing mode of this intent.
    #[must_use]
    pub const fn route_type(&self) -> RouteType {
        match self {
            Self::Node(_) => RouteType::NodeId,
            Self::Agency(_) => RouteType::Agency,
            Self::Component { .. } => RouteType::Component,
            Self::Topic { .. } => RouteType::Topic,
        }
    }
}
