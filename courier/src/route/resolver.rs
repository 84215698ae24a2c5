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

use tracing::trace;

use super::{RouteDescriptor, RouteIntent, RouteType};
use crate::message::FrontError;

/// Resolves `intent` and `topic` into the descriptor consumed by one send.
///
/// Only the fields required by the intent's variant are set; everything else
/// stays empty. For [`RouteIntent::Topic`] the routing topic comes from the
/// intent, and `topic` must be blank or equal to it.
///
/// # Errors
///
/// Returns [`FrontError::InvalidAddress`] when a required field is empty or
/// blank: an empty node id, a blank agency, component or topic.
pub fn resolve(intent: &RouteIntent, topic: &str) -> Result<RouteDescriptor, FrontError> {
    let descriptor = match intent {
        RouteIntent::Node(node_id) => {
            if node_id.is_empty() {
                return Err(FrontError::InvalidAddress("node id is empty".into()));
            }
            RouteDescriptor::new(
                RouteType::NodeId,
                topic.to_owned(),
                Some(node_id.clone()),
                None,
                None,
            )
        }
        RouteIntent::Agency(agency) => {
            let agency = required("agency", agency)?;
            RouteDescriptor::new(RouteType::Agency, topic.to_owned(), None, Some(agency), None)
        }
        RouteIntent::Component { agency, component } => {
            let component = required("component", component)?;
            // A blank agency means "no restriction", not a malformed route.
            let agency = agency
                .as_deref()
                .filter(|agency| !agency.trim().is_empty())
                .map(str::to_owned);
            RouteDescriptor::new(
                RouteType::Component,
                topic.to_owned(),
                None,
                agency,
                Some(component),
            )
        }
        RouteIntent::Topic {
            agency,
            topic: route_topic,
        } => {
            let agency = required("agency", agency)?;
            let route_topic = required("topic", route_topic)?;
            if !topic.trim().is_empty() && topic != route_topic {
                return Err(FrontError::InvalidAddress(format!(
                    "topic '{topic}' conflicts with routed topic '{route_topic}'"
                )));
            }
            RouteDescriptor::new(RouteType::Topic, route_topic, None, Some(agency), None)
        }
    };
    trace!(route = %descriptor.target(), "Resolved route");
    Ok(descriptor)
}

fn required(field: &str, value: &str) -> Result<String, FrontError> {
    if value.trim().is_empty() {
        Err(FrontError::InvalidAddress(format!("{field} is blank")))
    } else {
        Ok(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn test_node_sets_only_node() {
        let descriptor = resolve(&RouteIntent::node("n1"), "t").unwrap();
        assert_eq!(descriptor.route_type(), RouteType::NodeId);
        assert_eq!(descriptor.dst_node(), Some(&b"n1"[..]));
        assert_eq!(descriptor.topic(), "t");
        assert!(descriptor.dst_inst().is_none());
        assert!(descriptor.dst_component().is_none());
    }

    #[test]
    fn test_agency_sets_only_agency() {
        let descriptor = resolve(&RouteIntent::agency("a1"), "").unwrap();
        assert_eq!(descriptor.route_type(), RouteType::Agency);
        assert_eq!(descriptor.dst_inst(), Some("a1"));
        assert!(descriptor.dst_node().is_none());
        assert!(descriptor.dst_component().is_none());
    }

    #[test]
    fn test_component_keeps_both_fields() {
        let descriptor = resolve(&RouteIntent::component_in("a1", "c1"), "t").unwrap();
        assert_eq!(descriptor.dst_inst(), Some("a1"));
        assert_eq!(descriptor.dst_component(), Some("c1"));

        let unscoped = resolve(&RouteIntent::component("c1"), "t").unwrap();
        assert!(unscoped.dst_inst().is_none());
        assert_eq!(unscoped.dst_component(), Some("c1"));
    }

    #[test]
    fn test_topic_uses_routed_topic() {
        let descriptor = resolve(&RouteIntent::topic("a1", "orders"), "").unwrap();
        assert_eq!(descriptor.route_type(), RouteType::Topic);
        assert_eq!(descriptor.topic(), "orders");
        assert_eq!(descriptor.dst_inst(), Some("a1"));

        assert!(resolve(&RouteIntent::topic("a1", "orders"), "orders").is_ok());
        assert!(matches!(
            resolve(&RouteIntent::topic("a1", "orders"), "billing"),
            Err(FrontError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        let cases = [
            RouteIntent::Node(Bytes::new()),
            RouteIntent::agency(" "),
            RouteIntent::topic("", "t"),
            RouteIntent::topic("a", "  "),
            RouteIntent::component(""),
            RouteIntent::component_in("a1", "\t"),
        ];
        for intent in &cases {
            assert!(
                matches!(resolve(intent, "t"), Err(FrontError::InvalidAddress(_))),
                "{intent:?} should be rejected"
            );
        }
    }
}
