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

//! Route intents and their resolution into routing descriptors.
//!
//! A caller states *how* a message should be addressed with a [`RouteIntent`].
//! [`resolve`] validates the intent and produces the [`RouteDescriptor`] the
//! transport consumes. Resolution is pure: it touches no shared state.

pub use descriptor::RouteDescriptor;
pub use intent::{RouteIntent, RouteType};
pub use policy::ComponentRoutePolicy;
pub use resolver::resolve;

/// Defines [`RouteDescriptor`].
mod descriptor;
/// Defines [`RouteIntent`] and [`RouteType`].
mod intent;
/// Defines [`ComponentRoutePolicy`].
mod policy;
/// Defines [`resolve`].
mod resolver;
