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

//! Defines the message value object and the error type shared by every
//! public operation.
//!
//! # Key Components
//!
//! *   [`Message`]: topic, sequence number, payload and correlation data of one
//!     transfer. Immutable once handed to the transport.
//! *   [`FrontError`]: the five failure kinds surfaced to callers.

pub use envelope::Message;
pub use front_error::FrontError;

/// Defines [`Message`].
mod envelope;
/// Defines [`FrontError`].
mod front_error;
