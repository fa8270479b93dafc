//! `toad-device` is the device side of a CoAP conversation with a gateway.
//!
//! A constrained device (sensor box, actuator controller) uses it to:
//! - push telemetry with POST / PUT
//! - fetch actuator commands with GET
//! - observe resources so the gateway can push commands as they happen
//! - discover what the gateway serves (`.well-known/core`)
//!
//! Payloads are the JSON records in [`toad_device_data`]; decoded commands
//! are handed to a [`DataMessageListener`](listener::DataMessageListener)
//! that the [`Client`](client::Client) holds weakly.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use toad_device::client::Client;
//! use toad_device::config::Config;
//! use toad_device::listener::DataMessageListener;
//! use toad_device::resource::ResourceName;
//! use toad_device_data::{ActuatorData, SensorData};
//!
//! struct Printer;
//!
//! impl DataMessageListener for Printer {
//!   fn handle_sensor_message(&self, data: &SensorData) {
//!     println!("sensor: {:?}", data);
//!   }
//!
//!   fn handle_actuator_command_message(&self, data: &ActuatorData) {
//!     println!("command: {:?}", data);
//!   }
//! }
//!
//! let client = Client::new_std(Config::default());
//! let printer = Arc::new(Printer);
//! client.set_data_message_listener(&printer);
//!
//! client.start_observer(Some(ResourceName::CdaActuatorCmd), None, client.config().ttl);
//! ```
//!
//! ## Failure
//! Nothing here panics or tears down the hosting process. Operations
//! return a `Result` or `bool` and log a line describing what went wrong;
//! payloads that fail to decode are logged and dropped.

// -
// style
#![allow(clippy::unused_unit)]
// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]

#[cfg(test)]
pub(crate) mod test;

pub(crate) mod logging;

/// The protocol client
pub mod client;

/// Client configuration
pub mod config;

/// Errors
pub mod error;

/// Sending requests and handling their responses
pub mod exchange;

/// Where decoded records go
pub mod listener;

/// Wire messages
pub mod msg;

/// Network primitives
pub mod net;

/// Observations of gateway resources
pub mod observe;

/// Gateway resources & paths to them
pub mod resource;

/// Time utilities
pub mod time;

/// The seam between the client and the network
pub mod transport;

/// [`Transport`](transport::Transport) over UDP
pub mod udp;

#[doc(inline)]
pub use client::Client;
#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use listener::DataMessageListener;
