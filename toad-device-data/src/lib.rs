//! Records exchanged between a constrained device and its gateway,
//! plus the JSON codec used to put them on the wire.
//!
//! ```
//! use toad_device_data::{codec, ActuatorData};
//!
//! let mut cmd = ActuatorData::default();
//! cmd.command = 1;
//! cmd.value = 21.5;
//! cmd.state_data = "hvac on".into();
//!
//! let json = codec::encode(&cmd).unwrap();
//! assert_eq!(codec::decode::<ActuatorData>(&json).unwrap(), cmd);
//! ```

// -
// deny
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(not(test), deny(unsafe_code))]
// -
// warnings
#![cfg_attr(not(test), warn(unreachable_pub))]

/// Fields shared by every record
pub mod base;

/// Actuator commands & responses
pub mod actuator;

/// Sensor readings
pub mod sensor;

/// Device resource utilization
pub mod system_perf;

/// JSON encoding & decoding
pub mod codec;

#[doc(inline)]
pub use actuator::ActuatorData;
#[doc(inline)]
pub use base::BaseIotData;
#[doc(inline)]
pub use codec::{DecodeError, EncodeError, Record};
#[doc(inline)]
pub use sensor::SensorData;
#[doc(inline)]
pub use system_perf::SystemPerformanceData;
