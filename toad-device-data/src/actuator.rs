use serde::{Deserialize, Serialize};

use crate::base::BaseIotData;
use crate::codec::Record;

/// Command: turn the actuator off
pub const COMMAND_OFF: i32 = 0;

/// Command: turn the actuator on
pub const COMMAND_ON: i32 = 1;

/// An actuator command sent by the gateway,
/// or a device's response to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ActuatorData {
  /// Fields common to all records
  #[serde(flatten)]
  pub base: BaseIotData,
  /// What the actuator should do (see [`COMMAND_ON`], [`COMMAND_OFF`])
  pub command: i32,
  /// Target value, e.g. a thermostat setpoint
  pub value: f32,
  /// Free-form state (e.g. an LED message)
  pub state_data: String,
  /// Whether this is a device's response to a command
  pub is_response: bool,
}

impl Default for ActuatorData {
  fn default() -> Self {
    Self { base: BaseIotData::default(),
           command: COMMAND_OFF,
           value: 0.0,
           state_data: String::new(),
           is_response: false }
  }
}

impl ActuatorData {
  /// Create a command for the named actuator
  pub fn new(name: impl Into<String>, type_id: i32) -> Self {
    Self { base: BaseIotData::new(name, type_id),
           ..Default::default() }
  }

  /// Create the response a device sends after handling this command
  ///
  /// ```
  /// use toad_device_data::actuator::{ActuatorData, COMMAND_ON};
  ///
  /// let mut cmd = ActuatorData::new("hvac", 3);
  /// cmd.command = COMMAND_ON;
  ///
  /// let rep = cmd.response();
  /// assert!(rep.is_response);
  /// assert_eq!(rep.command, COMMAND_ON);
  /// ```
  pub fn response(&self) -> Self {
    Self { is_response: true,
           ..self.clone() }
  }
}

impl Record for ActuatorData {
  const KIND: &'static str = "ActuatorData";

  fn non_finite_field(&self) -> Option<&'static str> {
    self.base
        .non_finite_field()
        .or_else(|| Some("value").filter(|_| !self.value.is_finite()))
  }
}
