use serde::{Deserialize, Serialize};

use crate::base::BaseIotData;
use crate::codec::Record;

/// A single sensor reading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SensorData {
  /// Fields common to all records
  #[serde(flatten)]
  pub base: BaseIotData,
  /// The reading
  pub value: f32,
}

impl SensorData {
  /// Create an empty reading for the named sensor
  pub fn new(name: impl Into<String>, type_id: i32) -> Self {
    Self { base: BaseIotData::new(name, type_id),
           value: 0.0 }
  }
}

impl Record for SensorData {
  const KIND: &'static str = "SensorData";

  fn non_finite_field(&self) -> Option<&'static str> {
    self.base
        .non_finite_field()
        .or_else(|| Some("value").filter(|_| !self.value.is_finite()))
  }
}
