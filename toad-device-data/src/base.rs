use serde::{Deserialize, Serialize};

/// Identifies the device location when none has been configured
pub const NOT_SET: &str = "Not Set";

/// Default `typeID` for records that don't specify one
pub const DEFAULT_TYPE_ID: i32 = 0;

/// Default `statusCode`
pub const DEFAULT_STATUS: i32 = 0;

/// Fields carried by every record the device sends or receives.
///
/// Key names match the gateway's JSON representation, which
/// is why `typeID` & `locationID` break the camelCase pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BaseIotData {
  /// Human-readable name of the thing that produced this record
  pub name: String,
  /// Numeric type of the sensor / actuator
  #[serde(rename = "typeID")]
  pub type_id: i32,
  /// When the record was created, as formatted by the producer
  pub time_stamp: String,
  /// Application-specific status code
  pub status_code: i32,
  /// Whether the producer flagged this record as erroneous
  pub has_error: bool,
  /// Which device / site produced this record
  #[serde(rename = "locationID")]
  pub location_id: String,
  #[allow(missing_docs)]
  pub latitude: f32,
  #[allow(missing_docs)]
  pub longitude: f32,
  #[allow(missing_docs)]
  pub elevation: f32,
}

impl Default for BaseIotData {
  fn default() -> Self {
    Self { name: NOT_SET.into(),
           type_id: DEFAULT_TYPE_ID,
           time_stamp: String::new(),
           status_code: DEFAULT_STATUS,
           has_error: false,
           location_id: NOT_SET.into(),
           latitude: 0.0,
           longitude: 0.0,
           elevation: 0.0 }
  }
}

impl BaseIotData {
  /// Create a record base with a name & type
  pub fn new(name: impl Into<String>, type_id: i32) -> Self {
    Self { name: name.into(),
           type_id,
           ..Default::default() }
  }

  /// Set `hasError` and the status code in one go
  pub fn set_status(&mut self, status_code: i32, has_error: bool) {
    self.status_code = status_code;
    self.has_error = has_error;
  }

  /// Name of the first non-finite float field, if any
  pub(crate) fn non_finite_field(&self) -> Option<&'static str> {
    [("latitude", self.latitude),
     ("longitude", self.longitude),
     ("elevation", self.elevation)].into_iter()
                                   .find(|(_, f)| !f.is_finite())
                                   .map(|(name, _)| name)
  }
}
