use core::fmt;

use crate::error::PathError;

/// Separator between path segments
pub const SEPARATOR: char = '/';

/// Path the gateway serves its resource directory on
pub const DISCOVERY: &str = ".well-known/core";

/// Resource-type segment identifying actuator commands
pub const ACTUATOR_CMD: &str = "ActuatorCmd";

/// Index of the resource-type segment in a `PRODUCT/DEVICE/TYPE` path
pub const TYPE_SEGMENT: usize = 2;

/// Well-known resources on the gateway.
///
/// This table is shared with the gateway; both ends
/// must agree on every path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceName {
  /// Device management status updates
  CdaMgmtStatusMsg,
  /// Management commands sent to the device
  CdaMgmtStatusCmd,
  /// Actuator commands sent to the device
  CdaActuatorCmd,
  /// Device responses to actuator commands
  CdaActuatorResponse,
  /// Device sensor readings
  CdaSensorMsg,
  /// Device resource utilization
  CdaSystemPerfMsg,
  /// Gateway management status updates
  GdaMgmtStatusMsg,
  /// Management commands sent to the gateway
  GdaMgmtStatusCmd,
}

impl ResourceName {
  /// Every known resource
  pub const ALL: [ResourceName; 8] = [Self::CdaMgmtStatusMsg,
                                      Self::CdaMgmtStatusCmd,
                                      Self::CdaActuatorCmd,
                                      Self::CdaActuatorResponse,
                                      Self::CdaSensorMsg,
                                      Self::CdaSystemPerfMsg,
                                      Self::GdaMgmtStatusMsg,
                                      Self::GdaMgmtStatusCmd];

  /// The fixed path of this resource
  ///
  /// ```
  /// use toad_device::resource::ResourceName;
  ///
  /// assert_eq!(ResourceName::CdaActuatorCmd.path(),
  ///            "PIOT/ConstrainedDevice/ActuatorCmd");
  /// ```
  pub const fn path(&self) -> &'static str {
    use ResourceName::*;

    match self {
      | CdaMgmtStatusMsg => "PIOT/ConstrainedDevice/MgmtStatusMsg",
      | CdaMgmtStatusCmd => "PIOT/ConstrainedDevice/MgmtStatusCmd",
      | CdaActuatorCmd => "PIOT/ConstrainedDevice/ActuatorCmd",
      | CdaActuatorResponse => "PIOT/ConstrainedDevice/ActuatorResponse",
      | CdaSensorMsg => "PIOT/ConstrainedDevice/SensorMsg",
      | CdaSystemPerfMsg => "PIOT/ConstrainedDevice/SystemPerfMsg",
      | GdaMgmtStatusMsg => "PIOT/GatewayDevice/MgmtStatusMsg",
      | GdaMgmtStatusCmd => "PIOT/GatewayDevice/MgmtStatusCmd",
    }
  }

  /// Find the resource with this exact path
  pub fn from_path(path: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|r| r.path() == path)
  }
}

impl fmt::Display for ResourceName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.path())
  }
}

/// Path to a resource on the gateway, relative to the gateway's root.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourcePath(String);

impl ResourcePath {
  /// Join a well-known resource and a free-text name into a path.
  ///
  /// The name is used verbatim; an empty name is treated as absent.
  ///
  /// ```
  /// use toad_device::error::PathError;
  /// use toad_device::resource::{ResourceName, ResourcePath};
  ///
  /// let both = ResourcePath::build(Some(ResourceName::CdaSensorMsg), Some("temp")).unwrap();
  /// assert_eq!(both.as_str(), "PIOT/ConstrainedDevice/SensorMsg/temp");
  ///
  /// let name = ResourcePath::build(None, Some("anything/goes")).unwrap();
  /// assert_eq!(name.as_str(), "anything/goes");
  ///
  /// assert_eq!(ResourcePath::build(None, None), Err(PathError::Empty));
  /// ```
  pub fn build(resource: Option<ResourceName>, name: Option<&str>) -> Result<Self, PathError> {
    let name = name.filter(|n| !n.is_empty());

    match (resource, name) {
      | (None, None) => Err(PathError::Empty),
      | (Some(r), None) => Ok(Self(r.path().into())),
      | (None, Some(n)) => Ok(Self(n.into())),
      | (Some(r), Some(n)) => Ok(Self(format!("{}{}{}", r.path(), SEPARATOR, n))),
    }
  }

  /// Path of the gateway's resource directory
  pub fn discovery() -> Self {
    Self(DISCOVERY.into())
  }

  #[allow(missing_docs)]
  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// Iterate over the `/`-separated segments of this path
  pub fn segments(&self) -> impl Iterator<Item = &str> {
    self.0.split(SEPARATOR)
  }

  /// Does this path address actuator commands?
  ///
  /// ```
  /// use toad_device::resource::{ResourceName, ResourcePath};
  ///
  /// let cmd = ResourcePath::build(Some(ResourceName::CdaActuatorCmd), None).unwrap();
  /// let msg = ResourcePath::build(Some(ResourceName::CdaSensorMsg), None).unwrap();
  ///
  /// assert!(cmd.is_actuator_cmd());
  /// assert!(!msg.is_actuator_cmd());
  /// ```
  pub fn is_actuator_cmd(&self) -> bool {
    self.segments().nth(TYPE_SEGMENT) == Some(ACTUATOR_CMD)
  }
}

impl fmt::Display for ResourcePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl AsRef<str> for ResourcePath {
  fn as_ref(&self) -> &str {
    &self.0
  }
}
