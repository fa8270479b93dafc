use serde::{Deserialize, Serialize};

use crate::base::BaseIotData;
use crate::codec::Record;

/// Resource utilization of the device, in percent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemPerformanceData {
  /// Fields common to all records
  #[serde(flatten)]
  pub base: BaseIotData,
  #[allow(missing_docs)]
  pub cpu_util: f32,
  #[allow(missing_docs)]
  pub mem_util: f32,
  #[allow(missing_docs)]
  pub disk_util: f32,
}

impl Record for SystemPerformanceData {
  const KIND: &'static str = "SystemPerformanceData";

  fn non_finite_field(&self) -> Option<&'static str> {
    self.base.non_finite_field().or_else(|| {
                                  [("cpuUtil", self.cpu_util),
                                   ("memUtil", self.mem_util),
                                   ("diskUtil", self.disk_util)].into_iter()
                                                                .find(|(_, f)| !f.is_finite())
                                                                .map(|(name, _)| name)
                                })
  }
}
