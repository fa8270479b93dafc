/// A duration, in milliseconds
pub type Millis = embedded_time::duration::Milliseconds<u64>;

/// Timeout configuration allowing for "never time out" as an option
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub enum Timeout {
  /// Timeout after some number of milliseconds has elapsed
  Millis(u64),
  /// Never time out
  Never,
}

impl Timeout {
  /// Timeout after some number of seconds
  pub const fn secs(n: u64) -> Self {
    Self::Millis(n * 1000)
  }

  /// Convert to a [`std::time::Duration`], `None` meaning "wait forever"
  ///
  /// ```
  /// use std::time::Duration;
  ///
  /// use toad_device::time::Timeout;
  ///
  /// assert_eq!(Timeout::secs(2).duration(), Some(Duration::from_secs(2)));
  /// assert_eq!(Timeout::Never.duration(), None);
  /// ```
  pub fn duration(&self) -> Option<std::time::Duration> {
    match self {
      | Self::Millis(ms) => Some(std::time::Duration::from_millis(*ms)),
      | Self::Never => None,
    }
  }

  /// The instant at which something started `now` will have timed out
  pub fn deadline(&self, now: std::time::Instant) -> Option<std::time::Instant> {
    self.duration().map(|d| now + d)
  }
}

impl From<Millis> for Timeout {
  fn from(ms: Millis) -> Self {
    Self::Millis(ms.0)
  }
}
