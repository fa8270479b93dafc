use std::sync::{Arc, Weak};

use toad_device_data::{ActuatorData, SensorData};
use toad_stem::Stem;

/// Receives records decoded from gateway traffic.
///
/// Invoked on the transport's thread, so implementations
/// should hand work off rather than block.
///
/// In particular, never call a blocking request such as
/// [`Client::send_get_request`](crate::Client::send_get_request) from inside
/// a handler: its response is delivered by the very thread running the
/// handler, so the call deadlocks the receiver and every later exchange hangs.
/// Send from another thread, or use a fire-and-forget verb.
pub trait DataMessageListener: Send + Sync {
  /// A sensor reading arrived
  fn handle_sensor_message(&self, data: &SensorData);

  /// An actuator command arrived
  fn handle_actuator_command_message(&self, data: &ActuatorData);
}

/// Non-owning reference to the registered [`DataMessageListener`].
///
/// Holding a listener here never keeps it alive; once every `Arc`
/// to it is dropped, records are logged and discarded.
#[derive(Debug, Default)]
pub struct ListenerSlot(Stem<Option<Weak<dyn DataMessageListener>>>);

impl ListenerSlot {
  /// Create an empty slot
  pub fn new() -> Self {
    Self::default()
  }

  /// Replace the registered listener
  pub fn set<L: DataMessageListener + 'static>(&self, listener: &Arc<L>) {
    let weak = Arc::downgrade(listener);
    let weak: Weak<dyn DataMessageListener> = weak;
    self.0.map_mut(|slot| *slot = Some(weak.clone()));
  }

  /// Forget the registered listener
  pub fn clear(&self) {
    self.0.map_mut(|slot| *slot = None);
  }

  /// Get the listener, if one is registered and still alive
  pub fn get(&self) -> Option<Arc<dyn DataMessageListener>> {
    self.0.map_ref(|slot| slot.as_ref().and_then(Weak::upgrade))
  }

  /// Hand an actuator command to the listener
  pub fn actuator_command(&self, data: &ActuatorData) {
    match self.get() {
      | Some(l) => l.handle_actuator_command_message(data),
      | None => log::warn!("no listener registered; dropping actuator command {:?}", data),
    }
  }

  /// Hand a sensor reading to the listener
  pub fn sensor_message(&self, data: &SensorData) {
    match self.get() {
      | Some(l) => l.handle_sensor_message(data),
      | None => log::warn!("no listener registered; dropping sensor message {:?}", data),
    }
  }
}
