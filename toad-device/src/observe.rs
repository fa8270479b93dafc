use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use toad_device_data::{codec, ActuatorData, SensorData};
use toad_stem::Stem;

use crate::error::ObserveError;
use crate::listener::ListenerSlot;
use crate::resource::{ResourceName, ResourcePath};
use crate::time::{Millis, Timeout};
use crate::transport::{OnNotification, Request, Response, Transport};

/// Where an observation is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationState {
  /// The registration is being sent.
  ///
  /// `stop` holds the timeout of a [`Registry::stop`] that arrived
  /// in the meantime; the observation is cancelled as soon as the
  /// registration goes out.
  Starting {
    /// Timeout for the deferred stop
    stop: Option<Timeout>,
  },
  /// Registered; notifications are delivered
  Active,
  /// Cancellation is in flight
  Stopping,
}

/// One observation
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationEntry {
  /// The observed path
  pub path: ResourcePath,
  /// The well-known resource the path was built from, if any
  pub resource: Option<ResourceName>,
  /// The most recent notification; used to cancel the observation
  pub handle: Option<Response>,
  /// When the observation was started
  pub created: Instant,
  /// How long the observation was requested to live
  pub ttl: Millis,
  /// See [`ObservationState`]
  pub state: ObservationState,
}

impl ObservationEntry {
  fn new(path: ResourcePath, resource: Option<ResourceName>, ttl: Millis) -> Self {
    Self { path,
           resource,
           handle: None,
           created: Instant::now(),
           ttl,
           state: ObservationState::Starting { stop: None } }
  }

  /// Has this outlived its TTL?
  pub fn is_expired(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.created) >= Duration::from_millis(self.ttl.0)
  }

  /// Should notifications still reach the listener?
  pub fn is_delivering(&self) -> bool {
    matches!(self.state,
             ObservationState::Active | ObservationState::Starting { stop: None })
  }
}

enum StopPlan {
  Missing,
  Deferred,
  InFlight,
  Cancel(Option<Response>),
}

/// The observations a client has started, at most one per path.
///
/// Cloning yields another handle to the same registry.
/// Entries leave only through [`Registry::stop`] or a failed [`Registry::start`];
/// TTLs are recorded but not enforced (see [`Registry::expired`]).
#[derive(Debug, Default, Clone)]
pub struct Registry {
  entries: Arc<Stem<HashMap<ResourcePath, ObservationEntry>>>,
}

impl Registry {
  /// Create an empty registry
  pub fn new() -> Self {
    Self::default()
  }

  /// Start observing `path`.
  ///
  /// Every notification replaces the entry's handle, is decoded and handed
  /// to `listener` as an [`ActuatorData`] command.
  ///
  /// As an extension, observations whose `resource` is
  /// [`ResourceName::CdaSensorMsg`] decode their notifications as
  /// [`SensorData`] and hand them to the listener's sensor handler instead.
  /// Every other notification is treated as an actuator command.
  ///
  /// Notifications that don't decode are logged and dropped; the observation stays active.
  ///
  /// If [`Registry::stop`] is called for `path` while the registration is
  /// still being sent, the observation is cancelled right after it goes out
  /// and the entry is removed.
  pub fn start<T: Transport>(&self,
                             transport: &T,
                             listener: &Arc<ListenerSlot>,
                             path: ResourcePath,
                             resource: Option<ResourceName>,
                             ttl: Millis)
                             -> Result<(), ObserveError> {
    let mut entry = Some(ObservationEntry::new(path.clone(), resource, ttl));
    let reserved = self.entries.map_mut(|entries| {
                                 if entries.contains_key(&path) {
                                   return false;
                                 }

                                 if let Some(entry) = entry.take() {
                                   entries.insert(path.clone(), entry);
                                 }
                                 true
                               });

    if !reserved {
      log::warn!("already observing {}; ignoring", path);
      return Err(ObserveError::AlreadyActive(path));
    }

    let notify = self.on_notification(path.clone(), resource, listener.clone());
    if let Err(e) = transport.observe(Request::observe(path.clone()), notify) {
      self.entries.map_mut(|entries| entries.remove(&path));
      log::error!("failed to observe {}: {}", path, e);
      return Err(e.into());
    }

    let pending_stop = self.entries.map_mut(|entries| match entries.get_mut(&path) {
                                     | Some(entry) => match entry.state {
                                       | ObservationState::Starting { stop: Some(timeout) } => {
                                         entry.state = ObservationState::Stopping;
                                         Some((timeout, entry.handle.clone()))
                                       },
                                       | _ => {
                                         entry.state = ObservationState::Active;
                                         None
                                       },
                                     },
                                     | None => None,
                                   });

    match pending_stop {
      | None => {
        log::info!("observing {}", path);
        Ok(())
      },
      | Some((timeout, handle)) => {
        log::info!("observing {}; stop was requested meanwhile, cancelling", path);
        self.cancel(transport, &path, handle, timeout)
      },
    }
  }

  /// Stop observing `path`.
  ///
  /// The last notification received is rejected so the gateway stops sending;
  /// if none has arrived yet, cancellation is attempted without one.
  /// The entry is kept if the transport fails to cancel.
  ///
  /// If the registration for `path` is still being sent, the stop is recorded
  /// and carried out by [`Registry::start`] once the registration is out.
  /// `Ok(())` is returned right away in that case.
  pub fn stop<T: Transport>(&self,
                            transport: &T,
                            path: &ResourcePath,
                            timeout: Timeout)
                            -> Result<(), ObserveError> {
    let plan = self.entries.map_mut(|entries| match entries.get_mut(path) {
                             | None => StopPlan::Missing,
                             | Some(entry) => match entry.state {
                               | ObservationState::Starting { .. } => {
                                 entry.state = ObservationState::Starting { stop: Some(timeout) };
                                 StopPlan::Deferred
                               },
                               | ObservationState::Stopping => StopPlan::InFlight,
                               | ObservationState::Active => {
                                 entry.state = ObservationState::Stopping;
                                 StopPlan::Cancel(entry.handle.clone())
                               },
                             },
                           });

    match plan {
      | StopPlan::Missing => {
        log::warn!("not observing {}; ignoring", path);
        Err(ObserveError::NotActive(path.clone()))
      },
      | StopPlan::InFlight => {
        log::warn!("already stopping {}; ignoring", path);
        Err(ObserveError::NotActive(path.clone()))
      },
      | StopPlan::Deferred => {
        log::info!("{} is still registering; it will be stopped once registered", path);
        Ok(())
      },
      | StopPlan::Cancel(handle) => {
        if handle.is_none() {
          log::warn!("no notification from {} yet; cancelling without one", path);
        }
        self.cancel(transport, path, handle, timeout)
      },
    }
  }

  /// Cancel an entry that is [`ObservationState::Stopping`]
  fn cancel<T: Transport>(&self,
                          transport: &T,
                          path: &ResourcePath,
                          handle: Option<Response>,
                          timeout: Timeout)
                          -> Result<(), ObserveError> {
    match transport.cancel_observing(path, handle.as_ref(), true, timeout) {
      | Ok(()) => {
        self.entries.map_mut(|entries| entries.remove(path));
        log::info!("stopped observing {}", path);
        Ok(())
      },
      | Err(e) => {
        self.entries.map_mut(|entries| {
                      if let Some(entry) = entries.get_mut(path) {
                        entry.state = ObservationState::Active;
                      }
                    });
        log::error!("failed to stop observing {}: {}", path, e);
        Err(e.into())
      },
    }
  }

  fn on_notification(&self,
                     path: ResourcePath,
                     resource: Option<ResourceName>,
                     listener: Arc<ListenerSlot>)
                     -> OnNotification {
    let entries = self.entries.clone();

    Box::new(move |resp: Response| {
      let delivering = entries.map_mut(|entries| match entries.get_mut(&path) {
                                | Some(entry) => {
                                  entry.handle = Some(resp.clone());
                                  entry.is_delivering()
                                },
                                | None => false,
                              });

      if !delivering {
        log::debug!("dropping notification for {}; no longer observed", path);
        return;
      }

      let payload = resp.payload_string();
      let decoded = match resource {
        | Some(ResourceName::CdaSensorMsg) => {
          codec::decode::<SensorData>(&payload).map(|data| listener.sensor_message(&data))
        },
        | _ => codec::decode::<ActuatorData>(&payload).map(|cmd| listener.actuator_command(&cmd)),
      };

      if let Err(e) = decoded {
        log::warn!("failed to decode notification from {}: {}", path, e);
      }
    })
  }

  /// Is `path` being observed?
  pub fn is_observing(&self, path: &ResourcePath) -> bool {
    self.entries.map_ref(|entries| entries.contains_key(path))
  }

  /// Get a copy of the entry for `path`
  pub fn get(&self, path: &ResourcePath) -> Option<ObservationEntry> {
    self.entries.map_ref(|entries| entries.get(path).cloned())
  }

  /// Number of active observations
  pub fn len(&self) -> usize {
    self.entries.map_ref(|entries| entries.len())
  }

  #[allow(missing_docs)]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Observed paths, sorted
  pub fn paths(&self) -> Vec<ResourcePath> {
    let mut paths = self.entries
                        .map_ref(|entries| entries.keys().cloned().collect::<Vec<_>>());
    paths.sort();
    paths
  }

  /// Observed paths whose TTL has elapsed at `now`, sorted.
  ///
  /// Nothing is stopped automatically; it's up to the caller
  /// to [`stop`](Registry::stop) these if they should end.
  pub fn expired(&self, now: Instant) -> Vec<ResourcePath> {
    let mut paths = self.entries.map_ref(|entries| {
                                  entries.values()
                                         .filter(|e| e.is_expired(now))
                                         .map(|e| e.path.clone())
                                         .collect::<Vec<_>>()
                                });
    paths.sort();
    paths
  }
}

#[cfg(test)]
mod test {
  use embedded_time::duration::Milliseconds;
  use toad_device_data::actuator::COMMAND_ON;

  use super::*;
  use crate::error::TransportError;
  use crate::msg::observe;
  use crate::test::{init_logging, ListenerMock, TransportMock};

  struct Setup {
    registry: Registry,
    transport: TransportMock,
    slot: Arc<ListenerSlot>,
    listener: Arc<ListenerMock>,
  }

  fn setup() -> Setup {
    init_logging();
    let slot = Arc::new(ListenerSlot::new());
    let listener = Arc::new(ListenerMock::default());
    slot.set(&listener);

    Setup { registry: Registry::new(),
            transport: TransportMock::default(),
            slot,
            listener }
  }

  fn path() -> ResourcePath {
    ResourcePath::build(Some(ResourceName::CdaActuatorCmd), None).unwrap()
  }

  fn ttl() -> Millis {
    Milliseconds(60_000)
  }

  fn start(s: &Setup) -> Result<(), ObserveError> {
    s.registry.start(&s.transport,
                     &s.slot,
                     path(),
                     Some(ResourceName::CdaActuatorCmd),
                     ttl())
  }

  fn notification(payload: &str) -> Response {
    Response { observe: Some(3),
               payload: payload.as_bytes().to_vec(),
               ..Default::default() }
  }

  #[test]
  fn double_start_registers_once() {
    let s = setup();

    assert_eq!(start(&s), Ok(()));
    assert_eq!(start(&s), Err(ObserveError::AlreadyActive(path())));

    assert_eq!(s.registry.len(), 1);
    assert_eq!(s.transport.observed().len(), 1);
    assert_eq!(s.transport.observed()[0].observe, Some(observe::REGISTER));
  }

  #[test]
  fn stop_unobserved_is_noop() {
    let s = setup();
    start(&s).unwrap();

    let other = ResourcePath::build(Some(ResourceName::CdaSensorMsg), None).unwrap();
    assert_eq!(s.registry.stop(&s.transport, &other, Timeout::secs(1)),
               Err(ObserveError::NotActive(other)));
    assert_eq!(s.registry.len(), 1);
    assert!(s.transport.canceled().is_empty());
  }

  #[test]
  fn stop_then_start_reregisters() {
    let s = setup();
    start(&s).unwrap();
    s.registry
     .stop(&s.transport, &path(), Timeout::secs(1))
     .unwrap();

    assert!(s.registry.is_empty());

    start(&s).unwrap();
    assert_eq!(s.registry.len(), 1);
    assert_eq!(s.transport.observed().len(), 2);
  }

  #[test]
  fn notifications_reach_listener_and_update_handle() {
    let s = setup();
    start(&s).unwrap();

    let mut cmd = ActuatorData::new("led", 7);
    cmd.command = COMMAND_ON;
    cmd.state_data = "blink".into();
    let n = notification(&codec::encode(&cmd).unwrap());

    s.transport.notify(&path(), n.clone());

    assert_eq!(s.listener.actuator_commands(), vec![cmd]);
    assert_eq!(s.registry.get(&path()).and_then(|e| e.handle), Some(n.clone()));

    s.registry
     .stop(&s.transport, &path(), Timeout::secs(1))
     .unwrap();
    let canceled = s.transport.canceled();
    assert_eq!(canceled[0].handle, Some(n));
    assert!(canceled[0].send_rst);
  }

  #[test]
  fn sensor_notifications_reach_sensor_handler() {
    let s = setup();
    let sensor = ResourcePath::build(Some(ResourceName::CdaSensorMsg), Some("temp")).unwrap();
    s.registry
     .start(&s.transport,
            &s.slot,
            sensor.clone(),
            Some(ResourceName::CdaSensorMsg),
            ttl())
     .unwrap();

    let mut reading = SensorData::new("temp", 1);
    reading.value = 19.25;
    s.transport
     .notify(&sensor, notification(&codec::encode(&reading).unwrap()));

    assert_eq!(s.listener.sensor_messages(), vec![reading]);
    assert!(s.listener.actuator_commands().is_empty());
  }

  #[test]
  fn undecodable_notification_keeps_subscription() {
    let s = setup();
    start(&s).unwrap();

    s.transport.notify(&path(), notification("{{{{"));

    assert!(s.registry.is_observing(&path()));
    assert_eq!(s.registry.len(), 1);
    assert!(s.listener.actuator_commands().is_empty());
  }

  #[test]
  fn stop_without_notification_still_cancels() {
    let s = setup();
    start(&s).unwrap();

    s.registry
     .stop(&s.transport, &path(), Timeout::secs(1))
     .unwrap();

    assert_eq!(s.transport.canceled()[0].handle, None);
    assert!(s.registry.is_empty());
  }

  #[test]
  fn failed_registration_leaves_no_entry() {
    let s = setup();
    s.transport.fail_with(TransportError::Closed);

    assert_eq!(start(&s),
               Err(ObserveError::Transport(TransportError::Closed)));
    assert!(s.registry.is_empty());
  }

  #[test]
  fn failed_cancellation_keeps_entry() {
    let s = setup();
    start(&s).unwrap();
    s.transport.fail_with(TransportError::Closed);

    assert!(s.registry
             .stop(&s.transport, &path(), Timeout::secs(1))
             .is_err());
    assert!(s.registry.is_observing(&path()));
  }

  #[test]
  fn ttl_is_reported_not_enforced() {
    let s = setup();
    s.registry
     .start(&s.transport, &s.slot, path(), None, Milliseconds(10))
     .unwrap();

    let later = Instant::now() + Duration::from_millis(50);
    assert!(s.registry.expired(Instant::now() - Duration::from_secs(1)).is_empty());
    assert_eq!(s.registry.expired(later), vec![path()]);
    assert!(s.registry.is_observing(&path()));
  }

  #[test]
  fn concurrent_starts_keep_one_entry() {
    let s = Arc::new(setup());

    let handles = (0..8).map(|_| {
                          let s = s.clone();
                          std::thread::spawn(move || start(&s).is_ok())
                        })
                        .collect::<Vec<_>>();

    let started = handles.into_iter()
                         .map(|h| h.join().unwrap())
                         .filter(|ok| *ok)
                         .count();

    assert_eq!(started, 1);
    assert_eq!(s.registry.len(), 1);
    assert_eq!(s.transport.observed().len(), 1);
  }

  #[test]
  fn stop_while_registering_cancels_once_registered() {
    let s = Arc::new(setup());
    s.transport.delay_observe(Duration::from_millis(100));

    let starter = {
      let s = s.clone();
      std::thread::spawn(move || start(&s))
    };

    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(s.registry.get(&path()).map(|e| e.state),
               Some(ObservationState::Starting { stop: None }));
    assert_eq!(s.registry.stop(&s.transport, &path(), Timeout::secs(1)),
               Ok(()));

    assert_eq!(starter.join().unwrap(), Ok(()));

    assert!(s.registry.is_empty());
    assert_eq!(s.transport.observed().len(), 1);
    assert_eq!(s.transport.canceled().len(), 1);
    assert!(!s.transport.is_observed(&path()));
    assert_eq!(s.registry.stop(&s.transport, &path(), Timeout::secs(1)),
               Err(ObserveError::NotActive(path())));
  }

  #[test]
  fn registered_entries_are_active() {
    let s = setup();
    start(&s).unwrap();

    let entry = s.registry.get(&path()).unwrap();
    assert_eq!(entry.state, ObservationState::Active);
    assert!(entry.is_delivering());
  }

  #[test]
  fn failed_cancellation_reactivates_entry() {
    let s = setup();
    start(&s).unwrap();
    s.transport.fail_with(TransportError::Closed);

    assert!(s.registry
             .stop(&s.transport, &path(), Timeout::secs(1))
             .is_err());
    assert_eq!(s.registry.get(&path()).map(|e| e.state),
               Some(ObservationState::Active));
  }
}
