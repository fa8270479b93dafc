#![allow(dead_code)]

use ::std::collections::{HashMap, VecDeque};
use ::std::io;
use ::std::net::{SocketAddr, ToSocketAddrs};
use ::std::sync::{Arc, Mutex};
use ::std::thread;
use ::std::time::{Duration, Instant};

use toad_device_data::{ActuatorData, SensorData};

use crate::error::TransportError;
use crate::listener::DataMessageListener;
use crate::msg::{self, Message};
use crate::net::{Addrd, Socket};
use crate::resource::ResourcePath;
use crate::time::Timeout;
use crate::transport::{OnNotification, OnResponse, Request, Response, Transport};

pub fn init_logging() {
  simple_logger::init_with_level(log::Level::Trace).ok();
}

pub fn gateway() -> SocketAddr {
  "127.0.0.1:5683".parse().unwrap()
}

/// Records everything handed to it
#[derive(Debug, Default)]
pub struct ListenerMock {
  pub sensor: Mutex<Vec<SensorData>>,
  pub actuator: Mutex<Vec<ActuatorData>>,
}

impl ListenerMock {
  pub fn sensor_messages(&self) -> Vec<SensorData> {
    self.sensor.lock().unwrap().clone()
  }

  pub fn actuator_commands(&self) -> Vec<ActuatorData> {
    self.actuator.lock().unwrap().clone()
  }
}

impl DataMessageListener for ListenerMock {
  fn handle_sensor_message(&self, data: &SensorData) {
    self.sensor.lock().unwrap().push(data.clone());
  }

  fn handle_actuator_command_message(&self, data: &ActuatorData) {
    self.actuator.lock().unwrap().push(data.clone());
  }
}

/// A cancellation the transport was asked to perform
#[derive(Debug, Clone, PartialEq)]
pub struct Cancellation {
  pub path: ResourcePath,
  pub handle: Option<Response>,
  pub send_rst: bool,
}

/// A transport that never touches the network.
///
/// Requests are recorded and answered from a script of responses
/// (`None` once the script runs out). Callbacks run on the caller's thread.
#[derive(Default)]
pub struct TransportMock {
  pub sent: Mutex<Vec<Request>>,
  pub observed: Mutex<Vec<Request>>,
  pub canceled: Mutex<Vec<Cancellation>>,
  pub script: Mutex<VecDeque<Option<Response>>>,
  pub observers: Mutex<HashMap<ResourcePath, OnNotification>>,
  pub fail_with: Mutex<Option<TransportError>>,
  pub observe_delay: Mutex<Option<Duration>>,
}

impl core::fmt::Debug for TransportMock {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("TransportMock")
     .field("sent", &self.sent)
     .field("observed", &self.observed)
     .field("canceled", &self.canceled)
     .finish()
  }
}

impl TransportMock {
  pub fn respond_with(&self, resp: Option<Response>) {
    self.script.lock().unwrap().push_back(resp);
  }

  pub fn fail_with(&self, e: TransportError) {
    *self.fail_with.lock().unwrap() = Some(e);
  }

  /// Make `observe` block for `delay` before registering, like a slow gateway
  pub fn delay_observe(&self, delay: Duration) {
    *self.observe_delay.lock().unwrap() = Some(delay);
  }

  /// Is there a live observer for `path`?
  pub fn is_observed(&self, path: &ResourcePath) -> bool {
    self.observers.lock().unwrap().contains_key(path)
  }

  pub fn sent(&self) -> Vec<Request> {
    self.sent.lock().unwrap().clone()
  }

  pub fn observed(&self) -> Vec<Request> {
    self.observed.lock().unwrap().clone()
  }

  pub fn canceled(&self) -> Vec<Cancellation> {
    self.canceled.lock().unwrap().clone()
  }

  pub fn calls(&self) -> usize {
    self.sent().len() + self.observed().len() + self.canceled().len()
  }

  /// Deliver a notification to the observer of `path`
  pub fn notify(&self, path: &ResourcePath, resp: Response) {
    let mut observers = self.observers.lock().unwrap();
    let notify = observers.get_mut(path).expect("path not observed");
    notify(resp);
  }

  fn check(&self) -> Result<(), TransportError> {
    match self.fail_with.lock().unwrap().clone() {
      | Some(e) => Err(e),
      | None => Ok(()),
    }
  }

  fn next_response(&self) -> Option<Response> {
    self.script.lock().unwrap().pop_front().flatten()
  }
}

impl Transport for TransportMock {
  fn send(&self, req: Request, _: Timeout) -> Result<Option<Response>, TransportError> {
    self.sent.lock().unwrap().push(req);
    self.check()?;
    Ok(self.next_response())
  }

  fn send_then(&self, req: Request, _: Timeout, then: OnResponse) -> Result<(), TransportError> {
    self.sent.lock().unwrap().push(req);
    self.check()?;
    then(self.next_response());
    Ok(())
  }

  fn observe(&self, req: Request, notify: OnNotification) -> Result<(), TransportError> {
    let delay = *self.observe_delay.lock().unwrap();
    if let Some(delay) = delay {
      thread::sleep(delay);
    }

    self.observed.lock().unwrap().push(req.clone());
    self.check()?;
    self.observers.lock().unwrap().insert(req.path, notify);
    Ok(())
  }

  fn cancel_observing(&self,
                      path: &ResourcePath,
                      handle: Option<&Response>,
                      send_rst: bool,
                      _: Timeout)
                      -> Result<(), TransportError> {
    self.canceled.lock().unwrap().push(Cancellation { path: path.clone(),
                                                      handle: handle.cloned(),
                                                      send_rst });
    self.check()?;
    self.observers.lock().unwrap().remove(path);
    Ok(())
  }
}

/// A mocked socket
#[derive(Debug)]
pub struct SockMock {
  /// Inbound bytes from remote sockets. Address represents the sender
  pub rx: Arc<Mutex<Vec<Addrd<Vec<u8>>>>>,
  /// Outbound bytes to remote sockets. Address represents the destination
  pub tx: Arc<Mutex<Vec<Addrd<Vec<u8>>>>>,
}

impl SockMock {
  pub fn new() -> Self {
    Self { rx: Default::default(),
           tx: Default::default() }
  }

  /// Queue raw bytes as though a remote socket had sent them
  pub fn send_bytes(rx: &Arc<Mutex<Vec<Addrd<Vec<u8>>>>>, dgram: Addrd<&[u8]>) {
    rx.lock().unwrap().push(dgram.map(Vec::from));
  }

  pub fn send_msg(rx: &Arc<Mutex<Vec<Addrd<Vec<u8>>>>>, dgram: Addrd<Message>) {
    rx.lock().unwrap().push(dgram.map(|m| msg::to_bytes(&m).unwrap()));
  }

  /// Wait (up to a second) for the socket to send a message
  pub fn await_msg(tx: &Arc<Mutex<Vec<Addrd<Vec<u8>>>>>) -> Addrd<Message> {
    let deadline = Instant::now() + Duration::from_secs(1);

    loop {
      let sent = {
        let mut tx = tx.lock().unwrap();
        match tx.is_empty() {
          | true => None,
          | false => Some(tx.remove(0)),
        }
      };

      if let Some(dgram) = sent {
        break dgram.map(|bytes| msg::parse(&bytes).unwrap());
      }

      if Instant::now() > deadline {
        panic!("socket never sent anything");
      }

      thread::sleep(Duration::from_millis(1));
    }
  }

  pub fn nothing_sent(tx: &Arc<Mutex<Vec<Addrd<Vec<u8>>>>>) -> bool {
    tx.lock().unwrap().is_empty()
  }
}

impl Socket for SockMock {
  type Error = io::Error;

  fn bind_raw<A: ToSocketAddrs>(_: A) -> Result<Self, Self::Error> {
    Ok(Self::new())
  }

  fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
    Ok("127.0.0.1:40000".parse().unwrap())
  }

  fn recv(&self, buf: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    let mut rx = self.rx.lock().unwrap();

    if rx.is_empty() {
      return Err(nb::Error::WouldBlock);
    }

    let dgram = rx.remove(0);

    dgram.data()
         .iter()
         .enumerate()
         .for_each(|(ix, byte)| buf[ix] = *byte);

    Ok(dgram.map(|bytes| bytes.len()))
  }

  fn send(&self, buf: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    let mut vec = self.tx.lock().unwrap();
    vec.push(buf.map(Vec::from));
    Ok(())
  }
}
