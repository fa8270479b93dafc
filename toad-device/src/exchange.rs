use std::sync::Arc;

use toad_device_data::{codec, ActuatorData};

use crate::error::ExchangeError;
use crate::listener::ListenerSlot;
use crate::msg::code::{self, Dotted};
use crate::msg::Method;
use crate::resource::ResourcePath;
use crate::time::Timeout;
use crate::transport::{OnResponse, Request, Response, Transport};

/// Turns verb calls into exchanges on a [`Transport`]
/// and handles their completion.
///
/// GET blocks until its response arrives; POST, PUT and DELETE
/// return as soon as the request is handed to the transport.
#[derive(Debug)]
pub struct Dispatcher<'a, T> {
  transport: &'a T,
  listener: &'a Arc<ListenerSlot>,
}

impl<'a, T: Transport> Dispatcher<'a, T> {
  /// Create a dispatcher
  pub fn new(transport: &'a T, listener: &'a Arc<ListenerSlot>) -> Self {
    Self { transport, listener }
  }

  /// Send a GET and wait for the response.
  ///
  /// If `path` addresses actuator commands, the response is decoded
  /// and handed to the listener. Payloads that don't decode are logged and dropped.
  pub fn get(&self,
             path: ResourcePath,
             confirmable: bool,
             timeout: Timeout)
             -> Result<bool, ExchangeError> {
    let req = Request::new(Method::Get, path.clone(), confirmable);
    log::debug!("GET {} (token {:?}, {:?})", path, req.token, req.ty);

    match self.transport.send(req, timeout) {
      | Ok(Some(resp)) => {
        self.on_get_response(&path, &resp);
        Ok(true)
      },
      | Ok(None) => {
        log::warn!("GET {}: no response received", path);
        Err(ExchangeError::Timeout)
      },
      | Err(e) => {
        log::error!("GET {} failed: {}", path, e);
        Err(e.into())
      },
    }
  }

  /// GET the gateway's resource directory and log what it serves
  pub fn discover(&self, timeout: Timeout) -> Result<bool, ExchangeError> {
    self.get(ResourcePath::discovery(), false, timeout)
  }

  /// Send a request whose response is only logged
  pub fn send(&self,
              method: Method,
              path: ResourcePath,
              confirmable: bool,
              payload: Option<&str>,
              timeout: Timeout)
              -> Result<bool, ExchangeError> {
    let req = Request::new(method, path.clone(), confirmable).with_payload(payload);
    log::debug!("{} {} (token {:?}, {:?})", method, path, req.token, req.ty);

    match self.transport
              .send_then(req, timeout, log_response(method, path.clone()))
    {
      | Ok(()) => Ok(true),
      | Err(e) => {
        log::error!("{} {} failed: {}", method, path, e);
        Err(e.into())
      },
    }
  }

  fn on_get_response(&self, path: &ResourcePath, resp: &Response) {
    let payload = resp.payload_string();
    log::info!("GET response received: {} {}", Dotted(resp.code), payload);

    if *path == ResourcePath::discovery() {
      links(&payload).for_each(|link| log::info!("gateway serves {}", link));
    }

    if path.is_actuator_cmd() {
      match codec::decode::<ActuatorData>(&payload) {
        | Ok(cmd) => self.listener.actuator_command(&cmd),
        | Err(e) => log::warn!("GET {}: response is not an actuator command: {}", path, e),
      }
    }
  }
}

fn log_response(method: Method, path: ResourcePath) -> OnResponse {
  Box::new(move |resp| match resp {
    | Some(resp) if code::is_success(resp.code) => {
      log::info!("{} response received: {} {}",
                 method,
                 Dotted(resp.code),
                 resp.payload_string())
    },
    | Some(resp) => log::warn!("{} {} response received: {} {}",
                               method,
                               path,
                               Dotted(resp.code),
                               resp.payload_string()),
    | None => log::warn!("{} {}: no response received", method, path),
  })
}

/// Paths in a CoRE link-format document (`</a>;rt="x",</b>`)
fn links(doc: &str) -> impl Iterator<Item = &str> {
  doc.split(',')
     .filter_map(|link| link.split(';').next())
     .map(|target| target.trim().trim_start_matches('<').trim_end_matches('>'))
     .filter(|target| !target.is_empty())
}

#[cfg(test)]
mod test {
  use toad_device_data::actuator::COMMAND_ON;

  use super::*;
  use crate::error::TransportError;
  use crate::msg::Type;
  use crate::resource::ResourceName;
  use crate::test::{init_logging, ListenerMock, TransportMock};

  struct Setup {
    transport: TransportMock,
    slot: Arc<ListenerSlot>,
    listener: Arc<ListenerMock>,
  }

  fn setup() -> Setup {
    init_logging();
    let slot = Arc::new(ListenerSlot::new());
    let listener = Arc::new(ListenerMock::default());
    slot.set(&listener);

    Setup { transport: TransportMock::default(),
            slot,
            listener }
  }

  fn path(r: ResourceName) -> ResourcePath {
    ResourcePath::build(Some(r), None).unwrap()
  }

  fn response(payload: &str) -> Response {
    Response { payload: payload.as_bytes().to_vec(),
               ..Default::default() }
  }

  #[test]
  fn actuator_get_reaches_listener_once() {
    let s = setup();
    let mut cmd = ActuatorData::new("hvac", 3);
    cmd.command = COMMAND_ON;
    cmd.value = 21.5;
    s.transport
     .respond_with(Some(response(&codec::encode(&cmd).unwrap())));

    let ok = Dispatcher::new(&s.transport, &s.slot).get(path(ResourceName::CdaActuatorCmd),
                                                        false,
                                                        Timeout::secs(1));

    assert_eq!(ok, Ok(true));
    assert_eq!(s.listener.actuator_commands(), vec![cmd]);

    let sent = s.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].ty, Type::Non);
    assert_eq!(sent[0].method, Method::Get);
  }

  #[test]
  fn non_actuator_get_is_only_logged() {
    let s = setup();
    s.transport
     .respond_with(Some(response(r#"{"command": 1}"#)));

    let ok = Dispatcher::new(&s.transport, &s.slot).get(path(ResourceName::CdaSensorMsg),
                                                        true,
                                                        Timeout::secs(1));

    assert_eq!(ok, Ok(true));
    assert!(s.listener.actuator_commands().is_empty());
    assert_eq!(s.transport.sent()[0].ty, Type::Con);
  }

  #[test]
  fn undecodable_actuator_get_is_swallowed() {
    let s = setup();
    s.transport.respond_with(Some(response("not json")));

    let ok = Dispatcher::new(&s.transport, &s.slot).get(path(ResourceName::CdaActuatorCmd),
                                                        false,
                                                        Timeout::secs(1));

    assert_eq!(ok, Ok(true));
    assert!(s.listener.actuator_commands().is_empty());
  }

  #[test]
  fn get_timeout() {
    let s = setup();
    let ok = Dispatcher::new(&s.transport, &s.slot).get(path(ResourceName::CdaActuatorCmd),
                                                        false,
                                                        Timeout::Millis(1));
    assert_eq!(ok, Err(ExchangeError::Timeout));
    assert!(s.listener.actuator_commands().is_empty());
  }

  #[test]
  fn discovery_is_non_confirmable_get() {
    let s = setup();
    s.transport
     .respond_with(Some(response("</PIOT/ConstrainedDevice/ActuatorCmd>;obs,</.well-known/core>")));

    assert_eq!(Dispatcher::new(&s.transport, &s.slot).discover(Timeout::secs(1)),
               Ok(true));

    let sent = s.transport.sent();
    assert_eq!(sent[0].path, ResourcePath::discovery());
    assert_eq!(sent[0].ty, Type::Non);
  }

  #[test]
  fn async_verbs_hand_off() {
    let s = setup();
    let d = Dispatcher::new(&s.transport, &s.slot);

    s.transport.respond_with(Some(Response { code: code::CHANGED,
                                             ..Default::default() }));
    assert_eq!(d.send(Method::Post,
                      path(ResourceName::CdaSensorMsg),
                      true,
                      Some("{}"),
                      Timeout::secs(1)),
               Ok(true));
    assert_eq!(d.send(Method::Put,
                      path(ResourceName::CdaSystemPerfMsg),
                      false,
                      None,
                      Timeout::secs(1)),
               Ok(true));

    let sent = s.transport.sent();
    assert_eq!(sent[0].method, Method::Post);
    assert_eq!(sent[0].ty, Type::Con);
    assert_eq!(sent[0].payload.as_deref(), Some("{}"));
    assert_eq!(sent[1].method, Method::Put);
    assert_eq!(sent[1].ty, Type::Non);
  }

  #[test]
  fn transport_failure() {
    let s = setup();
    s.transport.fail_with(TransportError::Closed);

    let d = Dispatcher::new(&s.transport, &s.slot);
    assert_eq!(d.send(Method::Delete,
                      path(ResourceName::CdaSensorMsg),
                      false,
                      None,
                      Timeout::secs(1)),
               Err(ExchangeError::Transport(TransportError::Closed)));
  }

  #[test]
  fn link_format() {
    assert_eq!(links(r#"</a/b>;rt="x";obs, </c>,"#).collect::<Vec<_>>(),
               vec!["/a/b", "/c"]);
    assert_eq!(links("").count(), 0);
  }
}
