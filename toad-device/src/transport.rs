use crate::error::TransportError;
use crate::msg::{code, observe, opt, token, Code, Id, Message, MessageExt, Method, Token, Type};
use crate::resource::ResourcePath;
use crate::time::Timeout;

/// Invoked once with the response to a request,
/// or `None` if no response arrived in time.
pub type OnResponse = Box<dyn FnOnce(Option<Response>) + Send + Sync + 'static>;

/// Invoked with every notification for an observed resource
pub type OnNotification = Box<dyn FnMut(Response) + Send + Sync + 'static>;

/// An outbound request, before it has been assigned a message id
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
  /// Request method
  pub method: Method,
  /// Target resource
  pub path: ResourcePath,
  /// [`Type::Con`] or [`Type::Non`]
  pub ty: Type,
  /// Correlates the response with this request
  pub token: Token,
  /// Observe option value, if any
  pub observe: Option<u32>,
  /// Body
  pub payload: Option<String>,
}

impl Request {
  /// Create a request with a fresh short token
  ///
  /// ```
  /// use toad_device::msg::{Method, Type};
  /// use toad_device::resource::ResourcePath;
  /// use toad_device::transport::Request;
  ///
  /// let req = Request::new(Method::Get, ResourcePath::discovery(), false);
  /// assert_eq!(req.ty, Type::Non);
  /// assert_eq!(req.token.0.len(), 2);
  /// ```
  pub fn new(method: Method, path: ResourcePath, confirmable: bool) -> Self {
    Self { method,
           path,
           ty: if confirmable { Type::Con } else { Type::Non },
           token: token::short(),
           observe: None,
           payload: None }
  }

  /// Create a GET that registers interest in a resource
  pub fn observe(path: ResourcePath) -> Self {
    Self { observe: Some(observe::REGISTER),
           ..Self::new(Method::Get, path, true) }
  }

  /// Create a GET that deregisters interest in a resource,
  /// reusing the registration's token
  pub fn deregister(path: ResourcePath, token: Token) -> Self {
    Self { observe: Some(observe::DEREGISTER),
           token,
           ..Self::new(Method::Get, path, false) }
  }

  /// Attach a body
  pub fn with_payload(mut self, payload: Option<&str>) -> Self {
    self.payload = payload.map(String::from);
    self
  }

  /// Will the gateway acknowledge this request?
  pub fn confirmable(&self) -> bool {
    self.ty == Type::Con
  }

  /// Build the wire message for this request
  pub fn to_message(&self, id: Id) -> Message {
    let mut msg = Message::new(self.ty, self.method.code(), id, self.token);
    msg.set_uri_path(self.path.as_str());

    if let Some(n) = self.observe {
      msg.set_uint_opt(opt::OBSERVE, n);
    }

    if let Some(payload) = &self.payload {
      msg.set_uint_opt(opt::CONTENT_FORMAT, opt::FORMAT_JSON);
      msg.set_payload_bytes(payload.as_bytes());
    }

    msg
  }
}

/// A response or observe notification from the gateway.
///
/// The most recent notification for an observation is kept
/// as the handle used to cancel it.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
  /// Response code
  pub code: Code,
  /// Message type
  pub ty: Type,
  /// Message id
  pub id: Id,
  /// Token of the request this responds to
  pub token: Token,
  /// Observe sequence number, if this is a notification
  pub observe: Option<u32>,
  /// Body
  pub payload: Vec<u8>,
}

impl Response {
  /// Body as utf8, replacing invalid sequences
  pub fn payload_string(&self) -> String {
    String::from_utf8_lossy(&self.payload).into_owned()
  }
}

impl From<Message> for Response {
  fn from(msg: Message) -> Self {
    Self { code: msg.code,
           ty: msg.ty,
           id: msg.id,
           token: msg.token,
           observe: msg.observe_value(),
           payload: msg.payload.0 }
  }
}

impl Default for Response {
  fn default() -> Self {
    Self { code: code::CONTENT,
           ty: Type::Ack,
           id: Id(0),
           token: token::empty(),
           observe: None,
           payload: Vec::new() }
  }
}

/// Something that can carry requests to the gateway
/// and route its responses back.
///
/// Callbacks are invoked on a thread owned by the transport.
pub trait Transport: Send + Sync + 'static {
  /// Send a request and block until the response arrives.
  ///
  /// Yields `Ok(None)` if `timeout` elapses first.
  fn send(&self, req: Request, timeout: Timeout) -> Result<Option<Response>, TransportError>;

  /// Send a request and return immediately.
  ///
  /// `then` is invoked exactly once; with the response, or with `None`
  /// if `timeout` elapses first.
  fn send_then(&self,
               req: Request,
               timeout: Timeout,
               then: OnResponse)
               -> Result<(), TransportError>;

  /// Send an observe registration and invoke `notify` with every notification
  /// until [`Transport::cancel_observing`] is invoked for the same path.
  fn observe(&self, req: Request, notify: OnNotification) -> Result<(), TransportError>;

  /// Stop observing `path`.
  ///
  /// With a `handle` and `send_rst`, the gateway is told to stop by rejecting
  /// the notification in `handle`. Otherwise (or if `handle` is the ACK to the
  /// registration, which can't be rejected) a deregistration is sent.
  fn cancel_observing(&self,
                      path: &ResourcePath,
                      handle: Option<&Response>,
                      send_rst: bool,
                      timeout: Timeout)
                      -> Result<(), TransportError>;
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::resource::ResourceName;

  fn path() -> ResourcePath {
    ResourcePath::build(Some(ResourceName::CdaSensorMsg), None).unwrap()
  }

  #[test]
  fn request_message() {
    let req = Request::new(Method::Post, path(), true).with_payload(Some("{}"));
    let msg = req.to_message(Id(12));

    assert_eq!(msg.ty, Type::Con);
    assert_eq!(msg.code, code::POST);
    assert_eq!(msg.id, Id(12));
    assert_eq!(msg.token, req.token);
    assert_eq!(msg.uri_path(), "PIOT/ConstrainedDevice/SensorMsg");
    assert_eq!(msg.uint_opt(opt::CONTENT_FORMAT), Some(opt::FORMAT_JSON));
    assert_eq!(msg.payload_string(), "{}");
    assert_eq!(msg.observe_value(), None);
  }

  #[test]
  fn observe_requests() {
    let reg = Request::observe(path());
    assert_eq!(reg.method, Method::Get);
    assert_eq!(reg.to_message(Id(0)).observe_value(), Some(observe::REGISTER));

    let dereg = Request::deregister(path(), reg.token);
    assert_eq!(dereg.token, reg.token);
    assert_eq!(dereg.to_message(Id(1)).observe_value(), Some(observe::DEREGISTER));
  }

  #[test]
  fn response_from_message() {
    let mut msg = Message::new(Type::Non, code::CONTENT, Id(3), token::from_bytes(&[1, 2]));
    msg.set_uint_opt(opt::OBSERVE, 9);
    msg.set_payload_bytes(b"hi");

    let resp = Response::from(msg);
    assert_eq!(resp.observe, Some(9));
    assert_eq!(resp.payload_string(), "hi");
    assert_eq!(resp.token, token::from_bytes(&[1, 2]));
  }
}
