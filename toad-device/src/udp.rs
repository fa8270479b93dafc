use core::fmt;
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tinyvec::ArrayVec;
use toad_stem::Stem;

use crate::error::{ConnectionError, TransportError};
use crate::logging::msg_summary;
use crate::msg::code::Dotted;
use crate::msg::token::{self, Hex};
use crate::msg::{self, CodeKind, Id, Message, Token, Type};
use crate::net::{Addrd, Socket};
use crate::resource::ResourcePath;
use crate::time::Timeout;
use crate::transport::{OnNotification, OnResponse, Request, Response, Transport};

/// How long the receiver sleeps when the socket has nothing for it
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Largest datagram the receiver will read; the rest is dropped
pub const DGRAM_CAPACITY: usize = 1152;

type TokenKey = ArrayVec<[u8; 8]>;

enum Route {
  Once {
    deadline: Option<Instant>,
    then: OnResponse,
  },
  Observer {
    path: ResourcePath,
    notify: Arc<Stem<OnNotification>>,
  },
}

enum Dispatch {
  Once(OnResponse),
  Notify(Arc<Stem<OnNotification>>),
}

struct Shared<S> {
  sock: S,
  gateway: SocketAddr,
  routes: Stem<HashMap<TokenKey, Route>>,
  next_id: AtomicU16,
  running: AtomicBool,
}

fn isolate(what: &str, f: impl FnOnce()) {
  if catch_unwind(AssertUnwindSafe(f)).is_err() {
    log::error!("{} panicked; receiver continuing", what);
  }
}

impl<S: Socket> Shared<S> {
  fn next_id(&self) -> Id {
    Id(self.next_id.fetch_add(1, Ordering::Relaxed))
  }

  fn add_route(&self, token: Token, route: Route) {
    let mut route = Some(route);
    self.routes.map_mut(|routes| {
                 if let Some(route) = route.take() {
                   routes.insert(token.0, route);
                 }
               });
  }

  fn remove_route(&self, token: Token) -> Option<Route> {
    self.routes.map_mut(|routes| routes.remove(&token.0))
  }

  fn send_msg(&self, msg: &Message) -> Result<(), TransportError> {
    log::trace!("-> {} {}", self.gateway, msg_summary(msg));
    let bytes = msg::to_bytes(msg).map_err(|e| TransportError::Encode(format!("{:?}", e)))?;
    nb::block!(self.sock.send(Addrd(bytes.as_slice(), self.gateway)))
      .map_err(|e| TransportError::from(Into::<io::Error>::into(e)))
  }

  fn send_request(&self, req: &Request, route: Route) -> Result<(), TransportError> {
    let msg = req.to_message(self.next_id());
    self.add_route(req.token, route);

    self.send_msg(&msg).map_err(|e| {
                          self.remove_route(req.token);
                          e
                        })
  }

  fn handle_dgram(&self, dgram: Addrd<&[u8]>) {
    if dgram.addr() != self.gateway {
      log::warn!("dropping datagram from {}; only {} is trusted",
                 dgram.addr(),
                 self.gateway);
      return;
    }

    let msg = match msg::parse(dgram.data()) {
      | Ok(msg) => msg,
      | Err(e) => {
        log::warn!("dropping datagram from {}: {}", dgram.addr(), e);
        return;
      },
    };

    log::trace!("<- {} {}", dgram.addr(), msg_summary(&msg));

    match (msg.code.kind(), msg.ty) {
      | (CodeKind::Empty, Type::Ack) => {
        log::trace!("gateway acknowledged {:?}; response will follow", msg.id)
      },
      | (CodeKind::Empty, Type::Reset) => log::warn!("gateway rejected {:?}", msg.id),
      | (CodeKind::Empty, _) | (CodeKind::Request, _) => {
        log::debug!("rejecting unexpected {} from {}", Dotted(msg.code), dgram.addr());
        self.reject(&msg);
      },
      | (CodeKind::Response, _) => self.handle_response(msg),
    }
  }

  fn reject(&self, msg: &Message) {
    if let Err(e) = self.send_msg(&msg::reset(msg.id)) {
      log::warn!("failed to send RST: {}", e);
    }
  }

  fn handle_response(&self, msg: Message) {
    if msg.ty == Type::Con {
      if let Err(e) = self.send_msg(&msg::ack(msg.id)) {
        log::warn!("failed to ACK {:?}: {}", msg.id, e);
      }
    }

    let token = msg.token;
    let dispatch = self.routes.map_mut(|routes| match routes.remove(&token.0) {
                                | Some(Route::Observer { path, notify }) => {
                                  let dispatch = Dispatch::Notify(notify.clone());
                                  routes.insert(token.0, Route::Observer { path, notify });
                                  Some(dispatch)
                                },
                                | Some(Route::Once { then, .. }) => Some(Dispatch::Once(then)),
                                | None => None,
                              });

    match dispatch {
      | Some(Dispatch::Once(then)) => {
        let resp = Response::from(msg);
        isolate("response handler", move || then(Some(resp)));
      },
      | Some(Dispatch::Notify(notify)) => {
        let resp = Response::from(msg);
        notify.map_mut(|f| isolate("notification handler", || f(resp.clone())));
      },
      | None if msg.ty == Type::Ack => {
        log::debug!("dropping late response for token {}", Hex(token))
      },
      | None => {
        log::debug!("no exchange for token {}; rejecting", Hex(token));
        self.reject(&msg);
      },
    }
  }

  fn fire_timeouts(&self, now: Instant) {
    let expired = self.routes.map_mut(|routes| {
                                let tokens = routes.iter()
                                                   .filter(|(_, r)| {
                                                     matches!(r, Route::Once { deadline: Some(d), .. } if *d <= now)
                                                   })
                                                   .map(|(t, _)| t.clone())
                                                   .collect::<Vec<_>>();

                                tokens.into_iter()
                                      .filter_map(|t| routes.remove(&t).map(|r| (t, r)))
                                      .collect::<Vec<_>>()
                              });

    expired.into_iter().for_each(|(token, route)| {
                         if let Route::Once { then, .. } = route {
                           log::debug!("exchange {} timed out", Hex(Token(token)));
                           isolate("response handler", || then(None));
                         }
                       });
  }

  fn shutdown(&self) {
    let pending = self.routes.map_mut(|routes| routes.drain().collect::<Vec<_>>());

    pending.into_iter().for_each(|(_, route)| {
                         if let Route::Once { then, .. } = route {
                           isolate("response handler", || then(None));
                         }
                       });
  }

  fn run(&self) {
    let mut buf = [0u8; DGRAM_CAPACITY];

    while self.running.load(Ordering::Acquire) {
      match self.sock.recv(&mut buf) {
        | Ok(Addrd(n, addr)) => {
          isolate("datagram handler", || self.handle_dgram(Addrd(&buf[..n], addr)))
        },
        | Err(nb::Error::WouldBlock) => thread::sleep(POLL_INTERVAL),
        | Err(nb::Error::Other(e)) => {
          log::error!("socket error: {:?}", e);
          thread::sleep(POLL_INTERVAL);
        },
      }

      self.fire_timeouts(Instant::now());
    }

    self.shutdown();
  }
}

/// [`Transport`] over a datagram [`Socket`].
///
/// Owns a receiver thread that routes inbound messages to
/// the exchange or observation that is waiting on their token.
/// Confirmable responses are ACKed; messages nobody is waiting on are rejected
/// with RST. The thread stops when this is dropped, and exchanges
/// still pending at that point are completed with `None`.
pub struct UdpTransport<S: Socket = UdpSocket> {
  shared: Arc<Shared<S>>,
  receiver: Option<JoinHandle<()>>,
}

impl<S: Socket> fmt::Debug for UdpTransport<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("UdpTransport")
     .field("gateway", &self.shared.gateway)
     .field("routes", &self.shared.routes.map_ref(|r| r.len()))
     .finish()
  }
}

impl<S: Socket> UdpTransport<S> {
  /// Start a transport talking to `gateway` over `sock`
  pub fn new(sock: S, gateway: SocketAddr) -> io::Result<Self> {
    let shared = Arc::new(Shared { sock,
                                   gateway,
                                   routes: Stem::new(HashMap::new()),
                                   next_id: AtomicU16::new(rand::random()),
                                   running: AtomicBool::new(true) });

    let receiver = {
      let shared = shared.clone();
      thread::Builder::new().name("toad-device-rx".into())
                            .spawn(move || shared.run())?
    };

    Ok(Self { shared,
              receiver: Some(receiver) })
  }

  /// Bind an ephemeral local socket and start a transport talking to `gateway`
  pub fn bind(gateway: SocketAddr) -> Result<Self, ConnectionError> {
    let local: SocketAddr = match gateway {
      | SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
      | SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };

    let bind_err = |e: io::Error| ConnectionError::Bind(e.kind());

    let sock = S::bind_raw(local).map_err(|e| bind_err(e.into()))?;
    Self::new(sock, gateway).map_err(bind_err)
  }

  /// Address of the gateway
  pub fn gateway(&self) -> SocketAddr {
    self.shared.gateway
  }

  fn ensure_running(&self) -> Result<(), TransportError> {
    match self.shared.running.load(Ordering::Acquire) {
      | true => Ok(()),
      | false => Err(TransportError::Closed),
    }
  }
}

impl<S: Socket> Drop for UdpTransport<S> {
  fn drop(&mut self) {
    self.shared.running.store(false, Ordering::Release);

    if let Some(receiver) = self.receiver.take() {
      if receiver.thread().id() != thread::current().id() && receiver.join().is_err() {
        log::error!("receiver thread panicked");
      }
    }
  }
}

impl<S: Socket> Transport for UdpTransport<S> {
  fn send(&self, req: Request, timeout: Timeout) -> Result<Option<Response>, TransportError> {
    let (tx, rx) = mpsc::sync_channel(1);
    self.send_then(req,
                   timeout,
                   Box::new(move |resp| {
                     tx.send(resp).ok();
                   }))?;

    rx.recv().map_err(|_| TransportError::Closed)
  }

  fn send_then(&self,
               req: Request,
               timeout: Timeout,
               then: OnResponse)
               -> Result<(), TransportError> {
    self.ensure_running()?;

    let deadline = timeout.deadline(Instant::now());
    self.shared
        .send_request(&req, Route::Once { deadline, then })
  }

  fn observe(&self, req: Request, notify: OnNotification) -> Result<(), TransportError> {
    self.ensure_running()?;

    let route = Route::Observer { path: req.path.clone(),
                                  notify: Arc::new(Stem::new(notify)) };
    self.shared.send_request(&req, route)
  }

  fn cancel_observing(&self,
                      path: &ResourcePath,
                      handle: Option<&Response>,
                      send_rst: bool,
                      timeout: Timeout)
                      -> Result<(), TransportError> {
    self.ensure_running()?;

    let token = self.shared.routes.map_mut(|routes| {
                                    let token = routes.iter().find_map(|(t, r)| match r {
                                                               | Route::Observer { path: p, .. }
                                                                 if p == path =>
                                                               {
                                                                 Some(Token(t.clone()))
                                                               },
                                                               | _ => None,
                                                             });
                                    token.map(|t| {
                                           routes.remove(&t.0);
                                           t
                                         })
                                  });

    match (handle, send_rst) {
      | (Some(handle), true) if handle.ty != Type::Ack => {
        self.shared.send_msg(&msg::reset(handle.id))
      },
      | _ => {
        let token = token.unwrap_or_else(token::short);
        let logged = path.clone();
        self.send_then(Request::deregister(path.clone(), token),
                       timeout,
                       Box::new(move |resp| match resp {
                         | Some(r) => {
                           log::debug!("deregistered from {}: {}", logged, Dotted(r.code))
                         },
                         | None => log::warn!("no answer to deregistration from {}", logged),
                       }))
      },
    }
  }
}
