use core::fmt;
use std::io;

use crate::resource::ResourcePath;

/// A resource path could not be built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
  /// Neither a resource nor a name was provided
  Empty,
}

/// The client has no usable connection to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
  /// The client was created without a transport (see [`Client::new`](crate::client::Client::new))
  /// and will never be able to send anything.
  NotInitialized,
  /// The gateway's hostname did not resolve to an address
  Unresolvable(String),
  /// A local socket could not be bound
  Bind(io::ErrorKind),
}

/// The transport failed to carry a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
  /// Socket IO failed
  Io(io::ErrorKind),
  /// The transport's receiver has shut down
  Closed,
  /// A message could not be serialized
  Encode(String),
}

/// A request could not be completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
  /// See [`PathError`]
  NoTarget(PathError),
  /// See [`ConnectionError`]
  Connection(ConnectionError),
  /// No response arrived before the timeout elapsed
  Timeout,
  /// See [`TransportError`]
  Transport(TransportError),
}

/// An observation could not be started or stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserveError {
  /// See [`PathError`]
  NoTarget(PathError),
  /// See [`ConnectionError`]
  Connection(ConnectionError),
  /// The path is already being observed
  AlreadyActive(ResourcePath),
  /// The path is not being observed
  NotActive(ResourcePath),
  /// See [`TransportError`]
  Transport(TransportError),
}

impl fmt::Display for PathError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Empty => write!(f, "no resource or name provided"),
    }
  }
}

impl fmt::Display for ConnectionError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::NotInitialized => write!(f, "client not initialized"),
      | Self::Unresolvable(host) => write!(f, "can't resolve host {}", host),
      | Self::Bind(kind) => write!(f, "failed to bind local socket: {:?}", kind),
    }
  }
}

impl fmt::Display for TransportError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Io(kind) => write!(f, "socket error: {:?}", kind),
      | Self::Closed => write!(f, "transport closed"),
      | Self::Encode(e) => write!(f, "failed to serialize message: {}", e),
    }
  }
}

impl fmt::Display for ExchangeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::NoTarget(e) => e.fmt(f),
      | Self::Connection(e) => e.fmt(f),
      | Self::Timeout => write!(f, "timed out waiting for response"),
      | Self::Transport(e) => e.fmt(f),
    }
  }
}

impl fmt::Display for ObserveError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::NoTarget(e) => e.fmt(f),
      | Self::Connection(e) => e.fmt(f),
      | Self::AlreadyActive(path) => write!(f, "already observing {}", path),
      | Self::NotActive(path) => write!(f, "not observing {}", path),
      | Self::Transport(e) => e.fmt(f),
    }
  }
}

impl std::error::Error for PathError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for TransportError {}
impl std::error::Error for ExchangeError {}
impl std::error::Error for ObserveError {}

impl From<io::Error> for TransportError {
  fn from(e: io::Error) -> Self {
    Self::Io(e.kind())
  }
}

macro_rules! wraps {
  ($outer:ident { $($variant:ident($inner:ty)),* }) => {
    $(
      impl From<$inner> for $outer {
        fn from(e: $inner) -> Self {
          Self::$variant(e)
        }
      }
    )*
  };
}

wraps!(ExchangeError { NoTarget(PathError), Connection(ConnectionError), Transport(TransportError) });
wraps!(ObserveError { NoTarget(PathError), Connection(ConnectionError), Transport(TransportError) });
