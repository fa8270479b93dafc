use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{ConnectionError, ExchangeError, PathError};
use crate::exchange::Dispatcher;
use crate::listener::{DataMessageListener, ListenerSlot};
use crate::msg::Method;
use crate::observe::Registry;
use crate::resource::{ResourceName, ResourcePath};
use crate::time::{Millis, Timeout};
use crate::transport::Transport;
use crate::udp::UdpTransport;

/// A device's connection to its gateway.
///
/// Resolves the gateway when created. If that fails the client is
/// still usable, but every operation fails with
/// [`ConnectionError::NotInitialized`] for as long as it lives.
///
/// Responses and notifications are handled on the transport's thread;
/// decoded records reach the [`DataMessageListener`] registered with
/// [`Client::set_data_message_listener`].
#[derive(Debug)]
pub struct Client<T = UdpTransport> {
  config: Config,
  transport: Option<Arc<T>>,
  listener: Arc<ListenerSlot>,
  observations: Registry,
}

impl Client<UdpTransport> {
  /// Create a client talking to the configured gateway over UDP
  ///
  /// ```no_run
  /// use toad_device::client::Client;
  /// use toad_device::config::Config;
  /// use toad_device::resource::ResourceName;
  ///
  /// let client = Client::new_std(Config::default());
  /// let timeout = client.config().timeout;
  ///
  /// client.send_get_request(Some(ResourceName::CdaActuatorCmd), None, false, timeout)
  ///       .ok();
  /// ```
  pub fn new_std(config: Config) -> Self {
    Self::new(config, UdpTransport::bind)
  }
}

impl<T: Transport> Client<T> {
  /// Create a client, resolving the gateway and handing its address to `connect`
  pub fn new(config: Config,
             connect: impl FnOnce(SocketAddr) -> Result<T, ConnectionError>)
             -> Self {
    let transport = match resolve(&config).and_then(connect) {
      | Ok(t) => {
        log::info!("client ready for {}", config.uri());
        Some(Arc::new(t))
      },
      | Err(e) => {
        log::error!("{}; client for {} will not send anything", e, config.uri());
        None
      },
    };

    Self::from_parts(config, transport)
  }

  /// Create a client using an already-connected transport
  pub fn with_transport(config: Config, transport: T) -> Self {
    Self::from_parts(config, Some(Arc::new(transport)))
  }

  fn from_parts(config: Config, transport: Option<Arc<T>>) -> Self {
    Self { config,
           transport,
           listener: Arc::new(ListenerSlot::new()),
           observations: Registry::new() }
  }

  /// The config this client was created with
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Does this client have a transport?
  pub fn is_initialized(&self) -> bool {
    self.transport.is_some()
  }

  #[allow(missing_docs)]
  pub fn transport(&self) -> Option<&T> {
    self.transport.as_deref()
  }

  /// Active observations
  pub fn observations(&self) -> &Registry {
    &self.observations
  }

  /// Replace the listener that decoded records are handed to.
  ///
  /// The client holds it weakly; dropping the last `Arc` unregisters it.
  pub fn set_data_message_listener<L: DataMessageListener + 'static>(&self, listener: &Arc<L>) {
    self.listener.set(listener);
  }

  /// GET the gateway's resource directory
  pub fn send_discovery_request(&self, timeout: Timeout) -> Result<bool, ExchangeError> {
    let transport = self.connected(Method::Get)?;
    self.dispatcher(transport).discover(timeout)
  }

  /// GET a resource, blocking until the response arrives or `timeout` elapses.
  ///
  /// Actuator commands in the response are handed to the listener.
  pub fn send_get_request(&self,
                          resource: Option<ResourceName>,
                          name: Option<&str>,
                          confirmable: bool,
                          timeout: Timeout)
                          -> Result<bool, ExchangeError> {
    let path = target(Method::Get, resource, name)?;
    let transport = self.connected(Method::Get)?;
    self.dispatcher(transport).get(path, confirmable, timeout)
  }

  /// POST to a resource without waiting for the response.
  ///
  /// Unlike the other verbs, a missing target yields `Ok(false)`
  /// rather than an error.
  pub fn send_post_request(&self,
                           resource: Option<ResourceName>,
                           name: Option<&str>,
                           confirmable: bool,
                           payload: Option<&str>,
                           timeout: Timeout)
                           -> Result<bool, ExchangeError> {
    let path = match target(Method::Post, resource, name) {
      | Ok(path) => path,
      | Err(_) => return Ok(false),
    };

    let transport = self.connected(Method::Post)?;
    self.dispatcher(transport)
        .send(Method::Post, path, confirmable, payload, timeout)
  }

  /// PUT to a resource without waiting for the response
  pub fn send_put_request(&self,
                          resource: Option<ResourceName>,
                          name: Option<&str>,
                          confirmable: bool,
                          payload: Option<&str>,
                          timeout: Timeout)
                          -> Result<bool, ExchangeError> {
    self.send_async(Method::Put, resource, name, confirmable, payload, timeout)
  }

  /// DELETE a resource without waiting for the response
  pub fn send_delete_request(&self,
                             resource: Option<ResourceName>,
                             name: Option<&str>,
                             confirmable: bool,
                             payload: Option<&str>,
                             timeout: Timeout)
                             -> Result<bool, ExchangeError> {
    self.send_async(Method::Delete, resource, name, confirmable, payload, timeout)
  }

  /// Start observing a resource.
  ///
  /// Returns `false` (and does nothing) if it is already observed,
  /// or if the observation could not be started.
  pub fn start_observer(&self,
                        resource: Option<ResourceName>,
                        name: Option<&str>,
                        ttl: Millis)
                        -> bool {
    let (path, transport) = match self.observe_target(resource, name) {
      | Some(pair) => pair,
      | None => return false,
    };

    self.observations
        .start(transport, &self.listener, path, resource, ttl)
        .is_ok()
  }

  /// Stop observing a resource.
  ///
  /// Returns `false` (and does nothing) if it isn't observed,
  /// or if the observation could not be stopped.
  pub fn stop_observer(&self,
                       resource: Option<ResourceName>,
                       name: Option<&str>,
                       timeout: Timeout)
                       -> bool {
    let (path, transport) = match self.observe_target(resource, name) {
      | Some(pair) => pair,
      | None => return false,
    };

    self.observations.stop(transport, &path, timeout).is_ok()
  }

  fn send_async(&self,
                method: Method,
                resource: Option<ResourceName>,
                name: Option<&str>,
                confirmable: bool,
                payload: Option<&str>,
                timeout: Timeout)
                -> Result<bool, ExchangeError> {
    let path = target(method, resource, name)?;
    let transport = self.connected(method)?;
    self.dispatcher(transport)
        .send(method, path, confirmable, payload, timeout)
  }

  fn observe_target(&self,
                    resource: Option<ResourceName>,
                    name: Option<&str>)
                    -> Option<(ResourcePath, &T)> {
    let path = target(Method::Get, resource, name).ok()?;
    let transport = self.connected(Method::Get).ok()?;
    Some((path, transport))
  }

  fn connected(&self, method: Method) -> Result<&T, ConnectionError> {
    self.transport.as_deref().ok_or_else(|| {
                               log::warn!("can't {}: {}", method, ConnectionError::NotInitialized);
                               ConnectionError::NotInitialized
                             })
  }

  fn dispatcher<'a>(&'a self, transport: &'a T) -> Dispatcher<'a, T> {
    Dispatcher::new(transport, &self.listener)
  }
}

fn target(method: Method,
          resource: Option<ResourceName>,
          name: Option<&str>)
          -> Result<ResourcePath, PathError> {
  ResourcePath::build(resource, name).map_err(|e| {
                                       log::warn!("can't {}: {}", method, e);
                                       e
                                     })
}

fn resolve(config: &Config) -> Result<SocketAddr, ConnectionError> {
  (config.host.as_str(), config.port).to_socket_addrs()
                                     .ok()
                                     .and_then(|mut addrs| addrs.next())
                                     .ok_or_else(|| ConnectionError::Unresolvable(config.host.clone()))
}
