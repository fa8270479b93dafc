use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Data that came from (or is headed to) a network socket
#[derive(PartialEq, PartialOrd, Eq, Ord, Hash, Debug, Clone, Copy)]
pub struct Addrd<T>(pub T, pub SocketAddr);

impl<T> Addrd<T> {
  /// Borrow the contents of this Addressed
  pub fn as_ref(&self) -> Addrd<&T> {
    Addrd(self.data(), self.addr())
  }

  /// Discard the socket and get the data in this Addressed
  pub fn unwrap(self) -> T {
    self.0
  }

  /// Map the data contained in this Addressed
  pub fn map<R>(self, f: impl FnOnce(T) -> R) -> Addrd<R> {
    Addrd(f(self.0), self.1)
  }

  /// Borrow the contents of the addressed item
  pub fn data(&self) -> &T {
    &self.0
  }

  /// Copy the socket address for the data
  pub fn addr(&self) -> SocketAddr {
    self.1
  }
}

/// A datagram socket
///
/// Implementors should never block in [`Socket::send`] or [`Socket::recv`];
/// yield [`nb::Error::WouldBlock`] instead.
pub trait Socket: Sized + Send + Sync + 'static {
  /// The error yielded by socket operations
  type Error: core::fmt::Debug + Into<io::Error>;

  /// Bind the socket to the first address `addr` yields, in non-blocking mode
  fn bind_raw<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error>;

  /// Get the local address this socket is bound to
  fn local_addr(&self) -> Result<SocketAddr, Self::Error>;

  /// Send a datagram to a remote address
  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error>;

  /// Pull a buffered datagram from the socket, along with the address of the sender.
  ///
  /// It is expected that (like [`std::net::UdpSocket`]) if the message is larger
  /// than the buffer, those bytes are dropped and not considered an error condition.
  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error>;
}

impl Socket for UdpSocket {
  type Error = io::Error;

  fn bind_raw<A: ToSocketAddrs>(addr: A) -> Result<Self, Self::Error> {
    let sock = UdpSocket::bind(addr)?;
    sock.set_nonblocking(true)?;
    Ok(sock)
  }

  fn local_addr(&self) -> Result<SocketAddr, Self::Error> {
    UdpSocket::local_addr(self)
  }

  fn send(&self, msg: Addrd<&[u8]>) -> nb::Result<(), Self::Error> {
    self.send_to(msg.data(), msg.addr())
        .map(|_| ())
        .map_err(io_to_nb)
  }

  fn recv(&self, buffer: &mut [u8]) -> nb::Result<Addrd<usize>, Self::Error> {
    self.recv_from(buffer)
        .map(|(n, addr)| Addrd(n, addr))
        .map_err(io_to_nb)
  }
}

/// Turn an [`io::Error`] into a non-blocking error,
/// treating [`io::ErrorKind::WouldBlock`] as [`nb::Error::WouldBlock`].
pub fn io_to_nb(err: io::Error) -> nb::Error<io::Error> {
  match err.kind() {
    | io::ErrorKind::WouldBlock => nb::Error::WouldBlock,
    | _ => nb::Error::Other(err),
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn udp_recv_would_block_when_empty() {
    let sock = UdpSocket::bind_raw("127.0.0.1:0").unwrap();
    let mut buf = [0u8; 16];
    assert!(matches!(Socket::recv(&sock, &mut buf), Err(nb::Error::WouldBlock)));
  }

  #[test]
  fn udp_loopback() {
    let a = UdpSocket::bind_raw("127.0.0.1:0").unwrap();
    let b = UdpSocket::bind_raw("127.0.0.1:0").unwrap();
    let b_addr = Socket::local_addr(&b).unwrap();

    nb::block!(Socket::send(&a, Addrd(&[1u8, 2, 3][..], b_addr))).unwrap();

    let mut buf = [0u8; 16];
    let Addrd(n, from) = nb::block!(Socket::recv(&b, &mut buf)).unwrap();
    assert_eq!(&buf[..n], &[1, 2, 3]);
    assert_eq!(from, Socket::local_addr(&a).unwrap());
  }

  #[test]
  fn addrd_map() {
    let addr: SocketAddr = "127.0.0.1:5683".parse().unwrap();
    let a = Addrd(2u8, addr).map(|n| n * 2);
    assert_eq!(a.data(), &4);
    assert_eq!(a.addr(), addr);
    assert_eq!(a.as_ref().unwrap(), &4);
  }
}
