use core::fmt;

use rand::RngCore;
use tinyvec::ArrayVec;
use toad_msg::Token;

/// Length of tokens generated for outbound requests
pub const SHORT_TOKEN_LEN: usize = 2;

/// The zero-length token carried by empty ACKs and RSTs
pub fn empty() -> Token {
  Token(ArrayVec::new())
}

/// Create a token from up to 8 bytes; extra bytes are discarded
pub fn from_bytes(bytes: &[u8]) -> Token {
  let mut inner = ArrayVec::<[u8; 8]>::new();
  inner.extend_from_slice(&bytes[..bytes.len().min(8)]);
  Token(inner)
}

/// Generate a random token `len` bytes long (capped at 8)
///
/// ```
/// use toad_device::msg::token;
///
/// assert_eq!(token::random(2).0.len(), 2);
/// assert_eq!(token::random(20).0.len(), 8);
/// ```
pub fn random(len: usize) -> Token {
  let mut bytes = [0u8; 8];
  let len = len.min(8);
  rand::thread_rng().fill_bytes(&mut bytes[..len]);
  from_bytes(&bytes[..len])
}

/// Generate a random [`SHORT_TOKEN_LEN`]-byte token
pub fn short() -> Token {
  random(SHORT_TOKEN_LEN)
}

/// Displays a [`Token`] as hex
#[derive(Debug, Clone, Copy)]
pub struct Hex(pub Token);

impl fmt::Display for Hex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0 .0.iter().try_for_each(|b| write!(f, "{:02x}", b))
  }
}
