use core::fmt;
use std::panic::catch_unwind;

#[doc(inline)]
pub use toad_msg::{Code, CodeKind, Id, MessageParseError, OptNumber, OptValue, Payload, Token,
                   Type};
use toad_msg::{TryFromBytes, TryIntoBytes};

/// Message codes & request methods
pub mod code;

/// Message tokens
pub mod token;

#[doc(inline)]
pub use code::Method;

/// Messages sent to and received from the gateway
pub type Message = toad_msg::alloc::Message;

/// Known option numbers
pub mod opt {
  use super::OptNumber;

  /// Observe (RFC 7641); `0` registers, `1` deregisters
  pub const OBSERVE: OptNumber = OptNumber(6);
  /// One path segment; repeated for each segment
  pub const URI_PATH: OptNumber = OptNumber(11);
  /// Format of the payload
  pub const CONTENT_FORMAT: OptNumber = OptNumber(12);

  /// Content-Format value for `application/json`
  pub const FORMAT_JSON: u32 = 50;
}

/// Observe option values
pub mod observe {
  /// Ask to be notified of changes to a resource
  pub const REGISTER: u32 = 0;
  /// Ask to stop being notified
  pub const DEREGISTER: u32 = 1;
}

/// A datagram could not be read as a message
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParseError {
  /// The bytes were not a well-formed message
  Invalid(MessageParseError),
  /// An option delta or length overflowed while decoding
  Overflow,
}

impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Invalid(e) => write!(f, "malformed message: {:?}", e),
      | Self::Overflow => write!(f, "malformed message: option header overflowed"),
    }
  }
}

impl std::error::Error for ParseError {}

/// Parse a message from a datagram.
///
/// Datagrams come from the network; a decoder panic on hostile
/// option headers is reported as [`ParseError::Overflow`].
pub fn parse(bytes: &[u8]) -> Result<Message, ParseError> {
  catch_unwind(|| Message::try_from_bytes(bytes)).map_err(|_| ParseError::Overflow)?
                                                  .map_err(ParseError::Invalid)
}

/// Serialize a message
///
/// ```
/// use toad_device::msg::{self, code, Id, Message, Type};
///
/// let msg = Message::new(Type::Non, code::GET, Id(1), msg::token::from_bytes(&[0xfe]));
/// assert_eq!(msg::to_bytes(&msg).unwrap(), vec![0b0101_0001, 0b000_00001, 0, 1, 0xfe]);
/// ```
pub fn to_bytes(msg: &Message) -> Result<Vec<u8>, <Message as TryIntoBytes>::Error> {
  msg.clone().try_into_bytes::<Vec<u8>>()
}

/// Create an empty ACK for a message id
pub fn ack(id: Id) -> Message {
  Message::new(Type::Ack, code::EMPTY, id, token::empty())
}

/// Create an empty RST for a message id
pub fn reset(id: Id) -> Message {
  Message::new(Type::Reset, code::EMPTY, id, token::empty())
}

/// Option & payload helpers this client needs on [`Message`]
pub trait MessageExt {
  /// Set the Uri-Path options, one per `/`-separated segment
  fn set_uri_path(&mut self, path: &str);

  /// Re-join the Uri-Path options into a path
  fn uri_path(&self) -> String;

  /// Set a non-repeatable option with an unsigned integer value
  fn set_uint_opt(&mut self, number: OptNumber, value: u32);

  /// Get the value of an unsigned integer option
  fn uint_opt(&self, number: OptNumber) -> Option<u32>;

  /// Value of the Observe option
  fn observe_value(&self) -> Option<u32> {
    self.uint_opt(opt::OBSERVE)
  }

  /// Replace the payload
  fn set_payload_bytes(&mut self, bytes: &[u8]);

  /// Payload as utf8, replacing invalid sequences
  fn payload_string(&self) -> String;
}

impl MessageExt for Message {
  fn set_uri_path(&mut self, path: &str) {
    let segments = path.split('/')
                       .map(|s| OptValue(s.as_bytes().to_vec()))
                       .collect::<Vec<_>>();
    self.opts.insert(opt::URI_PATH, segments);
  }

  fn uri_path(&self) -> String {
    self.opts
        .get(&opt::URI_PATH)
        .map(|segs| {
          segs.iter()
              .map(|s| String::from_utf8_lossy(&s.0).into_owned())
              .collect::<Vec<_>>()
              .join("/")
        })
        .unwrap_or_default()
  }

  fn set_uint_opt(&mut self, number: OptNumber, value: u32) {
    self.opts.insert(number, vec![OptValue(encode_uint(value))]);
  }

  fn uint_opt(&self, number: OptNumber) -> Option<u32> {
    self.opts
        .get(&number)
        .and_then(|vals| vals.first())
        .map(|v| decode_uint(&v.0))
  }

  fn set_payload_bytes(&mut self, bytes: &[u8]) {
    self.payload = Payload(bytes.to_vec());
  }

  fn payload_string(&self) -> String {
    String::from_utf8_lossy(&self.payload.0).into_owned()
  }
}

fn encode_uint(value: u32) -> Vec<u8> {
  value.to_be_bytes()
       .into_iter()
       .skip_while(|b| *b == 0)
       .collect()
}

fn decode_uint(bytes: &[u8]) -> u32 {
  bytes.iter()
       .rev()
       .take(4)
       .rev()
       .fold(0u32, |n, b| (n << 8) | *b as u32)
}
