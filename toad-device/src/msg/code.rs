use core::fmt;

use toad_msg::Code;

macro_rules! codes {
  ($($name:ident = $c:literal * $d:literal $human:literal;)*) => {
    $(
      #[doc = concat!("`", stringify!($c), ".", stringify!($d), "` ", $human)]
      #[allow(clippy::zero_prefixed_literal)]
      pub const $name: Code = Code::new($c, $d);
    )*

    #[allow(clippy::zero_prefixed_literal)]
    const KNOWN: &[(Code, &str)] = &[$((Code::new($c, $d), $human)),*];
  };
}

codes! {
  EMPTY = 0*00 "Empty";
  GET = 0*01 "GET";
  POST = 0*02 "POST";
  PUT = 0*03 "PUT";
  DELETE = 0*04 "DELETE";
  CREATED = 2*01 "Created";
  DELETED = 2*02 "Deleted";
  VALID = 2*03 "Valid";
  CHANGED = 2*04 "Changed";
  CONTENT = 2*05 "Content";
  BAD_REQUEST = 4*00 "Bad Request";
  UNAUTHORIZED = 4*01 "Unauthorized";
  BAD_OPTION = 4*02 "Bad Option";
  FORBIDDEN = 4*03 "Forbidden";
  NOT_FOUND = 4*04 "Not Found";
  METHOD_NOT_ALLOWED = 4*05 "Method Not Allowed";
  INTERNAL_SERVER_ERROR = 5*00 "Internal Server Error";
  NOT_IMPLEMENTED = 5*01 "Not Implemented";
  SERVICE_UNAVAILABLE = 5*03 "Service Unavailable";
  GATEWAY_TIMEOUT = 5*04 "Gateway Timeout";
}

/// Is this a `2.xx` code?
pub fn is_success(code: Code) -> bool {
  code.class == 2
}

/// Human-readable name of a code, if it is one we know
///
/// ```
/// use toad_device::msg::{code, Code};
///
/// assert_eq!(code::name(code::CONTENT), Some("Content"));
/// assert_eq!(code::name(Code::new(2, 31)), None);
/// ```
pub fn name(code: Code) -> Option<&'static str> {
  KNOWN.iter()
       .find(|(c, _)| *c == code)
       .map(|(_, name)| *name)
}

/// Displays a [`Code`] as `class.detail` (e.g. `2.05`)
#[derive(Debug, Clone, Copy)]
pub struct Dotted(pub Code);

impl fmt::Display for Dotted {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}.{:02}", self.0.class, self.0.detail)
  }
}

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  #[allow(missing_docs)]
  Get,
  #[allow(missing_docs)]
  Post,
  #[allow(missing_docs)]
  Put,
  #[allow(missing_docs)]
  Delete,
}

impl Method {
  /// The request code for this method
  pub fn code(&self) -> Code {
    match self {
      | Self::Get => GET,
      | Self::Post => POST,
      | Self::Put => PUT,
      | Self::Delete => DELETE,
    }
  }
}

impl fmt::Display for Method {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Get => f.write_str("GET"),
      | Self::Post => f.write_str("POST"),
      | Self::Put => f.write_str("PUT"),
      | Self::Delete => f.write_str("DELETE"),
    }
  }
}
