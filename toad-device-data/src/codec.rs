use core::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

/// A record that can be sent to / received from the gateway
pub trait Record: Serialize + DeserializeOwned + Default + fmt::Debug {
  /// Name used in log lines
  const KIND: &'static str;

  /// Name of the first float field that cannot be represented
  /// in JSON (`NaN`, `inf`), if any.
  fn non_finite_field(&self) -> Option<&'static str>;
}

/// Errors encounterable while encoding a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
  /// A float field was `NaN` or infinite
  NonFinite(&'static str),
  /// serde_json refused the record
  Json(String),
}

impl fmt::Display for EncodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::NonFinite(field) => write!(f, "field `{}` is not a finite number", field),
      | Self::Json(e) => write!(f, "failed to encode record: {}", e),
    }
  }
}

impl std::error::Error for EncodeError {}

/// Errors encounterable while decoding a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
  /// There was no text to decode
  Empty,
  /// The text was not JSON, or the JSON did not fit the record
  Malformed(String),
  /// The text was JSON, but not an object
  NotAnObject,
}

impl fmt::Display for DecodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      | Self::Empty => write!(f, "payload is empty"),
      | Self::Malformed(e) => write!(f, "malformed payload: {}", e),
      | Self::NotAnObject => write!(f, "payload is not a JSON object"),
    }
  }
}

impl std::error::Error for DecodeError {}

/// Encode a record as indented JSON
///
/// ```
/// use toad_device_data::{codec, SensorData};
///
/// let json = codec::encode(&SensorData::default()).unwrap();
/// assert!(json.contains("\"value\": 0.0"));
/// ```
pub fn encode<R: Record>(record: &R) -> Result<String, EncodeError> {
  if let Some(field) = record.non_finite_field() {
    log::warn!("{} has non-finite field {}, refusing to encode", R::KIND, field);
    return Err(EncodeError::NonFinite(field));
  }

  let mut bytes = Vec::with_capacity(256);
  let mut ser = serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));

  record.serialize(&mut ser)
        .map_err(|e| EncodeError::Json(e.to_string()))?;

  String::from_utf8(bytes).map_err(|e| EncodeError::Json(e.to_string()))
}

/// Decode a record from JSON text
///
/// Payloads produced by loosely-typed peers (single-quoted strings,
/// capitalized `True` / `False`) are accepted as a fallback.
///
/// Keys that don't belong to the record are logged and ignored;
/// keys that are missing take their default values.
pub fn decode<R: Record>(text: &str) -> Result<R, DecodeError> {
  if text.trim().is_empty() {
    log::warn!("{} payload is empty", R::KIND);
    return Err(DecodeError::Empty);
  }

  let fields = match parse(text)? {
    | Value::Object(fields) => fields,
    | _ => return Err(DecodeError::NotAnObject),
  };

  warn_unmappable::<R>(&fields);

  serde_json::from_value(Value::Object(fields)).map_err(|e| DecodeError::Malformed(e.to_string()))
}

fn parse(text: &str) -> Result<Value, DecodeError> {
  serde_json::from_str(text).or_else(|strict| {
                              serde_json::from_str(&loosen(text)).map_err(|_| {
                                DecodeError::Malformed(strict.to_string())
                              })
                            })
}

fn loosen(text: &str) -> String {
  text.replace('\'', "\"")
      .replace("False", "false")
      .replace("True", "true")
}

fn warn_unmappable<R: Record>(fields: &Map<String, Value>) {
  let known = match serde_json::to_value(R::default()) {
    | Ok(Value::Object(known)) => known,
    | _ => return,
  };

  fields.keys()
        .filter(|k| !known.contains_key(k.as_str()))
        .for_each(|k| log::warn!("{} JSON contains key not mappable to record: {}", R::KIND, k));
}
