use crate::msg::{code, Message};

pub(crate) fn msg_summary(msg: &Message) -> String {
  format!("{:?}: {:?} {} with {} byte payload",
          msg.code.kind(),
          msg.ty,
          code::name(msg.code).map(String::from)
                              .unwrap_or_else(|| code::Dotted(msg.code).to_string()),
          msg.payload.0.len())
}
