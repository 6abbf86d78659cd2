use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One decoded rosbridge protocol instruction.
///
/// A message is a JSON object whose `op` field selects the handler that will
/// process it; every other field is operation-specific and opaque to this
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Map<String, Value>);

impl Message {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The operation name, when present and a string.
    pub fn op(&self) -> Option<&str> {
        self.0.get("op").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Message {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_field_is_extracted() {
        let msg: Message =
            serde_json::from_str(r#"{"op":"publish","topic":"/x"}"#).expect("parse");
        assert_eq!(msg.op(), Some("publish"));
        assert_eq!(msg.get("topic").and_then(Value::as_str), Some("/x"));
    }

    #[test]
    fn missing_or_non_string_op_yields_none() {
        let msg: Message = serde_json::from_str(r#"{"topic":"/x"}"#).expect("parse");
        assert_eq!(msg.op(), None);

        let msg: Message = serde_json::from_str(r#"{"op":42}"#).expect("parse");
        assert_eq!(msg.op(), None);
    }

    #[test]
    fn non_object_payloads_do_not_parse() {
        assert!(serde_json::from_str::<Message>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<Message>("\"publish\"").is_err());
    }
}
