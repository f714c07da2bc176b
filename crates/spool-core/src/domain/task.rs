use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SpoolError};

/// A unit of work: which handler to call, which queue carries it, and the
/// arguments passed to the handler untouched.
///
/// The wire form is a JSON object keyed `FuncName`, `QueueName` and `Args`,
/// so payloads written by other producers of the same store layout decode
/// as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "FuncName")]
    pub func_name: String,

    #[serde(rename = "QueueName")]
    pub queue_name: String,

    #[serde(rename = "Args", default)]
    pub args: Vec<Value>,
}

impl Task {
    pub fn new(
        func_name: impl Into<String>,
        queue_name: impl Into<String>,
        args: Vec<Value>,
    ) -> Self {
        Self {
            func_name: func_name.into(),
            queue_name: queue_name.into(),
            args,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(SpoolError::Encode)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(SpoolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_form_keeps_field_names() {
        let task = Task::new("resize", "images", vec![json!(640), json!("jpeg")]);
        let v: Value = serde_json::from_slice(&task.encode().unwrap()).unwrap();
        assert_eq!(v["FuncName"], "resize");
        assert_eq!(v["QueueName"], "images");
        assert_eq!(v["Args"], json!([640, "jpeg"]));
    }

    #[test]
    fn roundtrip_preserves_mixed_args() {
        let task = Task::new(
            "f",
            "default",
            vec![json!(1), json!(2.5), json!(null), json!({"k": [true, "v"]})],
        );
        let back = Task::decode(&task.encode().unwrap()).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn missing_args_decode_as_empty() {
        let back = Task::decode(br#"{"FuncName":"f","QueueName":"q"}"#).unwrap();
        assert!(back.args.is_empty());
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let err = Task::decode(b"{not json").unwrap_err();
        assert!(matches!(err, SpoolError::Decode(_)));
    }
}
