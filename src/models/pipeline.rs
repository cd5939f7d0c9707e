use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered filter/sort stages applied by the record store before pagination.
/// Opaque here apart from the first stage, which names the collection being
/// browsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline(Vec<Value>);

impl Pipeline {
    pub fn stages(&self) -> &[Value] {
        &self.0
    }

    pub fn subject_name(&self) -> String {
        match self.0.first() {
            None => "all servers".to_string(),
            Some(Value::String(name)) => name.clone(),
            Some(stage) => stage.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_name() {
        assert_eq!(Pipeline::default().subject_name(), "all servers");

        let named: Pipeline = serde_json::from_value(json!(["whitelisted"])).unwrap();
        assert_eq!(named.subject_name(), "whitelisted");

        let stage: Pipeline =
            serde_json::from_value(json!([{ "$match": { "cracked": true } }, { "$limit": 5 }])).unwrap();
        assert_eq!(stage.subject_name(), r#"{"$match":{"cracked":true}}"#);
    }

    #[test]
    fn test_deserializes_from_plain_array() {
        let pipeline: Pipeline = serde_json::from_str(r#"[{"$sort":{"players.online":-1}}]"#).unwrap();
        assert_eq!(pipeline.stages().len(), 1);
    }
}
