//! Parsed tool-call arguments with typed accessors.

use serde::de::DeserializeOwned;

use crate::error::TurnkitError;

/// Arguments a model supplied for one tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments {
    raw: serde_json::Value,
}

impl ToolArguments {
    pub fn new(raw: serde_json::Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    pub fn into_raw(self) -> serde_json::Value {
        self.raw
    }

    /// Required string field.
    pub fn get_str(&self, key: &str) -> Result<&str, TurnkitError> {
        self.raw
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| TurnkitError::InvalidArgument(format!("missing string argument '{key}'")))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(|v| v.as_str())
    }

    pub fn get_bool_opt(&self, key: &str) -> Option<bool> {
        self.raw.get(key).and_then(|v| v.as_bool())
    }

    /// Deserialize the whole argument object into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, TurnkitError> {
        serde_json::from_value(self.raw.clone())
            .map_err(|e| TurnkitError::InvalidArgument(e.to_string()))
    }
}

impl From<serde_json::Value> for ToolArguments {
    fn from(raw: serde_json::Value) -> Self {
        Self::new(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn get_str_reports_missing_key() {
        let args = ToolArguments::new(json!({ "question": 3 }));
        let err = args.get_str("question").unwrap_err();
        assert!(err.to_string().contains("question"));
    }

    #[test]
    fn deserializes_into_struct() {
        #[derive(Deserialize)]
        struct Ask {
            question: String,
        }
        let args = ToolArguments::new(json!({ "question": "why?" }));
        let ask: Ask = args.deserialize().unwrap();
        assert_eq!(ask.question, "why?");
    }
}
