use serde::Deserialize;

use crate::Error;

/// Error payload shapes the backend is known to return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(skip)]
    raw: String,
}

impl ApiErrorBody {
    pub fn parse(body: &str) -> Self {
        let mut parsed: Self = serde_json::from_str(body).unwrap_or_default();
        parsed.raw = body.trim().to_string();
        parsed
    }

    pub fn message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.clone())
            .or_else(|| match &self.detail {
                Some(serde_json::Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
                None => None,
            })
            .or_else(|| (!self.raw.is_empty()).then(|| self.raw.clone()))
    }

    pub fn into_error(self, status: reqwest::StatusCode) -> Error {
        let message = self.message().unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}
