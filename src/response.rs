use serde::Serialize;
use serde_json::Value;

use crate::query::PAGE_SIZE;

/// Uniform JSON body for every endpoint. Optional keys are omitted rather
/// than serialized as null so cached payload comparisons stay byte-stable.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total_results: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, total_results: i64) -> Self {
        Pagination {
            page,
            per_page: PAGE_SIZE,
            total_results,
            total_pages: (total_results + PAGE_SIZE - 1) / PAGE_SIZE,
        }
    }
}

impl Envelope {
    fn base(status: &'static str) -> Self {
        Envelope {
            status,
            message: None,
            data: None,
            pagination: None,
            cached: None,
        }
    }

    pub fn success() -> Self {
        Self::base("success")
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut envelope = Self::base("error");
        envelope.message = Some(message.into());
        envelope
    }

    pub fn data(value: impl Serialize) -> Self {
        Self::success().with_data(value)
    }

    pub fn message(text: impl Into<String>) -> Self {
        let mut envelope = Self::success();
        envelope.message = Some(text.into());
        envelope
    }

    pub fn with_data(mut self, value: impl Serialize) -> Self {
        self.data = Some(serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = Some(cached);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_absent_keys() {
        let json = serde_json::to_string(&Envelope::success()).unwrap();
        assert_eq!(json, r#"{"status":"success"}"#);
    }

    #[test]
    fn error_envelope_carries_message_only() {
        let json = serde_json::to_string(&Envelope::error("User not found")).unwrap();
        assert_eq!(json, r#"{"status":"error","message":"User not found"}"#);
    }

    #[test]
    fn pagination_rounds_up() {
        assert_eq!(Pagination::new(1, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 11).total_pages, 2);
        assert_eq!(Pagination::new(3, 95).total_pages, 10);
    }

    #[test]
    fn cached_flag_sits_outside_data() {
        let envelope = Envelope::data(serde_json::json!({"total": 3})).with_cached(true);
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["cached"], serde_json::json!(true));
        assert_eq!(json["data"], serde_json::json!({"total": 3}));
    }
}
