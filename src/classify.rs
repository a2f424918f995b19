//! Response classification.
//!
//! HTTP-level success and backend-level success are independent: a response
//! may pass [`is_http_success`] while its envelope reports a business
//! failure.

use serde_json::Value as JsonValue;

/// HTTP success is any 2xx status or 304.
pub fn is_http_success(status: u16) -> bool {
    (200..300).contains(&status) || status == 304
}

/// Reads `field` from a JSON envelope as text.
///
/// Numbers and booleans are stringified so `0` and `"0"` compare equal.
pub fn envelope_field(body: &JsonValue, field: &str) -> Option<String> {
    match body.get(field)? {
        JsonValue::String(value) => Some(value.clone()),
        JsonValue::Number(value) => Some(value.to_string()),
        JsonValue::Bool(value) => Some(value.to_string()),
        _ => None,
    }
}

/// Describes one backend flavor's response envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvelopeFormat {
    pub code_field: String,
    pub message_field: String,
    pub data_field: String,
    /// Value of `code_field` that marks success.
    pub success_value: String,
}

impl EnvelopeFormat {
    /// `{code, msg, data}` envelope.
    pub fn code_msg_data(success_value: impl Into<String>) -> Self {
        Self {
            code_field: "code".to_owned(),
            message_field: "msg".to_owned(),
            data_field: "data".to_owned(),
            success_value: success_value.into(),
        }
    }

    /// `{status, message, result}` envelope.
    pub fn status_message_result(success_value: impl Into<String>) -> Self {
        Self {
            code_field: "status".to_owned(),
            message_field: "message".to_owned(),
            data_field: "result".to_owned(),
            success_value: success_value.into(),
        }
    }

    pub fn is_success(&self, body: &JsonValue) -> bool {
        self.code(body).as_deref() == Some(self.success_value.as_str())
    }

    pub fn code(&self, body: &JsonValue) -> Option<String> {
        envelope_field(body, &self.code_field)
    }

    pub fn message(&self, body: &JsonValue) -> Option<String> {
        envelope_field(body, &self.message_field)
    }

    /// Extracts the payload, `Null` when absent.
    pub fn data(&self, body: &JsonValue) -> JsonValue {
        body.get(&self.data_field).cloned().unwrap_or(JsonValue::Null)
    }
}

impl Default for EnvelopeFormat {
    fn default() -> Self {
        Self::code_msg_data("0000")
    }
}

/// Set of backend codes parsed from a comma-separated list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodeSet(Vec<String>);

impl CodeSet {
    pub fn parse(list: &str) -> Self {
        let mut codes: Vec<String> = Vec::new();
        for code in list.split(',').map(str::trim).filter(|code| !code.is_empty()) {
            if !codes.iter().any(|existing| existing == code) {
                codes.push(code.to_owned());
            }
        }
        Self(codes)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|existing| existing == code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for CodeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let joined: Vec<String> = iter.into_iter().map(Into::into).collect();
        Self::parse(&joined.join(","))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{envelope_field, is_http_success, CodeSet, EnvelopeFormat};

    #[test]
    fn http_success_range() {
        assert!(is_http_success(200));
        assert!(is_http_success(299));
        assert!(is_http_success(304));
        assert!(!is_http_success(300));
        assert!(!is_http_success(404));
        assert!(!is_http_success(199));
    }

    #[test]
    fn numeric_codes_compare_as_text() {
        assert_eq!(envelope_field(&json!({"code": 200}), "code").as_deref(), Some("200"));
        let format = EnvelopeFormat::status_message_result("200");
        assert!(format.is_success(&json!({"status": 200, "result": 1})));
        assert!(format.is_success(&json!({"status": "200"})));
        assert!(!format.is_success(&json!({"status": "500"})));
    }

    #[test]
    fn missing_code_is_not_success() {
        let format = EnvelopeFormat::code_msg_data("0000");
        assert!(!format.is_success(&json!({"msg": "ok"})));
        assert!(!format.is_success(&json!("0000")));
    }

    #[test]
    fn code_set_ignores_blanks_and_duplicates() {
        let codes = CodeSet::parse(" 8888, 8889,,8888 ");
        assert_eq!(codes.iter().collect::<Vec<_>>(), vec!["8888", "8889"]);
        assert!(codes.contains("8889"));
        assert!(!codes.contains(""));
        assert!(CodeSet::parse("").is_empty());
    }
}
