use serde_json::Value;

use crate::{ClientSettings, ImportError};

pub(crate) fn build_client(settings: &ClientSettings) -> Result<reqwest::Client, ImportError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .build()
        .map_err(|err| ImportError::Configuration(format!("http client: {err}")))
}

pub(crate) fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return format!("request timed out: {err}");
    }
    if err.is_connect() {
        return format!("connection failed: {err}");
    }
    err.to_string()
}

/// Message for a failed response: JSON `error` or `message` field, then the raw
/// body text, then `HTTP {status}`. The first non-empty value wins.
pub(crate) fn error_message(status: u16, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        ["error", "message"].iter().find_map(|field| {
            json.get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(ToOwned::to_owned)
        })
    });

    from_json
        .or_else(|| {
            let text = body.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_wins_over_message() {
        let body = r#"{"error":"quota exceeded","message":"ignored"}"#;
        assert_eq!(error_message(429, body), "quota exceeded");
    }

    #[test]
    fn message_field_is_used_when_error_missing() {
        assert_eq!(error_message(500, r#"{"message":"boom"}"#), "boom");
    }

    #[test]
    fn blank_json_fields_fall_through_to_raw_text() {
        let body = r#"{"error":"","message":"  "}"#;
        assert_eq!(error_message(400, body), body);
    }

    #[test]
    fn non_string_fields_are_skipped() {
        let body = r#"{"error":{"code":7},"message":"bad input"}"#;
        assert_eq!(error_message(400, body), "bad input");
    }

    #[test]
    fn plain_text_body_is_used_verbatim() {
        assert_eq!(error_message(502, "upstream down\n"), "upstream down");
    }

    #[test]
    fn empty_body_yields_status_literal() {
        assert_eq!(error_message(500, ""), "HTTP 500");
        assert_eq!(error_message(503, "   "), "HTTP 503");
    }
}
