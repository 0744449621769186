use reqwest::StatusCode;

use sahayak_api::error::parse_error_message;

#[test]
fn parse_error_message_uses_string_error_field() {
    let body = r#"{"error": "No prompt provided"}"#;
    assert_eq!(
        parse_error_message(StatusCode::BAD_REQUEST, body),
        "No prompt provided"
    );
}

#[test]
fn parse_error_message_uses_nested_message() {
    let body = r#"{"error": {"message": "quota exceeded", "code": 429}}"#;
    assert_eq!(
        parse_error_message(StatusCode::TOO_MANY_REQUESTS, body),
        "quota exceeded"
    );
}

#[test]
fn parse_error_message_falls_back_to_raw_body() {
    assert_eq!(
        parse_error_message(StatusCode::BAD_GATEWAY, "upstream connect error"),
        "upstream connect error"
    );
}

#[test]
fn parse_error_message_falls_back_to_status_reason() {
    assert_eq!(
        parse_error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
        "Service Unavailable"
    );
}
