use gitboard_app_lib::commands::CommandError;
use gitboard_app_lib::error::{ApiErrorCode, AppError};
use serde_json::json;

#[test]
fn api_errors_keep_their_code_and_correlation_id() {
    let error = AppError::api_with_details(
        ApiErrorCode::RateLimited,
        "请求过于频繁，请稍后重试",
        Some("corr-123"),
        Some(json!({ "path": "/dashboard/overview" })),
    );

    let command_error = CommandError::from(error);
    assert_eq!(command_error.code, "RATE_LIMITED");
    assert_eq!(command_error.message, "请求过于频繁，请稍后重试");

    let details = command_error.details.expect("details present");
    assert_eq!(details["correlationId"], "corr-123");
    assert_eq!(details["path"], "/dashboard/overview");
}

#[test]
fn api_error_without_details_still_carries_correlation() {
    let error = AppError::api_with_details(
        ApiErrorCode::HttpTimeout,
        "指标服务请求超时",
        Some("corr-456"),
        None,
    );

    let command_error = CommandError::from(error);
    assert_eq!(command_error.code, "HTTP_TIMEOUT");
    let details = command_error
        .details
        .expect("correlation folded into details");
    assert_eq!(details["correlationId"], "corr-456");
}

#[test]
fn validation_errors_map_to_validation_code() {
    let error = AppError::validation_with_details(
        "时间范围仅支持 7、30 或 90 天",
        json!({ "received": 14 }),
    );

    let command_error = CommandError::from(error);
    assert_eq!(command_error.code, "VALIDATION_ERROR");
    assert_eq!(command_error.message, "时间范围仅支持 7、30 或 90 天");
    assert_eq!(command_error.details.unwrap()["received"], 14);
}

#[test]
fn superseded_requests_map_to_a_silent_code() {
    let command_error = CommandError::from(AppError::superseded());
    assert_eq!(command_error.code, "SUPERSEDED");
    assert!(command_error.details.is_none());
}

#[test]
fn not_found_maps_to_localized_message() {
    let command_error = CommandError::from(AppError::NotFound);
    assert_eq!(command_error.code, "NOT_FOUND");
    assert_eq!(command_error.message, "请求的资源不存在");
}

#[test]
fn retryability_is_limited_to_transient_codes() {
    assert!(ApiErrorCode::Network.is_retryable());
    assert!(ApiErrorCode::HttpTimeout.is_retryable());
    assert!(ApiErrorCode::RateLimited.is_retryable());
    assert!(ApiErrorCode::BackendUnavailable.is_retryable());

    assert!(!ApiErrorCode::Unauthorized.is_retryable());
    assert!(!ApiErrorCode::Forbidden.is_retryable());
    assert!(!ApiErrorCode::NotFound.is_retryable());
    assert!(!ApiErrorCode::InvalidRequest.is_retryable());
    assert!(!ApiErrorCode::InvalidResponse.is_retryable());
    assert!(!ApiErrorCode::Unknown.is_retryable());
}

#[test]
fn command_error_serializes_camel_case() {
    let command_error = CommandError::new(
        "BACKEND_UNAVAILABLE",
        "指标服务暂时不可用 (状态码 502)",
        Some(json!({ "correlationId": "corr-789" })),
    );

    let serialized = serde_json::to_value(&command_error).unwrap();
    assert_eq!(serialized["code"], "BACKEND_UNAVAILABLE");
    assert_eq!(serialized["message"], "指标服务暂时不可用 (状态码 502)");
    assert_eq!(serialized["details"]["correlationId"], "corr-789");
}
