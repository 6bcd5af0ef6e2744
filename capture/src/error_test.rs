use super::*;

#[test]
fn restricted_pages_are_environment_errors() {
    for text in [
        "Cannot access a chrome:// URL",
        "The extensions gallery cannot be scripted.",
        "Cannot access contents of url \"edge://settings\"",
    ] {
        let err = CaptureError::from(HostError::Injection(text.into()));
        assert!(matches!(err, CaptureError::InjectionBlocked(_)), "{text}");
        assert_eq!(err.category(), ErrorCategory::EnvironmentRestricted);
        assert!(!err.retryable());
    }
}

#[test]
fn missing_listener_is_a_connection_failure() {
    let err = CaptureError::from(HostError::Injection(
        "Could not establish connection. Receiving end does not exist.".into(),
    ));
    assert!(matches!(err, CaptureError::ConnectionFailed(_)));
    assert_eq!(err.category().user_message(), "Couldn't reach the page. Reload it and try again.");
    assert!(err.retryable());

    let err = CaptureError::from(HostError::Channel("port closed".into()));
    assert_eq!(err.error_code(), "E_CONNECTION_FAILED");
}

#[test]
fn capture_quota_is_rate_limited() {
    let err = CaptureError::from(HostError::Capture(
        "This request exceeds the MAX_CAPTURE_VISIBLE_TAB_CALLS_PER_SECOND quota.".into(),
    ));
    assert!(matches!(err, CaptureError::RateLimited(_)));
    assert_eq!(err.category(), ErrorCategory::CaptureFailed);
    assert!(err.retryable());
}

#[test]
fn unknown_text_is_a_plain_capture_failure() {
    let err = CaptureError::from(HostError::Capture("tab crashed".into()));
    assert!(matches!(err, CaptureError::CaptureFailed(_)));
    assert_eq!(err.error_code(), "E_CAPTURE_FAILED");
}

#[test]
fn no_target_maps_directly() {
    assert!(matches!(CaptureError::from(HostError::NoTarget), CaptureError::NoActiveTarget));
}

#[test]
fn selection_outcomes_are_user_driven() {
    assert!(CaptureError::SelectionCanceled.category().is_user_outcome());
    assert!(CaptureError::SelectionTimeout { secs: 60 }.category().is_user_outcome());
    assert!(!CaptureError::NoFrames.category().is_user_outcome());
}

#[test]
fn codes_and_categories_are_stable() {
    assert_eq!(CaptureError::NoFrames.error_code(), "E_NO_FRAMES");
    assert_eq!(CaptureError::NoFrames.to_string(), "no frames received");
    let big = CaptureError::CanvasTooLarge { width: 1, height: 2 };
    assert_eq!(big.error_code(), "E_CANVAS_TOO_LARGE");
    assert_eq!(big.category().as_str(), "canvas-too-large");
}
