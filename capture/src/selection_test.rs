use image::Rgba;

use super::*;

fn rect(x: f64, y: f64, width: f64, height: f64, dpr: f64) -> SelectionRect {
    SelectionRect { x, y, width, height, device_pixel_ratio: dpr }
}

// =============================================================================
// SelectionWaiter
// =============================================================================

#[tokio::test]
async fn delivered_rectangle_is_returned() {
    let waiter = SelectionWaiter::new();
    let (_guard, rx) = waiter.register();
    assert!(waiter.deliver(SelectionOutcome::Complete(rect(1.0, 2.0, 3.0, 4.0, 1.0))));
    let got = wait(rx, Duration::from_secs(60)).await.unwrap();
    assert_eq!(got, rect(1.0, 2.0, 3.0, 4.0, 1.0));
}

#[tokio::test]
async fn cancel_is_reported() {
    let waiter = SelectionWaiter::new();
    let (_guard, rx) = waiter.register();
    waiter.deliver(SelectionOutcome::Canceled);
    assert!(matches!(wait(rx, Duration::from_secs(60)).await, Err(CaptureError::SelectionCanceled)));
}

#[tokio::test(start_paused = true)]
async fn silence_times_out() {
    let waiter = SelectionWaiter::new();
    let (_guard, rx) = waiter.register();
    let err = wait(rx, Duration::from_secs(60)).await.unwrap_err();
    assert!(matches!(err, CaptureError::SelectionTimeout { secs: 60 }));
}

#[test]
fn dropping_the_guard_releases_the_listener() {
    let waiter = SelectionWaiter::new();
    let (guard, _rx) = waiter.register();
    assert!(waiter.is_waiting());
    drop(guard);
    assert!(!waiter.is_waiting());
    assert!(!waiter.deliver(SelectionOutcome::Canceled));
}

#[tokio::test]
async fn new_registration_cancels_the_previous_one() {
    let waiter = SelectionWaiter::new();
    let (old_guard, old_rx) = waiter.register();
    let (_guard, rx) = waiter.register();
    assert!(matches!(wait(old_rx, Duration::from_secs(1)).await, Err(CaptureError::SelectionCanceled)));

    // The stale guard must not release the newer listener.
    drop(old_guard);
    assert!(waiter.is_waiting());
    assert!(waiter.deliver(SelectionOutcome::Complete(rect(0.0, 0.0, 5.0, 5.0, 1.0))));
    assert!(wait(rx, Duration::from_secs(1)).await.is_ok());
}

#[test]
fn delivery_without_listener_is_dropped() {
    assert!(!SelectionWaiter::new().deliver(SelectionOutcome::Canceled));
}

// =============================================================================
// crop_to_selection
// =============================================================================

fn gradient(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Rgba([x as u8, y as u8, 0, 255]))
}

#[test]
fn crop_scales_by_device_pixel_ratio() {
    let img = gradient(200, 100);
    let out = crop_to_selection(&img, &rect(10.0, 5.0, 30.0, 20.0, 2.0)).unwrap();
    assert_eq!(out.dimensions(), (60, 40));
    assert_eq!(out.get_pixel(0, 0), &Rgba([20, 10, 0, 255]));
}

#[test]
fn crop_is_clamped_to_the_capture() {
    let img = gradient(100, 100);
    let out = crop_to_selection(&img, &rect(80.0, -10.0, 50.0, 30.0, 1.0)).unwrap();
    assert_eq!(out.dimensions(), (20, 20));
    assert_eq!(out.get_pixel(0, 0), &Rgba([80, 0, 0, 255]));
}

#[test]
fn crop_outside_the_capture_is_rejected() {
    let img = gradient(100, 100);
    let err = crop_to_selection(&img, &rect(150.0, 10.0, 20.0, 20.0, 1.0)).unwrap_err();
    assert!(matches!(err, CaptureError::InvalidRequest(_)));
    assert!(crop_to_selection(&img, &rect(10.0, 10.0, 0.0, 20.0, 1.0)).is_err());
}

#[test]
fn rect_dpr_defaults_to_one() {
    let parsed: SelectionRect = serde_json::from_str(r#"{"x":1,"y":2,"width":3,"height":4}"#).unwrap();
    assert_eq!(parsed, rect(1.0, 2.0, 3.0, 4.0, 1.0));
}
