#![allow(clippy::float_cmp)]

use std::time::Duration;

use super::*;
use crate::browser::HostError;
use crate::browser::TargetId;
use crate::browser::test_helpers::{FakeHost, FakePage, is_header, row_tag};

fn pipeline(config: CaptureConfig) -> ScrollCapturePipeline {
    let throttle = Arc::new(CaptureThrottle::new(config.max_per_window, config.window));
    ScrollCapturePipeline::new(throttle, config)
}

async fn run(host: &FakeHost, config: CaptureConfig) -> Result<RgbaImage, CaptureError> {
    let page = Page::new(host, TargetId("tab-1".into()));
    pipeline(config).capture_full_page(&page).await
}

// =============================================================================
// PrimingTracker
// =============================================================================

#[test]
fn priming_stops_after_three_unchanged_heights() {
    let mut tracker = PrimingTracker::new(3, 30_000.0);
    assert_eq!(tracker.observe(1000.0), PrimeStep::Continue);
    assert_eq!(tracker.observe(1000.0), PrimeStep::Continue);
    assert_eq!(tracker.observe(1000.0), PrimeStep::Continue);
    assert_eq!(tracker.observe(1000.0), PrimeStep::Stable);
}

#[test]
fn growth_resets_the_stability_count() {
    let mut tracker = PrimingTracker::new(2, 30_000.0);
    tracker.observe(1000.0);
    tracker.observe(1000.0);
    assert_eq!(tracker.observe(1800.0), PrimeStep::Continue);
    assert_eq!(tracker.observe(1800.0), PrimeStep::Continue);
    assert_eq!(tracker.observe(1800.0), PrimeStep::Stable);
}

#[test]
fn distance_cap_ends_priming_on_endless_pages() {
    let mut tracker = PrimingTracker::new(3, 2000.0);
    let mut height = 1000.0;
    let mut steps = 0;
    loop {
        height += 500.0;
        if tracker.observe(height) != PrimeStep::Continue {
            break;
        }
        tracker.advance(800.0);
        steps += 1;
    }
    assert_eq!(steps, 3);
    assert_eq!(tracker.observe(height + 1.0), PrimeStep::DistanceCap);
}

// =============================================================================
// Full page runs
// =============================================================================

#[tokio::test(start_paused = true)]
async fn three_frame_page_stitches_seam_free() {
    let host = FakeHost::new(FakePage::new(2350.0, 800.0));
    let img = run(&host, CaptureConfig::default()).await.unwrap();
    assert_eq!(img.dimensions(), (20, 2350));
    for y in 0..img.height() {
        assert_eq!(row_tag(&img, y), y, "row {y}");
    }
    let page = host.page();
    assert_eq!(page.captures(), 3);
    let shots: Vec<&str> = page.log.iter().filter(|e| e.starts_with("capture@")).map(String::as_str).collect();
    assert_eq!(shots, ["capture@0", "capture@800", "capture@1550"]);
}

#[tokio::test(start_paused = true)]
async fn scroll_position_is_restored() {
    let mut fake = FakePage::new(3000.0, 800.0);
    fake.scroll_y = 640.0;
    let host = FakeHost::new(fake);
    run(&host, CaptureConfig::default()).await.unwrap();
    assert_eq!(host.page().scroll_y, 640.0);
}

#[tokio::test(start_paused = true)]
async fn lazy_content_is_primed_before_measuring() {
    let mut fake = FakePage::new(1000.0, 800.0);
    fake.heights = [1000.0, 1600.0, 2350.0, 2350.0, 2350.0, 2350.0].into_iter().collect();
    let host = FakeHost::new(fake);
    let img = run(&host, CaptureConfig::default()).await.unwrap();
    assert_eq!(img.height(), 2350);
    assert_eq!(host.page().calls("read_scroll_height"), 6);
}

#[tokio::test(start_paused = true)]
async fn priming_respects_the_distance_cap() {
    let mut fake = FakePage::new(1000.0, 800.0);
    fake.heights = (1..100).map(|i| f64::from(i) * 1000.0).collect();
    let host = FakeHost::new(fake);
    let config = CaptureConfig { prime_max_distance_px: 3000.0, ..CaptureConfig::default() };
    run(&host, config).await.unwrap();
    assert_eq!(host.page().calls("read_scroll_height"), 5);
}

#[tokio::test(start_paused = true)]
async fn fixed_header_appears_only_in_the_first_frame() {
    let host = FakeHost::new(FakePage::new(2400.0, 800.0).with_fixed_header(40.0));
    let img = run(&host, CaptureConfig::default()).await.unwrap();
    assert!(is_header(&img, 0));
    assert!(is_header(&img, 39));
    assert!(!is_header(&img, 40));
    assert!(!is_header(&img, 800));
    assert!(!is_header(&img, 1600));
    let page = host.page();
    assert!(page.elements.iter().all(|el| !el.marked), "header left hidden");
    assert_eq!(page.calls("hide_floating"), 2);
}

#[tokio::test(start_paused = true)]
async fn newly_hidden_chrome_gets_time_to_repaint() {
    let host = FakeHost::new(FakePage::new(2400.0, 800.0).with_fixed_header(40.0));
    let config = CaptureConfig { hide_settle: Duration::from_secs(5), ..CaptureConfig::default() };
    let img = run(&host, config).await.unwrap();
    assert!(!is_header(&img, 800));
    let times = host.page().capture_times.clone();
    assert!(times[1] - times[0] >= Duration::from_millis(5600), "{:?}", times[1] - times[0]);
    // Nothing new to hide in the third frame.
    assert!(times[2] - times[1] < Duration::from_secs(5), "{:?}", times[2] - times[1]);
}

#[tokio::test(start_paused = true)]
async fn failure_mid_run_still_restores_the_page() {
    let mut fake = FakePage::new(3000.0, 800.0).with_fixed_header(40.0);
    fake.scroll_y = 200.0;
    fake.fail_capture_at = Some((2, HostError::Capture("tab crashed".into())));
    let host = FakeHost::new(fake);
    let err = run(&host, CaptureConfig::default()).await.unwrap_err();
    assert!(matches!(err, CaptureError::CaptureFailed(_)), "{err:?}");
    let page = host.page();
    assert_eq!(page.scroll_y, 200.0);
    assert!(page.elements.iter().all(|el| !el.marked));
    let tail: Vec<&str> = page.log.iter().rev().take(2).map(String::as_str).collect();
    assert_eq!(tail, ["scroll_to", "restore_hidden"]);
}

#[tokio::test(start_paused = true)]
async fn restore_failure_does_not_mask_the_primary_error() {
    let mut fake = FakePage::new(3000.0, 800.0);
    fake.fail_capture_at = Some((1, HostError::Capture("MAX_CAPTURE_VISIBLE_TAB_CALLS_PER_SECOND".into())));
    fake.fail_script = Some(("restore_hidden", HostError::Channel("port closed".into())));
    let host = FakeHost::new(fake);
    let err = run(&host, CaptureConfig::default()).await.unwrap_err();
    assert!(matches!(err, CaptureError::RateLimited(_)), "{err:?}");
}

#[tokio::test(start_paused = true)]
async fn restricted_page_fails_before_touching_it() {
    let mut fake = FakePage::new(3000.0, 800.0);
    fake.fail_script = Some(("read_metrics", HostError::Injection("Cannot access a chrome:// URL".into())));
    let host = FakeHost::new(fake);
    let err = run(&host, CaptureConfig::default()).await.unwrap_err();
    assert!(matches!(err, CaptureError::InjectionBlocked(_)));
    assert_eq!(host.page().captures(), 0);
    assert_eq!(host.page().calls("scroll_to"), 0);
}

#[tokio::test(start_paused = true)]
async fn frame_loop_stops_when_the_page_stops_scrolling() {
    let mut fake = FakePage::new(4000.0, 800.0);
    fake.scroll_limit = Some(800.0);
    let host = FakeHost::new(fake);
    let img = run(&host, CaptureConfig::default()).await.unwrap();
    assert_eq!(host.page().captures(), 2);
    assert_eq!(img.height(), 4000);
}

#[tokio::test(start_paused = true)]
async fn frame_count_is_capped() {
    let host = FakeHost::new(FakePage::new(10_000.0, 500.0));
    let config = CaptureConfig { max_frames: 4, ..CaptureConfig::default() };
    run(&host, config).await.unwrap();
    assert_eq!(host.page().captures(), 4);
}

#[tokio::test(start_paused = true)]
async fn captures_respect_the_throttle() {
    let host = FakeHost::new(FakePage::new(2350.0, 800.0));
    run(&host, CaptureConfig::default()).await.unwrap();
    let times = host.page().capture_times.clone();
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_secs(1), "{:?}", pair[1] - pair[0]);
    }
}

#[tokio::test(start_paused = true)]
async fn empty_viewport_is_rejected() {
    let host = FakeHost::new(FakePage::new(3000.0, 0.0));
    let err = run(&host, CaptureConfig::default()).await.unwrap_err();
    assert!(matches!(err, CaptureError::CaptureFailed(_)));
}
