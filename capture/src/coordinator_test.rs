use host::MemoryStore;
use host::message::{DATA_CATEGORY, DATA_CODE, DATA_MESSAGE, DATA_RETRYABLE};

use super::*;
use crate::browser::HostError;
use crate::browser::test_helpers::{FakeHost, FakePage, is_header, row_tag};

struct Rig {
    host: Arc<FakeHost>,
    store: Arc<MemoryStore>,
    coordinator: CaptureCoordinator,
}

fn rig(page: FakePage) -> Rig {
    rig_with_host(FakeHost::new(page))
}

fn init_tracing() {
    // Fails harmlessly once an earlier test has installed it.
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}

fn rig_with_host(host: FakeHost) -> Rig {
    init_tracing();
    let host = Arc::new(host);
    let store = Arc::new(MemoryStore::new());
    let coordinator = CaptureCoordinator::new(host.clone(), store.clone(), CaptureConfig::default());
    Rig { host, store, coordinator }
}

fn request(mode: &str) -> Message {
    Message::request(OP_CAPTURE_REQUEST, json!({ "mode": mode }))
}

fn stored_capture(store: &MemoryStore) -> RgbaImage {
    let bytes = store.get(LATEST_CAPTURE_KEY).unwrap().unwrap();
    image::load_from_memory(&bytes).unwrap().to_rgba8()
}

// =============================================================================
// visible / full
// =============================================================================

#[tokio::test(start_paused = true)]
async fn visible_capture_is_stored_and_acknowledged() {
    let r = rig(FakePage::new(3000.0, 800.0));
    let req = request("visible");
    let reply = r.coordinator.handle(&req).await.unwrap();
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.parent_id, Some(req.id));
    assert_eq!(reply.data["mode"], "visible");
    assert_eq!(reply.data["width"], 20);
    assert_eq!(reply.data["height"], 800);
    assert_eq!(reply.data["key"], LATEST_CAPTURE_KEY);
    assert_eq!(stored_capture(&r.store).dimensions(), (20, 800));
}

#[tokio::test(start_paused = true)]
async fn full_capture_stores_the_stitched_page() {
    let r = rig(FakePage::new(2350.0, 800.0));
    let reply = r.coordinator.handle(&request("full")).await.unwrap();
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.data["height"], 2350);
    assert_eq!(stored_capture(&r.store).dimensions(), (20, 2350));
}

#[tokio::test(start_paused = true)]
async fn unknown_mode_is_an_invalid_request() {
    let r = rig(FakePage::new(3000.0, 800.0));
    let reply = r.coordinator.handle(&request("panorama")).await.unwrap();
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data[DATA_CODE], "E_INVALID_REQUEST");
    assert_eq!(reply.data[DATA_CATEGORY], "invalid-request");
    assert_eq!(reply.data[DATA_RETRYABLE], false);
    assert!(r.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_page_is_environment_restricted() {
    let r = rig_with_host(FakeHost::without_target());
    let reply = r.coordinator.handle(&request("visible")).await.unwrap();
    assert_eq!(reply.data[DATA_CODE], "E_NO_ACTIVE_TARGET");
    assert_eq!(reply.data[DATA_CATEGORY], "environment-restricted");
}

#[tokio::test(start_paused = true)]
async fn capture_failures_carry_a_user_message() {
    let mut page = FakePage::new(3000.0, 800.0);
    page.fail_capture_at = Some((1, HostError::Capture("tab crashed".into())));
    let r = rig(page);
    let reply = r.coordinator.handle(&request("visible")).await.unwrap();
    assert_eq!(reply.data[DATA_CATEGORY], "capture-failed");
    assert_eq!(reply.data[DATA_MESSAGE], "The screenshot failed. Wait a moment and try again.");
    assert_eq!(reply.data[DATA_RETRYABLE], true);
}

#[tokio::test]
async fn unrelated_messages_get_no_reply() {
    let r = rig(FakePage::new(3000.0, 800.0));
    assert!(r.coordinator.handle(&Message::broadcast("board:join")).await.is_none());
    let mut done = request("visible");
    done.status = Status::Done;
    assert!(r.coordinator.handle(&done).await.is_none());
}

// =============================================================================
// selection
// =============================================================================

#[tokio::test(start_paused = true)]
async fn completed_selection_is_cropped() {
    let r = rig(FakePage::new(3000.0, 800.0));
    let mut cleanup = r.coordinator.subscribe();
    let complete = Message::request(OP_SELECTION_COMPLETE, json!({ "x": 2, "y": 3, "width": 10, "height": 5 }));

    let req = request("selection");
    let (reply, none) = tokio::join!(r.coordinator.handle(&req), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        r.coordinator.handle(&complete).await
    });
    assert!(none.is_none());
    let reply = reply.unwrap();
    assert_eq!(reply.status, Status::Done);
    assert_eq!((reply.data["width"].as_u64(), reply.data["height"].as_u64()), (Some(10), Some(5)));

    let img = stored_capture(&r.store);
    assert_eq!(img.get_pixel(0, 0)[1], 3, "crop starts at document row 3");
    assert_eq!(cleanup.recv().await.unwrap().op, OP_SELECTION_CLEANUP);
    assert!(!r.host.page().selection_active);
    assert!(!r.coordinator.selection.is_waiting());
}

#[tokio::test(start_paused = true)]
async fn canceled_selection_still_cleans_up() {
    let r = rig(FakePage::new(3000.0, 800.0));
    let mut cleanup = r.coordinator.subscribe();
    let cancel = Message::request(OP_SELECTION_CANCEL, json!({}));

    let req = request("selection");
    let (reply, _) = tokio::join!(r.coordinator.handle(&req), async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        r.coordinator.handle(&cancel).await
    });
    let reply = reply.unwrap();
    assert_eq!(reply.status, Status::Error);
    assert_eq!(reply.data[DATA_CATEGORY], "selection-canceled");
    assert_eq!(cleanup.recv().await.unwrap().op, OP_SELECTION_CLEANUP);
    assert_eq!(r.host.page().captures(), 0);
    assert!(r.store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn silent_selection_times_out() {
    let r = rig(FakePage::new(3000.0, 800.0));
    let start = tokio::time::Instant::now();
    let reply = r.coordinator.handle(&request("selection")).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(reply.data[DATA_CODE], "E_SELECTION_TIMEOUT");
    assert_eq!(reply.data[DATA_MESSAGE], "Selection timed out.");
    assert!(!r.host.page().selection_active);
    assert!(!r.coordinator.selection.is_waiting());
}

#[tokio::test(start_paused = true)]
async fn blocked_injection_releases_the_listener() {
    let mut page = FakePage::new(3000.0, 800.0);
    page.fail_script = Some(("start_selection", HostError::Injection("Cannot access a chrome:// URL".into())));
    let r = rig(page);
    let reply = r.coordinator.handle(&request("selection")).await.unwrap();
    assert_eq!(reply.data[DATA_CATEGORY], "environment-restricted");
    assert!(!r.coordinator.selection.is_waiting());
    assert_eq!(r.host.page().calls("cleanup_selection"), 1);
}

#[tokio::test]
async fn stray_selection_result_is_ignored() {
    let r = rig(FakePage::new(3000.0, 800.0));
    let complete = Message::request(OP_SELECTION_COMPLETE, json!({ "x": 0, "y": 0, "width": 1, "height": 1 }));
    assert!(r.coordinator.handle(&complete).await.is_none());
}

// =============================================================================
// dispatch loop
// =============================================================================

#[tokio::test(start_paused = true)]
async fn dispatch_loop_handles_selection_round_trip() {
    let r = rig(FakePage::new(3000.0, 800.0));
    let (reply_tx, mut reply_rx) = mpsc::channel(4);
    let inbox = spawn_coordinator(Arc::new(r.coordinator), reply_tx, 4);

    let req = request("selection");
    inbox.send(req.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    inbox
        .send(Message::request(OP_SELECTION_COMPLETE, json!({ "x": 0, "y": 0, "width": 4, "height": 4 })))
        .await
        .unwrap();

    let reply = reply_rx.recv().await.unwrap();
    assert_eq!(reply.parent_id, Some(req.id));
    assert_eq!(reply.status, Status::Done);
    assert_eq!(reply.data["width"], 4);
}

#[tokio::test(start_paused = true)]
async fn overlapping_full_captures_run_one_after_another() {
    let r = rig(FakePage::new(2400.0, 800.0).with_fixed_header(40.0));
    let host = Arc::clone(&r.host);
    let store = Arc::clone(&r.store);
    let (reply_tx, mut reply_rx) = mpsc::channel(4);
    let inbox = spawn_coordinator(Arc::new(r.coordinator), reply_tx, 4);

    inbox.send(request("full")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    inbox.send(request("full")).await.unwrap();

    for _ in 0..2 {
        let reply = reply_rx.recv().await.unwrap();
        assert_eq!(reply.status, Status::Done);
        assert_eq!(reply.data["height"], 2400);
    }

    let img = stored_capture(&store);
    for y in 0..img.height() {
        assert_eq!(row_tag(&img, y), y, "row {y}");
        assert_eq!(is_header(&img, y), y < 40, "row {y}");
    }

    let page = host.page();
    let shots: Vec<&str> = page.log.iter().filter(|e| e.starts_with("capture@")).map(String::as_str).collect();
    assert_eq!(shots, ["capture@0", "capture@800", "capture@1600", "capture@0", "capture@800", "capture@1600"]);
    let first_restore = page.log.iter().position(|e| e == "restore_hidden").unwrap();
    let second_start = page.log.iter().enumerate().filter(|(_, e)| *e == "read_metrics").nth(2).unwrap().0;
    assert!(second_start > first_restore, "second run touched the page before the first restored it");
}
