//! Realtime pacer behavior: pacing, idempotent polls, completion, restart

use liftwatch_core::{BoundingBox, Detection};
use liftwatch_vision::video::{NullSinkFactory, SyntheticProvider, VideoFile};
use liftwatch_vision::{MonitorConfig, MonitorService, StubDetector};
use std::sync::Arc;
use std::time::Duration;

fn emt_detection() -> Detection {
    Detection::new("EMTLOGO", 0.9, BoundingBox::new(5, 5, 40, 40))
}

fn service_with(
    fps: f64,
    frames: u64,
    detector: StubDetector,
) -> (MonitorService, SyntheticProvider) {
    let provider = SyntheticProvider::new(fps, frames);
    let service = MonitorService::with_components(
        MonitorConfig::default(),
        Arc::new(provider.clone()),
        Arc::new(NullSinkFactory::new()),
        Some(Arc::new(detector)),
    )
    .expect("service construction");
    (service, provider)
}

#[test]
fn test_start_on_missing_source_reports_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.mp4");
    let service = MonitorService::with_components(
        MonitorConfig::default(),
        Arc::new(VideoFile::new(missing)),
        Arc::new(NullSinkFactory::new()),
        Some(Arc::new(StubDetector::silent())),
    )
    .unwrap();

    let err = service.start_realtime(None).unwrap_err();
    assert_eq!(err.kind(), "source_unavailable");

    let state = service.state();
    assert!(!state.running);
    assert!(state.error.is_some());
}

#[test]
fn test_first_poll_delivers_frame_zero() {
    let (service, provider) = service_with(1.0, 10, StubDetector::new(vec![emt_detection()]));
    service.start_realtime(Some("2F".to_string())).unwrap();

    let result = service.poll_frame().unwrap();
    assert!(!result.completed);
    assert!(result.frame.is_some());
    assert_eq!(result.current_frame, 0);
    assert_eq!(provider.decode_calls(), 1);

    let state = service.state();
    assert!(state.running);
    assert_eq!(state.total_frames, 10);
    assert!(state.last_frame_jpeg.is_some());
}

#[test]
fn test_poll_is_idempotent_within_frame_interval() {
    // 1 fps: the first frame's interval is a whole second, far longer than
    // two back-to-back polls.
    let (service, provider) = service_with(1.0, 10, StubDetector::new(vec![emt_detection()]));
    service.start_realtime(None).unwrap();

    let first = service.poll_frame().unwrap();
    let second = service.poll_frame().unwrap();

    assert_eq!(first.frame, second.frame);
    assert_eq!(second.current_frame, 0);
    assert_eq!(service.state().current_frame, 0);
    // The cached path never re-decodes or re-detects.
    assert_eq!(provider.decode_calls(), 1);
}

#[test]
fn test_slow_poller_skips_to_wall_clock_frame() {
    let (service, provider) = service_with(100.0, 1000, StubDetector::silent());
    service.start_realtime(None).unwrap();

    service.poll_frame().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    let result = service.poll_frame().unwrap();

    // ~10 frames of video time passed; the pacer seeks, it does not decode
    // the intermediate frames.
    assert!(result.current_frame >= 5);
    assert_eq!(provider.decode_calls(), 2);
}

#[test]
fn test_playback_completes_when_clock_passes_the_tail() {
    let (service, _provider) = service_with(100.0, 3, StubDetector::silent());
    service.start_realtime(None).unwrap();

    service.poll_frame().unwrap();
    std::thread::sleep(Duration::from_millis(100));
    let result = service.poll_frame().unwrap();

    assert!(result.completed);
    assert_eq!(result.progress, 100);
    let perf = result.performance.expect("performance on completion");
    assert_eq!(perf.frames_processed, 1);
    assert!(perf.elapsed_secs > 0.0);
    assert!(perf.average_fps > 0.0);

    let state = service.state();
    assert!(state.completed);
    assert!(!state.running);
    assert_eq!(state.progress, 100);

    // The run is over; further polls are a client error, not a new frame.
    let err = service.poll_frame().unwrap_err();
    assert_eq!(err.kind(), "not_running");
}

#[test]
fn test_realtime_events_are_deduplicated_on_video_time() {
    let (service, _provider) = service_with(100.0, 10_000, StubDetector::new(vec![emt_detection()]));
    service.start_realtime(Some("3F".to_string())).unwrap();

    service.poll_frame().unwrap();
    std::thread::sleep(Duration::from_millis(50));
    service.poll_frame().unwrap();

    // Both polls saw a detection, but ~0.05s of video time is far inside
    // the 3s cooldown; and the raw EMTLOGO label lands as canonical EMT.
    let events = service.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].label, "EMT");
    assert_eq!(events[0].floor, "3F");
    assert!(events[0].confidence >= 0.6);
}

#[test]
fn test_stop_finalizes_and_restart_reinitializes() {
    let (service, provider) = service_with(1.0, 10, StubDetector::new(vec![emt_detection()]));
    service.start_realtime(None).unwrap();
    service.poll_frame().unwrap();

    let summary = tokio_test::block_on(service.stop()).expect("summary after stop");
    assert_eq!(summary.frames_processed, 1);
    assert!(!service.state().running);

    // Restart decodes from frame zero again and keeps the old events.
    let events_before = service.events().len();
    service.start_realtime(None).unwrap();
    let result = service.poll_frame().unwrap();
    assert_eq!(result.current_frame, 0);
    assert_eq!(provider.decode_calls(), 2);
    assert_eq!(service.events().len(), events_before + 1);
}
