//! Monitor service surface: mutual exclusion, detector gating, events API

use liftwatch_core::{BoundingBox, Detection, PerformanceProfile};
use liftwatch_vision::video::{NullSinkFactory, SyntheticProvider};
use liftwatch_vision::{MonitorConfig, MonitorService, StubDetector};
use std::sync::Arc;
use std::time::Duration;

fn emt_detection() -> Detection {
    Detection::new("EMT", 0.95, BoundingBox::new(10, 10, 50, 50))
}

fn build_service(detector: Option<Arc<StubDetector>>) -> MonitorService {
    let detector = detector.map(|d| d as Arc<dyn liftwatch_vision::Detector>);
    MonitorService::with_components(
        MonitorConfig::default(),
        Arc::new(SyntheticProvider::new(30.0, 90)),
        Arc::new(NullSinkFactory::new()),
        detector,
    )
    .expect("service construction")
}

async fn wait_for_batch(service: &MonitorService) {
    for _ in 0..500 {
        let state = service.state();
        if !state.running && (state.completed || state.error.is_some()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch run did not reach a terminal state in time");
}

#[tokio::test]
async fn test_realtime_start_is_rejected_while_batch_runs() {
    let detector =
        Arc::new(StubDetector::silent().with_delay(Duration::from_millis(25)));
    let service = build_service(Some(detector));

    service
        .start_batch(PerformanceProfile::Balanced, None)
        .await
        .unwrap();

    let err = service.start_realtime(None).unwrap_err();
    assert_eq!(err.kind(), "pipeline_busy");

    // The rejected start mutated nothing: the batch run still finishes
    // normally with full progress and no error.
    wait_for_batch(&service).await;
    let state = service.state();
    assert!(state.completed);
    assert_eq!(state.progress, 100);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_batch_start_is_rejected_while_realtime_runs() {
    let service = build_service(Some(Arc::new(StubDetector::silent())));
    service.start_realtime(None).unwrap();
    service.poll_frame().unwrap();

    let err = service
        .start_batch(PerformanceProfile::Fast, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "pipeline_busy");

    // Realtime run is untouched by the rejected start.
    assert!(service.state().running);
    service.stop().await;
}

#[tokio::test]
async fn test_missing_detector_refuses_both_pipelines() {
    let service = build_service(None);

    let err = service.start_realtime(None).unwrap_err();
    assert_eq!(err.kind(), "detector_unavailable");

    let err = service
        .start_batch(PerformanceProfile::Balanced, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "detector_unavailable");

    assert!(!service.state().running);
}

#[tokio::test]
async fn test_poll_before_start_is_an_error() {
    let service = build_service(Some(Arc::new(StubDetector::silent())));
    let err = service.poll_frame().unwrap_err();
    assert_eq!(err.kind(), "not_running");
}

#[tokio::test]
async fn test_clear_events_is_the_only_way_events_go_away() {
    let detector = Arc::new(StubDetector::new(vec![emt_detection()]));
    let service = build_service(Some(detector));

    service
        .start_batch(PerformanceProfile::Balanced, None)
        .await
        .unwrap();
    wait_for_batch(&service).await;
    assert_eq!(service.events().len(), 1);

    service.clear_events();
    assert!(service.events().is_empty());
}

#[tokio::test]
async fn test_reset_clears_outcome_but_keeps_events() {
    let detector = Arc::new(StubDetector::new(vec![emt_detection()]));
    let service = build_service(Some(detector));

    service
        .start_batch(PerformanceProfile::Balanced, None)
        .await
        .unwrap();
    wait_for_batch(&service).await;
    assert!(service.state().completed);
    assert_eq!(service.events().len(), 1);

    for _ in 0..100 {
        if service.reset().is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let state = service.state();
    assert_eq!(state.progress, 0);
    assert!(!state.completed);
    assert!(state.error.is_none());
    assert!(state.performance.is_none());
    assert_eq!(service.events().len(), 1);
}

#[tokio::test]
async fn test_reset_is_rejected_while_running() {
    let service = build_service(Some(Arc::new(StubDetector::silent())));
    service.start_realtime(None).unwrap();

    let err = service.reset().unwrap_err();
    assert_eq!(err.kind(), "pipeline_busy");
    service.stop().await;
}

#[tokio::test]
async fn test_state_snapshot_is_serializable() {
    let service = build_service(Some(Arc::new(StubDetector::silent())));
    service.start_realtime(None).unwrap();
    service.poll_frame().unwrap();

    let snapshot = service.state();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["running"], true);
    assert_eq!(json["total_frames"], 90);
    // The preview blob stays out of the serialized snapshot.
    assert!(json.get("last_frame_jpeg").is_none());
    service.stop().await;
}

#[tokio::test]
async fn test_stop_when_idle_is_a_no_op() {
    let service = build_service(Some(Arc::new(StubDetector::silent())));
    assert!(service.stop().await.is_none());
}
