use super::*;
use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use shared::domain::ToastLevel;

use crate::delivery::SimulatedDelivery;

const LATENCY: Duration = Duration::from_millis(1500);

/// Fails the first `failures` deliveries, then succeeds.
struct FlakyDelivery {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyDelivery {
    fn failing(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DeliveryStrategy for FlakyDelivery {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn deliver(&self, _submission: &ContactSubmission) -> Result<(), DeliveryError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(DeliveryError::Rejected { status: 502 })
        } else {
            Ok(())
        }
    }
}

fn pipeline(delivery: Arc<dyn DeliveryStrategy>) -> (ToastQueue, ContactPipeline) {
    let toasts = ToastQueue::new(Duration::from_secs(5));
    let pipeline = ContactPipeline::new(delivery, toasts.clone());
    (toasts, pipeline)
}

async fn fill(pipeline: &ContactPipeline) {
    pipeline.update_field(ContactField::Name, "Jane").await;
    pipeline.update_field(ContactField::Email, "jane@x.com").await;
    pipeline.update_field(ContactField::Message, "hi").await;
}

async fn next_change(
    rx: &mut broadcast::Receiver<ContactEvent>,
) -> (SubmissionStatus, SubmissionStatus) {
    match rx.recv().await.expect("contact event") {
        ContactEvent::StatusChanged { from, to } => (from, to),
    }
}

#[tokio::test(start_paused = true)]
async fn submission_round_trip_clears_fields_and_toasts_once() {
    let (toasts, pipeline) = pipeline(Arc::new(SimulatedDelivery::new(LATENCY)));
    let mut rx = pipeline.subscribe_events();
    fill(&pipeline).await;
    assert_eq!(pipeline.status().await, SubmissionStatus::Idle);

    pipeline.submit().await.expect("submit from idle");
    assert_eq!(pipeline.status().await, SubmissionStatus::Submitting);

    assert_eq!(
        next_change(&mut rx).await,
        (SubmissionStatus::Idle, SubmissionStatus::Submitting)
    );
    assert_eq!(
        next_change(&mut rx).await,
        (SubmissionStatus::Submitting, SubmissionStatus::Success)
    );

    assert_eq!(pipeline.fields().await, ContactFields::default());
    let visible = toasts.visible().await;
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, SUCCESS_TITLE);
    assert_eq!(visible[0].level, ToastLevel::Success);
    assert_eq!(visible[0].description, SUCCESS_DESCRIPTION);
}

#[tokio::test(start_paused = true)]
async fn dismissing_the_success_toast_returns_to_idle() {
    let (toasts, pipeline) = pipeline(Arc::new(SimulatedDelivery::new(LATENCY)));
    let mut rx = pipeline.subscribe_events();
    fill(&pipeline).await;
    pipeline.submit().await.expect("submit");
    next_change(&mut rx).await;
    next_change(&mut rx).await;

    let toast = toasts.visible().await[0].id;
    assert!(toasts.dismiss(toast).await);
    assert_eq!(
        next_change(&mut rx).await,
        (SubmissionStatus::Success, SubmissionStatus::Idle)
    );
    assert_eq!(pipeline.status().await, SubmissionStatus::Idle);

    fill(&pipeline).await;
    pipeline.submit().await.expect("a new submission is allowed again");
}

#[tokio::test(start_paused = true)]
async fn expired_success_toast_returns_to_idle() {
    let (toasts, pipeline) = pipeline(Arc::new(SimulatedDelivery::new(LATENCY)));
    let expiry = toasts.spawn_expiry();
    let mut rx = pipeline.subscribe_events();
    fill(&pipeline).await;

    let started = Instant::now();
    pipeline.submit().await.expect("submit");
    for _ in 0..3 {
        next_change(&mut rx).await;
    }
    assert_eq!(pipeline.status().await, SubmissionStatus::Idle);
    assert!(started.elapsed() >= LATENCY + toasts.default_ttl());
    assert!(toasts.is_empty().await);
    expiry.abort();
}

#[tokio::test(start_paused = true)]
async fn second_submit_while_in_flight_is_rejected() {
    let (toasts, pipeline) = pipeline(Arc::new(SimulatedDelivery::new(LATENCY)));
    let mut rx = pipeline.subscribe_events();
    fill(&pipeline).await;

    pipeline.submit().await.expect("first submit");
    assert_eq!(
        pipeline.submit().await,
        Err(SubmitRejected::NotIdle(SubmissionStatus::Submitting))
    );

    next_change(&mut rx).await;
    next_change(&mut rx).await;
    assert_eq!(
        pipeline.submit().await,
        Err(SubmitRejected::NotIdle(SubmissionStatus::Success))
    );

    tokio::time::sleep(LATENCY * 2).await;
    assert_eq!(toasts.len().await, 1);
    assert!(rx.try_recv().is_err(), "no duplicate transitions");
}

#[tokio::test(start_paused = true)]
async fn unmount_mid_flight_discards_the_completion() {
    let (toasts, pipeline) = pipeline(Arc::new(SimulatedDelivery::new(LATENCY)));
    let mut rx = pipeline.subscribe_events();
    fill(&pipeline).await;
    pipeline.submit().await.expect("submit");
    next_change(&mut rx).await;

    pipeline.unmount();
    pipeline.unmount();
    assert!(!pipeline.is_mounted());
    tokio::time::sleep(LATENCY * 2).await;

    assert!(toasts.is_empty().await);
    assert_eq!(pipeline.status().await, SubmissionStatus::Submitting);
    assert_eq!(pipeline.fields().await.name, "Jane");
    assert!(rx.try_recv().is_err());
    assert_eq!(pipeline.submit().await, Err(SubmitRejected::Unmounted));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_pipeline_mid_flight_writes_nothing() {
    let (toasts, pipeline) = pipeline(Arc::new(SimulatedDelivery::new(LATENCY)));
    fill(&pipeline).await;
    pipeline.submit().await.expect("submit");
    drop(pipeline);

    tokio::time::sleep(LATENCY * 2).await;
    assert!(toasts.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn failed_delivery_keeps_fields_and_offers_retry() {
    let (toasts, pipeline) = pipeline(Arc::new(FlakyDelivery::failing(1)));
    let mut rx = pipeline.subscribe_events();
    fill(&pipeline).await;

    assert_eq!(pipeline.retry().await, Err(SubmitRejected::NothingToRetry));
    pipeline.submit().await.expect("submit");
    next_change(&mut rx).await;
    assert_eq!(
        next_change(&mut rx).await,
        (SubmissionStatus::Submitting, SubmissionStatus::Error)
    );

    assert_eq!(pipeline.fields().await.email, "jane@x.com");
    assert_eq!(
        pipeline.last_error().await,
        Some(DeliveryError::Rejected { status: 502 })
    );
    let failure = toasts.visible().await;
    assert_eq!(failure.len(), 1);
    assert_eq!(failure[0].title, FAILURE_TITLE);
    assert_eq!(failure[0].level, ToastLevel::Error);
    assert_eq!(failure[0].action_label.as_deref(), Some(RETRY_LABEL));
    assert_eq!(
        pipeline.submit().await,
        Err(SubmitRejected::NotIdle(SubmissionStatus::Error))
    );

    pipeline.retry().await.expect("retry from error");
    assert_eq!(
        next_change(&mut rx).await,
        (SubmissionStatus::Error, SubmissionStatus::Submitting)
    );
    assert_eq!(pipeline.last_error().await, None);
    assert_eq!(
        next_change(&mut rx).await,
        (SubmissionStatus::Submitting, SubmissionStatus::Success)
    );
    assert!(pipeline.fields().await.is_empty());

    let shown: Vec<_> = toasts
        .visible()
        .await
        .into_iter()
        .map(|toast| (toast.title, toast.action_label))
        .collect();
    assert_eq!(shown, vec![(SUCCESS_TITLE.to_string(), None)]);
}

#[tokio::test]
async fn field_edits_are_allowed_in_any_status() {
    let (_toasts, pipeline) = pipeline(Arc::new(SimulatedDelivery::new(Duration::from_secs(60))));
    pipeline.update_field(ContactField::Name, "Jane").await;
    pipeline.submit().await.expect("submit");
    pipeline.update_field(ContactField::Message, "edited").await;
    let fields = pipeline.fields().await;
    assert_eq!(fields.name, "Jane");
    assert_eq!(fields.message, "edited");
    assert_eq!(pipeline.delivery_name(), "simulated");
}
