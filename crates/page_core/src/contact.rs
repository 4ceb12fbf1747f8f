//! Contact form state and its submission lifecycle.
//!
//! `Idle -> Submitting -> Success -> Idle` on delivery, with the return to
//! `Idle` gated on the success toast leaving the screen. A failed delivery
//! parks the form in `Error` with its fields intact until [`ContactPipeline::retry`].

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex as StdMutex, PoisonError,
};

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use shared::{
    domain::{ContactField, SubmissionId, SubmissionStatus, ToastId},
    error::DeliveryError,
    protocol::{ContactFields, ContactSubmission},
};
use thiserror::Error;
use tokio::{
    sync::{broadcast, Mutex},
    time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
    delivery::DeliveryStrategy,
    toast::{ToastDraft, ToastQueue},
};

pub const SUCCESS_TITLE: &str = "Message sent!";
pub const SUCCESS_DESCRIPTION: &str =
    "Thanks for reaching out. I usually respond within 24-48 hours.";
pub const FAILURE_TITLE: &str = "Message not sent";
pub const RETRY_LABEL: &str = "Retry";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("the form only accepts a submission while idle (currently {0:?})")]
    NotIdle(SubmissionStatus),
    #[error("there is no failed delivery to retry")]
    NothingToRetry,
    #[error("the contact form is no longer mounted")]
    Unmounted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactEvent {
    StatusChanged {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
}

#[derive(Default)]
struct ContactForm {
    fields: ContactFields,
    status: SubmissionStatus,
    last_error: Option<DeliveryError>,
    in_flight: Option<SubmissionId>,
    /// Failure toast still offering the retry action.
    failure_toast: Option<ToastId>,
}

/// Lifetime of the mounted form. Tearing it down aborts the in-flight
/// delivery and fences off any completion that still races in.
#[derive(Clone, Default)]
struct MountScope {
    torn_down: Arc<AtomicBool>,
    task: Arc<StdMutex<Option<AbortHandle>>>,
}

impl MountScope {
    fn is_mounted(&self) -> bool {
        !self.torn_down.load(Ordering::Acquire)
    }

    fn track(&self) -> AbortRegistration {
        let (handle, registration) = AbortHandle::new_pair();
        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        registration
    }

    fn tear_down(&self) {
        self.torn_down.store(true, Ordering::Release);
        if let Some(handle) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// Sole writer of the contact form. Feedback goes out through the shared
/// [`ToastQueue`].
pub struct ContactPipeline {
    form: Arc<Mutex<ContactForm>>,
    delivery: Arc<dyn DeliveryStrategy>,
    toasts: ToastQueue,
    events: broadcast::Sender<ContactEvent>,
    scope: MountScope,
}

impl ContactPipeline {
    pub fn new(delivery: Arc<dyn DeliveryStrategy>, toasts: ToastQueue) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            form: Arc::new(Mutex::new(ContactForm::default())),
            delivery,
            toasts,
            events,
            scope: MountScope::default(),
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ContactEvent> {
        self.events.subscribe()
    }

    pub fn delivery_name(&self) -> &'static str {
        self.delivery.name()
    }

    pub fn is_mounted(&self) -> bool {
        self.scope.is_mounted()
    }

    pub async fn update_field(&self, field: ContactField, value: impl Into<String>) {
        self.form.lock().await.fields.set(field, value);
    }

    pub async fn fields(&self) -> ContactFields {
        self.form.lock().await.fields.clone()
    }

    pub async fn status(&self) -> SubmissionStatus {
        self.form.lock().await.status
    }

    pub async fn last_error(&self) -> Option<DeliveryError> {
        self.form.lock().await.last_error.clone()
    }

    /// Starts delivering the current fields. Field validation is the
    /// caller's job; see [`ContactFields::validate`].
    pub async fn submit(&self) -> Result<SubmissionId, SubmitRejected> {
        if !self.scope.is_mounted() {
            return Err(SubmitRejected::Unmounted);
        }
        let mut form = self.form.lock().await;
        if form.status != SubmissionStatus::Idle {
            debug!(status = ?form.status, "contact: submit ignored");
            return Err(SubmitRejected::NotIdle(form.status));
        }
        Ok(self.start_delivery(&mut form))
    }

    /// Re-sends the preserved fields after a failed delivery.
    pub async fn retry(&self) -> Result<SubmissionId, SubmitRejected> {
        if !self.scope.is_mounted() {
            return Err(SubmitRejected::Unmounted);
        }
        let mut form = self.form.lock().await;
        if form.status != SubmissionStatus::Error {
            return Err(SubmitRejected::NothingToRetry);
        }
        let id = self.start_delivery(&mut form);
        if let Some(toast) = form.failure_toast.take() {
            self.toasts.dismiss(toast).await;
        }
        Ok(id)
    }

    /// Tears the form down. Idempotent; also runs on drop.
    pub fn unmount(&self) {
        if self.scope.is_mounted() {
            debug!("contact: form unmounted");
        }
        self.scope.tear_down();
    }

    fn start_delivery(&self, form: &mut ContactForm) -> SubmissionId {
        let submission = ContactSubmission {
            id: SubmissionId::new(),
            fields: form.fields.clone(),
        };
        let id = submission.id;
        let from = form.status;
        form.status = SubmissionStatus::Submitting;
        form.in_flight = Some(id);
        form.last_error = None;
        let _ = self.events.send(ContactEvent::StatusChanged {
            from,
            to: SubmissionStatus::Submitting,
        });
        info!(submission = %id, strategy = self.delivery.name(), "contact: submitting");

        let task = Completion {
            form: self.form.clone(),
            delivery: self.delivery.clone(),
            toasts: self.toasts.clone(),
            events: self.events.clone(),
            scope: self.scope.clone(),
        }
        .run(submission);
        tokio::spawn(Abortable::new(task, self.scope.track()));
        id
    }
}

impl Drop for ContactPipeline {
    fn drop(&mut self) {
        self.scope.tear_down();
    }
}

/// Everything the delivery task needs, detached from the pipeline borrow.
struct Completion {
    form: Arc<Mutex<ContactForm>>,
    delivery: Arc<dyn DeliveryStrategy>,
    toasts: ToastQueue,
    events: broadcast::Sender<ContactEvent>,
    scope: MountScope,
}

impl Completion {
    async fn run(self, submission: ContactSubmission) {
        let id = submission.id;
        let outcome = self.delivery.deliver(&submission).await;

        let success_toast = {
            let mut form = self.form.lock().await;
            if !self.scope.is_mounted() || form.in_flight != Some(id) {
                debug!(submission = %id, "contact: discarding stale delivery result");
                return;
            }
            form.in_flight = None;
            match outcome {
                Ok(()) => {
                    form.status = SubmissionStatus::Success;
                    form.fields.clear();
                    self.changed(SubmissionStatus::Submitting, SubmissionStatus::Success);
                    info!(submission = %id, "contact: delivered");
                    let toast = ToastDraft::success(SUCCESS_TITLE, SUCCESS_DESCRIPTION);
                    Some(self.toasts.push(toast, Instant::now()).await)
                }
                Err(err) => {
                    warn!(submission = %id, error = %err, "contact: delivery failed");
                    let toast = ToastDraft::error(FAILURE_TITLE, err.to_string()).with_action(RETRY_LABEL);
                    form.status = SubmissionStatus::Error;
                    form.last_error = Some(err);
                    self.changed(SubmissionStatus::Submitting, SubmissionStatus::Error);
                    form.failure_toast = Some(self.toasts.push(toast, Instant::now()).await);
                    None
                }
            }
        };

        let Some(toast_id) = success_toast else {
            return;
        };
        self.toasts.wait_removed(toast_id).await;

        let mut form = self.form.lock().await;
        if self.scope.is_mounted() && form.status == SubmissionStatus::Success {
            form.status = SubmissionStatus::Idle;
            self.changed(SubmissionStatus::Success, SubmissionStatus::Idle);
        }
    }

    fn changed(&self, from: SubmissionStatus, to: SubmissionStatus) {
        let _ = self.events.send(ContactEvent::StatusChanged { from, to });
    }
}

#[cfg(test)]
#[path = "tests/contact_tests.rs"]
mod tests;
