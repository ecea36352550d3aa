//! Optimistic, debounced toggle synchronization
//!
//! Every `toggle` applies to the local subject at once. The server only hears
//! about it after a quiet period with no further toggles: each toggle cancels
//! the pending confirmation (if it has not fired yet) and schedules a new one
//! carrying the flag as it stands after that toggle. A burst of toggles
//! therefore costs at most one request.

use super::subject::{SubjectId, ToggleSubject};
use super::transport::ToggleTransport;
use crate::viewer::Viewer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default quiet period before a confirmation is sent
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(2000);

/// Result of [`ToggleSync::toggle`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// No signed-in viewer; the caller should send them to the login flow
    LoginRequired,
    /// Local state changed and a confirmation is scheduled
    Toggled { active: bool, count: u64 },
}

/// Point-in-time view of a synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleState {
    pub active: bool,
    pub count: u64,
    /// A confirmation is scheduled and has not fired yet
    pub pending: bool,
    /// Message of the last failed confirmation
    pub last_error: Option<String>,
}

struct Pending {
    generation: u64,
    engage: bool,
    handle: JoinHandle<()>,
}

struct Inner {
    subject: ToggleSubject,
    generation: u64,
    pending: Option<Pending>,
    last_error: Option<String>,
    /// Generation of the newest confirmation whose result was recorded
    settled: u64,
}

/// Optimistic toggle with a debounced server confirmation
///
/// A failed confirmation is recorded in [`ToggleState::last_error`] but the
/// local flip is kept. Dropping the synchronizer leaves a scheduled
/// confirmation running.
///
/// # Example
///
/// ```rust,ignore
/// let like = ToggleSync::new(
///     ToggleSubject::from_post(&post, &viewer),
///     viewer,
///     Arc::new(HttpToggleTransport::new(client)),
/// );
///
/// match like.toggle() {
///     ToggleOutcome::LoginRequired => redirect_to_login(),
///     ToggleOutcome::Toggled { active, count } => render(active, count),
/// }
/// ```
pub struct ToggleSync {
    inner: Arc<Mutex<Inner>>,
    transport: Arc<dyn ToggleTransport>,
    viewer: Viewer,
    quiet_period: Duration,
}

impl ToggleSync {
    pub fn new(subject: ToggleSubject, viewer: Viewer, transport: Arc<dyn ToggleTransport>) -> Self {
        Self::with_quiet_period(subject, viewer, transport, DEFAULT_QUIET_PERIOD)
    }

    pub fn with_quiet_period(
        subject: ToggleSubject,
        viewer: Viewer,
        transport: Arc<dyn ToggleTransport>,
        quiet_period: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                subject,
                generation: 0,
                pending: None,
                last_error: None,
                settled: 0,
            })),
            transport,
            viewer,
            quiet_period,
        }
    }

    fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
        inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subject_id(&self) -> SubjectId {
        Self::lock(&self.inner).subject.id().clone()
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn state(&self) -> ToggleState {
        let inner = Self::lock(&self.inner);
        ToggleState {
            active: inner.subject.active(),
            count: inner.subject.count(),
            pending: inner.pending.is_some(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Message of the last failed confirmation, if the latest attempt failed
    pub fn last_error(&self) -> Option<String> {
        Self::lock(&self.inner).last_error.clone()
    }

    /// Flip the relationship locally and (re)schedule its confirmation
    ///
    /// Must be called from within a Tokio runtime.
    pub fn toggle(&self) -> ToggleOutcome {
        if !self.viewer.is_signed_in() {
            tracing::debug!("toggle without a signed-in viewer");
            return ToggleOutcome::LoginRequired;
        }

        let mut inner = Self::lock(&self.inner);
        let engage = inner.subject.flip();
        let count = inner.subject.count();

        if let Some(previous) = inner.pending.take() {
            previous.handle.abort();
        }

        inner.generation += 1;
        let generation = inner.generation;
        let handle = tokio::spawn(Self::confirm_after_quiet_period(
            Arc::clone(&self.inner),
            Arc::clone(&self.transport),
            self.quiet_period,
            generation,
        ));
        inner.pending = Some(Pending {
            generation,
            engage,
            handle,
        });

        tracing::debug!(subject = %inner.subject.id(), active = engage, count, "toggled");
        ToggleOutcome::Toggled { active: engage, count }
    }

    /// Send a scheduled confirmation now instead of waiting out the quiet period
    ///
    /// Returns `false` when nothing was pending.
    pub async fn flush(&self) -> bool {
        let (subject, pending) = {
            let mut inner = Self::lock(&self.inner);
            let Some(pending) = inner.pending.take() else {
                return false;
            };
            pending.handle.abort();
            (inner.subject.id().clone(), pending)
        };

        Self::send(
            &self.inner,
            self.transport.as_ref(),
            &subject,
            pending.engage,
            pending.generation,
        )
        .await;
        true
    }

    async fn confirm_after_quiet_period(
        inner: Arc<Mutex<Inner>>,
        transport: Arc<dyn ToggleTransport>,
        quiet_period: Duration,
        generation: u64,
    ) {
        tokio::time::sleep(quiet_period).await;

        // Past this point the confirmation has fired and can no longer be
        // cancelled by a later toggle.
        let (subject, engage) = {
            let mut guard = Self::lock(&inner);
            match guard.pending.take() {
                Some(pending) if pending.generation == generation => {
                    (guard.subject.id().clone(), pending.engage)
                }
                other => {
                    guard.pending = other;
                    return;
                }
            }
        };

        Self::send(&inner, transport.as_ref(), &subject, engage, generation).await;
    }

    async fn send(
        inner: &Mutex<Inner>,
        transport: &dyn ToggleTransport,
        subject: &SubjectId,
        engage: bool,
        generation: u64,
    ) {
        let result = transport.confirm(subject, engage).await;

        let mut guard = Self::lock(inner);
        if generation < guard.settled {
            // a newer confirmation already reported; this result is outdated
            tracing::debug!(%subject, engage, generation, "ignoring outdated confirmation result");
            return;
        }
        guard.settled = generation;

        match result {
            Ok(()) => {
                tracing::debug!(%subject, engage, "toggle confirmed");
                guard.last_error = None;
            }
            Err(e) => {
                tracing::warn!(%subject, engage, error = %e, "toggle confirmation failed");
                guard.last_error = Some(e.to_string());
            }
        }
    }
}
