use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use tramite_client::api::{RequestDetail, StatusChange};
use tramite_client::{ApprovalsApi, SessionStore};
use tramite_core::domain::history::sort_oldest_first;
use tramite_core::lifecycle::{authorize_transition, can_transition};
use tramite_core::{ApprovalRequest, NewRequest, RequestId, RequestStatus};

use crate::errors::SyncError;
use crate::notifications::NotificationEngine;

/// What became of a load once its response arrived.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied(RequestDetail),
    /// The viewed request or the session changed while the call was in
    /// flight; the response was dropped so it cannot overwrite newer state.
    Superseded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionReport {
    pub changed: bool,
    pub message: String,
}

#[derive(Default)]
struct ViewState {
    request_id: Option<RequestId>,
    view_generation: u64,
    snapshot: Option<RequestDetail>,
}

/// Owns one request's locally-cached snapshot and the transition gate.
///
/// The local [`can_transition`] predicate is advisory: it gates UI
/// affordances and spares the backend a doomed call, but the backend's
/// verdict is authoritative either way. Confirmed transitions are never
/// applied from the optimistic intent - the controller re-loads the
/// authoritative snapshot instead.
pub struct RequestController {
    api: Arc<dyn ApprovalsApi>,
    session: SessionStore,
    notifications: Option<NotificationEngine>,
    state: Mutex<ViewState>,
}

impl RequestController {
    pub fn new(api: Arc<dyn ApprovalsApi>, session: SessionStore) -> Self {
        Self { api, session, notifications: None, state: Mutex::new(ViewState::default()) }
    }

    /// Confirmed transitions will also trigger a refresh of this feed, since
    /// the backend creates notifications as a side effect the client cannot
    /// predict.
    pub fn with_notifications(mut self, notifications: NotificationEngine) -> Self {
        self.notifications = Some(notifications);
        self
    }

    /// Switches the viewed request. Bumps the view generation so an in-flight
    /// load for the previous request cannot apply late.
    pub fn open(&self, request_id: RequestId) {
        let mut state = self.lock();
        state.request_id = Some(request_id);
        state.view_generation += 1;
        state.snapshot = None;
        debug!(event_name = "lifecycle.view_opened", request_id = request_id.0, "request opened");
    }

    pub fn close(&self) {
        let mut state = self.lock();
        state.request_id = None;
        state.view_generation += 1;
        state.snapshot = None;
    }

    pub fn snapshot(&self) -> Option<RequestDetail> {
        self.lock().snapshot.clone()
    }

    /// Local transition predicate over the current session user and snapshot.
    /// Evaluated identically before enabling affordances and before issuing
    /// the transition command.
    pub fn can_transition(&self) -> bool {
        let user = self.session.current_user();
        self.lock()
            .snapshot
            .as_ref()
            .is_some_and(|snapshot| can_transition(user.as_ref(), &snapshot.request))
    }

    /// Fetches the request-plus-history snapshot and replaces the prior one
    /// wholesale, unless the view or session moved on while the call was in
    /// flight.
    pub async fn load(&self) -> Result<LoadOutcome, SyncError> {
        let (request_id, view_generation) = {
            let state = self.lock();
            (state.request_id.ok_or(SyncError::NoActiveRequest)?, state.view_generation)
        };
        let session_generation = self.session.generation();

        let mut detail = self.api.request_detail(request_id).await?;
        // Oldest-first presentation order; the stable sort keeps the
        // backend's arrival order on created_at ties.
        sort_oldest_first(&mut detail.history);

        let mut state = self.lock();
        let superseded = state.request_id != Some(request_id)
            || state.view_generation != view_generation
            || self.session.generation() != session_generation;
        if superseded {
            debug!(
                event_name = "lifecycle.load_superseded",
                request_id = request_id.0,
                "dropping late snapshot for a stale view"
            );
            return Ok(LoadOutcome::Superseded);
        }

        state.snapshot = Some(detail.clone());
        Ok(LoadOutcome::Applied(detail))
    }

    /// Issues a transition intent. A locally-denied transition never reaches
    /// the network; a confirmed `changed = true` outcome re-loads the
    /// authoritative snapshot rather than trusting the intent.
    pub async fn transition(
        &self,
        target: RequestStatus,
        comment: Option<String>,
    ) -> Result<TransitionReport, SyncError> {
        let request = self
            .lock()
            .snapshot
            .as_ref()
            .map(|snapshot| snapshot.request.clone())
            .ok_or(SyncError::NoSnapshot)?;
        let user = self.session.current_user();
        authorize_transition(user.as_ref(), &request, target)?;

        let comment = comment.map(|comment| comment.trim().to_owned()).filter(|c| !c.is_empty());
        let outcome = self
            .api
            .change_status(request.id, &StatusChange { new_status: target, comment })
            .await?;

        if outcome.changed {
            info!(
                event_name = "lifecycle.transition_confirmed",
                request_id = request.id.0,
                target = %target,
                "transition confirmed; reloading authoritative snapshot"
            );
            self.load().await?;
            if let Some(notifications) = &self.notifications {
                if let Err(error) = notifications.refresh().await {
                    warn!(
                        event_name = "lifecycle.notification_refresh_failed",
                        error = %error,
                        "notification refresh after transition failed"
                    );
                }
            }
        } else {
            info!(
                event_name = "lifecycle.transition_noop",
                request_id = request.id.0,
                message = %outcome.message,
                "backend reported an unchanged status"
            );
        }

        Ok(TransitionReport { changed: outcome.changed, message: outcome.message })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ViewState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Validates a draft before dispatch - a missing required field never issues
/// a network call - then submits the trimmed payload.
pub async fn submit_request(
    api: &dyn ApprovalsApi,
    draft: &NewRequest,
) -> Result<ApprovalRequest, SyncError> {
    draft.validate()?;
    Ok(api.create_request(&draft.normalized()).await?)
}
