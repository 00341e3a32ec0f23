//! Cancellable auto-continuation timers.
//!
//! A timer is owned by the session that armed it. Cancelling it, or
//! dropping it, stops the delayed task before it fires. A timer that has
//! already fired is unaffected by either.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::trace;

use super::flow_state::NodeKind;
use super::session::CallId;

/// What a timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinuationPurpose {
    /// Advance to the next node without external input
    Advance,
    /// End the session and hang up the call
    Finish,
}

/// Identity of the dispatch that armed a timer
///
/// A ticket is only honored while the session is still on the same node
/// kind and the same dispatch epoch it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationTicket {
    pub call_id: CallId,
    pub node_kind: NodeKind,
    pub epoch: u64,
    pub purpose: ContinuationPurpose,
}

/// A pending delayed task bound to one session
#[derive(Debug)]
pub struct ContinuationTimer {
    ticket: ContinuationTicket,
    due_at: DateTime<Utc>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl ContinuationTimer {
    /// Spawn `on_fire` to run after `delay` unless cancelled first
    pub fn spawn(
        ticket: ContinuationTicket,
        delay: Duration,
        on_fire: BoxFuture<'static, ()>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let due_at = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());

        let call_id = ticket.call_id.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => on_fire.await,
                _ = cancel_rx => {
                    trace!(call_id = %call_id, "Continuation timer cancelled");
                }
            }
        });

        Self {
            ticket,
            due_at,
            cancel_tx: Some(cancel_tx),
        }
    }

    /// The ticket this timer will present when it fires
    pub fn ticket(&self) -> &ContinuationTicket {
        &self.ticket
    }

    /// Wall-clock time the timer is due
    pub fn due_at(&self) -> DateTime<Utc> {
        self.due_at
    }

    /// Stop the timer if it has not fired yet
    pub fn cancel(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}
