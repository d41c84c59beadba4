use super::request_stop;
use crate::counters::UserCounters;
use crate::events::{EventEmitter, SpamEvent};
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::status::{RunStatus, StatusFlag};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// What an observer sees after every iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpamView {
    pub counters: UserCounters,
    pub rpc_url: String,
}

/// Cheap, cloneable window onto a running spammer for the presentation layer.
#[derive(Debug, Clone)]
pub struct SpamHandle {
    status: StatusFlag,
    events: EventEmitter,
    metrics: Arc<MetricsCollector>,
    view: watch::Receiver<SpamView>,
}

impl SpamHandle {
    pub(super) fn new(
        status: StatusFlag,
        events: EventEmitter,
        metrics: Arc<MetricsCollector>,
        view: watch::Receiver<SpamView>,
    ) -> Self {
        Self {
            status,
            events,
            metrics,
            view,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status.get()
    }

    /// Request a cooperative stop; honoured at the top of the next iteration.
    pub fn stop(&self) -> bool {
        request_stop(&self.status, &self.events)
    }

    pub fn user_counters(&self) -> UserCounters {
        self.view.borrow().counters.clone()
    }

    pub fn active_rpc_url(&self) -> String {
        self.view.borrow().rpc_url.clone()
    }

    pub fn view(&self) -> SpamView {
        self.view.borrow().clone()
    }

    /// Wait for the next published view. Returns false once the spammer is gone.
    pub async fn changed(&mut self) -> bool {
        self.view.changed().await.is_ok()
    }

    pub fn set_event_handler<F>(&self, handler: F)
    where
        F: Fn(&SpamEvent) + Send + Sync + 'static,
    {
        self.events.set_handler(handler);
    }

    pub fn remove_event_handler(&self) {
        self.events.remove_handler();
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
