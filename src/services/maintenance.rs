use crate::{
    errors::ServiceError,
    services::{
        history::{ArchiveOutcome, HistoryService},
        reservations::ReservationService,
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MaintenanceReport {
    pub reminders_due: usize,
    pub archived: ArchiveOutcome,
}

/// Periodic pass over reservations: tomorrow's reminders, then archiving.
#[derive(Clone)]
pub struct MaintenanceWorker {
    reservations: Arc<ReservationService>,
    history: Arc<HistoryService>,
    interval: Duration,
}

impl MaintenanceWorker {
    pub fn new(
        reservations: Arc<ReservationService>,
        history: Arc<HistoryService>,
        interval: Duration,
    ) -> Self {
        Self {
            reservations,
            history,
            interval,
        }
    }

    /// A failing reminder pass does not prevent archiving.
    pub async fn run_once(&self) -> Result<MaintenanceReport, ServiceError> {
        let reminders_due = match self.reservations.send_due_reminders().await {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Reminder pass failed");
                0
            }
        };
        let archived = self.history.archive().await?;
        Ok(MaintenanceReport {
            reminders_due,
            archived,
        })
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = self.interval.as_secs(), "Starting maintenance worker");
            let mut interval_timer = tokio::time::interval(self.interval);

            loop {
                interval_timer.tick().await;
                match self.run_once().await {
                    Ok(report) => debug!(?report, "Maintenance pass completed"),
                    Err(e) => error!(error = %e, "Maintenance pass failed"),
                }
            }
        })
    }
}
