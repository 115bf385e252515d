//! Scheduler endpoints
//!
//! The backend runs a cron-like job that refreshes data and reruns the
//! selection strategies; these wrappers inspect and toggle it.

use super::types::{MessageResponse, SchedulerLogs, SchedulerStartRequest, SchedulerStatus};
use super::ApiClient;
use crate::error::ClientError;

impl ApiClient {
    pub async fn scheduler_status(&self) -> Result<SchedulerStatus, ClientError> {
        self.execute(self.get("/scheduler/status")).await
    }

    /// Start the scheduled job, optionally overriding its cron expression.
    pub async fn start_scheduler(
        &self,
        cron_expression: Option<String>,
    ) -> Result<MessageResponse, ClientError> {
        let body = SchedulerStartRequest {
            enabled: true,
            cron_expression,
        };
        self.execute(self.post("/scheduler/start").json(&body)).await
    }

    pub async fn stop_scheduler(&self) -> Result<MessageResponse, ClientError> {
        self.execute(self.post("/scheduler/stop")).await
    }

    /// Tail of the scheduler's log file.
    pub async fn scheduler_logs(&self, lines: u32) -> Result<SchedulerLogs, ClientError> {
        self.execute(self.get("/scheduler/logs").query(&[("lines", lines)]))
            .await
    }
}
