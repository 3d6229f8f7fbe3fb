use serde::Serialize;
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::{
    dto::format_system_time,
    services::sync_engine::SyncReport,
    state::sync::SyncStatus,
};

/// Sync indicator shown next to the player's stats.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncStatusDto {
    /// A reconciliation is running.
    pub syncing: bool,
    /// The signed-in player was reconciled since signing in.
    pub synced: bool,
    /// Message of the last failed reconciliation.
    pub last_error: Option<String>,
    /// RFC 3339 timestamp of the last successful reconciliation.
    pub last_synced_at: Option<String>,
}

impl From<SyncStatus> for SyncStatusDto {
    fn from(status: SyncStatus) -> Self {
        Self {
            syncing: status.syncing,
            synced: status.synced,
            last_error: status.last_error,
            last_synced_at: status.last_synced_at.map(format_system_time),
        }
    }
}

/// Counters of a finished reconciliation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncReportDto {
    /// Reconciled user.
    pub user_id: String,
    /// Decks whose local totals were uploaded.
    pub decks_uploaded: usize,
    /// Outbox answers inserted remotely.
    pub answers_uploaded: usize,
    /// Decks whose remote totals replaced the local ones.
    pub decks_from_remote: usize,
    /// Size of the merged answered set.
    pub answered: usize,
}

impl From<SyncReport> for SyncReportDto {
    fn from(report: SyncReport) -> Self {
        Self {
            user_id: report.user.to_string(),
            decks_uploaded: report.decks_uploaded,
            answers_uploaded: report.answers_uploaded,
            decks_from_remote: report.decks_from_remote,
            answered: report.answered,
        }
    }
}

/// Response of an explicit reconciliation request.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncResponse {
    /// Counters of the run.
    pub report: SyncReportDto,
    /// Sync indicator after the run.
    pub status: SyncStatusDto,
}
