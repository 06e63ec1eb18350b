use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Append-only audit entry. Rows are only ever inserted; the API exposes
/// no update or delete path for this table.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ValidationHistory {
    pub id: u64,
    pub submission_id: u64,
    pub user_id: u64,
    #[schema(example = "Validé")]
    pub action: String,
    #[schema(example = "Service")]
    pub niveau: String,
    pub commentaire: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}
