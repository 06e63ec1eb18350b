use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeRequest {
    pub id: u64,
    #[schema(example = "MAT-0042")]
    pub matricule: String,
    #[schema(example = "Haddad")]
    pub nom: String,
    #[schema(example = "Karim")]
    pub prenom: String,
    #[schema(example = "Nouvelle recrue au service comptabilité")]
    pub raison: String,
    pub requested_by: u64,
    pub processed_by: Option<u64>,
    #[schema(example = "En attente")]
    pub statut: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
    #[schema(example = "2026-01-02T00:00:00Z", format = "date-time", value_type = String)]
    pub processed_at: Option<DateTime<Utc>>,
}
