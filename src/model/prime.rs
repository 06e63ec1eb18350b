use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Bonus sub-record. `statut` holds the wire form of
/// [`crate::domain::workflow::SubmissionStatus`].
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Prime {
    pub id: u64,
    pub submission_id: u64,
    pub taux_monetaire: Option<Decimal>,
    pub groupe: Option<String>,
    pub nombre_postes: Option<u32>,
    pub score_equipe: Option<i32>,
    pub note_hierarchique: Option<i32>,
    pub score_collectif: Option<i32>,
    pub montant_calcule: Decimal,
    pub statut: String,
    pub submitted_at: Option<DateTime<Utc>>,
}
