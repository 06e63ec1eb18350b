use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Aggregate root for one compensation request. Carries denormalized
/// copies of the computed amounts so listings never join into the
/// sub-record tables.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct EvpSubmission {
    pub id: u64,
    pub employee_id: u64,
    pub user_id: u64,
    pub is_prime: bool,
    pub is_conge: bool,
    pub montant_calcule: Option<Decimal>,
    pub indemnite_calculee: Option<Decimal>,
    pub valide_service: bool,
    pub valide_division: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
