use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Leave sub-record. Unlike the bonus amount, `indemnite_calculee` stays
/// NULL until every calculator input is present.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Conge {
    pub id: u64,
    pub submission_id: u64,
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
    pub nombre_jours: Option<i32>,
    pub tranche: Option<u32>,
    pub indemnite_forfaitaire: Option<Decimal>,
    pub avance_conge: bool,
    pub montant_avance: Option<Decimal>,
    pub indemnite_calculee: Option<Decimal>,
    pub statut: String,
    pub submitted_at: Option<DateTime<Utc>>,
}
