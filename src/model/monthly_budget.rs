use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Per-division monthly envelope, unique on (division, month, year).
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct MonthlyBudget {
    pub id: u64,
    #[schema(example = "Finance")]
    pub division: String,
    #[schema(example = 3)]
    pub month: u8,
    #[schema(example = 2026)]
    pub year: u16,
    #[schema(example = "150000.00", value_type = String)]
    pub montant_prevu: Decimal,
    #[schema(example = "112500.00", value_type = String)]
    pub montant_realise: Decimal,
}
