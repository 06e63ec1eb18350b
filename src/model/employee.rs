use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "matricule": "MAT-0001",
        "nom": "Benali",
        "prenom": "Yasmine",
        "poste": "Analyste",
        "service": "Comptabilité",
        "division": "Finance",
        "created_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "MAT-0001")]
    pub matricule: String,

    #[schema(example = "Benali")]
    pub nom: String,

    #[schema(example = "Yasmine")]
    pub prenom: String,

    #[schema(example = "Analyste")]
    pub poste: String,

    #[schema(example = "Comptabilité")]
    pub service: String,

    #[schema(example = "Finance")]
    pub division: String,

    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: Option<DateTime<Utc>>,
}
