use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::monthly_budget::MonthlyBudget;
use actix_web::{HttpResponse, web};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateBudget {
    #[schema(example = "Finance")]
    pub division: String,
    #[schema(example = 3)]
    pub month: u8,
    #[schema(example = 2026)]
    pub year: u16,
    #[schema(example = "150000.00", value_type = String)]
    pub montant_prevu: Decimal,
    #[schema(example = "0.00", value_type = Option<String>)]
    pub montant_realise: Option<Decimal>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateBudget {
    #[schema(example = "160000.00", value_type = Option<String>)]
    pub montant_prevu: Option<Decimal>,
    #[schema(example = "112500.00", value_type = Option<String>)]
    pub montant_realise: Option<Decimal>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BudgetQuery {
    /// Filter by division
    pub division: Option<String>,
    /// Filter by year
    #[schema(example = 2026)]
    pub year: Option<u16>,
}

#[derive(Serialize, ToSchema)]
pub struct BudgetListResponse {
    pub data: Vec<MonthlyBudget>,
}

fn validate_budget_fields(
    month: u8,
    prevu: Option<Decimal>,
    realise: Option<Decimal>,
) -> Result<(), AppError> {
    if !(1..=12).contains(&month) {
        return Err(AppError::Validation("month must be within 1..=12".into()));
    }
    for (name, value) in [("montant_prevu", prevu), ("montant_realise", realise)] {
        if let Some(v) = value {
            if v < Decimal::ZERO {
                return Err(AppError::Validation(format!("{name} must not be negative")));
            }
        }
    }
    Ok(())
}

/// Create a monthly budget line
#[utoipa::path(
    post,
    path = "/api/budgets",
    request_body = CreateBudget,
    responses(
        (status = 201, description = "Budget created"),
        (status = 409, description = "Budget already exists for (division, month, year)"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Budget",
    security(("bearer_auth" = []))
)]
pub async fn create_budget(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateBudget>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    validate_budget_fields(
        payload.month,
        Some(payload.montant_prevu),
        payload.montant_realise,
    )?;

    let result = sqlx::query(
        r#"
        INSERT INTO monthly_budgets (division, month, year, montant_prevu, montant_realise)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&payload.division)
    .bind(payload.month)
    .bind(payload.year)
    .bind(payload.montant_prevu)
    .bind(payload.montant_realise.unwrap_or_else(|| Decimal::new(0, 2)))
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            return Err(AppError::Conflict(format!(
                "Budget already exists for {} {}/{}",
                payload.division, payload.month, payload.year
            )));
        }
        Err(e) => return Err(AppError::db(e)),
    };

    Ok(HttpResponse::Created().json(json!({
        "id": result.last_insert_id(),
        "message": "Budget created"
    })))
}

/// List budgets
#[utoipa::path(
    get,
    path = "/api/budgets",
    params(BudgetQuery),
    responses(
        (status = 200, description = "Budget list", body = BudgetListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Budget",
    security(("bearer_auth" = []))
)]
pub async fn list_budgets(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<BudgetQuery>,
) -> Result<HttpResponse, AppError> {
    let mut where_sql = String::from(" WHERE 1=1");
    if query.division.is_some() {
        where_sql.push_str(" AND division = ?");
    }
    if query.year.is_some() {
        where_sql.push_str(" AND year = ?");
    }

    let sql = format!(
        "SELECT * FROM monthly_budgets{} ORDER BY year DESC, month DESC, division ASC",
        where_sql
    );

    let mut data_query = sqlx::query_as::<_, MonthlyBudget>(&sql);
    if let Some(division) = &query.division {
        data_query = data_query.bind(division);
    }
    if let Some(year) = query.year {
        data_query = data_query.bind(year);
    }

    let data = data_query.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(BudgetListResponse { data }))
}

/// Update budget amounts
#[utoipa::path(
    put,
    path = "/api/budgets/{budget_id}",
    params(("budget_id", Path, description = "Budget ID")),
    request_body = UpdateBudget,
    responses(
        (status = 200, description = "Budget updated"),
        (status = 404, description = "Budget not found"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Budget",
    security(("bearer_auth" = []))
)]
pub async fn update_budget(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateBudget>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    let budget_id = path.into_inner();

    let current = sqlx::query_as::<_, MonthlyBudget>("SELECT * FROM monthly_budgets WHERE id = ?")
        .bind(budget_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Budget {budget_id} not found")))?;

    validate_budget_fields(current.month, body.montant_prevu, body.montant_realise)?;

    let montant_prevu = body.montant_prevu.unwrap_or(current.montant_prevu);
    let montant_realise = body.montant_realise.unwrap_or(current.montant_realise);

    sqlx::query("UPDATE monthly_budgets SET montant_prevu = ?, montant_realise = ? WHERE id = ?")
        .bind(montant_prevu)
        .bind(montant_realise)
        .bind(budget_id)
        .execute(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({"message": "Budget updated"})))
}

/// Delete budget
#[utoipa::path(
    delete,
    path = "/api/budgets/{budget_id}",
    params(("budget_id", Path, description = "Budget ID")),
    responses(
        (status = 200, description = "Budget deleted"),
        (status = 404, description = "Budget not found"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Budget",
    security(("bearer_auth" = []))
)]
pub async fn delete_budget(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    let budget_id = path.into_inner();

    let result = sqlx::query("DELETE FROM monthly_budgets WHERE id = ?")
        .bind(budget_id)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Budget {budget_id} not found")));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "Budget deleted"})))
}
