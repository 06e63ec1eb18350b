use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::employee_request::EmployeeRequest;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

const STATUT_EN_ATTENTE: &str = "En attente";
const STATUT_TRAITE: &str = "Traité";
const STATUT_REJETE: &str = "Rejeté";

/// A request is processed at most once; anything past `En attente` is final.
fn ensure_pending(statut: &str) -> Result<(), AppError> {
    if statut == STATUT_EN_ATTENTE {
        Ok(())
    } else {
        Err(AppError::InvalidState(format!(
            "Employee request already processed (statut '{statut}')"
        )))
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateEmployeeRequest {
    #[schema(example = "MAT-0042")]
    pub matricule: String,
    #[schema(example = "Haddad")]
    pub nom: String,
    #[schema(example = "Karim")]
    pub prenom: String,
    #[schema(example = "Nouvelle recrue au service comptabilité")]
    pub raison: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcessAction {
    Approve,
    Reject,
}

/// Processing payload. `poste`/`service`/`division` are required for an
/// approval: they complete the Employee record the request only sketches.
#[derive(Deserialize, ToSchema)]
pub struct ProcessEmployeeRequest {
    #[schema(example = "approve")]
    pub action: ProcessAction,
    #[schema(example = "Analyste")]
    pub poste: Option<String>,
    #[schema(example = "Comptabilité")]
    pub service: Option<String>,
    #[schema(example = "Finance")]
    pub division: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeRequestQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    /// Filter by status
    #[schema(example = "En attente")]
    pub statut: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeRequestListResponse {
    pub data: Vec<EmployeeRequest>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

/// Propose a new employee record.
#[utoipa::path(
    post,
    path = "/api/employee-requests",
    request_body = CreateEmployeeRequest,
    responses(
        (status = 201, description = "Request created", body = Object, example = json!({
            "id": 1,
            "message": "Employee request created",
            "statut": "En attente"
        })),
        (status = 400, description = "Empty field"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "EmployeeRequest",
    security(("bearer_auth" = []))
)]
pub async fn create_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    if payload.matricule.trim().is_empty()
        || payload.nom.trim().is_empty()
        || payload.prenom.trim().is_empty()
    {
        return Err(AppError::Validation(
            "matricule, nom and prenom must not be empty".into(),
        ));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employee_requests (matricule, nom, prenom, raison, requested_by, statut)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.matricule.trim())
    .bind(&payload.nom)
    .bind(&payload.prenom)
    .bind(&payload.raison)
    .bind(auth.user_id)
    .bind(STATUT_EN_ATTENTE)
    .execute(pool.get_ref())
    .await?;

    info!(request_id = result.last_insert_id(), "Employee request created");

    Ok(HttpResponse::Created().json(json!({
        "id": result.last_insert_id(),
        "message": "Employee request created",
        "statut": STATUT_EN_ATTENTE
    })))
}

/// List employee requests (paginated)
#[utoipa::path(
    get,
    path = "/api/employee-requests",
    params(EmployeeRequestQuery),
    responses(
        (status = 200, description = "Paginated request list", body = EmployeeRequestListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "EmployeeRequest",
    security(("bearer_auth" = []))
)]
pub async fn list_requests(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeRequestQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    if query.statut.is_some() {
        where_sql.push_str(" AND statut = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM employee_requests{}", where_sql);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(statut) = &query.statut {
        count_query = count_query.bind(statut);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT * FROM employee_requests{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_query = sqlx::query_as::<_, EmployeeRequest>(&data_sql);
    if let Some(statut) = &query.statut {
        data_query = data_query.bind(statut);
    }
    let data = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeRequestListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Process a pending request: approval creates the Employee record in the
/// same transaction that flips the status, so neither survives without the
/// other. A request can only be processed once.
#[utoipa::path(
    put,
    path = "/api/employee-requests/{request_id}/process",
    params(("request_id", Path, description = "Employee request ID")),
    request_body = ProcessEmployeeRequest,
    responses(
        (status = 200, description = "Request processed", body = Object, example = json!({
            "message": "Employee request processed",
            "statut": "Traité",
            "employee_id": 7
        })),
        (status = 400, description = "Missing poste/service/division on approval"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Already processed, or duplicate matricule")
    ),
    tag = "EmployeeRequest",
    security(("bearer_auth" = []))
)]
pub async fn process_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<ProcessEmployeeRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    let request_id = path.into_inner();

    let request =
        sqlx::query_as::<_, EmployeeRequest>("SELECT * FROM employee_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(pool.get_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee request {request_id} not found")))?;

    ensure_pending(&request.statut)?;

    match body.action {
        ProcessAction::Approve => {
            let (poste, service, division) = match (&body.poste, &body.service, &body.division) {
                (Some(p), Some(s), Some(d)) => (p, s, d),
                _ => {
                    return Err(AppError::Validation(
                        "poste, service and division are required to approve a request".into(),
                    ));
                }
            };

            let mut tx = pool.begin().await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO employees (matricule, nom, prenom, poste, service, division)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&request.matricule)
            .bind(&request.nom)
            .bind(&request.prenom)
            .bind(poste)
            .bind(service)
            .bind(division)
            .execute(&mut *tx)
            .await;

            let inserted = match inserted {
                Ok(r) => r,
                Err(sqlx::Error::Database(db_err))
                    if db_err.code().as_deref() == Some("23000") =>
                {
                    tx.rollback().await?;
                    return Err(AppError::Conflict(format!(
                        "Matricule '{}' already exists",
                        request.matricule
                    )));
                }
                Err(e) => return Err(AppError::db(e)),
            };

            // The status predicate guards against a concurrent processor.
            let updated = sqlx::query(
                r#"
                UPDATE employee_requests
                SET statut = ?, processed_by = ?, processed_at = NOW()
                WHERE id = ? AND statut = ?
                "#,
            )
            .bind(STATUT_TRAITE)
            .bind(auth.user_id)
            .bind(request_id)
            .bind(STATUT_EN_ATTENTE)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(AppError::InvalidState(
                    "Employee request already processed".into(),
                ));
            }

            tx.commit().await?;

            let employee_id = inserted.last_insert_id();
            info!(request_id, employee_id, "Employee request approved");

            Ok(HttpResponse::Ok().json(json!({
                "message": "Employee request processed",
                "statut": STATUT_TRAITE,
                "employee_id": employee_id
            })))
        }
        ProcessAction::Reject => {
            let updated = sqlx::query(
                r#"
                UPDATE employee_requests
                SET statut = ?, processed_by = ?, processed_at = NOW()
                WHERE id = ? AND statut = ?
                "#,
            )
            .bind(STATUT_REJETE)
            .bind(auth.user_id)
            .bind(request_id)
            .bind(STATUT_EN_ATTENTE)
            .execute(pool.get_ref())
            .await?;

            if updated.rows_affected() == 0 {
                return Err(AppError::InvalidState(
                    "Employee request already processed".into(),
                ));
            }

            info!(request_id, "Employee request rejected");

            Ok(HttpResponse::Ok().json(json!({
                "message": "Employee request processed",
                "statut": STATUT_REJETE
            })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_requests_can_be_processed() {
        assert!(ensure_pending(STATUT_EN_ATTENTE).is_ok());
        assert!(matches!(
            ensure_pending(STATUT_TRAITE),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            ensure_pending(STATUT_REJETE),
            Err(AppError::InvalidState(_))
        ));
    }
}
