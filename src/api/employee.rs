use crate::auth::auth::AuthUser;
use crate::error::AppError;
use crate::model::employee::Employee;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
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
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    pub matricule: Option<String>,
    pub nom: Option<String>,
    pub prenom: Option<String>,
    pub poste: Option<String>,
    pub service: Option<String>,
    pub division: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    /// Filter by division
    pub division: Option<String>,
    /// Filter by service
    pub service: Option<String>,
    /// Search by matricule, nom or prenom
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "message": "Employee created"
        })),
        (status = 409, description = "Duplicate matricule"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    if payload.matricule.trim().is_empty() || payload.nom.trim().is_empty() {
        return Err(AppError::Validation(
            "matricule and nom must not be empty".into(),
        ));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO employees (matricule, nom, prenom, poste, service, division)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.matricule.trim())
    .bind(&payload.nom)
    .bind(&payload.prenom)
    .bind(&payload.poste)
    .bind(&payload.service)
    .bind(&payload.division)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            return Err(AppError::Conflict(format!(
                "Matricule '{}' already exists",
                payload.matricule.trim()
            )));
        }
        Err(e) => return Err(AppError::db(e)),
    };

    Ok(HttpResponse::Created().json(json!({
        "id": result.last_insert_id(),
        "message": "Employee created"
    })))
}

/// List employees (paginated)
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> Result<HttpResponse, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    // ---------- build WHERE clause dynamically ----------
    let mut conditions = Vec::new();
    let mut bindings: Vec<String> = Vec::new();

    if let Some(division) = &query.division {
        conditions.push("division = ?");
        bindings.push(division.clone());
    }

    if let Some(service) = &query.service {
        conditions.push("service = ?");
        bindings.push(service.clone());
    }

    if let Some(search) = &query.search {
        conditions.push("(matricule LIKE ? OR nom LIKE ? OR prenom LIKE ?)");
        let like = format!("%{}%", search);
        bindings.push(like.clone());
        bindings.push(like.clone());
        bindings.push(like);
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // ---------- total count ----------
    let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for b in &bindings {
        count_query = count_query.bind(b);
    }

    let total = count_query.fetch_one(pool.get_ref()).await?;

    // ---------- data query ----------
    let data_sql = format!(
        "SELECT * FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for b in &bindings {
        data_query = data_query.bind(b);
    }
    data_query = data_query.bind(per_page as i64).bind(offset as i64);

    let employees = data_query.fetch_all(pool.get_ref()).await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let employee_id = path.into_inner();

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {employee_id} not found")))?;

    Ok(HttpResponse::Ok().json(employee))
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Object, example = json!({
            "message": "Employee updated"
        })),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Duplicate matricule")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    let employee_id = path.into_inner();

    let current = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Employee {employee_id} not found")))?;

    let matricule = body.matricule.clone().unwrap_or(current.matricule);
    let nom = body.nom.clone().unwrap_or(current.nom);
    let prenom = body.prenom.clone().unwrap_or(current.prenom);
    let poste = body.poste.clone().unwrap_or(current.poste);
    let service = body.service.clone().unwrap_or(current.service);
    let division = body.division.clone().unwrap_or(current.division);

    let result = sqlx::query(
        r#"
        UPDATE employees
        SET matricule = ?, nom = ?, prenom = ?, poste = ?, service = ?, division = ?
        WHERE id = ?
        "#,
    )
    .bind(&matricule)
    .bind(&nom)
    .bind(&prenom)
    .bind(&poste)
    .bind(&service)
    .bind(&division)
    .bind(employee_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({"message": "Employee updated"}))),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => Err(
            AppError::Conflict(format!("Matricule '{matricule}' already exists")),
        ),
        Err(e) => Err(AppError::db(e)),
    }
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_rh_or_admin()?;

    let employee_id = path.into_inner();

    // Submissions do not cascade: an employee with open submissions must
    // have them removed explicitly first.
    let result = match sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
    {
        Ok(r) => r,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            return Err(AppError::Conflict(
                "Employee still has submissions; delete them first".into(),
            ));
        }
        Err(e) => return Err(AppError::db(e)),
    };

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Employee {employee_id} not found"
        )));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "Successfully deleted"})))
}
