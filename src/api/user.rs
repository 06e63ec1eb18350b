use crate::auth::auth::AuthUser;
use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::model::role::Role;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "chef.service@entreprise.com", format = "email")]
    pub email: String,
    #[schema(example = "Chef de service")]
    pub nom: String,
    #[schema(example = "motdepasse")]
    pub password: String,
    #[schema(example = 2)]
    pub role_id: u8,
    #[schema(example = "Finance")]
    pub division: Option<String>,
}

/// Distinguishes a field that is absent from one set to `null`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub nom: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<u8>,
    /// Omit to keep the current division scope, send `null` to clear it.
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, nullable)]
    pub division: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Public projection of a user row (never the password hash).
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    pub nom: String,
    pub role_id: u8,
    pub division: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

fn validate_role(role_id: u8) -> Result<(), AppError> {
    Role::from_id(role_id)
        .map(|_| ())
        .ok_or_else(|| AppError::Validation(format!("Unknown role id {role_id}")))
}

/// Create User (admin)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Unknown role"),
        (status = 409, description = "Email already registered"),
        (status = 403, description = "Forbidden")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "email and password must not be empty".into(),
        ));
    }
    validate_role(payload.role_id)?;

    let hashed = hash_password(&payload.password).map_err(|e| {
        tracing::error!(error = %e, "Password hashing failed");
        AppError::Internal("Internal Server Error".into())
    })?;

    let result = sqlx::query(
        r#"
        INSERT INTO users (email, nom, password, role_id, division)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.email.trim())
    .bind(&payload.nom)
    .bind(&hashed)
    .bind(payload.role_id)
    .bind(&payload.division)
    .execute(pool.get_ref())
    .await;

    let result = match result {
        Ok(r) => r,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(e) => return Err(AppError::db(e)),
    };

    info!(user_id = result.last_insert_id(), "User created");

    Ok(HttpResponse::Created().json(json!({
        "id": result.last_insert_id(),
        "message": "User created"
    })))
}

/// List users (admin)
#[utoipa::path(
    get,
    path = "/api/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Paginated user list", body = UserListResponse),
        (status = 403, description = "Forbidden")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await?;

    let data = sqlx::query_as::<_, UserResponse>(
        r#"
        SELECT id, email, nom, role_id, division, is_active
        FROM users
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(per_page as i64)
    .bind(offset as i64)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Update User (admin)
#[utoipa::path(
    put,
    path = "/api/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered"),
        (status = 403, description = "Forbidden")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdateUser>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let current = sqlx::query_as::<_, UserResponse>(
        "SELECT id, email, nom, role_id, division, is_active FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

    if let Some(role_id) = body.role_id {
        validate_role(role_id)?;
    }

    let email = body.email.clone().unwrap_or(current.email);
    let nom = body.nom.clone().unwrap_or(current.nom);
    let role_id = body.role_id.unwrap_or(current.role_id);
    let division = match body.division.clone() {
        Some(scope) => scope,
        None => current.division,
    };
    let is_active = body.is_active.unwrap_or(current.is_active);

    let password = match &body.password {
        Some(p) if !p.is_empty() => Some(hash_password(p).map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            AppError::Internal("Internal Server Error".into())
        })?),
        _ => None,
    };

    let result = if let Some(hashed) = password {
        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, nom = ?, password = ?, role_id = ?, division = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(&email)
        .bind(&nom)
        .bind(&hashed)
        .bind(role_id)
        .bind(&division)
        .bind(is_active)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
    } else {
        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, nom = ?, role_id = ?, division = ?, is_active = ?
            WHERE id = ?
            "#,
        )
        .bind(&email)
        .bind(&nom)
        .bind(role_id)
        .bind(&division)
        .bind(is_active)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
    };

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({"message": "User updated"}))),
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            Err(AppError::Conflict("Email already registered".into()))
        }
        Err(e) => Err(AppError::db(e)),
    }
}

/// Delete User (admin)
#[utoipa::path(
    delete,
    path = "/api/users/{user_id}",
    params(("user_id", Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found"),
        (status = 403, description = "Forbidden")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let user_id = path.into_inner();

    let result = match sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await
    {
        Ok(r) => r,
        Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("23000") => {
            return Err(AppError::Conflict(
                "User is referenced by submissions or requests".into(),
            ));
        }
        Err(e) => return Err(AppError::db(e)),
    };

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }

    Ok(HttpResponse::Ok().json(json!({"message": "User deleted"})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_division_distinguishes_absent_null_and_value() {
        let absent: UpdateUser = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(absent.division, None);

        let cleared: UpdateUser = serde_json::from_str(r#"{"division": null}"#).unwrap();
        assert_eq!(cleared.division, Some(None));

        let set: UpdateUser = serde_json::from_str(r#"{"division": "Finance"}"#).unwrap();
        assert_eq!(set.division, Some(Some("Finance".into())));
    }
}
