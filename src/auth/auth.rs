use crate::config::Config;
use crate::error::AppError;
use crate::{model::role::Role, models::Claims};
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::decode;
use jsonwebtoken::{DecodingKey, Validation};

pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub nom: String,
    pub role: Role,

    /// Division scope, present for division-level validators.
    pub division: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        let role = match Role::from_id(data.claims.role) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Invalid role"))),
        };

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            email: data.claims.sub,
            nom: data.claims.nom,
            role,
            division: data.claims.division,
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Administrateur {
            Ok(())
        } else {
            Err(AppError::Forbidden("Administrateur only".into()))
        }
    }

    pub fn require_rh_or_admin(&self) -> Result<(), AppError> {
        if matches!(self.role, Role::Administrateur | Role::Rh) {
            Ok(())
        } else {
            Err(AppError::Forbidden("RH/Administrateur only".into()))
        }
    }

    /// A submission may only be edited by the user who opened it, or an
    /// administrator.
    pub fn require_owner_or_admin(&self, owner_id: u64) -> Result<(), AppError> {
        if self.role == Role::Administrateur || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only the submitter or an administrator may modify this submission".into(),
            ))
        }
    }
}
