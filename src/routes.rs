use crate::{
    api::{budget, employee, employee_request, submission, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/employees")
                    // /employees
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // /employees/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/evp/submissions")
                    // /evp/submissions
                    .service(
                        web::resource("")
                            .route(web::post().to(submission::create_submission))
                            .route(web::get().to(submission::list_submissions)),
                    )
                    // /evp/submissions/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(submission::get_submission))
                            .route(web::put().to(submission::update_submission))
                            .route(web::delete().to(submission::delete_submission)),
                    )
                    // /evp/submissions/{id}/submit
                    .service(
                        web::resource("/{id}/submit")
                            .route(web::put().to(submission::submit_submission)),
                    )
                    // /evp/submissions/{id}/validate
                    .service(
                        web::resource("/{id}/validate")
                            .route(web::put().to(submission::validate_submission)),
                    ),
            )
            .service(
                web::scope("/employee-requests")
                    // /employee-requests
                    .service(
                        web::resource("")
                            .route(web::post().to(employee_request::create_request))
                            .route(web::get().to(employee_request::list_requests)),
                    )
                    // /employee-requests/{id}/process
                    .service(
                        web::resource("/{id}/process")
                            .route(web::put().to(employee_request::process_request)),
                    ),
            )
            .service(
                web::scope("/users")
                    .service(
                        web::resource("")
                            .route(web::post().to(user::create_user))
                            .route(web::get().to(user::list_users)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(user::update_user))
                            .route(web::delete().to(user::delete_user)),
                    ),
            )
            .service(
                web::scope("/budgets")
                    .service(
                        web::resource("")
                            .route(web::post().to(budget::create_budget))
                            .route(web::get().to(budget::list_budgets)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(budget::update_budget))
                            .route(web::delete().to(budget::delete_budget)),
                    ),
            ),
    );
}
