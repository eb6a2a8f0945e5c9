pub mod auth;
pub mod decisions;
pub mod proposals;
pub mod votes;

use actix_web::{
    web, Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::Method,
    middleware::Next,
};

use crate::errors::ApiErrorResponse;

/// Mutations (POST/PUT/PATCH/DELETE) must be sent as JSON. A cross-site form
/// post cannot set that content type, so this doubles as the CSRF guard for
/// cookie sessions. A DELETE with no Content-Type at all is let through.
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == Method::POST || method == Method::PUT || method == Method::PATCH || method == Method::DELETE {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        let bodyless_delete = method == Method::DELETE && content_type.is_empty();
        if !bodyless_delete && !content_type.starts_with("application/json") {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Content-Type must be application/json for mutation requests".to_string(),
            });
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure API v1 routes. `/proposals/active` and `/proposals/me` are
/// registered before `/proposals/{id}` to avoid routing conflicts.
///
/// The last `wrap` runs first: missing credentials are a 401 before the
/// content-type check can answer 400.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .route("/session", web::post().to(auth::sign_in))
            .route("/session", web::delete().to(auth::sign_out))
            .route("/me", web::get().to(auth::me)),
    );
    cfg.service(
        web::scope("/proposals")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .wrap(actix_web::middleware::from_fn(crate::auth::middleware::require_auth))
            .route("", web::post().to(proposals::create))
            .route("", web::get().to(proposals::list_all))
            .route("/active", web::get().to(proposals::list_active))
            .route("/me", web::get().to(proposals::list_mine))
            .route("/{id}", web::get().to(proposals::read))
            .route("/{id}", web::put().to(proposals::update))
            .route("/{id}/close", web::patch().to(proposals::close)),
    );
    cfg.service(
        web::scope("/decisions")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .wrap(actix_web::middleware::from_fn(crate::auth::middleware::require_auth))
            .route("", web::post().to(decisions::create))
            .route("", web::get().to(decisions::list))
            .route("/{id}", web::get().to(decisions::read))
            .route("/{id}", web::patch().to(decisions::update))
            .route("/{id}/tally", web::get().to(decisions::tally)),
    );
    cfg.service(
        web::scope("/votes")
            .wrap(actix_web::middleware::from_fn(require_json_content_type))
            .wrap(actix_web::middleware::from_fn(crate::auth::middleware::require_auth))
            .route("", web::post().to(votes::create))
            .route("", web::get().to(votes::list)),
    );
}
