use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

use crate::auth::identity::Credentials;
use crate::errors::ApiErrorResponse;

/// Middleware function that rejects requests carrying no credentials at all.
/// Token verification itself happens in the `Identity` extractor.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let credentials = Credentials::from_request(req.request());

    if credentials.is_empty() {
        let response = HttpResponse::Unauthorized().json(ApiErrorResponse {
            error: "Unauthorized".to_string(),
        });
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
