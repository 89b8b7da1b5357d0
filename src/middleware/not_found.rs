use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::{HttpResponse, Result, dev::ServiceResponse};
use serde_json::json;

/// Replaces actix's empty 404 with the JSON error envelope. Responses that
/// already carry a JSON body (handler-level not-found errors) pass through.
pub fn not_found<B>(res: ServiceResponse<B>) -> Result<ErrorHandlerResponse<B>> {
    let is_json = res
        .response()
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    if is_json {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let new_response = HttpResponse::build(StatusCode::NOT_FOUND).json(json!({
        "success": false,
        "error": "Route does not exist",
        "code": "NOT_FOUND_ERROR",
        "httpStatusCode": StatusCode::NOT_FOUND.as_u16(),
    }));
    let (req, _) = res.into_parts();
    let res = ServiceResponse::new(req, new_response.map_into_right_body());

    Ok(ErrorHandlerResponse::Response(res))
}
