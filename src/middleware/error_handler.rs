use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{Error, HttpRequest, web};

use crate::utils::error::CustomError;

// Extractor failures use the same envelope as every other client error.

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> Error {
    let message = match &err {
        JsonPayloadError::ContentType => "Content type must be application/json".to_string(),
        JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
        other => format!("Invalid request body: {}", other),
    };
    CustomError::ValidationError(message).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> Error {
    CustomError::ValidationError(format!("Invalid query string: {}", err)).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> Error {
    CustomError::ValidationError(format!("Invalid path parameter: {}", err)).into()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(json_error_handler)
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(query_error_handler)
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(path_error_handler)
}
