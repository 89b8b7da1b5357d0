use actix_web::{HttpResponse, web};

use crate::location::data;

pub async fn provinces() -> HttpResponse {
    HttpResponse::Ok().json(data::PROVINCES)
}

pub async fn districts(path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(data::districts(&path))
}

pub async fn neighborhoods(path: web::Path<(String, String)>) -> HttpResponse {
    let (province, district) = path.into_inner();
    HttpResponse::Ok().json(data::neighborhoods(&province, &district))
}
