use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Serialize)]
pub struct ResponseMessage {
    pub message: String,
}

impl ResponseMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub async fn health_check() -> HttpResponse {
    tracing::info!("Health check");
    HttpResponse::Ok().json(ResponseMessage::new("Movie catalog is up"))
}
