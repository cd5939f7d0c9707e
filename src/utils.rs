use actix_web::error::JsonPayloadError;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use log::debug;
use std::fmt;

#[derive(Debug)]
pub enum RequestError {
    InvalidBody(String),
    PlayersUnavailable,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBody(e) => write!(f, "Invalid request body: {}", e),
            Self::PlayersUnavailable => write!(f, "No player sample for this server"),
        }
    }
}

impl ResponseError for RequestError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::InvalidBody(_) => HttpResponse::BadRequest().body(self.to_string()),
            Self::PlayersUnavailable => HttpResponse::NotFound().body(self.to_string()),
        }
    }
}

pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    debug!("Rejected body for {}: {}", req.path(), err);
    RequestError::InvalidBody(err.to_string()).into()
}
