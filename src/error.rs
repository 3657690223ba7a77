use std::io::Cursor;

use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};

use crate::resolver::ResolveError;

pub type Result<T> = std::result::Result<T, Error>;
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug)]
pub struct Error(pub anyhow::Error);

#[derive(Debug)]
pub struct ApiError {
    pub error: anyhow::Error,
    pub status: Status,
}

impl<E> From<E> for Error
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Error(error.into())
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self {
            error: error.0,
            status: Status::InternalServerError,
        }
    }
}

impl From<ResolveError> for ApiError {
    fn from(error: ResolveError) -> Self {
        let status = match &error {
            ResolveError::NotFound(_) => Status::NotFound,
            ResolveError::Upstream(_) => Status::BadGateway,
            ResolveError::MalformedData(_) => Status::InternalServerError,
        };

        Self {
            error: error.into(),
            status,
        }
    }
}

pub trait WithStatus<T> {
    fn status(self, status: Status) -> ApiResult<T>;
}

impl<T> WithStatus<T> for Result<T> {
    fn status(self, status: Status) -> ApiResult<T> {
        self.map_err(|error| ApiError {
            error: error.0,
            status,
        })
    }
}

impl Responder<'_, 'static> for ApiError {
    fn respond_to(self, _: &Request<'_>) -> response::Result<'static> {
        if self.status.code >= 500 {
            let error = format!("{:#}", self.error);
            tracing::error!(status = self.status.code, %error, "Request failed");
        }

        let error = self.error.to_string();
        Response::build()
            .status(self.status)
            .sized_body(error.len(), Cursor::new(error))
            .ok()
    }
}
