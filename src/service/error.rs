use thiserror::Error;

use crate::{
    db::DbError,
    error::{field_errors, ErrorMessage, FieldErrors, HttpError},
    service::filters::UnknownBucket,
    utils::image_utils::ImageError,
};

/// The mutation an ownership check is guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedAction {
    Update,
    Delete,
    UploadImages,
}

impl OwnedAction {
    pub fn denial(&self) -> &'static str {
        match self {
            OwnedAction::Update => "You can't update or edit a property that doesn't belong to you",
            OwnedAction::Delete => "You can't delete a property that doesn't belong to you",
            OwnedAction::UploadImages => "You can't upload images for a property that doesn't belong to you",
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{}", ErrorMessage::PropertyNotFound)]
    PropertyNotFound,

    #[error("{}", .0.denial())]
    NotOwner(OwnedAction),

    #[error("Validation error: {0:?}")]
    Validation(FieldErrors),

    #[error(transparent)]
    UnknownBucket(#[from] UnknownBucket),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::Validation(field_errors(&errors))
    }
}

impl ServiceError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ServiceError::Validation(errors)
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        match error {
            ServiceError::PropertyNotFound => HttpError::not_found(error.to_string()),

            ServiceError::NotOwner(_) => HttpError::forbidden(error.to_string()),

            ServiceError::Validation(errors) => HttpError::validation(errors),

            ServiceError::UnknownBucket(ref bucket) => {
                let mut errors = FieldErrors::new();
                errors.insert(bucket.field.to_string(), vec![bucket.to_string()]);
                HttpError::validation(errors)
            }

            ServiceError::Image(ImageError::Io(ref e)) => {
                tracing::error!("Failed to store uploaded image: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }

            ServiceError::Image(ref image_error) => {
                HttpError::bad_request(image_error.to_string())
            }

            ServiceError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                HttpError::server_error(ErrorMessage::ServerError.to_string())
            }
        }
    }
}
