//! Custom axum extractors for Tessera

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::Error;

/// JSON body extractor that runs `validator` rules before the handler sees the value.
///
/// Malformed bodies and rule violations both surface as `Error::Validation` (400),
/// so handlers never receive a payload that failed its declared constraints.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

/// Why a `ValidatedJson` body was refused
#[derive(Debug)]
pub enum ValidatedJsonRejection {
    /// Body was not JSON, or not the expected shape
    Json(JsonRejection),
    /// Body parsed but broke a validation rule
    Validation(Error),
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        let error = match self {
            ValidatedJsonRejection::Json(rejection) => Error::Validation(rejection.body_text()),
            ValidatedJsonRejection::Validation(error) => error,
        };
        error.into_response()
    }
}

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::Json)?;

        if let Err(errors) = payload.validate() {
            tracing::debug!(errors = %errors, "Request body failed validation");
            return Err(ValidatedJsonRejection::Validation(Error::Validation(
                format!("Validation failed: {}", errors),
            )));
        }

        Ok(ValidatedJson(payload))
    }
}
