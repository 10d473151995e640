//! Request extractors that report failures through [`AppError`].

use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use validator::Validate;

use crate::error::AppError;

/// JSON body that is deserialized and then validated.
///
/// Malformed JSON, missing fields, wrong types and failed `validator` rules all
/// become a 400 with the usual error envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| {
                AppError::bad_request(
                    "Invalid request body",
                    json!({ "reason": rejection.body_text() }),
                )
            })?;

        value.validate()?;

        Ok(Self(value))
    }
}
