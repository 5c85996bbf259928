use super::ApiError;
use crate::core::{Actor, ActorId};
use crate::error::ServiceDeskError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Header carrying the caller's identity, set by the upstream gate
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header set to `true` when the caller holds administrative override
pub const ACTOR_OVERRIDE_HEADER: &str = "x-actor-override";

/// The [`Actor`] of the current request
#[derive(Debug, Clone, Copy)]
pub struct RequestActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| -> Result<Option<&str>, ApiError> {
            parts
                .headers
                .get(name)
                .map(|value| {
                    value.to_str().map_err(|_| {
                        ApiError(ServiceDeskError::validation(format!(
                            "header {name} is not valid text"
                        )))
                    })
                })
                .transpose()
        };

        let id = header(ACTOR_ID_HEADER)?.ok_or_else(|| {
            ApiError(ServiceDeskError::validation(format!(
                "missing {ACTOR_ID_HEADER} header"
            )))
        })?;
        let id: ActorId = id.parse().map_err(|_| {
            ApiError(ServiceDeskError::validation(format!(
                "{ACTOR_ID_HEADER} must be a UUID"
            )))
        })?;

        let admin_override = match header(ACTOR_OVERRIDE_HEADER)? {
            None => false,
            Some(value) => value.trim().parse::<bool>().map_err(|_| {
                ApiError(ServiceDeskError::validation(format!(
                    "{ACTOR_OVERRIDE_HEADER} must be true or false"
                )))
            })?,
        };

        Ok(Self(Actor { id, admin_override }))
    }
}
