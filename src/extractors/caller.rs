//! Resolve the caller key from the peer socket address (machine-level, not per user).

use crate::error::AppError;
use crate::tenant::CallerKey;
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use std::net::SocketAddr;

/// Extractor for the calling machine's key. Requires the server to be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Clone, Debug)]
pub struct Caller(pub CallerKey);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Caller(CallerKey::from(addr.ip())))
            .ok_or_else(|| AppError::BadRequest("caller address unavailable".into()))
    }
}
