//! Client metadata extractor for the auth audit log.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::USER_AGENT;
use axum::http::request::Parts;
use warden_auth::audit::RequestMeta;

/// Client IP (first `x-forwarded-for` hop, else `x-real-ip`) and user agent.
/// Never rejects; missing headers yield `None`.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip_address = header_value(parts, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .or_else(|| header_value(parts, "x-real-ip"))
            .map(str::to_string);
        let user_agent = header_value(parts, USER_AGENT.as_str()).map(str::to_string);

        Ok(ClientMeta(RequestMeta {
            ip_address,
            user_agent,
        }))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
