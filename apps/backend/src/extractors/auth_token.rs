use actix_web::{dev::Payload, http::header, FromRequest, HttpRequest};
use serde::Deserialize;

use crate::error::AppError;

/// Bearer token extracted from the Authorization header, falling back to an
/// `accessToken` query parameter for contexts where headers are impractical
/// (embedded media links). The fallback is a deliberate relaxation.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
}

#[derive(Deserialize)]
struct TokenQuery {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

fn bearer_from_header(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(auth_header) = req.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::unauthorized_missing_bearer())?;

    // Parse "Bearer <token>" format
    let parts: Vec<&str> = auth_value.split_whitespace().collect();
    if parts.len() != 2 || parts[0] != "Bearer" || parts[1].is_empty() {
        return Err(AppError::unauthorized_missing_bearer());
    }

    Ok(Some(parts[1].to_string()))
}

fn token_from_query(req: &HttpRequest) -> Option<String> {
    actix_web::web::Query::<TokenQuery>::from_query(req.query_string())
        .ok()
        .and_then(|q| q.into_inner().access_token)
        .filter(|t| !t.is_empty())
}

impl FromRequest for AuthToken {
    type Error = AppError;
    type Future = std::future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match bearer_from_header(req) {
            Ok(Some(token)) => Ok(AuthToken { token }),
            Ok(None) => token_from_query(req)
                .map(|token| AuthToken { token })
                .ok_or_else(AppError::unauthorized_missing_bearer),
            Err(e) => Err(e),
        };

        std::future::ready(result)
    }
}
