use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};

use crate::auth::jwt::{verify_access_token, TokenClaims};
use crate::error::AppError;
use crate::extractors::auth_token::AuthToken;
use crate::state::app_state::AppState;

/// Verified claims of the caller's access token.
///
/// Extraction fails with 401 before handler logic runs if the token is
/// missing, unparseable, wrongly signed, or expired.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub TokenClaims);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let token_fut = AuthToken::from_request(req, payload);
        let req = req.clone();

        Box::pin(async move {
            let token = token_fut.await?;

            let app_state = req
                .app_data::<web::Data<AppState>>()
                .ok_or_else(|| AppError::internal("AppState not found"))?;

            let claims = verify_access_token(&token.token, &app_state.security)?;
            Ok(CurrentUser(claims))
        })
    }
}
