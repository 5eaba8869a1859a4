use std::collections::HashMap;
use std::time::SystemTime;

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::identity::Provider;
use crate::error::AppError;
use crate::extractors::current_user::CurrentUser;
use crate::services::sessions;
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// 302 to the provider-authorize endpoint.
fn authorize(provider: Provider, app_state: &AppState) -> Result<HttpResponse, AppError> {
    let location = app_state
        .providers
        .endpoints(provider)
        .authorize_redirect(provider)?;

    let mut response = HttpResponse::Found();
    response.insert_header((header::LOCATION, location));

    // Apple's handshake is POST-based downstream; make sure no intermediary
    // replays a cached authorize response.
    if provider == Provider::Apple {
        response
            .insert_header((header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"))
            .insert_header((header::PRAGMA, "no-cache"))
            .insert_header((header::EXPIRES, "0"));
    }

    Ok(response.finish())
}

/// Common callback tail: verified profile -> token pair -> redirect to the
/// client with the pair in the query string (redirect delivery transport).
async fn complete_callback(
    provider: Provider,
    params: HashMap<String, String>,
    app_state: &AppState,
) -> Result<HttpResponse, AppError> {
    let profile = app_state.profile_fetcher.fetch(provider, &params).await?;
    let pair = sessions::login(provider, &profile, SystemTime::now(), &app_state.security)?;

    let location = format!(
        "{}/?{}",
        app_state.providers.client_origin.trim_end_matches('/'),
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("accessToken", &pair.access_token)
            .append_pair("refreshToken", &pair.refresh_token)
            .finish()
    );

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish())
}

async fn google_authorize(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    authorize(Provider::Google, &app_state)
}

async fn apple_authorize(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    authorize(Provider::Apple, &app_state)
}

async fn google_callback(
    query: web::Query<HashMap<String, String>>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    complete_callback(Provider::Google, query.into_inner(), &app_state).await
}

/// Apple's provider posts the callback parameters back as a form.
async fn apple_callback(
    form: web::Form<HashMap<String, String>>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    complete_callback(Provider::Apple, form.into_inner(), &app_state).await
}

async fn refresh(
    req: web::Json<RefreshRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.refresh_token.trim().is_empty() {
        return Err(AppError::unauthorized());
    }

    let pair = sessions::refresh(&req.refresh_token, SystemTime::now(), &app_state.security)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            e
        })?;

    Ok(HttpResponse::Ok().json(pair))
}

async fn logout(user: CurrentUser) -> Result<HttpResponse, AppError> {
    sessions::logout(&user.0.sub);

    Ok(HttpResponse::Ok().json(LogoutResponse {
        message: "logged out".to_string(),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/google/authorize", web::get().to(google_authorize))
            .route("/google/callback", web::get().to(google_callback))
            .route("/apple/authorize", web::get().to(apple_authorize))
            .route("/apple/callback", web::post().to(apple_callback))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout)),
    );
}
