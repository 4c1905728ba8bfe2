use axum::{
    extract::{Query, State},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use crate::{
    error::ShuffleError,
    management::{Session, TokenManager},
    server::AppState,
    success, warning,
};

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn callback(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Query(params): Query<CallbackParams>,
) -> (PrivateCookieJar, Redirect) {
    let mut session = Session::load(&jar);

    match complete_authorization(&state, &mut session, params).await {
        Ok(()) => {
            success!(
                "User {} signed in",
                session.user_id.as_deref().unwrap_or_default()
            );
            (
                session.persist(jar, state.secure_cookies()),
                Redirect::to("/randomize"),
            )
        }
        Err(e) => {
            warning!("Authorization failed: {}", e);
            (Session::clear(jar), Redirect::to("/index"))
        }
    }
}

async fn complete_authorization(
    state: &AppState,
    session: &mut Session,
    params: CallbackParams,
) -> Result<(), ShuffleError> {
    // The key is single use, whatever the outcome.
    let expected = session.take_state_key();
    match (params.state.as_deref(), expected.as_deref()) {
        (Some(received), Some(expected)) if received == expected => {}
        _ => return Err(ShuffleError::StateMismatch),
    }

    if let Some(error) = params.error {
        return Err(ShuffleError::AuthorizationDenied(error));
    }

    let code = params
        .code
        .ok_or_else(|| ShuffleError::AuthorizationDenied("no authorization code".to_string()))?;

    TokenManager::new(&state.spotify)
        .exchange_code(&code, session)
        .await
}
