use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use super::{failure_response, views};
use crate::{management::Session, server::AppState, spotify};

pub async fn index(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut session = Session::load(&jar);
    let state_key = session.begin_authorization();

    match spotify::auth::authorize_url(&state.spotify, &state_key) {
        Ok(url) => (
            session.persist(jar, state.secure_cookies()),
            Html(views::index(&url)),
        )
            .into_response(),
        Err(e) => failure_response(jar, &session, state.secure_cookies(), e),
    }
}

pub async fn forward(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut session = Session::load(&jar);
    let state_key = session.begin_authorization();

    match spotify::auth::authorize_url(&state.spotify, &state_key) {
        Ok(url) => (
            session.persist(jar, state.secure_cookies()),
            Redirect::to(&url),
        )
            .into_response(),
        Err(e) => failure_response(jar, &session, state.secure_cookies(), e),
    }
}
