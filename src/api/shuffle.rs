use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use super::{failure_response, views};
use crate::{
    error::ShuffleError,
    info,
    management::{Session, TokenManager},
    server::AppState,
    spotify::{playlist, tracks},
    success,
    types::{Playlist, WriteSummary},
    utils,
};

/// Form posted by the playlist selection page.
#[derive(Debug, Clone, Deserialize)]
pub struct ShuffleForm {
    pub playlist_id: String,
    pub playlist_name: String,
}

pub async fn randomize(State(state): State<AppState>, jar: PrivateCookieJar) -> Response {
    let mut session = Session::load(&jar);
    let secure = state.secure_cookies();

    match owned_playlists(&state, &mut session).await {
        Ok(playlists) if playlists.is_empty() => {
            (session.persist(jar, secure), Html(views::no_playlists())).into_response()
        }
        Ok(playlists) => {
            (session.persist(jar, secure), Html(views::playlists(&playlists))).into_response()
        }
        Err(e) => failure_response(jar, &session, secure, e),
    }
}

pub async fn randomized(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<ShuffleForm>,
) -> Response {
    let mut session = Session::load(&jar);
    let secure = state.secure_cookies();

    match shuffle_playlist(&state, &mut session, &form.playlist_id).await {
        Ok(summary) => {
            success!(
                "Shuffled {} tracks of playlist {} in {} batches",
                summary.tracks,
                form.playlist_id,
                summary.batches
            );
            (
                session.persist(jar, secure),
                Html(views::shuffled(&form.playlist_name, &summary)),
            )
                .into_response()
        }
        Err(e) => failure_response(jar, &session, secure, e),
    }
}

async fn owned_playlists(
    state: &AppState,
    session: &mut Session,
) -> Result<Vec<Playlist>, ShuffleError> {
    let user_id = session.user_id.clone().ok_or(ShuffleError::Unauthenticated)?;
    let token = TokenManager::new(&state.spotify)
        .get_valid_token(session)
        .await?;

    playlist::get_all_playlists(&state.spotify, &token, &user_id).await
}

async fn shuffle_playlist(
    state: &AppState,
    session: &mut Session,
    playlist_id: &str,
) -> Result<WriteSummary, ShuffleError> {
    if !session.is_authenticated() {
        return Err(ShuffleError::Unauthenticated);
    }
    if !utils::is_valid_playlist_id(playlist_id) {
        return Err(ShuffleError::InvalidPlaylist(playlist_id.to_string()));
    }

    let token = TokenManager::new(&state.spotify)
        .get_valid_token(session)
        .await?;

    let mut items = tracks::get_all_playlist_items(&state.spotify, &token, playlist_id).await?;
    info!("Fetched {} tracks of playlist {}", items.len(), playlist_id);

    utils::shuffle_tracks(&mut items);
    tracks::write_tracks(&state.spotify, &token, playlist_id, &items).await
}
