use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{Res, api, config::Config, error::ShuffleError, info, spotify::SpotifyClient, warning};

/// Shared state of every route handler.
#[derive(Clone)]
pub struct AppState {
    pub spotify: SpotifyClient,
    cookie_key: Key,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ShuffleError> {
        config.validate()?;
        // Key::from needs 64 bytes, which is exactly one SHA-512 digest.
        let cookie_key = Key::from(Sha512::digest(config.session_secret.as_bytes()).as_slice());
        let spotify = SpotifyClient::new(Arc::new(config))?;

        Ok(Self {
            spotify,
            cookie_key,
        })
    }

    pub fn config(&self) -> &Config {
        self.spotify.config()
    }

    pub fn secure_cookies(&self) -> bool {
        self.config().secure_cookies()
    }
}

// PrivateCookieJar extracts its key from the state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::index))
        .route("/index", get(api::index))
        .route("/forward", get(api::forward))
        .route("/callback", get(api::callback))
        .route("/randomize", get(api::randomize))
        .route("/randomized", post(api::randomized))
        .route("/health", get(api::health))
        .with_state(state)
}

pub async fn start_api_server(config: Config, open_browser: bool) -> Res<()> {
    let addr = config.server_address;
    let app = router(AppState::new(config)?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let url = format!("http://{}/", listener.local_addr()?);
    info!("Listening on {}", url);

    if open_browser && webbrowser::open(&url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            url
        );
    }

    axum::serve(listener, app).await?;
    Ok(())
}
