#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use playlist_shuffler::{config::Config, types::Track};

pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
pub const USER_ID: &str = "listener";

/// A request received by the mock Spotify service.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Token {
        grant_type: String,
        authorization: Option<String>,
        refresh_token: Option<String>,
    },
    Me,
    Playlists {
        user_id: String,
        offset: u32,
        limit: u32,
    },
    Tracks {
        playlist_id: String,
        offset: u32,
        limit: u32,
        fields: Option<String>,
    },
    Write {
        method: Method,
        playlist_id: String,
        uris: Vec<String>,
    },
}

/// Behaviour of the mock service.
#[derive(Debug, Clone)]
pub struct MockSettings {
    pub token_status: u16,
    pub refresh_status: u16,
    pub rotate_refresh_token: bool,
    pub token_rate_limits: u32,
    pub me_status: u16,
    /// (name, owner id) of every playlist the user can see.
    pub playlists: Vec<(String, String)>,
    pub track_count: usize,
    /// Positions of playlist items served with `"track": null`.
    pub null_tracks: Vec<usize>,
    /// Statuses returned by the next listing requests before they succeed.
    pub listing_failures: VecDeque<u16>,
    /// `Retry-After` seconds sent with a failing listing status of 429.
    pub retry_after_secs: u64,
    /// Statuses returned by the next writes; 201 once exhausted.
    pub write_statuses: VecDeque<u16>,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            token_status: 200,
            refresh_status: 200,
            rotate_refresh_token: false,
            token_rate_limits: 0,
            me_status: 200,
            playlists: Vec::new(),
            track_count: 0,
            null_tracks: Vec::new(),
            listing_failures: VecDeque::new(),
            retry_after_secs: 0,
            write_statuses: VecDeque::new(),
        }
    }
}

#[derive(Default)]
struct MockState {
    settings: Mutex<MockSettings>,
    calls: Mutex<Vec<Call>>,
}

impl MockState {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_listing_failure(&self) -> Option<Response> {
        let mut settings = self.settings.lock().unwrap();
        let status = StatusCode::from_u16(settings.listing_failures.pop_front()?).unwrap();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = settings.retry_after_secs.to_string();
            return Some((status, [("retry-after", retry_after)]).into_response());
        }
        Some(status.into_response())
    }
}

pub struct MockSpotify {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockSpotify {
    pub async fn start(settings: MockSettings) -> Self {
        let state = Arc::new(MockState {
            settings: Mutex::new(settings),
            calls: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/token", post(token))
            .route("/v1/me", get(me))
            .route("/v1/users/{user_id}/playlists", get(playlists))
            .route(
                "/v1/playlists/{playlist_id}/tracks",
                get(tracks).put(write).post(write),
            )
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn config(&self) -> Config {
        let mut config = Config::new(
            CLIENT_ID,
            CLIENT_SECRET,
            "http://127.0.0.1:8080/callback",
            "a-session-secret-that-is-long-enough-for-tests",
        );
        config.api_url = format!("{}/v1", self.base_url);
        config.auth_url = format!("{}/authorize", self.base_url);
        config.token_url = format!("{}/api/token", self.base_url);
        config.http_timeout = Duration::from_secs(5);
        config.max_retries = 2;
        config.retry_backoff = Duration::from_millis(1);
        config
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn token_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Token { .. }))
            .collect()
    }

    pub fn playlist_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Playlists { .. }))
            .collect()
    }

    pub fn track_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Tracks { .. }))
            .collect()
    }

    pub fn write_calls(&self) -> Vec<(Method, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Write { method, uris, .. } => Some((method, uris)),
                _ => None,
            })
            .collect()
    }

    pub fn me_calls(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Me).count()
    }
}

/// Tracks `0..n` as the mock serves them.
pub fn mock_tracks(n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| Track {
            name: format!("Track {i}"),
            uri: format!("spotify:track:t{i}"),
        })
        .collect()
}

async fn token(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let grant_type = form.get("grant_type").cloned().unwrap_or_default();
    state.record(Call::Token {
        grant_type: grant_type.clone(),
        authorization: headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        refresh_token: form.get("refresh_token").cloned(),
    });

    let mut settings = state.settings.lock().unwrap();
    if settings.token_rate_limits > 0 {
        settings.token_rate_limits -= 1;
        return (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "0")]).into_response();
    }

    let status = match grant_type.as_str() {
        "authorization_code" => settings.token_status,
        "refresh_token" => settings.refresh_status,
        _ => 400,
    };
    if status != 200 {
        return (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid authorization code"
            })),
        )
            .into_response();
    }

    let body = if grant_type == "authorization_code" {
        json!({
            "access_token": "access-1",
            "token_type": "Bearer",
            "scope": "playlist-read-private",
            "expires_in": 3600,
            "refresh_token": "refresh-1"
        })
    } else if settings.rotate_refresh_token {
        json!({
            "access_token": "access-refreshed",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "refresh-rotated"
        })
    } else {
        json!({
            "access_token": "access-refreshed",
            "token_type": "Bearer",
            "expires_in": 3600
        })
    };
    Json(body).into_response()
}

async fn me(State(state): State<Arc<MockState>>) -> Response {
    state.record(Call::Me);
    let status = state.settings.lock().unwrap().me_status;
    if status != 200 {
        return StatusCode::from_u16(status).unwrap().into_response();
    }
    Json(json!({ "id": USER_ID, "display_name": "Listener" })).into_response()
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: u32,
    offset: u32,
    fields: Option<String>,
}

async fn playlists(
    State(state): State<Arc<MockState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    state.record(Call::Playlists {
        user_id,
        offset: query.offset,
        limit: query.limit,
    });
    if let Some(response) = state.next_listing_failure() {
        return response;
    }

    let settings = state.settings.lock().unwrap();
    let items: Vec<_> = settings
        .playlists
        .iter()
        .enumerate()
        .skip(query.offset as usize)
        .take(query.limit as usize)
        .map(|(i, (name, owner))| {
            json!({
                "name": name,
                "uri": format!("spotify:playlist:pl{i}"),
                "owner": { "id": owner, "display_name": owner }
            })
        })
        .collect();

    Json(json!({ "items": items, "total": settings.playlists.len() })).into_response()
}

async fn tracks(
    State(state): State<Arc<MockState>>,
    Path(playlist_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    state.record(Call::Tracks {
        playlist_id,
        offset: query.offset,
        limit: query.limit,
        fields: query.fields,
    });
    if let Some(response) = state.next_listing_failure() {
        return response;
    }

    let settings = state.settings.lock().unwrap();
    let total = settings.track_count;
    let items: Vec<_> = mock_tracks(total)
        .into_iter()
        .enumerate()
        .skip(query.offset as usize)
        .take(query.limit as usize)
        .map(|(i, t)| {
            if settings.null_tracks.contains(&i) {
                json!({ "track": null })
            } else {
                json!({ "track": { "name": t.name, "uri": t.uri } })
            }
        })
        .collect();

    Json(json!({ "items": items, "total": total })).into_response()
}

#[derive(Debug, Deserialize)]
struct UrisBody {
    uris: Vec<String>,
}

async fn write(
    State(state): State<Arc<MockState>>,
    method: Method,
    Path(playlist_id): Path<String>,
    Json(body): Json<UrisBody>,
) -> Response {
    state.record(Call::Write {
        method,
        playlist_id,
        uris: body.uris,
    });
    let status = state
        .settings
        .lock()
        .unwrap()
        .write_statuses
        .pop_front()
        .unwrap_or(201);

    (
        StatusCode::from_u16(status).unwrap(),
        Json(json!({ "snapshot_id": "snapshot" })),
    )
        .into_response()
}
