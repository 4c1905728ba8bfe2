mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use common::{MockSettings, MockSpotify, USER_ID, mock_tracks};
use playlist_shuffler::server::{AppState, router};
use serde_json::Value;
use tower::ServiceExt;

fn app(mock: &MockSpotify) -> Router {
    router(AppState::new(mock.config()).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: &str, form: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(COOKIE, cookie)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap()
}

/// `name=value` part of the first Set-Cookie header.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Starts an authorization attempt and returns the session cookie with its state key.
async fn start_authorization(app: &Router) -> (String, String) {
    let response = send(app, get("/forward", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cookie = session_cookie(&response).unwrap();
    let url = url::Url::parse(location(&response)).unwrap();
    let state = url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();

    (cookie, state)
}

/// Runs the whole sign-in flow and returns the authenticated session cookie.
async fn sign_in(app: &Router) -> String {
    let (cookie, state) = start_authorization(app).await;
    let response = send(
        app,
        get(&format!("/callback?code=the-code&state={state}"), Some(&cookie)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/randomize");
    session_cookie(&response).unwrap()
}

fn owned_playlists(names: &[&str]) -> Vec<(String, String)> {
    names
        .iter()
        .map(|n| (n.to_string(), USER_ID.to_string()))
        .collect()
}

#[tokio::test]
async fn test_index_renders_login_link_and_sets_session() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);

    let response = send(&app, get("/", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    assert!(cookie.starts_with("playlist_shuffler_session="));

    let body = body_text(response).await;
    assert!(body.contains("Log in with Spotify"));
    assert!(body.contains(&format!("{}/authorize?", mock.base_url)));
}

#[tokio::test]
async fn test_forward_redirects_with_fresh_state() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);

    let (_, state) = start_authorization(&app).await;
    let (_, other) = start_authorization(&app).await;

    assert_eq!(state.len(), 15);
    assert!(
        state
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    );
    assert_ne!(state, other);
}

#[tokio::test]
async fn test_callback_with_wrong_state_resets_session() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);
    let (cookie, _) = start_authorization(&app).await;

    let response = send(
        &app,
        get("/callback?code=the-code&state=NOTTHESTATEKEY1", Some(&cookie)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/index");
    let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(mock.token_calls().is_empty());
}

#[tokio::test]
async fn test_callback_without_session_is_rejected() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);

    let response = send(&app, get("/callback?code=the-code&state=ABC", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/index");
    assert!(mock.token_calls().is_empty());
}

#[tokio::test]
async fn test_callback_with_provider_error_is_rejected() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);
    let (cookie, state) = start_authorization(&app).await;

    let response = send(
        &app,
        get(
            &format!("/callback?error=access_denied&state={state}"),
            Some(&cookie),
        ),
    )
    .await;

    assert_eq!(location(&response), "/index");
    assert!(mock.token_calls().is_empty());
}

#[tokio::test]
async fn test_state_key_cannot_be_replayed() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);
    let (cookie, state) = start_authorization(&app).await;

    let first = send(
        &app,
        get(&format!("/callback?code=the-code&state={state}"), Some(&cookie)),
    )
    .await;
    assert_eq!(location(&first), "/randomize");

    // The authenticated cookie no longer carries the key
    let signed_in = session_cookie(&first).unwrap();
    let replay = send(
        &app,
        get(&format!("/callback?code=the-code&state={state}"), Some(&signed_in)),
    )
    .await;

    assert_eq!(location(&replay), "/index");
    assert_eq!(mock.token_calls().len(), 1);
}

#[tokio::test]
async fn test_rejected_code_exchange_returns_to_index() {
    let mock = MockSpotify::start(MockSettings {
        token_status: 400,
        ..Default::default()
    })
    .await;
    let app = app(&mock);
    let (cookie, state) = start_authorization(&app).await;

    let response = send(
        &app,
        get(&format!("/callback?code=bad&state={state}"), Some(&cookie)),
    )
    .await;

    assert_eq!(location(&response), "/index");
    assert_eq!(mock.token_calls().len(), 1);
    assert_eq!(mock.me_calls(), 0);
}

#[tokio::test]
async fn test_randomize_without_session_returns_to_index() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);

    let response = send(&app, get("/randomize", None)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/index");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_randomize_lists_owned_playlists() {
    let mock = MockSpotify::start(MockSettings {
        playlists: vec![
            ("Workout".to_string(), USER_ID.to_string()),
            ("Somebody else's".to_string(), "another-user".to_string()),
            ("<Chill>".to_string(), USER_ID.to_string()),
        ],
        ..Default::default()
    })
    .await;
    let app = app(&mock);
    let cookie = sign_in(&app).await;

    let response = send(&app, get("/randomize", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Choose a playlist"));
    assert!(body.contains("value=\"pl0\""));
    assert!(body.contains("value=\"pl2\""));
    assert!(!body.contains("value=\"pl1\""));
    assert!(body.contains("&lt;Chill&gt;"));
    assert!(!body.contains("<Chill>"));
    // Sorted by name, ignoring case
    assert!(body.find("Chill").unwrap() < body.find("Workout").unwrap());
}

#[tokio::test]
async fn test_randomize_without_owned_playlists() {
    let mock = MockSpotify::start(MockSettings {
        playlists: vec![("Followed".to_string(), "another-user".to_string())],
        ..Default::default()
    })
    .await;
    let app = app(&mock);
    let cookie = sign_in(&app).await;

    let response = send(&app, get("/randomize", Some(&cookie))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No playlists found"));
}

#[tokio::test]
async fn test_full_shuffle_flow() {
    let mock = MockSpotify::start(MockSettings {
        playlists: owned_playlists(&["Road Trip"]),
        track_count: 120,
        ..Default::default()
    })
    .await;
    let app = app(&mock);
    let cookie = sign_in(&app).await;

    let response = send(
        &app,
        post_form(
            "/randomized",
            &cookie,
            "playlist_id=pl0&playlist_name=Road+Trip",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Playlist shuffled"));
    assert!(body.contains("Road Trip"));
    assert!(body.contains("120 tracks"));

    assert_eq!(mock.track_calls().len(), 3);

    let writes = mock.write_calls();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].0, "PUT");
    assert_eq!(writes[0].1.len(), 100);
    assert_eq!(writes[1].0, "POST");
    assert_eq!(writes[1].1.len(), 20);

    let mut written: Vec<String> = writes.into_iter().flat_map(|(_, uris)| uris).collect();
    let mut expected: Vec<String> = mock_tracks(120).into_iter().map(|t| t.uri).collect();
    written.sort();
    expected.sort();
    assert_eq!(written, expected);
}

#[tokio::test]
async fn test_partial_write_is_reported() {
    let mock = MockSpotify::start(MockSettings {
        playlists: owned_playlists(&["Long"]),
        track_count: 150,
        write_statuses: [201, 500].into(),
        ..Default::default()
    })
    .await;
    let app = app(&mock);
    let cookie = sign_in(&app).await;

    let response = send(
        &app,
        post_form("/randomized", &cookie, "playlist_id=pl0&playlist_name=Long"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_text(response).await;
    assert!(body.contains("Shuffle failed"));
    assert!(body.contains("after 1 of 2 batches"));
    assert!(body.contains("first 100 tracks"));
    assert_eq!(mock.write_calls().len(), 2);
}

#[tokio::test]
async fn test_playlist_with_unavailable_items_is_left_unchanged() {
    let mock = MockSpotify::start(MockSettings {
        playlists: owned_playlists(&["Old Favourites"]),
        track_count: 3,
        null_tracks: vec![1],
        ..Default::default()
    })
    .await;
    let app = app(&mock);
    let cookie = sign_in(&app).await;

    let response = send(
        &app,
        post_form(
            "/randomized",
            &cookie,
            "playlist_id=pl0&playlist_name=Old+Favourites",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("Shuffle failed"));
    assert!(body.contains("1 of the 3 entries"));
    assert!(body.contains("left unchanged"));
    assert!(mock.write_calls().is_empty());
}

#[tokio::test]
async fn test_invalid_playlist_id_is_rejected() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);
    let cookie = sign_in(&app).await;

    let response = send(
        &app,
        post_form(
            "/randomized",
            &cookie,
            "playlist_id=..%2Fme&playlist_name=Mine",
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("cannot be shuffled"));
    assert!(mock.track_calls().is_empty());
    assert!(mock.write_calls().is_empty());
}

#[tokio::test]
async fn test_shuffle_without_session_returns_to_index() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);

    let response = send(
        &app,
        post_form("/randomized", "", "playlist_id=pl0&playlist_name=Road"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/index");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_forged_cookie_is_ignored() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);

    let response = send(
        &app,
        get(
            "/randomize",
            Some("playlist_shuffler_session={\"user_id\":\"listener\"}"),
        ),
    )
    .await;

    assert_eq!(location(&response), "/index");
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_health() {
    let mock = MockSpotify::start(MockSettings::default()).await;
    let app = app(&mock);

    let response = send(&app, get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["name"], "playlist-shuffler");
}
