use reqwest::{
    StatusCode,
    header::{ACCEPT, AUTHORIZATION},
};
use url::Url;

use crate::{
    error::ShuffleError,
    spotify::{Retry, SpotifyClient},
    types::{TokenErrorResponse, TokenResponse, UserProfile},
    utils,
};

/// Constructs the Spotify authorization URL for the given state key.
///
/// The URL carries the client id, `response_type=code`, the redirect uri, the
/// state key, the configured scope and `show_dialog=true`, so the user is asked
/// to approve the application even when a grant already exists.
///
/// # Errors
///
/// [`ShuffleError::InvalidConfig`] if the configured authorization endpoint is
/// not a valid URL.
pub fn authorize_url(client: &SpotifyClient, state_key: &str) -> Result<String, ShuffleError> {
    let config = client.config();
    let url = Url::parse_with_params(
        &config.auth_url,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("state", state_key),
            ("scope", config.scope.as_str()),
            ("show_dialog", "true"),
        ],
    )
    .map_err(|e| ShuffleError::InvalidConfig {
        name: "SPOTIFY_API_AUTH_URL",
        reason: e.to_string(),
    })?;

    Ok(url.into())
}

/// Exchanges an authorization code for an access/refresh token pair.
///
/// Sends a form-encoded `authorization_code` grant to the token endpoint,
/// authenticated with the application's Basic credentials.
///
/// # Errors
///
/// - [`ShuffleError::TokenRequest`] when the endpoint answers with anything but
///   200, carrying the provider's error code
/// - [`ShuffleError::Transport`] on network or decoding failures
pub async fn request_token(
    client: &SpotifyClient,
    code: &str,
) -> Result<TokenResponse, ShuffleError> {
    let redirect_uri = client.config().redirect_uri.clone();
    token_grant(
        client,
        &[
            ("code", code),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ],
        "token exchange",
    )
    .await
}

/// Requests a fresh access token with a refresh token.
///
/// # Errors
///
/// Same as [`request_token`].
pub async fn refresh_token(
    client: &SpotifyClient,
    refresh_token: &str,
) -> Result<TokenResponse, ShuffleError> {
    token_grant(
        client,
        &[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
        "token refresh",
    )
    .await
}

async fn token_grant(
    client: &SpotifyClient,
    form: &[(&str, &str)],
    context: &'static str,
) -> Result<TokenResponse, ShuffleError> {
    let config = client.config();
    let request = client
        .http()
        .post(&config.token_url)
        .header(
            AUTHORIZATION,
            utils::basic_authorization(&config.client_id, &config.client_secret),
        )
        .header(ACCEPT, "application/json")
        .form(form);

    let response = client.send(request, Retry::RateLimitOnly, context).await?;
    let status = response.status();

    if status != StatusCode::OK {
        let body: TokenErrorResponse = response.json().await.unwrap_or_default();
        let message = match (body.error, body.error_description) {
            (Some(error), Some(description)) => format!("{error} ({description})"),
            (Some(error), None) => error,
            (None, Some(description)) => description,
            (None, None) => "no error reported".to_string(),
        };
        return Err(ShuffleError::TokenRequest {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(ShuffleError::transport(context))
}

/// Resolves the Spotify user id of the token's owner via `GET /me`.
pub async fn get_user_id(
    client: &SpotifyClient,
    access_token: &str,
) -> Result<String, ShuffleError> {
    let request = client
        .http()
        .get(client.api_url("/me"))
        .bearer_auth(access_token);

    let response = client
        .send(request, Retry::Idempotent, "identity lookup")
        .await?;

    if response.status() != StatusCode::OK {
        return Err(ShuffleError::Api {
            context: "identity lookup",
            status: response.status().as_u16(),
        });
    }

    let profile = response
        .json::<UserProfile>()
        .await
        .map_err(ShuffleError::transport("identity lookup"))?;

    Ok(profile.id)
}
