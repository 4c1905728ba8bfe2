use reqwest::StatusCode;

use crate::{
    error::ShuffleError,
    spotify::{
        Retry, SpotifyClient,
        pagination::{PAGE_LIMIT, fetch_all},
    },
    types::{GetUserPlaylistsResponse, Page, Playlist},
    utils,
};

/// Retrieves one page of the user's playlists.
///
/// Only playlists owned by `user_id` are kept; followed playlists of other
/// users cannot be rewritten and are dropped. The returned `total` is the
/// provider's count before filtering, which is what drives pagination.
///
/// # Arguments
///
/// * `token` - Valid access token for Spotify API authentication
/// * `user_id` - Spotify id of the signed-in user
/// * `offset` - Index of the first playlist of the page
///
/// # Errors
///
/// [`ShuffleError::Api`] for any status other than 200, and
/// [`ShuffleError::Transport`] when the response never arrives or cannot be
/// decoded.
pub async fn get_playlist_page(
    client: &SpotifyClient,
    token: &str,
    user_id: &str,
    offset: u32,
) -> Result<Page<Playlist>, ShuffleError> {
    let request = client
        .http()
        .get(client.api_url(&format!("/users/{user_id}/playlists")))
        .bearer_auth(token)
        .query(&[
            ("limit", PAGE_LIMIT.to_string()),
            ("offset", offset.to_string()),
        ]);

    let response = client
        .send(request, Retry::Idempotent, "playlist listing")
        .await?;

    if response.status() != StatusCode::OK {
        return Err(ShuffleError::Api {
            context: "playlist listing",
            status: response.status().as_u16(),
        });
    }

    let body = response
        .json::<GetUserPlaylistsResponse>()
        .await
        .map_err(ShuffleError::transport("playlist listing"))?;

    let items = body
        .items
        .into_iter()
        .filter(|p| p.owner.is(user_id))
        .map(|p| Playlist {
            name: p.name,
            uri: p.uri,
        })
        .collect();

    Ok(Page {
        items,
        total: body.total,
        skipped: 0,
    })
}

/// Fetches all playlists owned by the user, sorted by name ignoring case.
pub async fn get_all_playlists(
    client: &SpotifyClient,
    token: &str,
    user_id: &str,
) -> Result<Vec<Playlist>, ShuffleError> {
    let mut playlists = fetch_all(|offset| get_playlist_page(client, token, user_id, offset))
        .await?
        .items;
    utils::sort_playlists(&mut playlists);
    Ok(playlists)
}
