use reqwest::StatusCode;

use crate::{
    error::ShuffleError,
    spotify::{
        Retry, SpotifyClient,
        pagination::{PAGE_LIMIT, fetch_all},
    },
    types::{GetPlaylistItemsResponse, Page, PlaylistTracksRequest, Track, WriteSummary},
    utils, warning,
};

/// Largest number of uris the Web API accepts in one write.
pub const WRITE_BATCH_SIZE: usize = 100;

/// Field filter for item listings; only names and uris are needed.
const ITEM_FIELDS: &str = "total,items(track(name,uri))";

/// How a batch is applied to the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `PUT`: the batch becomes the full content of the playlist.
    Replace,
    /// `POST`: the batch is added to the end of the playlist.
    Append,
}

impl WriteMode {
    /// The first batch of a rewrite replaces, every later batch appends.
    pub fn for_batch(batch_index: usize) -> Self {
        if batch_index == 0 {
            WriteMode::Replace
        } else {
            WriteMode::Append
        }
    }
}

/// Retrieves one page of a playlist's tracks.
///
/// Items without a track (removed or unavailable entries) are left out of
/// `items` and counted in `skipped`. The order of the remaining tracks is
/// preserved.
///
/// # Errors
///
/// [`ShuffleError::Api`] for any status other than 200, and
/// [`ShuffleError::Transport`] when the response never arrives or cannot be
/// decoded.
pub async fn get_tracks_page(
    client: &SpotifyClient,
    token: &str,
    playlist_id: &str,
    offset: u32,
) -> Result<Page<Track>, ShuffleError> {
    let request = client
        .http()
        .get(client.api_url(&format!("/playlists/{playlist_id}/tracks")))
        .bearer_auth(token)
        .query(&[
            ("limit", PAGE_LIMIT.to_string()),
            ("offset", offset.to_string()),
            ("fields", ITEM_FIELDS.to_string()),
        ]);

    let response = client
        .send(request, Retry::Idempotent, "playlist items listing")
        .await?;

    if response.status() != StatusCode::OK {
        return Err(ShuffleError::Api {
            context: "playlist items listing",
            status: response.status().as_u16(),
        });
    }

    let body = response
        .json::<GetPlaylistItemsResponse>()
        .await
        .map_err(ShuffleError::transport("playlist items listing"))?;

    let received = body.items.len();
    let items: Vec<Track> = body.items.into_iter().filter_map(|i| i.track).collect();
    let skipped = received - items.len();
    if skipped > 0 {
        warning!(
            "Found {} unavailable items in playlist {} at offset {}",
            skipped,
            playlist_id,
            offset
        );
    }

    Ok(Page {
        items,
        total: body.total,
        skipped,
    })
}

/// Fetches every track of a playlist in playlist order, for a rewrite.
///
/// # Errors
///
/// [`ShuffleError::UnavailableTracks`] if any entry of the playlist has no
/// track. Writing the remaining tracks back would delete those entries, so
/// such a playlist is left alone. Listing failures abort as in
/// [`get_tracks_page`].
pub async fn get_all_playlist_items(
    client: &SpotifyClient,
    token: &str,
    playlist_id: &str,
) -> Result<Vec<Track>, ShuffleError> {
    let listing = fetch_all(|offset| get_tracks_page(client, token, playlist_id, offset)).await?;

    if listing.skipped > 0 {
        return Err(ShuffleError::UnavailableTracks {
            skipped: listing.skipped,
            total: listing.total,
        });
    }

    Ok(listing.items)
}

/// Sends one batch of uris to the playlist and returns the response status.
pub async fn write_batch(
    client: &SpotifyClient,
    token: &str,
    playlist_id: &str,
    mode: WriteMode,
    uris: Vec<String>,
) -> Result<StatusCode, ShuffleError> {
    let url = client.api_url(&format!("/playlists/{playlist_id}/tracks"));
    let body = PlaylistTracksRequest { uris };

    let (request, retry, context) = match mode {
        WriteMode::Replace => (
            client.http().put(url),
            Retry::Idempotent,
            "playlist replace",
        ),
        WriteMode::Append => (
            client.http().post(url),
            Retry::RateLimitOnly,
            "playlist append",
        ),
    };

    let response = client
        .send(request.bearer_auth(token).json(&body), retry, context)
        .await?;

    Ok(response.status())
}

/// Rewrites a playlist with the given tracks, in order.
///
/// The tracks are sent in consecutive batches of at most
/// [`WRITE_BATCH_SIZE`] uris: the first batch replaces the playlist content,
/// the following batches are appended. `n` tracks take `ceil(n / 100)` calls;
/// an empty list takes none.
///
/// Each call must be answered with `201 Created`. Batches that were already
/// applied are not rolled back when a later one fails.
///
/// # Errors
///
/// - [`ShuffleError::Api`] if the replacing batch fails; the playlist is
///   unchanged
/// - [`ShuffleError::PartialWrite`] if an appending batch fails; the playlist
///   then holds only the tracks written so far
/// - [`ShuffleError::Transport`] if a call gets no response
pub async fn write_tracks(
    client: &SpotifyClient,
    token: &str,
    playlist_id: &str,
    tracks: &[Track],
) -> Result<WriteSummary, ShuffleError> {
    let total_batches = utils::batch_count(tracks.len(), WRITE_BATCH_SIZE);
    let mut written_tracks = 0;

    for (batch_index, batch) in tracks.chunks(WRITE_BATCH_SIZE).enumerate() {
        let mode = WriteMode::for_batch(batch_index);
        let uris = batch.iter().map(|t| t.uri.clone()).collect();

        let status = match write_batch(client, token, playlist_id, mode, uris).await {
            Ok(status) => status,
            Err(e) if batch_index == 0 => return Err(e),
            Err(e) => {
                warning!("Playlist {} write aborted: {}", playlist_id, e);
                return Err(ShuffleError::PartialWrite {
                    written_batches: batch_index,
                    total_batches,
                    written_tracks,
                    status: e.status().unwrap_or(0),
                });
            }
        };

        if status != StatusCode::CREATED {
            return Err(match mode {
                WriteMode::Replace => ShuffleError::Api {
                    context: "playlist replace",
                    status: status.as_u16(),
                },
                WriteMode::Append => ShuffleError::PartialWrite {
                    written_batches: batch_index,
                    total_batches,
                    written_tracks,
                    status: status.as_u16(),
                },
            });
        }

        written_tracks += batch.len();
    }

    Ok(WriteSummary {
        batches: total_batches,
        tracks: written_tracks,
    })
}
