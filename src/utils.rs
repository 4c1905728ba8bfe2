use base64::{Engine, engine::general_purpose::STANDARD};
use rand::{Rng, seq::SliceRandom};

use crate::{
    error::ShuffleError,
    types::{Playlist, Track},
};

const STATE_KEY_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of the CSRF state key sent with every authorization request.
pub const STATE_KEY_LEN: usize = 15;

/// Creates a random state key of uppercase letters and digits.
///
/// The thread-local generator behind `rand::rng()` is a CSPRNG seeded from the
/// operating system, so the key is unpredictable to a third party.
pub fn create_state_key(size: usize) -> String {
    let mut rng = rand::rng();
    (0..size)
        .map(|_| STATE_KEY_CHARSET[rng.random_range(0..STATE_KEY_CHARSET.len())] as char)
        .collect()
}

/// Value of the `Authorization` header for client-authenticated token requests.
pub fn basic_authorization(client_id: &str, client_secret: &str) -> String {
    let credentials = STANDARD.encode(format!("{client_id}:{client_secret}"));
    format!("Basic {credentials}")
}

/// Extracts the id from a `spotify:playlist:<id>` uri.
pub fn playlist_id_from_uri(uri: &str) -> Result<&str, ShuffleError> {
    let mut parts = uri.split(':');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("spotify"), Some("playlist"), Some(id), None) if is_valid_playlist_id(id) => Ok(id),
        _ => Err(ShuffleError::InvalidPlaylist(uri.to_string())),
    }
}

/// Playlist ids are base62 strings; anything else is rejected before it can
/// reach a request path.
pub fn is_valid_playlist_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Shuffles tracks in place into a uniformly random order.
pub fn shuffle_tracks(tracks: &mut [Track]) {
    shuffle_tracks_with(tracks, &mut rand::rng());
}

pub fn shuffle_tracks_with<R: Rng + ?Sized>(tracks: &mut [Track], rng: &mut R) {
    tracks.shuffle(rng);
}

/// Sorts playlists by name, ignoring case.
pub fn sort_playlists(playlists: &mut [Playlist]) {
    playlists.sort_by_cached_key(|p| p.name.to_lowercase());
}

/// Number of calls needed to move `items` items in chunks of `chunk_size`.
pub fn batch_count(items: usize, chunk_size: usize) -> usize {
    items.div_ceil(chunk_size)
}

/// Escapes text for use inside HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
