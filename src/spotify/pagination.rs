use std::future::Future;

use crate::{error::ShuffleError, types::Page};

/// Largest page the Web API returns for playlist and item listings.
pub const PAGE_LIMIT: u32 = 50;

/// Fetches every page of an offset-paginated listing.
///
/// Calls `fetch_page` with offsets `0, 50, 100, ...` and concatenates the
/// items until the offset covers the `total` declared by the most recent
/// page. A listing with `n` entries therefore costs `ceil(n / 50)` requests,
/// and at least one.
///
/// The result is a single page holding every item, the last `total` and the
/// sum of all `skipped` counts.
///
/// The loop is driven by the offset alone. If the listing changes while it
/// is being read, entries may be skipped or repeated.
///
/// # Errors
///
/// The first error returned by `fetch_page` aborts the whole fetch; no
/// partial result is returned.
pub async fn fetch_all<T, F, Fut>(mut fetch_page: F) -> Result<Page<T>, ShuffleError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Page<T>, ShuffleError>>,
{
    let mut items = Vec::new();
    let mut skipped = 0;
    let mut offset = 0;

    loop {
        let page = fetch_page(offset).await?;
        items.extend(page.items);
        skipped += page.skipped;

        offset += PAGE_LIMIT;
        if offset >= page.total {
            return Ok(Page {
                items,
                total: page.total,
                skipped,
            });
        }
    }
}
