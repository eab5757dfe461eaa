//! Paged fetch loop shared by every list implementation.

use std::future::Future;

use super::RowSink;
use crate::common::AppResult;
use crate::google::Page;

/// Fetch pages until the API runs out, the row limit is reached, or the
/// scan is cancelled.
///
/// `fetch_page` receives the page size to ask for and the continuation token
/// of the previous page (`None` for the first).
pub async fn paginate<F, Fut>(page_cap: u64, sink: &mut RowSink<'_>, mut fetch_page: F) -> AppResult<()>
where
    F: FnMut(u64, Option<String>) -> Fut,
    Fut: Future<Output = AppResult<Page>>,
{
    let mut page_token: Option<String> = None;

    while !sink.is_done() {
        let page = fetch_page(sink.page_size(page_cap), page_token.take()).await?;

        for item in page.items {
            if !sink.push(item).await? {
                return Ok(());
            }
        }

        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(())
}
