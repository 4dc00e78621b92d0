//! Lazy, token-driven listing of every object under a prefix.

use crate::{errors::StoreError, models::object_ref::ObjectRef, services::store::ObjectStore};
use futures::{Stream, TryStreamExt, stream};
use tracing::debug;

enum Cursor {
    Start,
    Resume(String),
    Exhausted,
}

/// Stream every object in `bucket` whose key starts with `prefix`.
///
/// Pages are fetched one at a time and only once the consumer has drained
/// the previous page. The stream is finite: it ends when the store stops
/// returning a continuation token. It cannot be restarted mid-stream; call
/// again to list from the beginning. A listing error ends the stream after
/// yielding that error.
pub fn list_objects<'a, S>(
    store: &'a S,
    bucket: &'a str,
    prefix: &'a str,
    page_size: Option<i32>,
) -> impl Stream<Item = Result<ObjectRef, StoreError>> + Send + 'a
where
    S: ObjectStore + ?Sized + 'a,
{
    stream::try_unfold(
        (Cursor::Start, 0usize),
        move |(cursor, page_no)| async move {
            let token = match cursor {
                Cursor::Exhausted => return Ok(None),
                Cursor::Start => None,
                Cursor::Resume(token) => Some(token),
            };

            let page = store
                .list_page(bucket, prefix, token.clone(), page_size)
                .await?;
            debug!(
                page = page_no + 1,
                objects = page.objects.len(),
                truncated = page.next_token.is_some(),
                "fetched listing page"
            );

            let next = match page.next_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(StoreError::StalledPagination {
                        bucket: bucket.to_string(),
                        prefix: prefix.to_string(),
                    });
                }
                Some(next) => Cursor::Resume(next),
                None => Cursor::Exhausted,
            };

            Ok(Some((page.objects, (next, page_no + 1))))
        },
    )
    .map_ok(|objects| stream::iter(objects.into_iter().map(Ok::<_, StoreError>)))
    .try_flatten()
}
