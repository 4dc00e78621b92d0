//! The two storage calls the renamer needs, behind a trait so the run loop
//! can be driven by S3 in production and an in-memory store in tests.

use crate::{errors::StoreError, models::object_ref::ObjectRef};
use async_trait::async_trait;

/// One batch of a prefix listing.
#[derive(Debug, Default)]
pub struct ListingPage {
    /// Objects in listing order (lexicographic by key on S3).
    pub objects: Vec<ObjectRef>,

    /// Opaque token for the next page; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a single page of objects in `bucket` whose keys start with
    /// `prefix`, resuming after `continuation_token` when given.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
        max_keys: Option<i32>,
    ) -> Result<ListingPage, StoreError>;

    /// Server-side copy of `from` to `to`, overwriting `to` if it exists.
    async fn copy_object(&self, from: &ObjectRef, to: &ObjectRef) -> Result<(), StoreError>;
}
