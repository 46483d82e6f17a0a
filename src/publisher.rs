use crate::constants::{THUMB_CACHE_CONTROL, THUMB_CONTENT_TYPE};
use crate::error::{Result, ThumbError};
use crate::resize::render_thumbnail;
use crate::resolver::SourceRef;
use crate::size::SizeSpec;
use crate::store::ObjectStore;

/// Per-item outcome of an idempotent publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The thumbnail was rendered and written.
    Uploaded,
    /// The destination key already existed; nothing was done.
    Skipped,
}

/// Destination key for a thumbnail. Pure function of the size and the source
/// key: the rendered size is the leading path segment, so re-runs rediscover
/// their own output and distinct sizes can never collide on the same source.
pub fn destination_key(size: &SizeSpec, source_key: &str) -> String {
    format!("{size}/{source_key}")
}

pub struct Publisher<'a, R: ObjectStore, W: ObjectStore> {
    originals: &'a R,
    thumbs: &'a W,
    size: SizeSpec,
}

impl<'a, R: ObjectStore, W: ObjectStore> Publisher<'a, R, W> {
    pub fn new(originals: &'a R, thumbs: &'a W, size: SizeSpec) -> Self {
        Self {
            originals,
            thumbs,
            size,
        }
    }

    /// Publishes one thumbnail unless the destination key already exists.
    ///
    /// Every failure (head check other than "not found", fetch, decode,
    /// upload) comes back as `Err` so the caller can count it and move on to
    /// the next candidate; one corrupt photo must not stop a batch run.
    pub async fn publish(&self, source: &SourceRef) -> Result<Outcome> {
        let dest = destination_key(&self.size, &source.key);

        if self.thumbs.exists(&dest).await? {
            return Ok(Outcome::Skipped);
        }

        let bytes = match &source.bytes {
            Some(prefetched) => prefetched.clone(),
            None => self
                .originals
                .get(&source.key)
                .await?
                .ok_or_else(|| ThumbError::EmptyObject(source.key.clone()))?,
        };
        if bytes.is_empty() {
            return Err(ThumbError::EmptyObject(source.key.clone()));
        }

        let body = render_thumbnail(&bytes, &self.size)?;
        self.thumbs
            .put(&dest, body, THUMB_CONTENT_TYPE, THUMB_CACHE_CONTROL)
            .await?;
        Ok(Outcome::Uploaded)
    }
}
