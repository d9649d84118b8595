//! Record store seam.
//!
//! Implementations hold whatever per-principal context the remote needs. A
//! store value is bound to exactly one principal for its whole lifetime.

use async_trait::async_trait;

use crate::error::CalTrackResult;
use crate::record::{RecordShape, TrackedRecord};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records created by caltrack, i.e. carrying a uid back-reference.
    async fn fetch_records(&self) -> CalTrackResult<Vec<TrackedRecord>>;

    async fn create_record(&self, shape: &RecordShape) -> CalTrackResult<TrackedRecord>;

    async fn update_record(
        &self,
        existing: &TrackedRecord,
        shape: &RecordShape,
    ) -> CalTrackResult<TrackedRecord>;

    async fn delete_record(&self, existing: &TrackedRecord) -> CalTrackResult<()>;
}
