use reach_core::{FilterCondition, Projection, Record, RecordId, Result};
use serde_json::{Map, Value};

/// Key-addressable document collection with partial-field updates.
///
/// No cross-document transactions are assumed. Implementations must be
/// safe to share across worker threads.
pub trait RecordStore: Send + Sync {
    /// Fetch one record restricted to `projection`
    fn find_one(&self, id: &RecordId, projection: &Projection) -> Result<Option<Record>>;

    /// Fetch several records in the order of `ids`, skipping missing ones
    fn find_many(&self, ids: &[RecordId], projection: &Projection) -> Result<Vec<Record>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.find_one(id, projection)? {
                found.push(record);
            }
        }
        Ok(found)
    }

    /// Records matching `query` in key order, strictly after `after`, at most `limit`
    fn find(
        &self,
        query: &FilterCondition,
        projection: &Projection,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>>;

    /// Merge `fields` into an existing record. Returns false if the record is missing.
    fn update(&self, id: &RecordId, fields: &Map<String, Value>) -> Result<bool>;

    /// Insert or replace a whole record
    fn insert(&self, record: Record) -> Result<()>;

    fn count(&self) -> Result<usize>;
}
