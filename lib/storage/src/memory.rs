use crate::RecordStore;
use parking_lot::RwLock;
use reach_core::{Error, FilterCondition, Projection, Record, RecordFilter, RecordId, Result};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

/// In-memory record collection, ordered by record key
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<String, Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I: IntoIterator<Item = Record>>(records: I) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                map.insert(record.id.key(), record);
            }
        }
        store
    }

    /// Load one JSON document per line; blank lines are skipped
    pub fn from_json_lines<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(std::fs::File::open(path)?);
        let mut records = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = serde_json::from_str(&line).map_err(|e| {
                Error::Serialization(format!("{}:{}: {}", path.display(), n + 1, e))
            })?;
            records.push(record);
        }
        tracing::info!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self::from_records(records))
    }

    /// Write every record as one JSON document per line, in key order
    pub fn write_json_lines<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        let records = self.records.read();
        for record in records.values() {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(records.len())
    }

    /// Get a full record by id
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.records.read().get(&id.key()).cloned()
    }

    /// All records in key order
    pub fn iter(&self) -> Vec<Record> {
        self.records.read().values().cloned().collect()
    }
}

impl RecordStore for MemoryStore {
    fn find_one(&self, id: &RecordId, projection: &Projection) -> Result<Option<Record>> {
        Ok(self
            .records
            .read()
            .get(&id.key())
            .map(|record| record.project(projection)))
    }

    fn find_many(&self, ids: &[RecordId], projection: &Projection) -> Result<Vec<Record>> {
        let records = self.records.read();
        Ok(ids
            .iter()
            .filter_map(|id| records.get(&id.key()))
            .map(|record| record.project(projection))
            .collect())
    }

    fn find(
        &self,
        query: &FilterCondition,
        projection: &Projection,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let start = match after {
            Some(id) => Bound::Excluded(id.key()),
            None => Bound::Unbounded,
        };
        let records = self.records.read();
        Ok(records
            .range((start, Bound::Unbounded))
            .map(|(_, record)| record)
            .filter(|record| query.matches(record))
            .take(limit)
            .map(|record| record.project(projection))
            .collect())
    }

    fn update(&self, id: &RecordId, fields: &Map<String, Value>) -> Result<bool> {
        let mut records = self.records.write();
        match records.get_mut(&id.key()) {
            Some(record) => {
                record.merge(fields);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert(&self, record: Record) -> Result<()> {
        self.records.write().insert(record.id.key(), record);
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }
}
