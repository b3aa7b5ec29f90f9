// LMDB-backed record store, one JSON document per record key
use crate::RecordStore;
use anyhow::Context;
use heed::{Database, Env, EnvOpenOptions};
use reach_core::{Error, FilterCondition, Projection, Record, RecordFilter, RecordId, Result};
use serde_json::{Map, Value};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

const DB_RECORDS: &str = "records";

pub struct LmdbStore {
    env: Arc<Env>,
    records_db: Database<heed::types::Str, heed::types::Bytes>,
}

impl LmdbStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_inner(path.as_ref()).map_err(storage_error)
    }

    fn open_inner(path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path)?;

        let env = Arc::new(unsafe {
            EnvOpenOptions::new()
                .map_size(100 * 1024 * 1024 * 1024) // 100GB default
                .max_dbs(4)
                .open(path)
                .with_context(|| format!("opening LMDB environment at {}", path.display()))?
        });

        let mut wtxn = env.write_txn()?;
        let records_db = env.create_database(&mut wtxn, Some(DB_RECORDS))?;
        wtxn.commit()?;

        Ok(Self { env, records_db })
    }

    fn decode(key: &str, bytes: &[u8]) -> anyhow::Result<Record> {
        serde_json::from_slice(bytes).with_context(|| format!("decoding record {}", key))
    }

    fn get_raw(&self, id: &RecordId) -> anyhow::Result<Option<Record>> {
        let rtxn = self.env.read_txn()?;
        let key = id.key();
        match self.records_db.get(&rtxn, &key)? {
            Some(bytes) => Ok(Some(Self::decode(&key, bytes)?)),
            None => Ok(None),
        }
    }

    fn scan(
        &self,
        query: &FilterCondition,
        projection: &Projection,
        after: Option<&RecordId>,
        limit: usize,
    ) -> anyhow::Result<Vec<Record>> {
        let rtxn = self.env.read_txn()?;
        let after_key = after.map(RecordId::key);
        let bounds: (Bound<&str>, Bound<&str>) = match &after_key {
            Some(key) => (Bound::Excluded(key.as_str()), Bound::Unbounded),
            None => (Bound::Unbounded, Bound::Unbounded),
        };

        let mut found = Vec::new();
        for entry in self.records_db.range(&rtxn, &bounds)? {
            if found.len() >= limit {
                break;
            }
            let (key, bytes) = entry?;
            let record = Self::decode(key, bytes)?;
            if query.matches(&record) {
                found.push(record.project(projection));
            }
        }
        Ok(found)
    }

    fn merge_raw(&self, id: &RecordId, fields: &Map<String, Value>) -> anyhow::Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let key = id.key();
        let mut record = match self.records_db.get(&wtxn, &key)? {
            Some(bytes) => Self::decode(&key, bytes)?,
            None => return Ok(false),
        };
        record.merge(fields);
        let bytes = serde_json::to_vec(&record)?;
        self.records_db.put(&mut wtxn, &key, &bytes)?;
        wtxn.commit()?;
        Ok(true)
    }

    fn put_raw(&self, record: &Record) -> anyhow::Result<()> {
        let mut wtxn = self.env.write_txn()?;
        let bytes = serde_json::to_vec(record)?;
        self.records_db.put(&mut wtxn, &record.id.key(), &bytes)?;
        wtxn.commit()?;
        Ok(())
    }

    fn len_raw(&self) -> anyhow::Result<usize> {
        let rtxn = self.env.read_txn()?;
        Ok(self.records_db.len(&rtxn)? as usize)
    }

    /// Insert many records in a single write transaction
    pub fn insert_batch<I: IntoIterator<Item = Record>>(&self, records: I) -> Result<usize> {
        let write = || -> anyhow::Result<usize> {
            let mut wtxn = self.env.write_txn()?;
            let mut n = 0;
            for record in records {
                let bytes = serde_json::to_vec(&record)?;
                self.records_db.put(&mut wtxn, &record.id.key(), &bytes)?;
                n += 1;
            }
            wtxn.commit()?;
            Ok(n)
        };
        write().map_err(storage_error)
    }
}

fn storage_error(e: anyhow::Error) -> Error {
    Error::Storage(format!("{:#}", e))
}

impl RecordStore for LmdbStore {
    fn find_one(&self, id: &RecordId, projection: &Projection) -> Result<Option<Record>> {
        let record = self.get_raw(id).map_err(storage_error)?;
        Ok(record.map(|r| r.project(projection)))
    }

    fn find(
        &self,
        query: &FilterCondition,
        projection: &Projection,
        after: Option<&RecordId>,
        limit: usize,
    ) -> Result<Vec<Record>> {
        self.scan(query, projection, after, limit).map_err(storage_error)
    }

    fn update(&self, id: &RecordId, fields: &Map<String, Value>) -> Result<bool> {
        self.merge_raw(id, fields).map_err(storage_error)
    }

    fn insert(&self, record: Record) -> Result<()> {
        self.put_raw(&record).map_err(storage_error)
    }

    fn count(&self) -> Result<usize> {
        self.len_raw().map_err(storage_error)
    }
}
