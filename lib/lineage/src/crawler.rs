//! Breadth-first lineage crawling over a [`RecordStore`].
//!
//! The store is the arena and record ids are the indices: the crawler never
//! builds a graph object, it keeps a visited-id set and one generation of
//! frontier at a time, so it terminates even on malformed cyclic data.

use ahash::AHashSet;
use reach_core::{Projection, Record, RecordFilter, RecordId, Result, CHILDREN_FIELD};
use reach_storage::RecordStore;

/// A record reached by the crawl, tagged with its hop count from the root
#[derive(Debug, Clone, PartialEq)]
pub struct LineageEntry {
    pub generation: usize,
    pub record: Record,
}

/// Root followed by its included descendants, breadth-first by generation,
/// then in `citedby` order within a generation
#[derive(Debug, Clone, PartialEq)]
pub struct Lineage {
    entries: Vec<LineageEntry>,
}

impl Lineage {
    #[inline]
    pub fn root(&self) -> &Record {
        &self.entries[0].record
    }

    /// Everything after the root
    #[inline]
    pub fn descendants(&self) -> &[LineageEntry] {
        &self.entries[1..]
    }

    #[inline]
    pub fn entries(&self) -> &[LineageEntry] {
        &self.entries
    }

    /// Number of records including the root
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn has_descendants(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.entries.iter().map(|e| e.record.id.clone()).collect()
    }

    /// Records at exactly `generation` hops from the root
    pub fn generation(&self, generation: usize) -> impl Iterator<Item = &Record> {
        self.entries
            .iter()
            .filter(move |e| e.generation == generation)
            .map(|e| &e.record)
    }

    pub fn max_generation(&self) -> usize {
        self.entries.last().map(|e| e.generation).unwrap_or(0)
    }
}

/// Crawl up to `max_generations` hops from `root_id` along `citedby`.
///
/// The root is always included. A descendant is included, and its children
/// followed, only if `predicate` accepts it. Each id is considered at most
/// once. `fields` is extended with `citedby` so the crawl can expand.
///
/// Returns `Ok(None)` if the root is not in the store; a root without
/// qualifying descendants yields a one-entry lineage.
pub fn crawl<S: RecordStore + ?Sized>(
    store: &S,
    root_id: &RecordId,
    max_generations: usize,
    fields: &Projection,
    predicate: &dyn RecordFilter,
) -> Result<Option<Lineage>> {
    let projection = fields.clone().with(CHILDREN_FIELD);
    let root = match store.find_one(root_id, &projection)? {
        Some(root) => root,
        None => return Ok(None),
    };

    let mut visited: AHashSet<RecordId> = AHashSet::new();
    visited.insert(root.id.clone());
    let mut entries = vec![LineageEntry {
        generation: 0,
        record: root,
    }];
    let mut frontier = 0..entries.len();

    for generation in 1..=max_generations {
        let mut next_ids = Vec::new();
        for entry in &entries[frontier.clone()] {
            for child in entry.record.children()? {
                if visited.insert(child.clone()) {
                    next_ids.push(child);
                }
            }
        }
        if next_ids.is_empty() {
            break;
        }

        let start = entries.len();
        for record in store.find_many(&next_ids, &projection)? {
            if predicate.matches(&record) {
                entries.push(LineageEntry { generation, record });
            }
        }
        frontier = start..entries.len();
        if frontier.is_empty() {
            break;
        }
    }

    tracing::debug!(
        root = %root_id,
        records = entries.len(),
        max_generations,
        "crawled lineage"
    );
    Ok(Some(Lineage { entries }))
}
