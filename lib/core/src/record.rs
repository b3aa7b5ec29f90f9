use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Document field holding the record identifier
pub const ID_FIELD: &str = "_id";

/// Document field listing the records that cite (derive from) a record
pub const CHILDREN_FIELD: &str = "citedby";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Integer(u64),
    Uuid(Uuid),
    String(String),
}

impl RecordId {
    /// Canonical store key. Integers are zero-padded so key order matches
    /// numeric order, and the prefix keeps `5` and `"5"` apart.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            RecordId::Integer(i) => format!("i:{:020}", i),
            RecordId::Uuid(u) => format!("u:{}", u),
            RecordId::String(s) => format!("s:{}", s),
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordId::String(s) => write!(f, "{}", s),
            RecordId::Uuid(u) => write!(f, "{}", u),
            RecordId::Integer(i) => write!(f, "{}", i),
        }
    }
}

/// Parses command-line ids. Digits become `Integer` and UUIDs `Uuid`;
/// an `s:` prefix forces a string id, so `s:5` addresses `{"_id": "5"}`.
impl std::str::FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("s:") {
            return Ok(RecordId::String(rest.to_string()));
        }
        if let Ok(i) = s.parse::<u64>() {
            return Ok(RecordId::Integer(i));
        }
        if let Ok(u) = Uuid::parse_str(s) {
            return Ok(RecordId::Uuid(u));
        }
        Ok(RecordId::String(s.to_string()))
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::String(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::String(s.to_string())
    }
}

impl From<u64> for RecordId {
    fn from(i: u64) -> Self {
        RecordId::Integer(i)
    }
}

impl From<Uuid> for RecordId {
    fn from(u: Uuid) -> Self {
        RecordId::Uuid(u)
    }
}

/// Which fields of a record a read should return. The id is always returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Option<Vec<String>>,
}

impl Projection {
    /// Every stored field
    #[must_use]
    pub fn all() -> Self {
        Self { fields: None }
    }

    /// Only the id
    #[must_use]
    pub fn id_only() -> Self {
        Self {
            fields: Some(Vec::new()),
        }
    }

    #[must_use]
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: Some(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Add a field unless already present
    #[must_use]
    pub fn with(mut self, field: &str) -> Self {
        if let Some(fields) = &mut self.fields {
            if !fields.iter().any(|f| f == field) {
                fields.push(field.to_string());
            }
        }
        self
    }

    #[must_use]
    pub fn includes(&self, field: &str) -> bool {
        match &self.fields {
            None => true,
            Some(fields) => field == ID_FIELD || fields.iter().any(|f| f == field),
        }
    }
}

/// A document in the derivation graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    #[must_use]
    pub fn with_children<I, T>(self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<RecordId>,
    {
        let ids: Vec<Value> = children
            .into_iter()
            .map(|c| serde_json::to_value(c.into()).unwrap_or(Value::Null))
            .collect();
        self.with_field(CHILDREN_FIELD, Value::Array(ids))
    }

    /// Field value, with an explicit `null` treated as absent
    #[inline]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|v| !v.is_null())
    }

    /// Ids of the records citing this one, in stored order
    pub fn children(&self) -> Result<Vec<RecordId>> {
        match self.get(CHILDREN_FIELD) {
            None => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                Error::Serialization(format!("{} of {}: {}", CHILDREN_FIELD, self.id, e))
            }),
        }
    }

    /// Number of stored children, without parsing their ids
    #[inline]
    pub fn child_count(&self) -> usize {
        self.get(CHILDREN_FIELD)
            .and_then(Value::as_array)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Copy restricted to the projection
    #[must_use]
    pub fn project(&self, projection: &Projection) -> Self {
        let fields = self
            .fields
            .iter()
            .filter(|(name, _)| projection.includes(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self {
            id: self.id.clone(),
            fields,
        }
    }

    /// Overwrite the given fields, keeping the rest
    pub fn merge(&mut self, update: &Map<String, Value>) {
        for (name, value) in update {
            if name == ID_FIELD {
                continue;
            }
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_document_shape() {
        let doc = json!({"_id": 4061724, "citedby": [1, 2], "doc_vec": [0.5, 0.5]});
        let record: Record = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(record.id, RecordId::Integer(4061724));
        assert_eq!(record.children().unwrap(), vec![RecordId::Integer(1), RecordId::Integer(2)]);
        assert_eq!(serde_json::to_value(&record).unwrap(), doc);
    }

    #[test]
    fn test_null_field_is_absent() {
        let record = Record::new(1u64).with_field("doc_vec", Value::Null);
        assert!(record.get("doc_vec").is_none());
        assert!(record.children().unwrap().is_empty());
    }

    #[test]
    fn test_projection_keeps_requested_fields() {
        let record = Record::new("a")
            .with_children(["b"])
            .with_field("doc_vec", json!([1.0]))
            .with_field("title", json!("x"));
        let projected = record.project(&Projection::fields(["doc_vec"]).with(CHILDREN_FIELD));
        assert_eq!(projected.fields.len(), 2);
        assert!(projected.get("title").is_none());
        assert_eq!(projected.id, RecordId::from("a"));
    }

    #[test]
    fn test_key_separates_id_types() {
        assert_ne!(RecordId::Integer(5).key(), RecordId::from("5").key());
        assert!(RecordId::Integer(9).key() < RecordId::Integer(10).key());
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::Integer(42));
    }

    #[test]
    fn test_string_prefix_reaches_numeric_looking_keys() {
        let id: RecordId = "s:5".parse().unwrap();
        assert_eq!(id, RecordId::from("5"));
        assert_eq!(id.key(), "s:5");
        assert_eq!("s:abc".parse::<RecordId>().unwrap(), RecordId::from("abc"));
        assert_eq!(" 7 ".parse::<RecordId>().unwrap(), RecordId::Integer(7));
    }
}
