use crate::models::pipeline::Pipeline;
use crate::models::server::{RecordError, ServerRecord};
use crate::storage::{RecordStore, StoreError};
use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

struct StoredServer {
    seq: u64,
    doc: Value,
}

/// In-memory catalog of scan documents. Documents keep their storage form and
/// are decoded on read; insertion order is the default pipeline order.
pub struct ServerStorage {
    servers: DashMap<String, StoredServer>,
    next_seq: AtomicU64,
}

impl Default for ServerStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStorage {
    pub fn new() -> Self {
        Self {
            servers: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Inserts a document, replacing any existing one for the same ip and port.
    pub fn add_server(&self, doc: Value) -> Result<String, RecordError> {
        let record = ServerRecord::from_document(doc.clone())?;

        let existing = self
            .servers
            .iter()
            .find(|r| {
                lookup(&r.value().doc, "host.ip").and_then(Value::as_str) == Some(record.address.ip.as_str())
                    && lookup(&r.value().doc, "host.port").and_then(Value::as_u64)
                        == Some(u64::from(record.address.port))
            })
            .map(|r| (r.key().clone(), r.value().seq));

        // A replaced server keeps its place in the default order.
        let (id, seq) = match existing {
            Some(entry) => {
                debug!("Replacing {}:{}", record.address.ip, record.address.port);
                entry
            }
            None => (
                uuid::Uuid::new_v4().to_string(),
                self.next_seq.fetch_add(1, AtomicOrdering::Relaxed),
            ),
        };

        self.servers.insert(id.clone(), StoredServer { seq, doc });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Loads a JSON array of scan documents. Documents that fail validation are
    /// skipped with a warning. Returns how many were stored.
    pub fn load_file(&self, path: impl AsRef<Path>) -> std::io::Result<usize> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let docs: Vec<Value> = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let mut loaded = 0;
        for (i, doc) in docs.into_iter().enumerate() {
            match self.add_server(doc) {
                Ok(_) => loaded += 1,
                Err(e) => warn!("Skipping catalog entry {}: {}", i, e),
            }
        }
        Ok(loaded)
    }

    fn evaluate(&self, pipeline: &Pipeline) -> Result<Vec<Value>, StoreError> {
        let mut snapshot: Vec<(u64, Value)> = self
            .servers
            .iter()
            .map(|r| (r.value().seq, r.value().doc.clone()))
            .collect();
        snapshot.sort_by_key(|(seq, _)| *seq);
        let mut docs: Vec<Value> = snapshot.into_iter().map(|(_, doc)| doc).collect();

        for stage in pipeline.stages() {
            docs = apply_stage(stage, docs)?;
        }
        Ok(docs)
    }
}

#[async_trait]
impl RecordStore for ServerStorage {
    async fn count(&self, pipeline: &Pipeline) -> Result<usize, StoreError> {
        Ok(self.evaluate(pipeline)?.len())
    }

    async fn get_at(&self, pipeline: &Pipeline, index: usize) -> Result<Option<ServerRecord>, StoreError> {
        match self.evaluate(pipeline)?.into_iter().nth(index) {
            Some(doc) => Ok(Some(ServerRecord::from_document(doc)?)),
            None => Ok(None),
        }
    }
}

fn apply_stage(stage: &Value, docs: Vec<Value>) -> Result<Vec<Value>, StoreError> {
    let obj = match stage {
        // Bare strings only label the collection.
        Value::String(_) => return Ok(docs),
        Value::Object(obj) if obj.len() == 1 => obj,
        other => return Err(StoreError::InvalidStage(other.to_string())),
    };
    let Some((op, arg)) = obj.iter().next() else {
        return Err(StoreError::InvalidStage(stage.to_string()));
    };

    match op.as_str() {
        "$match" => {
            let conditions = arg
                .as_object()
                .ok_or_else(|| StoreError::InvalidStage(format!("$match expects an object, got {}", arg)))?;
            Ok(docs
                .into_iter()
                .filter(|doc| {
                    conditions
                        .iter()
                        .all(|(path, cond)| matches_condition(lookup(doc, path), cond))
                })
                .collect())
        }
        "$sort" => {
            let keys = arg
                .as_object()
                .ok_or_else(|| StoreError::InvalidStage(format!("$sort expects an object, got {}", arg)))?;
            let mut order = Vec::with_capacity(keys.len());
            for (path, dir) in keys {
                match dir.as_i64() {
                    Some(1) => order.push((path.as_str(), false)),
                    Some(-1) => order.push((path.as_str(), true)),
                    _ => return Err(StoreError::InvalidStage(format!("$sort direction for {} must be 1 or -1", path))),
                }
            }
            let mut docs = docs;
            docs.sort_by(|a, b| {
                for (path, descending) in &order {
                    let ord = compare_values(lookup(a, path), lookup(b, path));
                    let ord = if *descending { ord.reverse() } else { ord };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
            Ok(docs)
        }
        "$skip" => {
            let n = count_arg(op, arg)?;
            Ok(docs.into_iter().skip(n).collect())
        }
        "$limit" => {
            let n = count_arg(op, arg)?;
            Ok(docs.into_iter().take(n).collect())
        }
        _ => Err(StoreError::UnsupportedStage(op.clone())),
    }
}

fn count_arg(op: &str, arg: &Value) -> Result<usize, StoreError> {
    arg.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| StoreError::InvalidStage(format!("{} expects a non-negative integer, got {}", op, arg)))
}

fn matches_condition(value: Option<&Value>, cond: &Value) -> bool {
    if let Some(exists) = cond.get("$exists").and_then(Value::as_bool) {
        return value.is_some() == exists;
    }
    value == Some(cond)
}

/// Resolves a dotted path such as `players.online`.
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, key| current.get(key))
}

// Missing < null < bool < number < string; anything else compares equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::server::tests::document;
    use serde_json::json;

    fn storage_with(docs: Vec<Value>) -> ServerStorage {
        let storage = ServerStorage::new();
        for doc in docs {
            storage.add_server(doc).unwrap();
        }
        storage
    }

    fn pipeline(stages: Value) -> Pipeline {
        serde_json::from_value(stages).unwrap()
    }

    #[tokio::test]
    async fn test_insertion_order_is_default_order() {
        let storage = storage_with(vec![
            document("alpha", 25565),
            document("bravo", 25566),
            document("charlie", 25567),
        ]);

        let all = Pipeline::default();
        assert_eq!(storage.count(&all).await.unwrap(), 3);
        assert_eq!(storage.get_at(&all, 1).await.unwrap().unwrap().hostname, "bravo");
        assert!(storage.get_at(&all, 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_server_replaces_same_address() {
        let storage = ServerStorage::new();
        let first = storage.add_server(document("old-name", 25565)).unwrap();
        let second = storage.add_server(document("new-name", 25565)).unwrap();

        assert_eq!(first, second);
        assert_eq!(storage.len(), 1);
        let record = storage.get_at(&Pipeline::default(), 0).await.unwrap().unwrap();
        assert_eq!(record.hostname, "new-name");
    }

    #[tokio::test]
    async fn test_replaced_server_keeps_its_position() {
        let storage = storage_with(vec![
            document("alpha", 25565),
            document("bravo", 25566),
            document("charlie", 25567),
        ]);
        storage.add_server(document("bravo-renamed", 25566)).unwrap();

        let all = Pipeline::default();
        assert_eq!(storage.count(&all).await.unwrap(), 3);
        assert_eq!(storage.get_at(&all, 1).await.unwrap().unwrap().hostname, "bravo-renamed");
        assert_eq!(storage.get_at(&all, 2).await.unwrap().unwrap().hostname, "charlie");
    }

    #[test]
    fn test_add_server_rejects_invalid_document() {
        let storage = ServerStorage::new();
        assert!(storage.add_server(json!({ "host": { "ip": "1.2.3.4" } })).is_err());
        assert_eq!(storage.len(), 0);
    }

    #[tokio::test]
    async fn test_match_and_exists() {
        let mut cracked = document("cracked", 25566);
        cracked["cracked"] = json!(true);
        let mut with_sample = document("sampled", 25567);
        with_sample["sample"] = json!([]);
        let storage = storage_with(vec![document("plain", 25565), cracked, with_sample]);

        let only_cracked = pipeline(json!([{ "$match": { "cracked": true } }]));
        assert_eq!(storage.count(&only_cracked).await.unwrap(), 1);
        assert_eq!(storage.get_at(&only_cracked, 0).await.unwrap().unwrap().hostname, "cracked");

        let has_sample = pipeline(json!([{ "$match": { "sample": { "$exists": true } } }]));
        assert_eq!(storage.count(&has_sample).await.unwrap(), 1);

        let by_port = pipeline(json!([{ "$match": { "host.port": 25565 } }]));
        assert_eq!(storage.get_at(&by_port, 0).await.unwrap().unwrap().hostname, "plain");
    }

    #[tokio::test]
    async fn test_sort_skip_limit() {
        let mut docs = Vec::new();
        for (name, online) in [("a", 5), ("b", 50), ("c", 10), ("d", 0)] {
            let mut doc = document(name, 25565 + online as u16);
            doc["players"]["online"] = json!(online);
            docs.push(doc);
        }
        let storage = storage_with(docs);

        let busiest = pipeline(json!([
            "busiest",
            { "$sort": { "players.online": -1 } },
            { "$skip": 1 },
            { "$limit": 2 }
        ]));
        assert_eq!(storage.count(&busiest).await.unwrap(), 2);
        assert_eq!(storage.get_at(&busiest, 0).await.unwrap().unwrap().hostname, "c");
        assert_eq!(storage.get_at(&busiest, 1).await.unwrap().unwrap().hostname, "a");
    }

    #[tokio::test]
    async fn test_unsupported_and_invalid_stages() {
        let storage = storage_with(vec![document("alpha", 25565)]);

        let lookup_stage = pipeline(json!([{ "$lookup": {} }]));
        assert!(matches!(
            storage.count(&lookup_stage).await,
            Err(StoreError::UnsupportedStage(op)) if op == "$lookup"
        ));

        let bad_sort = pipeline(json!([{ "$sort": { "hostname": 2 } }]));
        assert!(matches!(storage.count(&bad_sort).await, Err(StoreError::InvalidStage(_))));

        let bad_limit = pipeline(json!([{ "$limit": -1 }]));
        assert!(matches!(storage.count(&bad_limit).await, Err(StoreError::InvalidStage(_))));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!("mcdir-catalog-{}.json", uuid::Uuid::new_v4()));
        let docs = json!([document("alpha", 25565), { "broken": true }, document("bravo", 25566)]);
        std::fs::write(&path, docs.to_string()).unwrap();

        let storage = ServerStorage::new();
        let loaded = storage.load_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(storage.len(), 2);
    }
}
