use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, RwLock};

/// A remote hash store: named hashes whose fields map byte keys to byte
/// values.
///
/// Stores operate on raw bytes — serialization/deserialization is handled
/// by higher layers ([`crate::Chelate`]). Stores have no knowledge of value
/// kinds or cache state, and each method is atomic only at single-field
/// granularity; nothing here composes multiple calls.
///
/// All methods take `&self` to support stores with internal locking or
/// connection handles. Transport concerns (timeouts, retries, pooling)
/// belong to implementations; this trait adds no resilience layer.
pub trait HashStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Retrieves one field of the named hash, or `None` if not present.
    fn field_get(&self, ns: &str, field: &[u8]) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sets one field of the named hash, creating the hash if needed.
    fn field_set(&self, ns: &str, field: &[u8], value: &[u8]) -> Result<(), Self::Error>;

    /// Deletes one field, returning how many fields were removed (0 or 1).
    fn field_delete(&self, ns: &str, field: &[u8]) -> Result<u64, Self::Error>;

    /// Checks whether a field exists in the named hash.
    fn field_exists(&self, ns: &str, field: &[u8]) -> Result<bool, Self::Error>;

    /// Returns every (field, value) pair of the named hash, in no
    /// particular order. An unknown hash is an empty one.
    fn all_fields(&self, ns: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error>;

    /// Deletes the named hash and all its fields unconditionally.
    fn drop_namespace(&self, ns: &str) -> Result<(), Self::Error>;
}

/// An in-memory store backed by a HashMap.
///
/// Useful for testing and as a reference implementation. Clones share the
/// same underlying storage, so two mappings over clones of one
/// `MemoryStore` observe each other's writes like two clients of one
/// server would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    hashes: Arc<RwLock<HashMap<String, HashMap<Vec<u8>, Vec<u8>>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryStore {
    type Error = Infallible;

    fn field_get(&self, ns: &str, field: &[u8]) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self
            .hashes
            .read()
            .unwrap()
            .get(ns)
            .and_then(|hash| hash.get(field).cloned()))
    }

    fn field_set(&self, ns: &str, field: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.hashes
            .write()
            .unwrap()
            .entry(ns.to_string())
            .or_default()
            .insert(field.to_vec(), value.to_vec());
        Ok(())
    }

    fn field_delete(&self, ns: &str, field: &[u8]) -> Result<u64, Self::Error> {
        let mut hashes = self.hashes.write().unwrap();
        let Some(hash) = hashes.get_mut(ns) else {
            return Ok(0);
        };
        let removed = hash.remove(field).map_or(0, |_| 1);
        // Mirror hash-store servers: an emptied hash ceases to exist.
        if hash.is_empty() {
            hashes.remove(ns);
        }
        Ok(removed)
    }

    fn field_exists(&self, ns: &str, field: &[u8]) -> Result<bool, Self::Error> {
        Ok(self
            .hashes
            .read()
            .unwrap()
            .get(ns)
            .is_some_and(|hash| hash.contains_key(field)))
    }

    fn all_fields(&self, ns: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error> {
        Ok(self
            .hashes
            .read()
            .unwrap()
            .get(ns)
            .map(|hash| hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn drop_namespace(&self, ns: &str) -> Result<(), Self::Error> {
        self.hashes.write().unwrap().remove(ns);
        Ok(())
    }
}
