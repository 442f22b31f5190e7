use std::collections::HashMap;

use indexmap::IndexMap;

use crate::codec::{self, DecodeError, EncodeError};
use crate::store::HashStore;
use crate::value::Value;

/// Error type for mapping operations.
#[derive(Debug, thiserror::Error)]
pub enum ChelateError {
    #[error("key not found: {0}")]
    KeyNotFound(Value),
    #[error("cannot pop from an empty mapping")]
    Empty,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

fn store_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> ChelateError {
    ChelateError::Store(Box::new(err))
}

/// A mutable mapping persisted in a remote hash store.
///
/// All entries live in one hash, addressed by the chelate's namespace; the
/// store is always the source of truth. A private read cache avoids repeat
/// round trips: it is filled lazily by [`get`](Chelate::get) and eagerly by
/// [`insert`](Chelate::insert), and is never consulted for key discovery
/// ([`keys`](Chelate::keys)) or membership ([`contains`](Chelate::contains)).
///
/// Dropping a `Chelate` leaves the stored data intact; reopen it with
/// [`Chelate::open`] and the same namespace.
///
/// # Concurrency caveats
///
/// Several mappings (possibly in different processes) may share a namespace.
/// There is no cross-instance locking or cache invalidation: a cached read
/// can be stale if another instance wrote the key since, and multi-step
/// operations ([`set_default`](Chelate::set_default), [`pop`](Chelate::pop),
/// [`pop_item`](Chelate::pop_item), [`update`](Chelate::update),
/// [`duplicate`](Chelate::duplicate)) are not atomic as a whole — a
/// concurrent writer can interleave between their read and write halves.
/// Each individual store call is as atomic as the store makes it, no more.
pub struct Chelate<S: HashStore> {
    store: S,
    namespace: String,
    cache: HashMap<Value, Value>,
}

impl<S: HashStore> Chelate<S> {
    /// Creates a mapping under a fresh random namespace.
    pub fn new(store: S) -> Self {
        let namespace = uuid::Uuid::new_v4().to_string();
        log::debug!("chelate bound to fresh namespace {namespace}");
        Chelate {
            store,
            namespace,
            cache: HashMap::new(),
        }
    }

    /// Binds to an explicit namespace, existing or new.
    pub fn open(store: S, namespace: impl Into<String>) -> Self {
        Chelate {
            store,
            namespace: namespace.into(),
            cache: HashMap::new(),
        }
    }

    /// Creates a mapping under a fresh namespace, seeded from an iterator of
    /// pairs applied in order via [`insert`](Chelate::insert).
    pub fn with_entries<K, V>(
        store: S,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ChelateError>
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        let mut chelate = Self::new(store);
        chelate.update(entries)?;
        Ok(chelate)
    }

    /// Creates a mapping under a fresh namespace where every key of `keys`
    /// maps to `default`.
    pub fn from_keys<I>(store: S, keys: I, default: impl Into<Value>) -> Result<Self, ChelateError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let default = default.into().canonicalized();
        let mut chelate = Self::new(store);
        for key in keys {
            chelate.insert(key, default.clone())?;
        }
        Ok(chelate)
    }

    /// The namespace all entries of this mapping live under.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Sets `key` to `value`, overwriting any previous entry.
    pub fn insert(
        &mut self,
        key: impl Into<Value>,
        value: impl Into<Value>,
    ) -> Result<(), ChelateError> {
        let key = key.into().canonicalized();
        let value = value.into().canonicalized();
        let field = codec::encode(&key)?;
        let payload = codec::encode(&value)?;
        self.store
            .field_set(&self.namespace, &field, &payload)
            .map_err(store_err)?;
        self.cache.insert(key, value);
        Ok(())
    }

    /// Returns the value for `key`, or `ChelateError::KeyNotFound`.
    ///
    /// Served from the cache when possible; a miss fetches from the store
    /// and populates the cache.
    pub fn get(&mut self, key: impl Into<Value>) -> Result<Value, ChelateError> {
        let key = key.into().canonicalized();
        match self.lookup(&key)? {
            Some(value) => Ok(value),
            None => Err(ChelateError::KeyNotFound(key)),
        }
    }

    /// Like [`get`](Chelate::get), with absence as `None` instead of an
    /// error.
    pub fn try_get(&mut self, key: impl Into<Value>) -> Result<Option<Value>, ChelateError> {
        let key = key.into().canonicalized();
        self.lookup(&key)
    }

    /// Like [`get`](Chelate::get), returning `default` when absent.
    pub fn get_or(
        &mut self,
        key: impl Into<Value>,
        default: impl Into<Value>,
    ) -> Result<Value, ChelateError> {
        match self.try_get(key)? {
            Some(value) => Ok(value),
            None => Ok(default.into()),
        }
    }

    /// Cache-then-store lookup. Expects a canonicalized key.
    fn lookup(&mut self, key: &Value) -> Result<Option<Value>, ChelateError> {
        if let Some(hit) = self.cache.get(key) {
            log::trace!("cache hit for {key} in {}", self.namespace);
            return Ok(Some(hit.clone()));
        }
        let field = codec::encode(key)?;
        let raw = self
            .store
            .field_get(&self.namespace, &field)
            .map_err(store_err)?;
        match codec::decode_maybe(raw.as_deref())? {
            Some(value) => {
                self.cache.insert(key.clone(), value.clone());
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Deletes the entry for `key`, or fails with
    /// `ChelateError::KeyNotFound` when the store reports nothing deleted.
    /// The cache is only touched on success.
    pub fn remove(&mut self, key: impl Into<Value>) -> Result<(), ChelateError> {
        let key = key.into().canonicalized();
        let field = codec::encode(&key)?;
        let deleted = self
            .store
            .field_delete(&self.namespace, &field)
            .map_err(store_err)?;
        if deleted == 0 {
            return Err(ChelateError::KeyNotFound(key));
        }
        self.cache.remove(&key);
        Ok(())
    }

    /// Membership test, always authoritative against the store (the cache
    /// is bypassed).
    pub fn contains(&self, key: impl Into<Value>) -> Result<bool, ChelateError> {
        let field = codec::encode(&key.into())?;
        self.store
            .field_exists(&self.namespace, &field)
            .map_err(store_err)
    }

    /// All keys, freshly fetched from the store on every call, in whatever
    /// order the store returns them.
    pub fn keys(&self) -> Result<Vec<Value>, ChelateError> {
        let fields = self.store.all_fields(&self.namespace).map_err(store_err)?;
        let mut keys = Vec::with_capacity(fields.len());
        for (field, _) in fields {
            keys.push(codec::decode(&field)?);
        }
        Ok(keys)
    }

    /// All (key, value) pairs. Key discovery bypasses the cache; each value
    /// is then re-fetched through [`get`](Chelate::get), one lookup per key,
    /// so every entry carries the same cache semantics as a direct read.
    /// (The alternative — reusing the bulk fetch — would cost one round trip
    /// but race differently with concurrent writers.)
    pub fn items(&mut self) -> Result<Vec<(Value, Value)>, ChelateError> {
        let keys = self.keys()?;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.get(key.clone())?;
            items.push((key, value));
        }
        Ok(items)
    }

    /// All values, derived from [`items`](Chelate::items).
    pub fn values(&mut self) -> Result<Vec<Value>, ChelateError> {
        Ok(self.items()?.into_iter().map(|(_, v)| v).collect())
    }

    /// Number of entries, authoritative against the store.
    pub fn len(&self) -> Result<usize, ChelateError> {
        Ok(self.keys()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ChelateError> {
        Ok(self.len()? == 0)
    }

    /// Deletes the entire hash and empties the cache.
    pub fn clear(&mut self) -> Result<(), ChelateError> {
        log::debug!("dropping namespace {}", self.namespace);
        self.store
            .drop_namespace(&self.namespace)
            .map_err(store_err)?;
        self.cache.clear();
        Ok(())
    }

    /// Returns the value for `key`; when absent, stores `default` under
    /// `key` and returns it.
    pub fn set_default(
        &mut self,
        key: impl Into<Value>,
        default: impl Into<Value>,
    ) -> Result<Value, ChelateError> {
        let key = key.into().canonicalized();
        if let Some(existing) = self.lookup(&key)? {
            return Ok(existing);
        }
        let default = default.into().canonicalized();
        self.insert(key, default.clone())?;
        Ok(default)
    }

    /// Removes `key` and returns its value, or `ChelateError::KeyNotFound`.
    pub fn pop(&mut self, key: impl Into<Value>) -> Result<Value, ChelateError> {
        let key = key.into().canonicalized();
        match self.lookup(&key)? {
            Some(value) => {
                self.remove(key)?;
                Ok(value)
            }
            None => Err(ChelateError::KeyNotFound(key)),
        }
    }

    /// Removes `key` and returns its value, or `default` when absent.
    pub fn pop_or(
        &mut self,
        key: impl Into<Value>,
        default: impl Into<Value>,
    ) -> Result<Value, ChelateError> {
        let key = key.into().canonicalized();
        match self.lookup(&key)? {
            Some(value) => {
                self.remove(key)?;
                Ok(value)
            }
            None => Ok(default.into()),
        }
    }

    /// Removes and returns the first discovered pair, or
    /// `ChelateError::Empty` when there are none.
    pub fn pop_item(&mut self) -> Result<(Value, Value), ChelateError> {
        let Some(key) = self.keys()?.into_iter().next() else {
            return Err(ChelateError::Empty);
        };
        let value = self.get(key.clone())?;
        self.remove(key.clone())?;
        Ok((key, value))
    }

    /// Inserts every pair of `entries`, in iterator order.
    pub fn update<K, V>(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), ChelateError>
    where
        K: Into<Value>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.insert(key, value)?;
        }
        Ok(())
    }

    /// Copies all entries into a new mapping under a fresh namespace on the
    /// same store.
    pub fn duplicate(&mut self) -> Result<Self, ChelateError>
    where
        S: Clone,
    {
        let mut copy = Chelate::new(self.store.clone());
        for (key, value) in self.items()? {
            copy.insert(key, value)?;
        }
        Ok(copy)
    }

    /// Materializes the current contents as a plain in-memory mapping.
    pub fn materialize(&mut self) -> Result<IndexMap<Value, Value>, ChelateError> {
        Ok(self.items()?.into_iter().collect())
    }

    /// Content equality against a plain mapping.
    ///
    /// Comparing against `None` reports `true`. This is inherited behavior
    /// (the reference implementation's comparison answered truthy for the
    /// absent value) and is kept deliberately; see DESIGN.md.
    pub fn content_eq(
        &mut self,
        other: Option<&IndexMap<Value, Value>>,
    ) -> Result<bool, ChelateError> {
        match other {
            None => Ok(true),
            Some(expected) => Ok(&self.materialize()? == expected),
        }
    }

    /// Renders the materialized contents, `{key: value, ...}`.
    pub fn render(&mut self) -> Result<String, ChelateError> {
        Ok(Value::Map(self.materialize()?).to_string())
    }
}
