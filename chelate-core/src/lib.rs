//! Chelate is a mutable mapping persisted in a remote hash store.
//!
//! Core concepts:
//! - **Value**: A closed tagged-variant model of everything a chelate can
//!   hold (numbers of several exact kinds, text, bytes, instants, spans,
//!   UUIDs, sequences, maps)
//! - **Codec**: Canonical CBOR encoding for values, with integer-valued
//!   floats, complexes, decimals, and rationals narrowed to integers
//! - **HashStore**: The six-primitive contract a backing store must satisfy
//!   (get/set/delete/exists per field, fetch-all, drop)
//! - **Chelate**: The mapping engine — the full associative-container
//!   contract built on those primitives, with a per-instance read cache
//!
//! # Example
//!
//! ```
//! use chelate_core::{Chelate, MemoryStore, Value};
//!
//! let mut map = Chelate::new(MemoryStore::new());
//! map.insert("answer", 42i64).unwrap();
//! assert_eq!(map.get("answer").unwrap(), Value::Int(42));
//!
//! // Integer-valued floats are stored as integers.
//! map.insert("pi-ish", 3.0f64).unwrap();
//! assert_eq!(map.get("pi-ish").unwrap(), Value::Int(3));
//! ```
//!
//! Every operation is synchronous and blocking; cross-instance coordination
//! is out of scope (see the caveats on [`Chelate`]).

mod chelate;
mod codec;
mod store;
mod value;

pub use chelate::{Chelate, ChelateError};
pub use codec::{decode, decode_maybe, encode, DecodeError, EncodeError};
pub use store::{HashStore, MemoryStore};
pub use value::{Complex, Decimal, Rational, Span, Timestamp, Value};
