//! Compile-time key→value narrowing
//!
//! The runtime [`Schema`](crate::schema::Schema) validates raw keys; this
//! module is the static half. A caller declares a marker type implementing
//! [`KeySpace`], one Rust type per key shape implementing [`TypedKey`], and
//! the type system then narrows every call site to exactly that key's value
//! type. Counter legality is a trait bound (`Codec = Counter`), not a
//! runtime check.
//!
//! Value encoding goes through codec types rather than bounds on the value
//! itself, so one key space can mix serde-encoded values, native counters,
//! and raw pass-through reads.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::schema::{Schema, ValueKind};
use crate::value::RawValue;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Marker type carrying a schema: the static identity of one declared
/// key space. All typed keys, prefixes, and facades are parameterized by
/// it so keys from one schema cannot be used against another.
pub trait KeySpace: Sized + 'static {
    /// The runtime schema these typed keys belong to.
    fn schema() -> &'static Schema;
}

/// Decode half of a value codec.
pub trait ValueCodec {
    /// The caller-facing value type.
    type Value;

    /// Decode a stored value.
    fn decode(raw: &RawValue) -> Result<Self::Value>;
}

/// Encode half of a value codec. Read-only codecs (like [`Raw`]) do not
/// implement this, which keeps them out of write paths at compile time.
pub trait EncodeValue: ValueCodec {
    /// The schema kind this codec writes.
    const KIND: ValueKind;

    /// Encode a caller value for storage.
    fn encode(value: &Self::Value) -> Result<RawValue>;
}

/// Codec for any serde value, stored as an opaque bincode blob.
pub struct SerdeBincode<T>(PhantomData<T>);

impl<T: Serialize + DeserializeOwned> ValueCodec for SerdeBincode<T> {
    type Value = T;

    fn decode(raw: &RawValue) -> Result<T> {
        raw.decode()
    }
}

impl<T: Serialize + DeserializeOwned> EncodeValue for SerdeBincode<T> {
    const KIND: ValueKind = ValueKind::Blob;

    fn encode(value: &T) -> Result<RawValue> {
        RawValue::encode(value)
    }
}

/// Codec for merge-capable counters.
///
/// Keys whose codec is `Counter` are the only ones the atomic builder's
/// `sum`/`min`/`max` accept.
pub struct Counter;

impl ValueCodec for Counter {
    type Value = u64;

    fn decode(raw: &RawValue) -> Result<u64> {
        raw.as_counter().ok_or_else(|| {
            Error::Codec("expected a counter, found an encoded value".to_string())
        })
    }
}

impl EncodeValue for Counter {
    const KIND: ValueKind = ValueKind::Counter;

    fn encode(value: &u64) -> Result<RawValue> {
        Ok(RawValue::Counter(*value))
    }
}

/// Pass-through codec: yields the stored [`RawValue`] untouched. Used by
/// heterogeneous reads (multi-variant list selectors, raw watches) where no
/// single caller type applies. Decode-only.
pub struct Raw;

impl ValueCodec for Raw {
    type Value = RawValue;

    fn decode(raw: &RawValue) -> Result<RawValue> {
        Ok(raw.clone())
    }
}

/// A key type bound to one schema variant.
///
/// Implementations are small structs mirroring the variant's shape, e.g.
/// `struct Preferences(pub String)` for a `["preferences", str]` variant.
pub trait TypedKey<S: KeySpace> {
    /// Codec for the variant's value type.
    type Codec: ValueCodec;

    /// The concrete key this instance denotes.
    fn key(&self) -> Key;
}

/// A prefix type narrowing to variants that share one value type.
pub trait TypedPrefix<S: KeySpace> {
    /// Codec for the value type of every variant under this prefix.
    type Codec: ValueCodec;

    /// The concrete prefix this instance denotes.
    fn prefix(&self) -> Key;
}

/// The value type a typed key narrows to.
pub type ValueOf<K, S> = <<K as TypedKey<S>>::Codec as ValueCodec>::Value;
