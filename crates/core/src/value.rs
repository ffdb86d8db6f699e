//! Raw value representation shared with the store
//!
//! The store never sees callers' value types. It sees [`RawValue`]: either
//! an opaque encoded blob, replaced wholesale on write, or a native u64
//! counter the store can merge with sum/min/max at commit time.

use crate::error::{Error, Result};
use crate::limits;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A value as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Opaque serialized bytes of a caller value.
    Blob(Vec<u8>),
    /// A merge-capable counter.
    Counter(u64),
}

impl RawValue {
    /// Encode a caller value into a blob, enforcing the size limit.
    pub fn encode<V: Serialize>(value: &V) -> Result<RawValue> {
        let bytes = bincode::serialize(value)?;
        if bytes.len() > limits::MAX_VALUE_BYTES {
            return Err(Error::ValueTooLarge {
                actual: bytes.len(),
                max: limits::MAX_VALUE_BYTES,
            });
        }
        Ok(RawValue::Blob(bytes))
    }

    /// Decode a blob back into a caller value.
    ///
    /// Fails with a codec error if this is a counter.
    pub fn decode<V: DeserializeOwned>(&self) -> Result<V> {
        match self {
            RawValue::Blob(bytes) => Ok(bincode::deserialize(bytes)?),
            RawValue::Counter(_) => Err(Error::Codec(
                "expected an encoded value, found a counter".to_string(),
            )),
        }
    }

    /// The counter value, if this is one.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            RawValue::Counter(n) => Some(*n),
            RawValue::Blob(_) => None,
        }
    }
}
