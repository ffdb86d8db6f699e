//! Heterogeneous batched reads.
//!
//! `getMany`-style reads take several typed keys of *different* variants in
//! one round trip and give back a tuple of entries, each narrowed to its own
//! key's value type. [`KeyTuple`] is implemented for tuples of typed-key
//! references up to arity 8.

use typedkv_core::{Error, Key, KeySpace, MaybeEntry, RawValue, Result, TypedKey, ValueCodec, ValueOf};

/// A fixed-arity collection of typed keys read in one batch.
pub trait KeyTuple<S: KeySpace> {
    /// One decoded [`MaybeEntry`] per key, in tuple order.
    type Entries;

    /// The raw keys, in tuple order.
    fn keys(&self) -> Vec<Key>;

    /// Decode one raw entry per key, each through its own codec.
    fn decode(entries: Vec<MaybeEntry<RawValue>>) -> Result<Self::Entries>;
}

fn next_entry<C: ValueCodec>(
    entries: &mut std::vec::IntoIter<MaybeEntry<RawValue>>,
) -> Result<MaybeEntry<C::Value>> {
    let entry = entries
        .next()
        .ok_or_else(|| Error::Store("batch read returned fewer entries than keys".to_string()))?;
    entry.try_map(|_, raw| C::decode(&raw))
}

macro_rules! impl_key_tuple {
    ($(($K:ident, $idx:tt)),+) => {
        impl<'a, S: KeySpace, $($K: TypedKey<S>),+> KeyTuple<S> for ($(&'a $K,)+) {
            type Entries = ($(MaybeEntry<ValueOf<$K, S>>,)+);

            fn keys(&self) -> Vec<Key> {
                vec![$(self.$idx.key()),+]
            }

            fn decode(entries: Vec<MaybeEntry<RawValue>>) -> Result<Self::Entries> {
                let mut entries = entries.into_iter();
                Ok(($(next_entry::<$K::Codec>(&mut entries)?,)+))
            }
        }
    };
}

impl_key_tuple!((K0, 0));
impl_key_tuple!((K0, 0), (K1, 1));
impl_key_tuple!((K0, 0), (K1, 1), (K2, 2));
impl_key_tuple!((K0, 0), (K1, 1), (K2, 2), (K3, 3));
impl_key_tuple!((K0, 0), (K1, 1), (K2, 2), (K3, 3), (K4, 4));
impl_key_tuple!((K0, 0), (K1, 1), (K2, 2), (K3, 3), (K4, 4), (K5, 5));
impl_key_tuple!((K0, 0), (K1, 1), (K2, 2), (K3, 3), (K4, 4), (K5, 5), (K6, 6));
impl_key_tuple!(
    (K0, 0),
    (K1, 1),
    (K2, 2),
    (K3, 3),
    (K4, 4),
    (K5, 5),
    (K6, 6),
    (K7, 7)
);
