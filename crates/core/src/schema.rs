//! Schema model: a closed union of (key shape, value kind) variants
//!
//! A schema is declared once and validated at construction. Shape components
//! are either literal parts (`["preferences", ...]`) or typed wildcards
//! (any string, any int). Shapes must not overlap, so every concrete key
//! matches at most one variant; a key may still match the *prefix* of
//! several variants, which is what range listing builds on.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::limits;
use crate::part::{KeyPart, PartType};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// The value capability of a schema variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// An opaque serialized value, replaced wholesale on write.
    Blob,
    /// A u64 merged with sum/min/max at commit time instead of overwritten.
    Counter,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Blob => write!(f, "blob"),
            ValueKind::Counter => write!(f, "counter"),
        }
    }
}

/// One component of a key shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapePart {
    /// Exactly this part, typically a namespace tag like `"preferences"`.
    Lit(KeyPart),
    /// Any part of the given type.
    Type(PartType),
}

impl ShapePart {
    /// A literal component.
    pub fn lit(part: impl Into<KeyPart>) -> Self {
        ShapePart::Lit(part.into())
    }

    /// Whether `part` satisfies this component.
    pub fn matches(&self, part: &KeyPart) -> bool {
        match self {
            ShapePart::Lit(lit) => lit == part,
            ShapePart::Type(ty) => part.matches(*ty),
        }
    }

    /// Whether some concrete part satisfies both components.
    fn overlaps(&self, other: &ShapePart) -> bool {
        match (self, other) {
            (ShapePart::Lit(a), ShapePart::Lit(b)) => a == b,
            (ShapePart::Lit(lit), ShapePart::Type(ty))
            | (ShapePart::Type(ty), ShapePart::Lit(lit)) => lit.matches(*ty),
            (ShapePart::Type(a), ShapePart::Type(b)) => a == b,
        }
    }
}

impl From<PartType> for ShapePart {
    fn from(ty: PartType) -> Self {
        ShapePart::Type(ty)
    }
}

impl From<KeyPart> for ShapePart {
    fn from(part: KeyPart) -> Self {
        ShapePart::Lit(part)
    }
}

impl From<&str> for ShapePart {
    fn from(s: &str) -> Self {
        ShapePart::Lit(KeyPart::Str(s.to_string()))
    }
}

impl From<i64> for ShapePart {
    fn from(i: i64) -> Self {
        ShapePart::Lit(KeyPart::Int(i))
    }
}

impl From<bool> for ShapePart {
    fn from(b: bool) -> Self {
        ShapePart::Lit(KeyPart::Bool(b))
    }
}

impl fmt::Display for ShapePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapePart::Lit(part) => write!(f, "{part}"),
            ShapePart::Type(ty) => write!(f, "{ty}"),
        }
    }
}

/// Build a [`KeyShape`] from literal and typed components.
///
/// ```
/// use typedkv_core::{key_shape, PartType};
///
/// let shape = key_shape!["preferences", PartType::Str];
/// ```
#[macro_export]
macro_rules! key_shape {
    ($($part:expr),* $(,)?) => {
        $crate::schema::KeyShape::new(vec![$($crate::schema::ShapePart::from($part)),*])
    };
}

/// An ordered sequence of shape components: the shape of a key.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyShape {
    parts: Vec<ShapePart>,
}

impl KeyShape {
    /// The empty shape, matched only by the empty key.
    pub fn empty() -> Self {
        KeyShape { parts: Vec::new() }
    }

    /// Build a shape from components.
    pub fn new(parts: Vec<ShapePart>) -> Self {
        KeyShape { parts }
    }

    /// The components, in order.
    pub fn parts(&self) -> &[ShapePart] {
        &self.parts
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether this is the empty shape.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Whether `key` fully matches this shape: same length, each part
    /// satisfying the declared component.
    pub fn matches(&self, key: &Key) -> bool {
        key.len() == self.parts.len() && self.matches_prefix_of_len(key, key.len())
    }

    /// Whether the first `len` parts of `key` match the first `len`
    /// components of this shape.
    fn matches_prefix_of_len(&self, key: &Key, len: usize) -> bool {
        len <= self.parts.len()
            && key.parts()[..len]
                .iter()
                .zip(&self.parts[..len])
                .all(|(part, component)| component.matches(part))
    }

    /// Whether `key` matches a leading portion of this shape.
    pub fn starts_with_key(&self, key: &Key) -> bool {
        key.len() <= self.parts.len() && self.matches_prefix_of_len(key, key.len())
    }

    /// Whether some concrete key could match both shapes.
    pub fn overlaps(&self, other: &KeyShape) -> bool {
        self.parts.len() == other.parts.len()
            && self
                .parts
                .iter()
                .zip(&other.parts)
                .all(|(a, b)| a.overlaps(b))
    }

    /// The shape with its final component removed, or `None` if empty.
    pub fn parent(&self) -> Option<KeyShape> {
        if self.parts.is_empty() {
            return None;
        }
        Some(KeyShape {
            parts: self.parts[..self.parts.len() - 1].to_vec(),
        })
    }
}

impl From<Vec<ShapePart>> for KeyShape {
    fn from(parts: Vec<ShapePart>) -> Self {
        KeyShape { parts }
    }
}

impl<const N: usize> From<[ShapePart; N]> for KeyShape {
    fn from(parts: [ShapePart; N]) -> Self {
        KeyShape {
            parts: parts.to_vec(),
        }
    }
}

impl<const N: usize> From<[PartType; N]> for KeyShape {
    fn from(parts: [PartType; N]) -> Self {
        KeyShape {
            parts: parts.iter().map(|ty| ShapePart::Type(*ty)).collect(),
        }
    }
}

impl fmt::Display for KeyShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, component) in self.parts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{component}")?;
        }
        write!(f, "]")
    }
}

/// One (key shape, value kind) pair of a schema.
#[derive(Debug, Clone)]
pub struct Variant {
    name: String,
    shape: KeyShape,
    kind: ValueKind,
}

impl Variant {
    /// Descriptive name, used in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key shape this variant owns.
    pub fn shape(&self) -> &KeyShape {
        &self.shape
    }

    /// The value capability of keys matching this variant.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
}

/// Schema construction errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A schema must declare at least one variant.
    #[error("schema has no variants")]
    Empty,

    /// Two variants admit a common key, so keys would not partition.
    #[error("variants '{first}' and '{second}' declare overlapping shapes ({shape})")]
    OverlappingShapes {
        /// Name of the earlier variant
        first: String,
        /// Name of the later variant
        second: String,
        /// The later variant's shape
        shape: String,
    },

    /// A shape exceeds the maximum component count.
    #[error("variant '{name}' has {len} components, maximum is {max}")]
    ShapeTooLong {
        /// Offending variant name
        name: String,
        /// Declared component count
        len: usize,
        /// Maximum allowed
        max: usize,
    },
}

/// A validated, closed set of variants.
#[derive(Debug, Clone)]
pub struct Schema {
    variants: Vec<Variant>,
}

impl Schema {
    /// Start declaring a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            variants: Vec::new(),
        }
    }

    /// All variants, in declaration order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// The unique variant whose shape `key` fully matches, if any.
    ///
    /// Uniqueness is guaranteed by construction: shapes do not overlap, so
    /// no key can fully match two of them.
    pub fn variant_of(&self, key: &Key) -> Option<&Variant> {
        self.variants.iter().find(|v| v.shape.matches(key))
    }

    /// Like [`Schema::variant_of`] but a construction error on no match.
    pub fn check_key(&self, key: &Key) -> Result<&Variant> {
        self.variant_of(key)
            .ok_or_else(|| Error::SchemaMismatch { key: key.clone() })
    }

    /// Check that `key` matches a variant of the expected value kind.
    pub fn check_key_kind(&self, key: &Key, kind: ValueKind) -> Result<&Variant> {
        let variant = self.check_key(key)?;
        if variant.kind() != kind {
            return match kind {
                ValueKind::Counter => Err(Error::NotACounter { key: key.clone() }),
                ValueKind::Blob => Err(Error::ValueKindMismatch {
                    key: key.clone(),
                    expected: variant.kind().to_string(),
                    actual: kind.to_string(),
                }),
            };
        }
        Ok(variant)
    }

    /// Every valid listing prefix: each variant's shape with the final
    /// component removed, plus the empty shape.
    pub fn prefixes(&self) -> BTreeSet<KeyShape> {
        let mut set: BTreeSet<KeyShape> = self
            .variants
            .iter()
            .filter_map(|v| v.shape.parent())
            .collect();
        set.insert(KeyShape::empty());
        set
    }

    /// Whether `key` is a valid listing prefix, i.e. matches a strict
    /// leading subsequence of at least one variant's shape.
    pub fn is_prefix(&self, key: &Key) -> bool {
        self.variants
            .iter()
            .any(|v| key.len() < v.shape.len() && v.shape.starts_with_key(key))
    }

    /// All variants whose shape begins with `prefix` (possibly the variant
    /// the prefix fully matches, for start/end bound validation).
    pub fn variants_with_prefix(&self, prefix: &Key) -> Vec<&Variant> {
        self.variants
            .iter()
            .filter(|v| v.shape.starts_with_key(prefix))
            .collect()
    }

    /// Like [`Schema::is_prefix`] but a construction error when invalid.
    pub fn check_prefix(&self, key: &Key) -> Result<()> {
        if self.is_prefix(key) {
            Ok(())
        } else {
            Err(Error::InvalidPrefix { key: key.clone() })
        }
    }
}

/// Builder for [`Schema`], validating as it accumulates.
#[derive(Debug)]
pub struct SchemaBuilder {
    variants: Vec<Variant>,
}

impl SchemaBuilder {
    /// Declare a variant.
    pub fn variant(
        mut self,
        name: impl Into<String>,
        shape: impl Into<KeyShape>,
        kind: ValueKind,
    ) -> Self {
        self.variants.push(Variant {
            name: name.into(),
            shape: shape.into(),
            kind,
        });
        self
    }

    /// Validate and produce the schema.
    pub fn build(self) -> std::result::Result<Schema, SchemaError> {
        if self.variants.is_empty() {
            return Err(SchemaError::Empty);
        }
        for v in &self.variants {
            if v.shape.len() > limits::MAX_KEY_PARTS {
                return Err(SchemaError::ShapeTooLong {
                    name: v.name.clone(),
                    len: v.shape.len(),
                    max: limits::MAX_KEY_PARTS,
                });
            }
        }
        for (i, a) in self.variants.iter().enumerate() {
            for b in &self.variants[i + 1..] {
                if a.shape.overlaps(&b.shape) {
                    return Err(SchemaError::OverlappingShapes {
                        first: a.name.clone(),
                        second: b.name.clone(),
                        shape: b.shape.to_string(),
                    });
                }
            }
        }
        Ok(Schema {
            variants: self.variants,
        })
    }
}
