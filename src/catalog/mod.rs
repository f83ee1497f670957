//! The ordered collection of classifiable items.
//!
//! Share codes address items by position, so the order a provider reports
//! must be stable between encoding and decoding.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable identifier of a catalog item.
///
/// Serialized as a JSON string. Deserialization also accepts integers, since
/// older exports stored numeric ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        ItemId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        ItemId(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        ItemId(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id.to_string())
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Serialize for ItemId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(text) => ItemId(text),
            RawId::Unsigned(n) => ItemId(n.to_string()),
            RawId::Signed(n) => ItemId(n.to_string()),
        })
    }
}

/// Ordered, indexable sequence of item identifiers.
pub trait CatalogProvider {
    fn len(&self) -> usize;

    /// Identifier at `index`, or `None` past the end.
    fn identifier_at(&self, index: usize) -> Option<&ItemId>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CatalogProvider for [ItemId] {
    fn len(&self) -> usize {
        <[ItemId]>::len(self)
    }

    fn identifier_at(&self, index: usize) -> Option<&ItemId> {
        self.get(index)
    }
}

impl CatalogProvider for Vec<ItemId> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn identifier_at(&self, index: usize) -> Option<&ItemId> {
        self.get(index)
    }
}

impl<T: CatalogProvider + ?Sized> CatalogProvider for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn identifier_at(&self, index: usize) -> Option<&ItemId> {
        (**self).identifier_at(index)
    }
}

/// Owned catalog backed by a vector of identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<ItemId>,
}

impl Catalog {
    pub fn new(items: Vec<ItemId>) -> Self {
        Catalog { items }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter()
    }
}

impl<I: Into<ItemId>> FromIterator<I> for Catalog {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Catalog {
            items: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl CatalogProvider for Catalog {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn identifier_at(&self, index: usize) -> Option<&ItemId> {
        self.items.get(index)
    }
}
