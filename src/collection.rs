use serde::{Serialize, Serializer};

/// A record returned by the planning API, kept whole and exposing the fields
/// collections filter and correlate on.
pub trait Record {
    /// Class name of the entity the record describes or targets.
    fn entity_type(&self) -> Option<&str>;

    /// Identifier that stays stable across markets.
    fn reference_id(&self) -> Option<&str>;
}

/// Case-insensitive comparison; a missing field never matches.
pub(crate) fn field_matches(field: Option<&str>, wanted: &str) -> bool {
    match field {
        Some(f) => f.to_lowercase() == wanted.to_lowercase(),
        None => false,
    }
}

/// Ordered list of records. Filters never modify the collection they are
/// called on.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    items: Vec<T>,
}

impl<T> Collection<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    pub(crate) fn push(&mut self, item: T) {
        self.items.push(item);
    }
}

impl<T: Record> Collection<T> {
    /// Lazy view over the records of one entity type.
    pub fn iter_entity_type<'a>(&'a self, entity_type: &'a str) -> impl Iterator<Item = &'a T> + 'a {
        self.items
            .iter()
            .filter(move |r| field_matches(r.entity_type(), entity_type))
    }
}

impl<T: Record + Clone> Collection<T> {
    pub fn by_entity_type(&self, entity_type: &str) -> Self {
        self.iter_entity_type(entity_type).cloned().collect()
    }
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for Collection<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> FromIterator<T> for Collection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self { items: iter.into_iter().collect() }
    }
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}
