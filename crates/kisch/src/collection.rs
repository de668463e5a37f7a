//! Ordered collections that can also be addressed by name.
//!
//! A [`NamedCollection`] keeps one backing `Vec` and a name index over it, so
//! the same elements can be walked in file order or looked up by designator.
//! Keys come from a caller-supplied function when an element is added and are
//! then tracked by the collection, which lets owners re-key elements (e.g.
//! after a Reference edit) without touching element order.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use crate::error::{Result, SchematicError};

/// Derives the name of an element at insertion time.
pub type KeyFn<T> = fn(&T) -> String;

#[derive(Debug, Clone)]
pub struct NamedCollection<T> {
    elements: Vec<T>,
    /// Key of each element, parallel to `elements`.
    keys: Vec<String>,
    index: HashMap<String, usize>,
    key_fn: KeyFn<T>,
}

impl<T> NamedCollection<T> {
    pub fn new(key_fn: KeyFn<T>) -> Self {
        NamedCollection {
            elements: Vec::new(),
            keys: Vec::new(),
            index: HashMap::new(),
            key_fn,
        }
    }

    /// Build from `elements`, failing on the first duplicate key.
    pub fn from_elements(elements: impl IntoIterator<Item = T>, key_fn: KeyFn<T>) -> Result<Self> {
        let mut collection = Self::new(key_fn);
        for element in elements {
            collection.append(element)?;
        }
        Ok(collection)
    }

    /// Build from `elements`, keeping only the first element under a repeated key
    /// in the name index. Later duplicates stay reachable by position.
    pub fn from_elements_lenient(elements: impl IntoIterator<Item = T>, key_fn: KeyFn<T>) -> Self {
        let mut collection = Self::new(key_fn);
        for element in elements {
            let key = key_fn(&element);
            collection.index.entry(key.clone()).or_insert(collection.elements.len());
            collection.keys.push(key);
            collection.elements.push(element);
        }
        collection
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.position(name).map(|idx| &self.elements[idx])
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Key the element at `index` is registered under.
    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(String::as_str)
    }

    /// Element keys in sequence order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Add `element` at the end under its derived key.
    pub fn append(&mut self, element: T) -> Result<usize> {
        let key = (self.key_fn)(&element);
        self.append_with_key(element, key)
    }

    /// Add `element` at the end under an explicit key.
    pub fn append_with_key(&mut self, element: T, key: String) -> Result<usize> {
        if self.index.contains_key(&key) {
            return Err(SchematicError::KeyCollision { key });
        }
        let position = self.elements.len();
        self.index.insert(key.clone(), position);
        self.keys.push(key);
        self.elements.push(element);
        Ok(position)
    }

    /// Move the index entry `old` to `new`; element order is unchanged.
    pub fn element_rename(&mut self, old: &str, new: &str) -> Result<()> {
        let Some(&position) = self.index.get(old) else {
            return Err(SchematicError::KeyNotFound {
                key: old.to_string(),
            });
        };
        if old == new {
            return Ok(());
        }
        if self.index.contains_key(new) {
            return Err(SchematicError::KeyCollision {
                key: new.to_string(),
            });
        }
        self.index.remove(old);
        self.index.insert(new.to_string(), position);
        self.keys[position] = new.to_string();
        Ok(())
    }

    /// Remove the element named `name`, shifting later elements down.
    pub fn remove(&mut self, name: &str) -> Result<T> {
        let position = self
            .index
            .remove(name)
            .ok_or_else(|| SchematicError::KeyNotFound {
                key: name.to_string(),
            })?;
        self.keys.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Ok(self.elements.remove(position))
    }
}

impl<T> Index<usize> for NamedCollection<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.elements[index]
    }
}

impl<T> IndexMut<usize> for NamedCollection<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.elements[index]
    }
}

impl<'a, T> IntoIterator for &'a NamedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Part {
        name: &'static str,
        value: u32,
    }

    fn part(name: &'static str, value: u32) -> Part {
        Part { name, value }
    }

    fn parts() -> NamedCollection<Part> {
        NamedCollection::from_elements(
            [part("C1", 1), part("R1", 2), part("R2", 3)],
            |p| p.name.to_string(),
        )
        .unwrap()
    }

    #[test]
    fn index_and_name_views_share_elements() {
        let parts = parts();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].value, 2);
        assert_eq!(parts.get_by_name("R2").map(|p| p.value), Some(3));
        assert!(parts.get_by_name("R3").is_none());
        assert_eq!(parts.names().collect::<Vec<_>>(), vec!["C1", "R1", "R2"]);
        assert_eq!(parts.iter().map(|p| p.value).sum::<u32>(), 6);
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let err = NamedCollection::from_elements([part("R1", 1), part("R1", 2)], |p| {
            p.name.to_string()
        })
        .unwrap_err();
        assert!(matches!(err, SchematicError::KeyCollision { key } if key == "R1"));
    }

    #[test]
    fn lenient_build_keeps_first_duplicate() {
        let parts = NamedCollection::from_elements_lenient([part("~", 1), part("~", 2)], |p| {
            p.name.to_string()
        });
        assert_eq!(parts.len(), 2);
        assert_eq!(parts.get_by_name("~").map(|p| p.value), Some(1));
    }

    #[test]
    fn rename_moves_index_and_keeps_order() {
        let mut parts = parts();
        parts.element_rename("R1", "R9").unwrap();
        assert!(!parts.contains("R1"));
        assert_eq!(parts.get_by_name("R9").map(|p| p.value), Some(2));
        assert_eq!(parts.position("R9"), Some(1));
        assert_eq!(parts.key_at(1), Some("R9"));

        assert!(matches!(
            parts.element_rename("R9", "C1"),
            Err(SchematicError::KeyCollision { .. })
        ));
        assert!(matches!(
            parts.element_rename("nope", "X1"),
            Err(SchematicError::KeyNotFound { .. })
        ));
        parts.element_rename("C1", "C1").unwrap();
    }

    #[test]
    fn append_and_remove_keep_index_consistent() {
        let mut parts = parts();
        assert_eq!(parts.append(part("L1", 4)).unwrap(), 3);
        assert!(parts.append(part("L1", 5)).is_err());

        let removed = parts.remove("R1").unwrap();
        assert_eq!(removed.value, 2);
        assert_eq!(parts.position("R2"), Some(1));
        assert_eq!(parts.position("L1"), Some(2));
        assert_eq!(parts.get_by_name("L1").map(|p| p.value), Some(4));
        assert!(parts.remove("R1").is_err());
    }
}
