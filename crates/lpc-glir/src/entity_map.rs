//! Dense entity-to-data maps.
//!
//! `PrimaryMap` is the arena behind every node kind of a shader. It is a
//! `Vec` with entity-based indexing: pushing returns the handle of the new
//! node, and handles are only ever produced by the map that owns them.

use alloc::vec::Vec;
use core::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::entity::EntityRef;

/// Dense map from entity to data
///
/// - `PrimaryMap<Var, Variable>` - the variable arena
/// - `PrimaryMap<Inst, InstData>` - the statement arena
/// - `PrimaryMap<Expr, ExprData>` - the expression arena
#[derive(Debug, Clone)]
pub struct PrimaryMap<K: EntityRef, V> {
    data: Vec<V>,
    _phantom: PhantomData<K>,
}

impl<K: EntityRef, V> PrimaryMap<K, V> {
    /// Create a new empty PrimaryMap
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Create a new PrimaryMap with the specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            _phantom: PhantomData,
        }
    }

    /// Push a value and return its entity key
    pub fn push(&mut self, value: V) -> K {
        let index = self.data.len();
        self.data.push(value);
        K::from_index(index)
    }

    /// The key the next `push` will return
    pub fn next_key(&self) -> K {
        K::from_index(self.data.len())
    }

    /// Get a value by entity key
    pub fn get(&self, key: K) -> Option<&V> {
        self.data.get(key.index())
    }

    /// Get a mutable value by entity key
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.data.get_mut(key.index())
    }

    /// Check whether a key was produced by this map
    pub fn is_valid(&self, key: K) -> bool {
        key.index() < self.data.len()
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over keys in allocation order
    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.data.len()).map(K::from_index)
    }

    /// Iterate over entries as (entity, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.data
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_index(i), v))
    }

    /// Iterate over entries as (entity, mutable value) pairs
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut V)> {
        self.data
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (K::from_index(i), v))
    }

    /// Iterate over values
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.data.iter()
    }

    /// Iterate over mutable values
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.data.iter_mut()
    }
}

impl<K: EntityRef, V> Default for PrimaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V> Index<K> for PrimaryMap<K, V> {
    type Output = V;

    fn index(&self, key: K) -> &V {
        &self.data[key.index()]
    }
}

impl<K: EntityRef, V> IndexMut<K> for PrimaryMap<K, V> {
    fn index_mut(&mut self, key: K) -> &mut V {
        &mut self.data[key.index()]
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::entity::{Expr, Var};

    #[test]
    fn test_primary_map_basic() {
        let mut map: PrimaryMap<Var, i32> = PrimaryMap::new();

        let v1 = map.push(10);
        let v2 = map.push(20);

        assert_eq!(map.get(v1), Some(&10));
        assert_eq!(map[v2], 20);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_primary_map_next_key() {
        let mut map: PrimaryMap<Expr, &str> = PrimaryMap::new();
        let expected = map.next_key();
        let actual = map.push("a");
        assert_eq!(expected, actual);
        assert!(map.is_valid(actual));
        assert!(!map.is_valid(map.next_key()));
    }

    #[test]
    fn test_primary_map_index_mut() {
        let mut map: PrimaryMap<Var, i32> = PrimaryMap::new();
        let v = map.push(1);
        map[v] += 41;
        assert_eq!(map[v], 42);
    }

    #[test]
    fn test_primary_map_iteration_order() {
        let mut map: PrimaryMap<Var, i32> = PrimaryMap::with_capacity(3);
        map.push(10);
        map.push(20);
        map.push(30);

        let items: Vec<_> = map.iter().map(|(k, v)| (k.as_u32(), *v)).collect();
        assert_eq!(items, [(0, 10), (1, 20), (2, 30)]);
        assert_eq!(map.keys().count(), 3);
    }

    #[test]
    fn test_primary_map_default() {
        let map: PrimaryMap<Var, i32> = PrimaryMap::default();
        assert!(map.is_empty());
    }
}
