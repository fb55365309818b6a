//! Per-system entity tables.
//!
//! Every system keeps an [`EntityTable`] of the entities it tracks, each paired
//! with the bundle of component handles that system cares about. Tables are
//! small (hundreds of rows), so lookups are linear scans.

use crate::entity::EntityId;
use crate::EcsError;

/// An ordered collection of `(EntityId, bundle)` rows.
///
/// Invariant: no two rows share an entity id. Removal swaps the last row into
/// the hole, so row order is only meaningful to systems that sort explicitly.
#[derive(Debug, Clone)]
pub struct EntityTable<B> {
    rows: Vec<(EntityId, B)>,
}

impl<B> Default for EntityTable<B> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<B> EntityTable<B> {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateEntity`] if `entity` already has a row.
    /// The table is left unchanged.
    pub fn insert(&mut self, entity: EntityId, bundle: B) -> Result<(), EcsError> {
        if self.contains(entity) {
            return Err(EcsError::DuplicateEntity { entity });
        }
        self.rows.push((entity, bundle));
        Ok(())
    }

    /// Remove the row for `entity`, returning its bundle.
    ///
    /// Removing an absent id is a no-op that returns `None`.
    pub fn remove(&mut self, entity: EntityId) -> Option<B> {
        let index = self.rows.iter().position(|(id, _)| *id == entity)?;
        Some(self.rows.swap_remove(index).1)
    }

    /// Whether `entity` has a row.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.rows.iter().any(|(id, _)| *id == entity)
    }

    /// The bundle for `entity`.
    pub fn get(&self, entity: EntityId) -> Option<&B> {
        self.rows
            .iter()
            .find(|(id, _)| *id == entity)
            .map(|(_, bundle)| bundle)
    }

    /// Mutable access to the bundle for `entity`.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut B> {
        self.rows
            .iter_mut()
            .find(|(id, _)| *id == entity)
            .map(|(_, bundle)| bundle)
    }

    /// Iterate rows in table order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &B)> {
        self.rows.iter().map(|(id, bundle)| (*id, bundle))
    }

    /// Iterate rows mutably in table order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut B)> {
        self.rows.iter_mut().map(|(id, bundle)| (*id, bundle))
    }

    /// Entity ids in table order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.rows.iter().map(|(id, _)| *id).collect()
    }

    /// Row at `index` in table order.
    pub fn row(&self, index: usize) -> Option<(EntityId, &B)> {
        self.rows.get(index).map(|(id, bundle)| (*id, bundle))
    }

    /// Stable sort of the rows by their bundles.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&B, &B) -> std::cmp::Ordering,
    {
        self.rows.sort_by(|(_, a), (_, b)| compare(a, b));
    }

    /// Retain only the rows for which `keep` returns `true`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(EntityId, &mut B) -> bool,
    {
        self.rows.retain_mut(|(id, bundle)| keep(*id, bundle));
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop every row.
    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Insert --

    #[test]
    fn insert_then_get() {
        let mut table = EntityTable::new();
        let e = EntityId::next();
        table.insert(e, "bundle").unwrap();
        assert_eq!(table.get(e), Some(&"bundle"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut table = EntityTable::new();
        let e = EntityId::next();
        table.insert(e, 1).unwrap();
        let err = table.insert(e, 2).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateEntity { entity } if entity == e));
        assert_eq!(table.get(e), Some(&1));
        assert_eq!(table.len(), 1);
    }

    // -- 2. Remove --

    #[test]
    fn remove_returns_bundle() {
        let mut table = EntityTable::new();
        let e = EntityId::next();
        table.insert(e, 9).unwrap();
        assert_eq!(table.remove(e), Some(9));
        assert!(!table.contains(e));
        assert!(table.is_empty());
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut table = EntityTable::new();
        let a = EntityId::next();
        let b = EntityId::next();
        table.insert(a, 'a').unwrap();

        assert_eq!(table.remove(b), None);
        assert_eq!(table.ids(), vec![a]);
    }

    #[test]
    fn remove_swaps_last_into_hole() {
        let mut table = EntityTable::new();
        let ids: Vec<_> = (0..4).map(|_| EntityId::next()).collect();
        for (i, id) in ids.iter().enumerate() {
            table.insert(*id, i).unwrap();
        }
        table.remove(ids[0]);
        assert_eq!(table.ids(), vec![ids[3], ids[1], ids[2]]);
    }

    // -- 3. Ordering helpers --

    #[test]
    fn sort_by_is_stable() {
        let mut table = EntityTable::new();
        let ids: Vec<_> = (0..4).map(|_| EntityId::next()).collect();
        table.insert(ids[0], 1).unwrap();
        table.insert(ids[1], 0).unwrap();
        table.insert(ids[2], 1).unwrap();
        table.insert(ids[3], 0).unwrap();

        table.sort_by(|a, b| a.cmp(b));
        assert_eq!(table.ids(), vec![ids[1], ids[3], ids[0], ids[2]]);
    }

    #[test]
    fn retain_drops_rejected_rows() {
        let mut table = EntityTable::new();
        for i in 0..6 {
            table.insert(EntityId::next(), i).unwrap();
        }
        table.retain(|_, v| *v % 2 == 0);
        assert_eq!(table.len(), 3);
        assert!(table.iter().all(|(_, v)| v % 2 == 0));
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut table = EntityTable::new();
        let e = EntityId::next();
        table.insert(e, 1).unwrap();
        *table.get_mut(e).unwrap() += 10;
        assert_eq!(table.get(e), Some(&11));
    }
}
