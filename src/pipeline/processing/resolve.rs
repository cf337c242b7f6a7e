//! Dimension resolution: canonical business key to stable surrogate id.
//! This is the only place surrogate ids are minted; facts reference
//! dimensions by id and nothing else may create dimension rows.

use crate::error::Result;
use crate::storage::Store;
use std::collections::HashMap;
use tracing::debug;

/// Get-or-create resolver over a [`Store`], with a run-local cache so a batch
/// sees one consistent key-to-id mapping. For a fixed business key the
/// returned id is stable within a run and across runs against the same store:
/// re-running a pipeline never creates a duplicate dimension row.
pub struct DimensionResolver<'a, S: Store> {
    store: &'a mut S,
    materials: HashMap<String, i64>,
    times: HashMap<String, i64>,
    regions: HashMap<String, i64>,
}

impl<'a, S: Store> DimensionResolver<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            materials: HashMap::new(),
            times: HashMap::new(),
            regions: HashMap::new(),
        }
    }

    pub fn resolve_material(&mut self, material_number: &str) -> Result<i64> {
        if let Some(id) = self.materials.get(material_number) {
            return Ok(*id);
        }
        let id = match self.store.find_material(material_number)? {
            Some(id) => id,
            None => {
                let id = self.store.insert_material(material_number)?;
                debug!(material_number, id, "created material dimension row");
                id
            }
        };
        self.materials.insert(material_number.to_string(), id);
        Ok(id)
    }

    pub fn resolve_time(&mut self, period: &str, year: i32) -> Result<i64> {
        if let Some(id) = self.times.get(period) {
            return Ok(*id);
        }
        let id = match self.store.find_time(period)? {
            Some(id) => id,
            None => {
                let id = self.store.insert_time(period, year)?;
                debug!(period, id, "created time dimension row");
                id
            }
        };
        self.times.insert(period.to_string(), id);
        Ok(id)
    }

    /// Lookup-only: the region dimension is seeded and never grown from data.
    /// `None` means the code has no dimension row.
    pub fn resolve_region(&mut self, region_code: &str) -> Result<Option<i64>> {
        if let Some(id) = self.regions.get(region_code) {
            return Ok(Some(*id));
        }
        match self.store.find_region(region_code)? {
            Some(id) => {
                self.regions.insert(region_code.to_string(), id);
                Ok(Some(id))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    #[test]
    fn test_resolve_material_is_idempotent_within_a_run() {
        let mut store = InMemoryStore::new();
        let mut resolver = DimensionResolver::new(&mut store);
        let first = resolver.resolve_material("00012345").unwrap();
        let second = resolver.resolve_material("00012345").unwrap();
        assert_eq!(first, second);
        drop(resolver);
        assert_eq!(store.material_count(), 1);
    }

    #[test]
    fn test_resolve_material_is_idempotent_across_runs() {
        let mut store = InMemoryStore::new();
        let first = {
            let mut resolver = DimensionResolver::new(&mut store);
            resolver.resolve_material("00012345").unwrap()
        };
        let second = {
            let mut resolver = DimensionResolver::new(&mut store);
            resolver.resolve_material("00012345").unwrap()
        };
        assert_eq!(first, second);
        assert_eq!(store.material_count(), 1);
    }

    #[test]
    fn test_distinct_keys_get_distinct_ids() {
        let mut store = InMemoryStore::new();
        let mut resolver = DimensionResolver::new(&mut store);
        let a = resolver.resolve_time("2024.01", 2024).unwrap();
        let b = resolver.resolve_time("2024.02", 2024).unwrap();
        assert_ne!(a, b);
        assert_eq!(resolver.resolve_time("2024.01", 2024).unwrap(), a);
        drop(resolver);
        assert_eq!(store.time_count(), 2);
    }

    #[test]
    fn test_region_resolution_never_creates_rows() {
        let mut store = InMemoryStore::new();
        let mut resolver = DimensionResolver::new(&mut store);
        assert!(resolver.resolve_region("1").unwrap().is_some());
        assert!(resolver.resolve_region("3").unwrap().is_none());
        // A second lookup of the unknown code still resolves to nothing.
        assert!(resolver.resolve_region("3").unwrap().is_none());
    }
}
