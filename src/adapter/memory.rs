//! In-process backend: ordered maps keyed by id, with hash indexes on the
//! string and integer fields for the indexed entity kind.

use std::collections::BTreeMap;

use ahash::AHashMap;
use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::adapter::entity::SimpleEntity;
use crate::adapter::scenario::{self, EntityKind, EntityStore};
use crate::adapter::{BenchAdapter, RunContext};
use crate::bench::OperationType;
use crate::core::BenchError;

const NAME: &str = "memory";

#[derive(Default)]
struct Table {
    rows: BTreeMap<u64, SimpleEntity>,
    last_id: u64,
    indexes: Option<Indexes>,
}

#[derive(Default)]
struct Indexes {
    by_string: AHashMap<String, Vec<u64>>,
    by_int: AHashMap<i32, Vec<u64>>,
}

impl Indexes {
    fn add(&mut self, entity: &SimpleEntity) {
        self.by_string
            .entry(entity.simple_string.clone())
            .or_default()
            .push(entity.id);
        self.by_int.entry(entity.simple_int).or_default().push(entity.id);
    }

    fn remove(&mut self, entity: &SimpleEntity) {
        if let Some(ids) = self.by_string.get_mut(&entity.simple_string) {
            ids.retain(|id| *id != entity.id);
            if ids.is_empty() {
                self.by_string.remove(&entity.simple_string);
            }
        }
        if let Some(ids) = self.by_int.get_mut(&entity.simple_int) {
            ids.retain(|id| *id != entity.id);
            if ids.is_empty() {
                self.by_int.remove(&entity.simple_int);
            }
        }
    }
}

impl Table {
    fn indexed() -> Self {
        Self {
            indexes: Some(Indexes::default()),
            ..Self::default()
        }
    }

    fn put(&mut self, entity: &mut SimpleEntity) {
        if entity.id == 0 {
            self.last_id += 1;
            entity.id = self.last_id;
        }
        let previous = self.rows.insert(entity.id, entity.clone());
        if let Some(indexes) = self.indexes.as_mut() {
            if let Some(previous) = previous {
                indexes.remove(&previous);
            }
            indexes.add(entity);
        }
    }

    fn remove(&mut self, id: u64) {
        if let Some(removed) = self.rows.remove(&id) {
            if let Some(indexes) = self.indexes.as_mut() {
                indexes.remove(&removed);
            }
        }
    }

    fn lookup(&self, ids: &[u64]) -> Vec<SimpleEntity> {
        ids.iter().filter_map(|id| self.rows.get(id)).cloned().collect()
    }
}

/// Store state for one run.
pub struct MemoryStore {
    plain: Table,
    indexed: Table,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            plain: Table::default(),
            indexed: Table::indexed(),
        }
    }

    fn table(&mut self, kind: EntityKind) -> &mut Table {
        match kind {
            EntityKind::Plain => &mut self.plain,
            EntityKind::Indexed => &mut self.indexed,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for MemoryStore {
    fn backend(&self) -> &str {
        NAME
    }

    fn put(&mut self, kind: EntityKind, entities: &mut [SimpleEntity]) -> Result<(), BenchError> {
        let table = self.table(kind);
        for entity in entities.iter_mut() {
            table.put(entity);
        }
        Ok(())
    }

    fn count(&mut self, kind: EntityKind) -> Result<usize, BenchError> {
        Ok(self.table(kind).rows.len())
    }

    fn load_all(&mut self, kind: EntityKind) -> Result<Vec<SimpleEntity>, BenchError> {
        Ok(self.table(kind).rows.values().cloned().collect())
    }

    fn remove(&mut self, kind: EntityKind, entities: &[SimpleEntity]) -> Result<(), BenchError> {
        let table = self.table(kind);
        for entity in entities {
            table.remove(entity.id);
        }
        Ok(())
    }

    fn find_by_string(
        &mut self,
        kind: EntityKind,
        value: &str,
    ) -> Result<Vec<SimpleEntity>, BenchError> {
        let table = self.table(kind);
        Ok(match &table.indexes {
            Some(indexes) => indexes
                .by_string
                .get(value)
                .map(|ids| table.lookup(ids))
                .unwrap_or_default(),
            None => table
                .rows
                .values()
                .filter(|e| e.simple_string == value)
                .cloned()
                .collect(),
        })
    }

    fn find_by_int(
        &mut self,
        kind: EntityKind,
        value: i32,
    ) -> Result<Vec<SimpleEntity>, BenchError> {
        let table = self.table(kind);
        Ok(match &table.indexes {
            Some(indexes) => indexes
                .by_int
                .get(&value)
                .map(|ids| table.lookup(ids))
                .unwrap_or_default(),
            None => table
                .rows
                .values()
                .filter(|e| e.simple_int == value)
                .cloned()
                .collect(),
        })
    }

    fn get_many(&mut self, kind: EntityKind, ids: &[u64]) -> Result<Vec<SimpleEntity>, BenchError> {
        Ok(self.table(kind).lookup(ids))
    }
}

pub struct MemoryAdapter {
    store: Option<MemoryStore>,
    entity_count: usize,
    rng: StdRng,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self {
            store: None,
            entity_count: 0,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, entity_count: usize) {
        self.entity_count = entity_count;
    }

    fn set_up(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        if self.store.replace(MemoryStore::new()).is_some() {
            debug!("memory store from a previous run discarded");
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        operation: OperationType,
        ctx: &mut RunContext<'_>,
    ) -> Result<(), BenchError> {
        let store = self
            .store
            .as_mut()
            .ok_or_else(|| BenchError::adapter(NAME, "dispatch called before set_up"))?;
        scenario::dispatch(store, operation, self.entity_count, &mut self.rng, ctx)
    }

    fn tear_down(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        self.store = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(s: &str, i: i32) -> SimpleEntity {
        SimpleEntity {
            simple_string: s.to_string(),
            simple_int: i,
            ..SimpleEntity::default()
        }
    }

    #[test]
    fn test_put_assigns_sequential_ids() {
        let mut store = MemoryStore::new();
        let mut entities = vec![entity("a", 1), entity("b", 2), entity("c", 3)];
        store.put(EntityKind::Plain, &mut entities).unwrap();
        let ids: Vec<u64> = entities.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.count(EntityKind::Plain).unwrap(), 3);
        assert_eq!(store.count(EntityKind::Indexed).unwrap(), 0);
    }

    #[test]
    fn test_index_follows_updates() {
        let mut store = MemoryStore::new();
        let mut entities = vec![entity("old", 1)];
        store.put(EntityKind::Indexed, &mut entities).unwrap();
        entities[0].simple_string = "new".to_string();
        entities[0].simple_int = 2;
        store.put(EntityKind::Indexed, &mut entities).unwrap();

        assert!(store.find_by_string(EntityKind::Indexed, "old").unwrap().is_empty());
        assert_eq!(store.find_by_string(EntityKind::Indexed, "new").unwrap().len(), 1);
        assert!(store.find_by_int(EntityKind::Indexed, 1).unwrap().is_empty());
        assert_eq!(store.find_by_int(EntityKind::Indexed, 2).unwrap().len(), 1);
        assert_eq!(store.count(EntityKind::Indexed).unwrap(), 1);
    }

    #[test]
    fn test_scan_and_index_agree() {
        let mut store = MemoryStore::new();
        for kind in [EntityKind::Plain, EntityKind::Indexed] {
            let mut entities = vec![entity("x", 5), entity("x", 6), entity("y", 5)];
            store.put(kind, &mut entities).unwrap();
        }
        for kind in [EntityKind::Plain, EntityKind::Indexed] {
            assert_eq!(store.find_by_string(kind, "x").unwrap().len(), 2);
            assert_eq!(store.find_by_int(kind, 5).unwrap().len(), 2);
        }
    }

    #[test]
    fn test_remove_and_get_many() {
        let mut store = MemoryStore::new();
        let mut entities = vec![entity("a", 1), entity("b", 2)];
        store.put(EntityKind::Indexed, &mut entities).unwrap();
        store.remove(EntityKind::Indexed, &entities[..1]).unwrap();
        let found = store.get_many(EntityKind::Indexed, &[1, 2, 2]).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|e| e.id == 2));
        assert!(store.find_by_string(EntityKind::Indexed, "a").unwrap().is_empty());
    }
}
