//! Operation scenarios shared by every backend. A backend only provides the
//! primitive storage calls through [`EntityStore`]; the phase layout of each
//! [`OperationType`] is defined once here.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::adapter::RunContext;
use crate::adapter::entity::{SimpleEntity, access_all};
use crate::bench::OperationType;
use crate::core::BenchError;

/// Non-indexed lookups scan the whole table per query, so they are skipped
/// above this many entities.
pub const UNINDEXED_QUERY_LIMIT: usize = 10_000;

/// Which of the two entity tables an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Plain,
    /// Same fields, with secondary indexes on the string and integer fields.
    Indexed,
}

/// Primitive storage calls a backend provides to the scenarios.
pub trait EntityStore {
    fn backend(&self) -> &str;

    /// Inserts entities with `id == 0`, assigning their ids, and updates the rest.
    fn put(&mut self, kind: EntityKind, entities: &mut [SimpleEntity]) -> Result<(), BenchError>;

    fn count(&mut self, kind: EntityKind) -> Result<usize, BenchError>;

    fn load_all(&mut self, kind: EntityKind) -> Result<Vec<SimpleEntity>, BenchError>;

    fn remove(&mut self, kind: EntityKind, entities: &[SimpleEntity]) -> Result<(), BenchError>;

    fn find_by_string(
        &mut self,
        kind: EntityKind,
        value: &str,
    ) -> Result<Vec<SimpleEntity>, BenchError>;

    fn find_by_int(&mut self, kind: EntityKind, value: i32)
    -> Result<Vec<SimpleEntity>, BenchError>;

    /// Looks up every id; missing ids are skipped.
    fn get_many(&mut self, kind: EntityKind, ids: &[u64]) -> Result<Vec<SimpleEntity>, BenchError>;
}

pub fn dispatch<S, R>(
    store: &mut S,
    operation: OperationType,
    entity_count: usize,
    rng: &mut R,
    ctx: &mut RunContext<'_>,
) -> Result<(), BenchError>
where
    S: EntityStore + ?Sized,
    R: Rng,
{
    let mut run = Scenario {
        store,
        entity_count,
        rng,
    };
    match operation {
        OperationType::Crud => run.crud(EntityKind::Plain, false, ctx),
        OperationType::CrudScalars => run.crud(EntityKind::Plain, true, ctx),
        OperationType::CrudIndexed => run.crud(EntityKind::Indexed, false, ctx),
        OperationType::QueryString => run.query_string(EntityKind::Plain, ctx),
        OperationType::QueryStringIndexed => run.query_string(EntityKind::Indexed, ctx),
        OperationType::QueryInteger => run.query_integer(EntityKind::Plain, ctx),
        OperationType::QueryIntegerIndexed => run.query_integer(EntityKind::Indexed, ctx),
        OperationType::QueryId => run.query_id(false, ctx),
        OperationType::QueryIdRandom => run.query_id(true, ctx),
    }
}

struct Scenario<'s, S: ?Sized, R> {
    store: &'s mut S,
    entity_count: usize,
    rng: &'s mut R,
}

impl<S: EntityStore + ?Sized, R: Rng> Scenario<'_, S, R> {
    fn crud(
        &mut self,
        kind: EntityKind,
        scalars_only: bool,
        ctx: &mut RunContext<'_>,
    ) -> Result<(), BenchError> {
        let mut entities = self.prepare_and_put(kind, scalars_only, ctx)?;

        for entity in entities.iter_mut() {
            if scalars_only {
                entity.randomize_scalars(self.rng);
            } else {
                entity.randomize(self.rng);
            }
        }
        ctx.start("update");
        self.store.put(kind, &mut entities)?;
        ctx.stop()?;
        drop(entities);

        ctx.start("load");
        let reloaded = self.store.load_all(kind)?;
        ctx.stop()?;
        self.expect_count(reloaded.len())?;

        ctx.start("access");
        access_all(&reloaded);
        ctx.stop()?;

        ctx.start("delete");
        self.store.remove(kind, &reloaded)?;
        ctx.stop()
    }

    fn query_string(&mut self, kind: EntityKind, ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        if !self.within_unindexed_limit(kind, ctx)? {
            return Ok(());
        }
        let entities = self.prepare_and_put(kind, false, ctx)?;
        let candidates: Vec<&SimpleEntity> = entities
            .iter()
            .filter(|e| e.simple_string.len() >= 2)
            .collect();
        let lookups: Vec<String> = (0..self.entity_count)
            .filter_map(|_| candidates.choose(self.rng))
            .map(|e| e.simple_string.clone())
            .collect();

        let store = &mut *self.store;
        let found = ctx.measure("query", || {
            let mut found = 0;
            for value in &lookups {
                let result = store.find_by_string(kind, value)?;
                access_all(&result);
                found += result.len();
            }
            Ok(found)
        })?;
        ctx.log(&format!("Entities found: {found}"))?;
        self.expect_at_least(found, lookups.len())
    }

    fn query_integer(&mut self, kind: EntityKind, ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        if !self.within_unindexed_limit(kind, ctx)? {
            return Ok(());
        }
        let entities = self.prepare_and_put(kind, false, ctx)?;
        let lookups: Vec<i32> = (0..self.entity_count)
            .filter_map(|_| entities.choose(self.rng))
            .map(|e| e.simple_int)
            .collect();

        let store = &mut *self.store;
        let found = ctx.measure("query", || {
            let mut found = 0;
            for value in &lookups {
                let result = store.find_by_int(kind, *value)?;
                access_all(&result);
                found += result.len();
            }
            Ok(found)
        })?;
        ctx.log(&format!("Entities found: {found}"))?;
        self.expect_at_least(found, lookups.len())
    }

    fn query_id(&mut self, random_ids: bool, ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        let kind = EntityKind::Plain;
        self.prepare_and_put(kind, false, ctx)?;

        let n = self.entity_count as u64;
        let ids: Vec<u64> = (0..n)
            .map(|i| {
                if random_ids {
                    self.rng.gen_range(1..=n)
                } else {
                    i + 1
                }
            })
            .collect();

        let backend = self.store.backend().to_string();
        let store = &mut *self.store;
        ctx.measure("query", || {
            let results = store.get_many(kind, &ids)?;
            if results.len() != ids.len() {
                return Err(BenchError::adapter(
                    &backend,
                    format!("result count {} is not {}", results.len(), ids.len()),
                ));
            }
            access_all(&results);
            Ok(())
        })
    }

    fn prepare_and_put(
        &mut self,
        kind: EntityKind,
        scalars_only: bool,
        ctx: &mut RunContext<'_>,
    ) -> Result<Vec<SimpleEntity>, BenchError> {
        let mut entities: Vec<SimpleEntity> = (0..self.entity_count)
            .map(|_| SimpleEntity::random(self.rng, scalars_only))
            .collect();
        ctx.log(&format!("Prepared test data: {} objects", self.entity_count))?;

        ctx.start("insert");
        self.store.put(kind, &mut entities)?;
        ctx.stop()?;

        let stored = self.store.count(kind)?;
        self.expect_count(stored)?;
        Ok(entities)
    }

    fn within_unindexed_limit(
        &self,
        kind: EntityKind,
        ctx: &mut RunContext<'_>,
    ) -> Result<bool, BenchError> {
        if kind == EntityKind::Plain && self.entity_count > UNINDEXED_QUERY_LIMIT {
            ctx.log(&format!(
                "Reduce number of entities to {UNINDEXED_QUERY_LIMIT} to avoid extremely long test runs"
            ))?;
            return Ok(false);
        }
        Ok(true)
    }

    fn expect_count(&self, actual: usize) -> Result<(), BenchError> {
        if actual != self.entity_count {
            return Err(BenchError::adapter(
                self.store.backend(),
                format!("expected {} entities, found {}", self.entity_count, actual),
            ));
        }
        Ok(())
    }

    fn expect_at_least(&self, found: usize, expected: usize) -> Result<(), BenchError> {
        if found < expected {
            return Err(BenchError::adapter(
                self.store.backend(),
                format!("expected at least {expected} entities found, got {found}"),
            ));
        }
        Ok(())
    }
}
