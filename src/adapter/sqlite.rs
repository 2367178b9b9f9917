//! Embedded SQLite backend on a database file inside a private temporary
//! directory. The file is deleted after every run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rusqlite::{Connection, Row, params};
use tempfile::TempDir;

use crate::adapter::entity::SimpleEntity;
use crate::adapter::scenario::{self, EntityKind, EntityStore};
use crate::adapter::{BenchAdapter, RunContext};
use crate::bench::OperationType;
use crate::core::BenchError;

const NAME: &str = "sqlite";
const DB_NAME: &str = "perfbench.sqlite";

static VERSION_LOGGED: AtomicBool = AtomicBool::new(false);

const SCHEMA: &str = "
    CREATE TABLE simple_entity (
        id INTEGER PRIMARY KEY,
        simple_boolean INTEGER NOT NULL,
        simple_byte INTEGER NOT NULL,
        simple_short INTEGER NOT NULL,
        simple_int INTEGER NOT NULL,
        simple_long INTEGER NOT NULL,
        simple_float REAL NOT NULL,
        simple_double REAL NOT NULL,
        simple_string TEXT NOT NULL,
        simple_byte_array BLOB NOT NULL
    );
    CREATE TABLE simple_entity_indexed (
        id INTEGER PRIMARY KEY,
        simple_boolean INTEGER NOT NULL,
        simple_byte INTEGER NOT NULL,
        simple_short INTEGER NOT NULL,
        simple_int INTEGER NOT NULL,
        simple_long INTEGER NOT NULL,
        simple_float REAL NOT NULL,
        simple_double REAL NOT NULL,
        simple_string TEXT NOT NULL,
        simple_byte_array BLOB NOT NULL
    );
    CREATE INDEX idx_indexed_string ON simple_entity_indexed(simple_string);
    CREATE INDEX idx_indexed_int ON simple_entity_indexed(simple_int);
";

const COLUMNS: &str = "id, simple_boolean, simple_byte, simple_short, simple_int, simple_long, \
     simple_float, simple_double, simple_string, simple_byte_array";

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Plain => "simple_entity",
        EntityKind::Indexed => "simple_entity_indexed",
    }
}

fn read_entity(row: &Row<'_>) -> rusqlite::Result<SimpleEntity> {
    Ok(SimpleEntity {
        id: row.get::<_, i64>(0)? as u64,
        simple_boolean: row.get(1)?,
        simple_byte: row.get(2)?,
        simple_short: row.get(3)?,
        simple_int: row.get(4)?,
        simple_long: row.get(5)?,
        simple_float: row.get::<_, f64>(6)? as f32,
        simple_double: row.get(7)?,
        simple_string: row.get(8)?,
        simple_byte_array: row.get(9)?,
    })
}

/// Applies the pragmas used for every benchmark connection.
pub fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;",
    )
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, BenchError> {
        let conn = Connection::open(path)?;
        configure_connection(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self, BenchError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn version(&self) -> Result<String, BenchError> {
        Ok(self
            .conn
            .query_row("SELECT sqlite_version()", [], |r| r.get(0))?)
    }

    fn close(self) -> Result<(), BenchError> {
        self.conn.close().map_err(|(_, e)| BenchError::from(e))
    }

    fn query_entities<P: rusqlite::Params>(
        &mut self,
        sql: &str,
        params: P,
    ) -> Result<Vec<SimpleEntity>, BenchError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params, read_entity)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl EntityStore for SqliteStore {
    fn backend(&self) -> &str {
        NAME
    }

    fn put(&mut self, kind: EntityKind, entities: &mut [SimpleEntity]) -> Result<(), BenchError> {
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(&format!(
                "INSERT INTO {} (simple_boolean, simple_byte, simple_short, simple_int, \
                 simple_long, simple_float, simple_double, simple_string, simple_byte_array) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                table(kind)
            ))?;
            let mut update = tx.prepare_cached(&format!(
                "UPDATE {} SET simple_boolean = ?1, simple_byte = ?2, simple_short = ?3, \
                 simple_int = ?4, simple_long = ?5, simple_float = ?6, simple_double = ?7, \
                 simple_string = ?8, simple_byte_array = ?9 WHERE id = ?10",
                table(kind)
            ))?;
            for entity in entities.iter_mut() {
                if entity.id == 0 {
                    let id = insert.insert(params![
                        entity.simple_boolean,
                        entity.simple_byte,
                        entity.simple_short,
                        entity.simple_int,
                        entity.simple_long,
                        entity.simple_float as f64,
                        entity.simple_double,
                        entity.simple_string,
                        entity.simple_byte_array,
                    ])?;
                    entity.id = id as u64;
                } else {
                    update.execute(params![
                        entity.simple_boolean,
                        entity.simple_byte,
                        entity.simple_short,
                        entity.simple_int,
                        entity.simple_long,
                        entity.simple_float as f64,
                        entity.simple_double,
                        entity.simple_string,
                        entity.simple_byte_array,
                        entity.id as i64,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn count(&mut self, kind: EntityKind) -> Result<usize, BenchError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table(kind)),
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    fn load_all(&mut self, kind: EntityKind) -> Result<Vec<SimpleEntity>, BenchError> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", COLUMNS, table(kind));
        self.query_entities(&sql, [])
    }

    fn remove(&mut self, kind: EntityKind, entities: &[SimpleEntity]) -> Result<(), BenchError> {
        let tx = self.conn.transaction()?;
        {
            let mut delete =
                tx.prepare_cached(&format!("DELETE FROM {} WHERE id = ?1", table(kind)))?;
            for entity in entities {
                delete.execute([entity.id as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn find_by_string(
        &mut self,
        kind: EntityKind,
        value: &str,
    ) -> Result<Vec<SimpleEntity>, BenchError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE simple_string = ?1",
            COLUMNS,
            table(kind)
        );
        self.query_entities(&sql, [value])
    }

    fn find_by_int(
        &mut self,
        kind: EntityKind,
        value: i32,
    ) -> Result<Vec<SimpleEntity>, BenchError> {
        let sql = format!("SELECT {} FROM {} WHERE simple_int = ?1", COLUMNS, table(kind));
        self.query_entities(&sql, [value])
    }

    fn get_many(&mut self, kind: EntityKind, ids: &[u64]) -> Result<Vec<SimpleEntity>, BenchError> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", COLUMNS, table(kind));
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let mut rows = stmt.query([*id as i64])?;
            if let Some(row) = rows.next()? {
                found.push(read_entity(row)?);
            }
        }
        Ok(found)
    }
}

pub struct SqliteAdapter {
    /// Database file chosen by the caller. When unset the file lives in a
    /// private temporary directory created on first use.
    path: Option<PathBuf>,
    dir: Option<TempDir>,
    store: Option<SqliteStore>,
    entity_count: usize,
    rng: StdRng,
}

impl SqliteAdapter {
    pub fn new() -> Self {
        Self {
            path: None,
            dir: None,
            store: None,
            entity_count: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Keeps the database at `path`. A file left there by an earlier process
    /// is deleted on `set_up`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::new()
        }
    }

    fn db_path(&mut self) -> Result<PathBuf, BenchError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if self.dir.is_none() {
            self.dir = Some(TempDir::with_prefix("perfbench-sqlite")?);
        }
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| BenchError::adapter(NAME, "no database directory"))?;
        Ok(dir.path().join(DB_NAME))
    }
}

impl Default for SqliteAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BenchAdapter for SqliteAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn configure(&mut self, entity_count: usize) {
        self.entity_count = entity_count;
    }

    fn set_up(&mut self, ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        let path = self.db_path()?;
        if delete_database(&path)? {
            ctx.log("DB existed before start - deleted")?;
        }
        let store = SqliteStore::open(&path)?;
        if !VERSION_LOGGED.swap(true, Ordering::Relaxed) {
            ctx.log(&format!("SQLite version {}", store.version()?))?;
        }
        debug!("opened {}", path.display());
        self.store = Some(store);
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

    fn tear_down(&mut self, ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        let closed = match self.store.take() {
            Some(store) => store.close(),
            None => Ok(()),
        };
        let path = self.db_path()?;
        let deleted = delete_database(&path)?;
        ctx.log(&format!("DB deleted: {deleted}"))?;
        closed
    }

    fn on_suite_complete(&mut self, _ctx: &mut RunContext<'_>) -> Result<(), BenchError> {
        self.dir = None;
        Ok(())
    }
}

/// Removes the database file together with its WAL and shared-memory files.
/// Returns whether the main file existed.
fn delete_database(path: &Path) -> Result<bool, BenchError> {
    let existed = path.exists();
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let file = PathBuf::from(file);
        if file.exists() {
            fs::remove_file(&file)?;
        }
    }
    Ok(existed)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn entity(s: &str, i: i32) -> SimpleEntity {
        SimpleEntity {
            simple_string: s.to_string(),
            simple_int: i,
            simple_byte_array: vec![1, 2, 3],
            ..SimpleEntity::default()
        }
    }

    #[test]
    fn test_put_load_round_trip_keeps_fields() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut entities = vec![SimpleEntity {
            simple_boolean: true,
            simple_byte: -3,
            simple_short: 1200,
            simple_long: i64::MIN,
            simple_float: 1.5,
            simple_double: -2.25,
            ..entity("hello", 42)
        }];
        store.put(EntityKind::Plain, &mut entities).unwrap();
        assert_eq!(entities[0].id, 1);

        let loaded = store.load_all(EntityKind::Plain).unwrap();
        assert_eq!(loaded, entities);
    }

    #[test]
    fn test_update_and_remove() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut entities = vec![entity("a", 1), entity("b", 2)];
        store.put(EntityKind::Indexed, &mut entities).unwrap();
        entities[0].simple_string = "c".to_string();
        store.put(EntityKind::Indexed, &mut entities).unwrap();
        assert_eq!(store.count(EntityKind::Indexed).unwrap(), 2);
        assert!(store.find_by_string(EntityKind::Indexed, "a").unwrap().is_empty());
        assert_eq!(store.find_by_string(EntityKind::Indexed, "c").unwrap().len(), 1);

        store.remove(EntityKind::Indexed, &entities).unwrap();
        assert_eq!(store.count(EntityKind::Indexed).unwrap(), 0);
    }

    #[test]
    fn test_get_many_skips_missing() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let mut entities = vec![entity("a", 1), entity("b", 2)];
        store.put(EntityKind::Plain, &mut entities).unwrap();
        let found = store.get_many(EntityKind::Plain, &[2, 9, 1, 2]).unwrap();
        let ids: Vec<u64> = found.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1, 2]);
        assert_eq!(store.find_by_int(EntityKind::Plain, 2).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_database_removes_sidecars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DB_NAME);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.close().unwrap();
        }
        assert!(path.exists());
        assert!(delete_database(&path).unwrap());
        assert!(!path.exists());
        assert!(!delete_database(&path).unwrap());
    }
}
