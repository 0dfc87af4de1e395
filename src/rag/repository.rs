//! Dog listings backed by SQLite

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS dog (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    owner TEXT,
    description TEXT NOT NULL
)";

/// A dog listed for adoption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dog {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub owner: Option<String>,
    pub description: String,
}

impl Dog {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            owner: row.get(2)?,
            description: row.get(3)?,
        })
    }
}

/// Read and write access to the `dog` table.
///
/// `rusqlite::Connection` is not `Sync`, so the connection sits behind a mutex.
pub struct DogRepository {
    conn: Mutex<Connection>,
}

impl DogRepository {
    /// Open (or create) the database at `path`. `:memory:` opens a private
    /// in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str() == ":memory:" {
            return Self::in_memory();
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {:?}", path))?;
        tracing::info!("Database opened at {}", path.display());
        Self::with_schema(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_schema(conn)
    }

    fn with_schema(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create dog table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("Database lock poisoned: {}", e))
    }

    pub fn find_all(&self) -> Result<Vec<Dog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT id, name, owner, description FROM dog ORDER BY id")?;
        let dogs = stmt
            .query_map([], Dog::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(dogs)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Dog>> {
        let conn = self.conn()?;
        let dog = conn
            .query_row(
                "SELECT id, name, owner, description FROM dog WHERE id = ?1",
                params![id],
                Dog::from_row,
            )
            .optional()?;
        Ok(dog)
    }

    /// Insert or replace a dog by id.
    pub fn save(&self, dog: &Dog) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO dog (id, name, owner, description) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                owner = excluded.owner,
                description = excluded.description",
            params![dog.id, dog.name, dog.owner, dog.description],
        )
        .with_context(|| format!("Failed to save dog {}", dog.id))?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM dog", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Import a JSON array of dogs. Returns how many were written.
    pub fn import_json(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let dogs: Vec<Dog> = serde_json::from_str(&json)
            .with_context(|| format!("{:?} is not a JSON array of dogs", path))?;

        for dog in &dogs {
            self.save(dog)?;
        }

        tracing::info!("Imported {} dogs from {}", dogs.len(), path.display());
        Ok(dogs.len())
    }
}
