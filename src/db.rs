use crate::store::{
    pull_matching, push_value, Document, DocumentStore, FieldPath, Namespace, Query, Scope,
    StoreError,
};
use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DB_FILE: &str = "gradebook.sqlite3";

/// SQLite-backed document store. Bodies are stored as JSON text, one row per document.
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

pub fn open_db(workspace: &Path) -> anyhow::Result<SqliteStore> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;
    Ok(SqliteStore {
        conn,
        path: Some(db_path),
    })
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            id TEXT PRIMARY KEY,
            account TEXT NOT NULL,
            collection TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_ns ON documents(account, collection)",
        [],
    )?;
    Ok(())
}

fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl SqliteStore {
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Matching documents in insertion order, paired with their row ids.
    fn load(
        conn: &Connection,
        ns: &Namespace,
        query: &Query,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, body FROM documents
             WHERE account = ? AND collection = ?
             ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map((&ns.account, ns.collection.as_str()), |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = Vec::new();
        for (id, body) in rows {
            let doc: Document = match serde_json::from_str(&body) {
                Ok(d) => d,
                Err(source) => return Err(StoreError::Corrupt { id, source }),
            };
            if query.matches(&doc) {
                out.push((id, doc));
            }
        }
        Ok(out)
    }

    fn update_with<F>(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        mut f: F,
    ) -> Result<usize, StoreError>
    where
        F: FnMut(&mut Document) -> Result<bool, StoreError>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let mut targets = Self::load(&tx, ns, query)?;
        if scope == Scope::One {
            targets.truncate(1);
        }

        let stamp = now_stamp();
        let mut changed = 0;
        for (id, mut doc) in targets {
            if !f(&mut doc)? {
                continue;
            }
            let body = serde_json::to_string(&doc)?;
            tx.execute(
                "UPDATE documents SET body = ?, updated_at = ? WHERE id = ?",
                (&body, &stamp, &id),
            )?;
            changed += 1;
        }
        tx.commit()?;
        Ok(changed)
    }
}

impl DocumentStore for SqliteStore {
    fn find(&self, ns: &Namespace, query: &Query) -> Result<Vec<Document>, StoreError> {
        Ok(Self::load(&self.conn, ns, query)?
            .into_iter()
            .map(|(_, doc)| doc)
            .collect())
    }

    fn insert(&self, ns: &Namespace, doc: Document) -> Result<(), StoreError> {
        let body = serde_json::to_string(&doc)?;
        self.conn.execute(
            "INSERT INTO documents(id, account, collection, body, updated_at)
             VALUES(?, ?, ?, ?, ?)",
            (
                Uuid::new_v4().to_string(),
                &ns.account,
                ns.collection.as_str(),
                &body,
                now_stamp(),
            ),
        )?;
        Ok(())
    }

    fn update_push(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        array: &str,
        value: Value,
    ) -> Result<usize, StoreError> {
        self.update_with(ns, query, scope, |doc| {
            push_value(doc, array, value.clone())
        })
    }

    fn update_pull(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        array: &str,
        element: &Query,
    ) -> Result<usize, StoreError> {
        self.update_with(ns, query, scope, |doc| pull_matching(doc, array, element))
    }

    fn update_set(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        path: &FieldPath,
        value: Value,
    ) -> Result<usize, StoreError> {
        self.update_with(ns, query, scope, |doc| Ok(path.set(doc, &value)))
    }

    fn update_unset(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        path: &FieldPath,
    ) -> Result<usize, StoreError> {
        self.update_with(ns, query, scope, |doc| Ok(path.unset(doc)))
    }

    fn delete(&self, ns: &Namespace, query: &Query, scope: Scope) -> Result<usize, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut targets = Self::load(&tx, ns, query)?;
        if scope == Scope::One {
            targets.truncate(1);
        }
        for (id, _) in &targets {
            tx.execute("DELETE FROM documents WHERE id = ?", [id])?;
        }
        tx.commit()?;
        Ok(targets.len())
    }
}
