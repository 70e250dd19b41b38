//! Schema objects owned by the application, in creation order.
//!
//! [`create_all`] applies them at startup when `AUTO_CREATE_SCHEMA` is set.
//! Every statement is idempotent, so running it against an existing database
//! leaves the data untouched.

use std::fmt;

use super::{Database, DbError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Type,
    Table,
    Index,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKind::Type => write!(f, "type"),
            ObjectKind::Table => write!(f, "table"),
            ObjectKind::Index => write!(f, "index"),
        }
    }
}

#[derive(Debug)]
pub struct SchemaObject {
    pub kind: ObjectKind,
    pub name: &'static str,
    pub ddl: &'static str,
}

pub const SCHEMA: &[SchemaObject] = &[
    SchemaObject {
        kind: ObjectKind::Type,
        name: "task_priority",
        ddl: "DO $$ BEGIN \
                CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high', 'urgent'); \
              EXCEPTION WHEN duplicate_object THEN NULL; \
              END $$",
    },
    SchemaObject {
        kind: ObjectKind::Type,
        name: "task_status",
        ddl: "DO $$ BEGIN \
                CREATE TYPE task_status AS ENUM ('todo', 'in_progress', 'review', 'done'); \
              EXCEPTION WHEN duplicate_object THEN NULL; \
              END $$",
    },
    SchemaObject {
        kind: ObjectKind::Table,
        name: "users",
        ddl: "CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                username VARCHAR(32) NOT NULL UNIQUE,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
              )",
    },
    SchemaObject {
        kind: ObjectKind::Table,
        name: "tasks",
        ddl: "CREATE TABLE IF NOT EXISTS tasks (
                id UUID PRIMARY KEY,
                title VARCHAR(200) NOT NULL,
                description TEXT,
                priority task_priority,
                status task_status NOT NULL DEFAULT 'todo',
                due_date TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
                assigned_to INTEGER REFERENCES users (id) ON DELETE SET NULL
              )",
    },
    SchemaObject {
        kind: ObjectKind::Index,
        name: "idx_tasks_user_id",
        ddl: "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks (user_id)",
    },
    SchemaObject {
        kind: ObjectKind::Index,
        name: "idx_tasks_status",
        ddl: "CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks (status)",
    },
];

/// Creates every missing object in [`SCHEMA`] inside a single session.
pub async fn create_all(db: &Database) -> Result<(), DbError> {
    db.run_with_session(|session| {
        Box::pin(async move {
            for object in SCHEMA {
                log::debug!("ensuring {} {}", object.kind, object.name);
                sqlx::query(object.ddl)
                    .execute(session.conn())
                    .await
                    .map_err(DbError::Query)?;
            }
            Ok::<(), DbError>(())
        })
    })
    .await?;

    log::info!("schema ready ({} objects)", SCHEMA.len());
    Ok(())
}
