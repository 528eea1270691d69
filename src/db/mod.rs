mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use user::{User, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        // A pooled in-memory database would give every connection its own empty schema.
        let max_connections = if path == ":memory:" { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get the current schema version.
    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    /// Set the schema version within a transaction.
    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Run database migrations.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    username TEXT UNIQUE NOT NULL COLLATE NOCASE,
                    password_hash TEXT NOT NULL,
                    email TEXT UNIQUE COLLATE NOCASE,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_username ON users(username)",
                "CREATE INDEX idx_users_email ON users(email)",
            ],
        )
        .await
    }

    /// Get the user store.
    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::hash_password;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();
        let hash = hash_password("correct").unwrap();

        let id = db
            .users()
            .create("uuid-123", "alice", &hash, Some("alice@example.com"))
            .await
            .unwrap();

        let user = db.users().get_by_username("alice").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.uuid, "uuid-123");
        assert_eq!(user.username, "alice");
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));

        let user = db
            .users()
            .get_by_email("ALICE@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn test_duplicate_username_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("uuid-1", "alice", "h", None).await.unwrap();
        let result = db.users().create("uuid-2", "Alice", "h", None).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_users_without_email_do_not_conflict() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("uuid-1", "alice", "h", None).await.unwrap();
        db.users().create("uuid-2", "bob", "h", None).await.unwrap();

        assert!(db.users().get_by_username("bob").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_availability() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(db.users().is_username_available("alice").await.unwrap());
        assert!(db.users().is_email_available("a@example.com").await.unwrap());

        db.users()
            .create("uuid-1", "alice", "h", Some("a@example.com"))
            .await
            .unwrap();

        assert!(!db.users().is_username_available("alice").await.unwrap());
        assert!(!db.users().is_email_available("a@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let db = Database::open(":memory:").await.unwrap();
        let hash = hash_password("correct").unwrap();
        db.users().create("uuid-1", "alice", &hash, None).await.unwrap();

        let user = db
            .users()
            .verify_credentials("alice", "correct")
            .await
            .unwrap();
        assert_eq!(user.map(|u| u.username), Some("alice".to_string()));

        assert!(
            db.users()
                .verify_credentials("alice", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            db.users()
                .verify_credentials("nobody", "correct")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            db.users()
                .verify_credentials("nobody", "unused-dummy-password")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("uuid-123", "alice", "h", None).await.unwrap();
        assert!(db.users().delete_by_username("alice").await.unwrap());
        assert!(!db.users().delete_by_username("alice").await.unwrap());

        assert!(db.users().get_by_username("alice").await.unwrap().is_none());
    }
}
