use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite, SqliteConnection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::{debug, info};

use shared::domain::{Person, SortOrder};

/// The persisted People collection, the server side of every batch.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// Listing parameters applied server side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeopleQuery {
    pub last_name_contains: Option<String>,
    pub order: SortOrder,
}

/// One change inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Insert(Person),
    Update { key: String, person: Person },
    Delete { key: String },
}

impl BatchOp {
    /// Application order inside a batch: deletes free user names that updates and
    /// inserts may then take.
    fn phase(&self) -> u8 {
        match self {
            BatchOp::Delete { .. } => 0,
            BatchOp::Update { .. } => 1,
            BatchOp::Insert(_) => 2,
        }
    }

    fn key(&self) -> &str {
        match self {
            BatchOp::Insert(person) => &person.user_name,
            BatchOp::Update { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{message}")]
    Rejected { user_name: String, message: String },
    #[error("person '{user_name}' does not exist")]
    NotFound { user_name: String },
    #[error("storage failure: {0}")]
    Database(#[from] sqlx::Error),
}

impl BatchError {
    /// Database failures are infrastructure problems; everything else is a business rejection.
    pub fn is_technical(&self) -> bool {
        matches!(self, BatchError::Database(_))
    }

    pub fn user_name(&self) -> Option<&str> {
        match self {
            BatchError::Rejected { user_name, .. } | BatchError::NotFound { user_name } => {
                Some(user_name)
            }
            BatchError::Database(_) => None,
        }
    }
}

pub fn sample_people() -> Vec<Person> {
    vec![
        Person::new("russellwhyte", "Russell", "Whyte", "42"),
        Person::new("scottketchum", "Scott", "Ketchum", "36"),
        Person::new("ronaldmundy", "Ronald", "Mundy", "51"),
        Person::new("javieralfred", "Javier", "Alfred", "29"),
        Person::new("willieashmore", "Willie", "Ashmore", "33"),
        Person::new("vincentcalabrese", "Vincent", "Calabrese", "47"),
        Person::new("clydeguess", "Clyde", "Guess", "24"),
        Person::new("keithpinckney", "Keith", "Pinckney", "38"),
    ]
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        // Every connection to an in-memory database sees its own empty database.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;

        let storage = Self { pool };
        storage.ensure_people_table().await?;
        Ok(storage)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Closes the pool; subsequent calls fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn ensure_people_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS people (
                user_name  TEXT PRIMARY KEY NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name  TEXT NOT NULL DEFAULT '',
                age        TEXT NOT NULL DEFAULT '18'
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure people table exists")?;
        Ok(())
    }

    pub async fn list_people(&self, query: &PeopleQuery) -> Result<Vec<Person>> {
        let mut sql = String::from("SELECT user_name, first_name, last_name, age FROM people");
        if query.last_name_contains.is_some() {
            sql.push_str(" WHERE instr(last_name, ?) > 0");
        }
        sql.push_str(match query.order {
            SortOrder::None => " ORDER BY rowid",
            SortOrder::Ascending => " ORDER BY last_name ASC, rowid",
            SortOrder::Descending => " ORDER BY last_name DESC, rowid",
        });

        let mut statement = sqlx::query(&sql);
        if let Some(needle) = &query.last_name_contains {
            statement = statement.bind(needle);
        }
        let rows = statement
            .fetch_all(&self.pool)
            .await
            .context("failed to list people")?;
        Ok(rows.into_iter().map(|row| person_from_row(&row)).collect())
    }

    pub async fn find_person(&self, user_name: &str) -> Result<Option<Person>> {
        let row = sqlx::query(
            "SELECT user_name, first_name, last_name, age FROM people WHERE user_name = ?",
        )
        .bind(user_name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load person '{user_name}'"))?;
        Ok(row.map(|r| person_from_row(&r)))
    }

    pub async fn count_people(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM people")
            .fetch_one(&self.pool)
            .await
            .context("failed to count people")?;
        Ok(count)
    }

    /// Applies every operation in one transaction; the first failure rolls all of them back.
    ///
    /// Deletes run first, then updates, then inserts, each group in the given order.
    pub async fn apply_batch(&self, ops: &[BatchOp]) -> Result<(), BatchError> {
        let mut ordered: Vec<&BatchOp> = ops.iter().collect();
        ordered.sort_by_key(|op| op.phase());

        let mut tx = self.pool.begin().await?;
        for op in ordered {
            debug!(key = op.key(), "applying batch operation");
            apply_op(&mut *tx, op).await?;
        }
        tx.commit().await?;
        info!(operations = ops.len(), "batch committed");
        Ok(())
    }

    /// Drops every row and restores the sample data set.
    pub async fn reset_data_source(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM people")
            .execute(&mut *tx)
            .await
            .context("failed to clear people")?;
        for person in sample_people() {
            insert_person(&mut *tx, &person)
                .await
                .with_context(|| format!("failed to seed '{}'", person.user_name))?;
        }
        tx.commit().await.context("failed to commit data source reset")?;
        info!("people data source reset");
        Ok(())
    }
}

async fn apply_op(conn: &mut SqliteConnection, op: &BatchOp) -> Result<(), BatchError> {
    match op {
        BatchOp::Insert(person) => {
            validate(person)?;
            if exists(conn, &person.user_name).await? {
                return Err(BatchError::Rejected {
                    user_name: person.user_name.clone(),
                    message: format!("user name '{}' is already taken", person.user_name),
                });
            }
            insert_person(conn, person).await?;
        }
        BatchOp::Update { key, person } => {
            validate(person)?;
            if person.user_name != *key && exists(conn, &person.user_name).await? {
                return Err(BatchError::Rejected {
                    user_name: person.user_name.clone(),
                    message: format!("user name '{}' is already taken", person.user_name),
                });
            }
            let result = sqlx::query(
                "UPDATE people SET user_name = ?, first_name = ?, last_name = ?, age = ?
                 WHERE user_name = ?",
            )
            .bind(&person.user_name)
            .bind(&person.first_name)
            .bind(&person.last_name)
            .bind(&person.age)
            .bind(key)
            .execute(&mut *conn)
            .await?;
            if result.rows_affected() == 0 {
                return Err(BatchError::NotFound {
                    user_name: key.clone(),
                });
            }
        }
        BatchOp::Delete { key } => {
            let result = sqlx::query("DELETE FROM people WHERE user_name = ?")
                .bind(key)
                .execute(&mut *conn)
                .await?;
            if result.rows_affected() == 0 {
                return Err(BatchError::NotFound {
                    user_name: key.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate(person: &Person) -> Result<(), BatchError> {
    if person.user_name.trim().is_empty() {
        return Err(BatchError::Rejected {
            user_name: person.user_name.clone(),
            message: "user name must not be empty".to_string(),
        });
    }
    if person.age.trim().parse::<u32>().is_err() {
        return Err(BatchError::Rejected {
            user_name: person.user_name.clone(),
            message: format!("age '{}' is not a whole number", person.age),
        });
    }
    Ok(())
}

async fn exists(conn: &mut SqliteConnection, user_name: &str) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM people WHERE user_name = ?")
        .bind(user_name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

async fn insert_person(conn: &mut SqliteConnection, person: &Person) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO people (user_name, first_name, last_name, age) VALUES (?, ?, ?, ?)")
        .bind(&person.user_name)
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(&person.age)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

fn person_from_row(row: &sqlx::sqlite::SqliteRow) -> Person {
    Person {
        user_name: row.get::<String, _>(0),
        first_name: row.get::<String, _>(1),
        last_name: row.get::<String, _>(2),
        age: row.get::<String, _>(3),
    }
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
