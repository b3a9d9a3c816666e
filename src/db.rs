use crate::config::AppPaths;
use crate::domain::{RateSnapshot, Target};
use crate::error::{Result, TargeterError};
use anyhow::Context;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(paths: &AppPaths, filename: &str) -> anyhow::Result<(Self, PathBuf)> {
        fs::create_dir_all(&paths.data_dir)
            .with_context(|| format!("Failed to create data dir {}", paths.data_dir.display()))?;

        let db_path = paths.data_dir.join(filename);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open DB {}", db_path.display()))?;

        let db = Self { conn };
        db.migrate()
            .with_context(|| format!("Failed to initialize DB {}", db_path.display()))?;
        Ok((db, db_path))
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS rates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL UNIQUE,
                eur TEXT NOT NULL,
                usd TEXT NOT NULL,
                gbp TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS targets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                base_value TEXT NOT NULL,
                target_value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Runs `f` inside one transaction; any error rolls back everything it wrote.
    pub fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f()?;
        tx.commit()?;
        Ok(out)
    }

    /// Stores the day's rates, replacing any snapshot already held for that date.
    pub fn record_snapshot(&self, snapshot: &RateSnapshot) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO rates (date, eur, usd, gbp)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(date) DO UPDATE SET
                eur = excluded.eur,
                usd = excluded.usd,
                gbp = excluded.gbp
            "#,
            params![
                snapshot.date,
                snapshot.eur.to_string(),
                snapshot.usd.to_string(),
                snapshot.gbp.to_string(),
            ],
        )?;
        Ok(())
    }

    /// EUR per USD recorded for exactly `date`.
    pub fn get_rate_for_date(&self, date: NaiveDate) -> Result<Option<Decimal>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT eur FROM rates WHERE date = ?1", params![date], |row| {
                row.get(0)
            })
            .optional()?;

        raw.map(|r| parse_stored(&r, "eur")).transpose()
    }

    pub fn list_snapshots(&self, limit: usize) -> Result<Vec<RateSnapshot>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, eur, usd, gbp
            FROM rates
            ORDER BY date DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let date: NaiveDate = row.get(0)?;
            let eur: String = row.get(1)?;
            let usd: String = row.get(2)?;
            let gbp: String = row.get(3)?;
            Ok((date, eur, usd, gbp))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (date, eur, usd, gbp) = row?;
            out.push(RateSnapshot {
                date,
                eur: parse_stored(&eur, "eur")?,
                usd: parse_stored(&usd, "usd")?,
                gbp: parse_stored(&gbp, "gbp")?,
            });
        }
        Ok(out)
    }

    pub fn insert_target(
        &self,
        name: &str,
        base_value: Decimal,
        target_value: Decimal,
    ) -> Result<Target> {
        self.conn.execute(
            "INSERT INTO targets (name, base_value, target_value) VALUES (?1, ?2, ?3)",
            params![name, base_value.to_string(), target_value.to_string()],
        )?;

        Ok(Target {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            base_value,
            target_value,
        })
    }

    pub fn list_targets(&self) -> Result<Vec<Target>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, base_value, target_value FROM targets ORDER BY id ASC")?;

        let rows = stmt.query_map([], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            let base_value: String = row.get(2)?;
            let target_value: String = row.get(3)?;
            Ok((id, name, base_value, target_value))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, base_value, target_value) = row?;
            out.push(Target {
                id,
                name,
                base_value: parse_stored(&base_value, "base_value")?,
                target_value: parse_stored(&target_value, "target_value")?,
            });
        }
        Ok(out)
    }

    /// Drops every target and restarts id assignment.
    pub fn clear_targets(&mut self) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let removed = tx.execute("DELETE FROM targets", [])?;
        tx.execute("DELETE FROM sqlite_sequence WHERE name = 'targets'", [])?;
        tx.commit()?;
        Ok(removed)
    }
}

fn parse_stored(raw: &str, column: &str) -> Result<Decimal> {
    raw.parse::<Decimal>().map_err(|err| {
        TargeterError::Db(rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("Invalid decimal in {column} column: {raw} ({err})").into(),
        ))
    })
}
