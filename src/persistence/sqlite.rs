use super::{MemberRecord, PersistenceError, PersistenceResult, PlanningStore, WorkbookSnapshot};
use crate::workbook::PlanningWorkbook;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Mutex;
use tracing::info;

pub struct SqlitePlanningStore {
    connection: Mutex<Connection>,
}

impl SqlitePlanningStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                settings_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS team_members (
                position INTEGER PRIMARY KEY,
                team TEXT NOT NULL,
                pi TEXT NOT NULL,
                name TEXT NOT NULL,
                member_json TEXT NOT NULL,
                UNIQUE (team, pi, name)
            );
            CREATE TABLE IF NOT EXISTS team_records (
                position INTEGER PRIMARY KEY,
                record_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS role_relevance (
                position INTEGER PRIMARY KEY,
                assignment_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS velocity_history (
                position INTEGER PRIMARY KEY,
                velocity_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS capabilities (
                position INTEGER PRIMARY KEY,
                capability_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }

    fn replace_rows<T: Serialize>(
        tx: &Transaction,
        table: &str,
        column: &str,
        rows: &[T],
    ) -> PersistenceResult<()> {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {table} (position, {column}) VALUES (?1, ?2)"
        ))?;
        for (position, row) in rows.iter().enumerate() {
            let json = serde_json::to_string(row)?;
            stmt.execute(params![position as i64, json])?;
        }
        Ok(())
    }

    fn read_rows<T: DeserializeOwned>(
        conn: &Connection,
        table: &str,
        column: &str,
    ) -> PersistenceResult<Vec<T>> {
        let mut stmt = conn.prepare(&format!("SELECT {column} FROM {table} ORDER BY position ASC"))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for json in rows {
            out.push(serde_json::from_str(&json?)?);
        }
        Ok(out)
    }

    fn save_members(tx: &Transaction, members: &[MemberRecord]) -> PersistenceResult<()> {
        tx.execute("DELETE FROM team_members", [])?;
        let mut stmt = tx.prepare(
            "INSERT INTO team_members (position, team, pi, name, member_json) VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (position, record) in members.iter().enumerate() {
            let json = serde_json::to_string(&record.member)?;
            stmt.execute(params![
                position as i64,
                record.team,
                record.pi,
                record.member.name,
                json
            ])?;
        }
        Ok(())
    }

    fn load_members(conn: &Connection) -> PersistenceResult<Vec<MemberRecord>> {
        let mut stmt =
            conn.prepare("SELECT team, pi, member_json FROM team_members ORDER BY position ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        let mut members = Vec::new();
        for row in rows {
            let (team, pi, json) = row?;
            members.push(MemberRecord {
                team,
                pi,
                member: serde_json::from_str(&json)?,
            });
        }
        Ok(members)
    }
}

impl PlanningStore for SqlitePlanningStore {
    fn save_workbook(&self, workbook: &PlanningWorkbook) -> PersistenceResult<()> {
        let snapshot = WorkbookSnapshot::from_workbook(workbook)?;
        let mut conn = self
            .connection
            .lock()
            .map_err(|_| PersistenceError::Poisoned)?;
        let tx = conn.transaction()?;

        let settings_json = serde_json::to_string(&snapshot.settings)?;
        tx.execute("DELETE FROM settings", [])?;
        tx.execute(
            "INSERT INTO settings (id, settings_json) VALUES (1, ?1)",
            params![settings_json],
        )?;
        Self::save_members(&tx, &snapshot.members)?;
        Self::replace_rows(&tx, "team_records", "record_json", &snapshot.team_records)?;
        Self::replace_rows(&tx, "role_relevance", "assignment_json", &snapshot.role_assignments)?;
        Self::replace_rows(&tx, "velocity_history", "velocity_json", &snapshot.velocity_history)?;
        Self::replace_rows(&tx, "capabilities", "capability_json", &snapshot.capabilities)?;
        tx.commit()?;

        info!(members = snapshot.members.len(), "saved workbook to sqlite");
        Ok(())
    }

    fn load_workbook(&self) -> PersistenceResult<Option<PlanningWorkbook>> {
        let conn = self
            .connection
            .lock()
            .map_err(|_| PersistenceError::Poisoned)?;

        let settings_json: Option<String> = conn
            .query_row("SELECT settings_json FROM settings WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(settings_json) = settings_json else {
            return Ok(None);
        };

        let snapshot = WorkbookSnapshot {
            settings: serde_json::from_str(&settings_json)?,
            members: Self::load_members(&conn)?,
            team_records: Self::read_rows(&conn, "team_records", "record_json")?,
            role_assignments: Self::read_rows(&conn, "role_relevance", "assignment_json")?,
            velocity_history: Self::read_rows(&conn, "velocity_history", "velocity_json")?,
            capabilities: Self::read_rows(&conn, "capabilities", "capability_json")?,
        };
        info!(members = snapshot.members.len(), "loaded workbook from sqlite");
        snapshot.into_workbook().map(Some)
    }
}
