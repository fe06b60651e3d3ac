use crate::calculator::{LoanScenario, PaymentBreakdown};
use crate::scenario::SavedScenario;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Event for audit trail ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Result of trying to store a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Another scenario already uses this name; snapshots are never overwritten
    NameTaken,
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Scenarios Table (inputs and outputs stored side by side, REAL = exact f64)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS scenarios (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scenario_uuid TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            fingerprint TEXT NOT NULL,
            price REAL NOT NULL,
            down_payment REAL NOT NULL,
            annual_rate_percent REAL NOT NULL,
            term_years INTEGER NOT NULL,
            annual_property_tax REAL NOT NULL,
            annual_insurance REAL NOT NULL,
            annual_hoa REAL NOT NULL,
            monthly_payment REAL NOT NULL,
            total_payment REAL NOT NULL,
            total_interest REAL NOT NULL,
            principal REAL NOT NULL,
            monthly_principal_and_interest REAL NOT NULL,
            monthly_taxes REAL NOT NULL,
            monthly_insurance REAL NOT NULL,
            monthly_hoa REAL NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scenarios_fingerprint ON scenarios(fingerprint)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_scenarios_created ON scenarios(created_at)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    tracing::debug!("scenario schema ready");

    Ok(())
}

const SCENARIO_COLUMNS: &str = "scenario_uuid, name,
    price, down_payment, annual_rate_percent, term_years,
    annual_property_tax, annual_insurance, annual_hoa,
    monthly_payment, total_payment, total_interest, principal,
    monthly_principal_and_interest, monthly_taxes, monthly_insurance, monthly_hoa,
    created_at";

fn row_to_scenario(row: &Row) -> rusqlite::Result<SavedScenario> {
    let created_at_str: String = row.get(17)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(17, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);

    Ok(SavedScenario {
        id: row.get(0)?,
        name: row.get(1)?,
        inputs: LoanScenario {
            price: row.get(2)?,
            down_payment: row.get(3)?,
            annual_rate_percent: row.get(4)?,
            term_years: row.get(5)?,
            annual_property_tax: row.get(6)?,
            annual_insurance: row.get(7)?,
            annual_hoa: row.get(8)?,
        },
        outputs: PaymentBreakdown {
            monthly_payment: row.get(9)?,
            total_payment: row.get(10)?,
            total_interest: row.get(11)?,
            principal: row.get(12)?,
            monthly_principal_and_interest: row.get(13)?,
            monthly_taxes: row.get(14)?,
            monthly_insurance: row.get(15)?,
            monthly_hoa: row.get(16)?,
        },
        created_at,
    })
}

/// Persist a snapshot verbatim. Existing names are never overwritten.
///
/// The row and its `scenario_saved` event are written in one transaction.
pub fn save_scenario(conn: &Connection, scenario: &SavedScenario) -> Result<SaveOutcome> {
    let inputs = &scenario.inputs;
    let outputs = &scenario.outputs;

    let tx = conn.unchecked_transaction()?;

    let result = tx.execute(
        "INSERT INTO scenarios (
            scenario_uuid, name, fingerprint,
            price, down_payment, annual_rate_percent, term_years,
            annual_property_tax, annual_insurance, annual_hoa,
            monthly_payment, total_payment, total_interest, principal,
            monthly_principal_and_interest, monthly_taxes, monthly_insurance, monthly_hoa,
            created_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
            ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19
        )",
        params![
            scenario.id,
            scenario.name,
            scenario.fingerprint(),
            inputs.price,
            inputs.down_payment,
            inputs.annual_rate_percent,
            inputs.term_years,
            inputs.annual_property_tax,
            inputs.annual_insurance,
            inputs.annual_hoa,
            outputs.monthly_payment,
            outputs.total_payment,
            outputs.total_interest,
            outputs.principal,
            outputs.monthly_principal_and_interest,
            outputs.monthly_taxes,
            outputs.monthly_insurance,
            outputs.monthly_hoa,
            scenario.created_at.to_rfc3339(),
        ],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            tracing::warn!(name = %scenario.name, "scenario name already taken");
            return Ok(SaveOutcome::NameTaken);
        }
        Err(e) => return Err(e).context("Failed to save scenario"),
    }

    let event = Event::new(
        "scenario_saved",
        "scenario",
        &scenario.id,
        serde_json::json!({
            "name": scenario.name,
            "principal": outputs.principal,
            "monthly_payment": outputs.monthly_payment,
        }),
        "calculator",
    );
    insert_event(&tx, &event)?;
    tx.commit().context("Failed to commit scenario")?;

    tracing::info!(id = %scenario.id, name = %scenario.name, "scenario saved");
    Ok(SaveOutcome::Saved)
}

/// Load a snapshot by identity
pub fn load_scenario(conn: &Connection, id: &str) -> Result<Option<SavedScenario>> {
    let sql = format!("SELECT {} FROM scenarios WHERE scenario_uuid = ?1", SCENARIO_COLUMNS);
    let scenario = conn
        .query_row(&sql, params![id], row_to_scenario)
        .optional()
        .context("Failed to load scenario")?;

    Ok(scenario)
}

pub fn find_scenario_by_name(conn: &Connection, name: &str) -> Result<Option<SavedScenario>> {
    let sql = format!("SELECT {} FROM scenarios WHERE name = ?1", SCENARIO_COLUMNS);
    let scenario = conn
        .query_row(&sql, params![name.trim()], row_to_scenario)
        .optional()
        .context("Failed to look up scenario by name")?;

    Ok(scenario)
}

/// All snapshots sharing the given input fingerprint, oldest first
pub fn find_scenarios_by_fingerprint(
    conn: &Connection,
    fingerprint: &str,
) -> Result<Vec<SavedScenario>> {
    let sql = format!(
        "SELECT {} FROM scenarios WHERE fingerprint = ?1 ORDER BY id ASC",
        SCENARIO_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;

    let scenarios = stmt
        .query_map(params![fingerprint], row_to_scenario)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(scenarios)
}

/// Every snapshot, newest first
pub fn list_scenarios(conn: &Connection) -> Result<Vec<SavedScenario>> {
    let sql = format!("SELECT {} FROM scenarios ORDER BY id DESC", SCENARIO_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;

    let scenarios = stmt
        .query_map([], row_to_scenario)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(scenarios)
}

pub fn count_scenarios(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM scenarios", [], |row| row.get(0))?;

    Ok(count)
}

/// Delete a snapshot. Returns false when no scenario has that id.
pub fn delete_scenario(conn: &Connection, id: &str) -> Result<bool> {
    let removed = conn
        .execute("DELETE FROM scenarios WHERE scenario_uuid = ?1", params![id])
        .context("Failed to delete scenario")?;

    if removed == 0 {
        return Ok(false);
    }

    let event = Event::new(
        "scenario_deleted",
        "scenario",
        id,
        serde_json::json!({}),
        "calculator",
    );
    insert_event(conn, &event)?;

    tracing::info!(id = %id, "scenario deleted");
    Ok(true)
}

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, oldest first
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY id ASC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
                    })?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}
