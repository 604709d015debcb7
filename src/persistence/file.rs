use super::{PersistenceError, PersistenceResult, PlanningStore, WorkbookSnapshot};
use crate::calculations::velocity::SprintVelocity;
use crate::member::{MemberStatus, TeamMember};
use crate::portfolio::{self, Capability};
use crate::roster::{Roster, RosterEntry};
use crate::settings::PlanningSettings;
use crate::workbook::PlanningWorkbook;
use chrono::NaiveDate;
use csv::StringRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub fn save_workbook_to_json<P: AsRef<Path>>(
    workbook: &PlanningWorkbook,
    path: P,
) -> PersistenceResult<()> {
    let snapshot = WorkbookSnapshot::from_workbook(workbook)?;
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    info!(path = %path.as_ref().display(), members = snapshot.members.len(), "saved workbook");
    Ok(())
}

pub fn load_workbook_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<PlanningWorkbook> {
    let file = File::open(path.as_ref())?;
    let snapshot: WorkbookSnapshot = serde_json::from_reader(file)?;
    info!(path = %path.as_ref().display(), members = snapshot.members.len(), "loaded workbook");
    snapshot.into_workbook()
}

pub fn save_settings_to_json<P: AsRef<Path>>(
    settings: &PlanningSettings,
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, settings)?;
    Ok(())
}

pub fn load_settings_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<PlanningSettings> {
    let file = File::open(path)?;
    let settings: PlanningSettings = serde_json::from_reader(file)?;
    settings
        .validate()
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
    Ok(settings)
}

/// Workbook kept as a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonPlanningStore {
    path: PathBuf,
}

impl JsonPlanningStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlanningStore for JsonPlanningStore {
    fn save_workbook(&self, workbook: &PlanningWorkbook) -> PersistenceResult<()> {
        save_workbook_to_json(workbook, &self.path)
    }

    fn load_workbook(&self) -> PersistenceResult<Option<PlanningWorkbook>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_workbook_from_json(&self.path).map(Some)
    }
}

// Spreadsheet headers.
const TEAM_NAME: &str = "Team Name";
const PI: &str = "PI";
const NAME: &str = "Name";
const ROLE: &str = "Role";
const HOURS: &str = "Hours";
const FTE: &str = "FTE";
const DAYS_OFF_PREFIX: &str = "Days Off Sprint ";
const FOCUS_FACTOR: &str = "SP Focus Factor (%)";
const STATUS: &str = "Status";
const MULTIPLIER: &str = "Multiplier";

/// Header lookup for sheets whose column set varies.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self { index }
    }

    fn require(&self, name: &str) -> PersistenceResult<()> {
        if self.index.contains_key(name) {
            Ok(())
        } else {
            Err(PersistenceError::InvalidData(format!(
                "missing column '{name}'"
            )))
        }
    }

    /// Trimmed cell, `None` when the column is absent or the cell is blank.
    fn cell<'r>(&self, record: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index
            .get(name)
            .and_then(|idx| record.get(*idx))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn required_text(columns: &Columns, record: &StringRecord, name: &str, line: usize) -> PersistenceResult<String> {
    columns
        .cell(record, name)
        .map(ToOwned::to_owned)
        .ok_or_else(|| PersistenceError::InvalidData(format!("row {line}: missing {name}")))
}

fn parse_number(input: &str, name: &str, line: usize) -> PersistenceResult<f64> {
    input
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| {
            PersistenceError::InvalidData(format!("row {line}: invalid {name} '{input}'"))
        })
}

fn required_number(columns: &Columns, record: &StringRecord, name: &str, line: usize) -> PersistenceResult<f64> {
    match columns.cell(record, name) {
        Some(value) => parse_number(value, name, line),
        None => Err(PersistenceError::InvalidData(format!(
            "row {line}: missing {name}"
        ))),
    }
}

fn optional_number(
    columns: &Columns,
    record: &StringRecord,
    name: &str,
    line: usize,
    default: f64,
) -> PersistenceResult<f64> {
    columns
        .cell(record, name)
        .map_or(Ok(default), |value| parse_number(value, name, line))
}

fn days_off_columns(headers: &StringRecord) -> Vec<String> {
    let mut sprints: Vec<(u32, String)> = headers
        .iter()
        .filter_map(|header| {
            let header = header.trim();
            header
                .strip_prefix(DAYS_OFF_PREFIX)
                .and_then(|sprint| sprint.trim().parse::<u32>().ok())
                .map(|sprint| (sprint, header.to_string()))
        })
        .collect();
    sprints.sort_by_key(|(sprint, _)| *sprint);
    sprints.into_iter().map(|(_, header)| header).collect()
}

/// Read the team member sheet.
///
/// Focus factor, multiplier and status are optional and default to 0.0, 1.0
/// and `Active`. An FTE column holding any value above 1 is read as percent.
pub fn load_roster_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Roster> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();
    let columns = Columns::new(&headers);
    for name in [TEAM_NAME, PI, NAME, ROLE, HOURS, FTE] {
        columns.require(name)?;
    }
    let days_off_headers = days_off_columns(&headers);
    if days_off_headers.is_empty() {
        return Err(PersistenceError::InvalidData(
            "missing 'Days Off Sprint N' columns".into(),
        ));
    }

    let mut entries = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        let status = match columns.cell(&record, STATUS) {
            Some(value) => value.parse::<MemberStatus>().map_err(|err| {
                PersistenceError::InvalidData(format!("row {line}: {err}"))
            })?,
            None => MemberStatus::Active,
        };
        let days_off = days_off_headers
            .iter()
            .map(|header| required_number(&columns, &record, header, line))
            .collect::<PersistenceResult<Vec<f64>>>()?;

        let member = TeamMember {
            name: required_text(&columns, &record, NAME, line)?,
            role: required_text(&columns, &record, ROLE, line)?,
            hours: required_number(&columns, &record, HOURS, line)?,
            fte: required_number(&columns, &record, FTE, line)?,
            days_off,
            sp_focus_factor: optional_number(&columns, &record, FOCUS_FACTOR, line, 0.0)?,
            multiplier: optional_number(&columns, &record, MULTIPLIER, line, 1.0)?,
            status,
        };
        entries.push(RosterEntry::new(
            required_text(&columns, &record, TEAM_NAME, line)?,
            required_text(&columns, &record, PI, line)?,
            member,
        ));
    }

    if entries.is_empty() {
        return Err(PersistenceError::InvalidData(
            "CSV file contained no members".into(),
        ));
    }

    if entries.iter().any(|entry| entry.member.fte > 1.0) {
        warn!("FTE column holds percentages, normalizing to fractions");
        for entry in &mut entries {
            entry.member.fte /= 100.0;
        }
    }

    let roster = Roster::from_entries(&entries)?;
    info!(members = roster.len(), "imported roster");
    Ok(roster)
}

pub fn save_roster_to_csv<P: AsRef<Path>>(roster: &Roster, path: P) -> PersistenceResult<()> {
    let entries = roster.entries()?;
    let num_sprints = entries
        .iter()
        .map(|entry| entry.member.days_off.len())
        .max()
        .unwrap_or(0);

    let mut header: Vec<String> = [TEAM_NAME, PI, NAME, ROLE, HOURS, FTE]
        .iter()
        .map(|name| name.to_string())
        .collect();
    header.extend((1..=num_sprints).map(|sprint| format!("{DAYS_OFF_PREFIX}{sprint}")));
    header.extend([FOCUS_FACTOR, STATUS, MULTIPLIER].iter().map(|name| name.to_string()));

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&header)?;
    for entry in &entries {
        let member = &entry.member;
        let mut row = vec![
            entry.team.clone(),
            entry.pi.clone(),
            member.name.clone(),
            member.role.clone(),
            member.hours.to_string(),
            member.fte.to_string(),
        ];
        row.extend((0..num_sprints).map(|sprint| {
            member
                .days_off
                .get(sprint)
                .map(|days| days.to_string())
                .unwrap_or_default()
        }));
        row.push(member.sp_focus_factor.to_string());
        row.push(member.status.as_str().to_string());
        row.push(member.multiplier.to_string());
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct VelocityCsvRecord {
    #[serde(rename = "Team")]
    team: String,
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "PI")]
    pi: String,
    #[serde(rename = "Sprint")]
    sprint: String,
    #[serde(rename = "SprintVelocity")]
    velocity: f64,
}

impl From<&SprintVelocity> for VelocityCsvRecord {
    fn from(row: &SprintVelocity) -> Self {
        Self {
            team: row.team.clone(),
            year: row.year,
            pi: row.pi.clone(),
            sprint: row.sprint.clone(),
            velocity: row.velocity,
        }
    }
}

impl From<VelocityCsvRecord> for SprintVelocity {
    fn from(record: VelocityCsvRecord) -> Self {
        SprintVelocity::new(record.team, record.year, record.pi, record.sprint, record.velocity)
    }
}

pub fn load_velocity_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<SprintVelocity>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for record in reader.deserialize::<VelocityCsvRecord>() {
        let row = SprintVelocity::from(record?);
        if !row.velocity.is_finite() {
            return Err(PersistenceError::InvalidData(format!(
                "team {} sprint {} has non-numeric velocity",
                row.team, row.sprint
            )));
        }
        rows.push(row);
    }
    info!(rows = rows.len(), "imported velocity history");
    Ok(rows)
}

pub fn save_velocity_to_csv<P: AsRef<Path>>(
    history: &[SprintVelocity],
    path: P,
) -> PersistenceResult<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in history {
        writer.serialize(VelocityCsvRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

const CAPABILITY_COLUMNS: [&str; 20] = [
    "ID",
    "Title",
    "State",
    "Area Path",
    "Tags",
    "WSJF",
    "Time Criticality WSJF",
    "Risk Reduction Opp. Enablement WSJF",
    "Business Value WSJF",
    "Effort WSJF",
    "Priority",
    "OD Business Priority",
    "Start Date",
    "Target Date",
    "Assigned To",
    "OD Budget Story Points",
    "Discovery PI",
    "Fit-Scope PI",
    "To be aligned",
    "Comment",
];

fn optional_float(value: Option<&str>, name: &str, line: usize) -> PersistenceResult<Option<f64>> {
    value.map(|value| parse_number(value, name, line)).transpose()
}

fn lenient_date(value: Option<&str>, name: &str, line: usize) -> Option<NaiveDate> {
    let value = value?;
    let date_part = value.split([' ', 'T']).next().unwrap_or(value);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            warn!(row = line, column = name, value, %err, "ignoring unparseable date");
            None
        }
    }
}

fn parse_flag(value: Option<&str>, line: usize) -> PersistenceResult<bool> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("false") | Some("0") | Some("no") => Ok(false),
        Some("true") | Some("1") | Some("yes") => Ok(true),
        Some(other) => Err(PersistenceError::InvalidData(format!(
            "row {line}: invalid 'To be aligned' value '{other}'"
        ))),
    }
}

/// Read the capability sheet. Every `PI YY-0N` column is an allocation;
/// blank allocation cells count as zero.
pub fn load_capabilities_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Capability>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();
    let columns = Columns::new(&headers);
    columns.require("ID")?;
    let pi_columns: Vec<String> = headers
        .iter()
        .map(str::trim)
        .filter(|header| portfolio::is_pi_column(header))
        .map(ToOwned::to_owned)
        .collect();

    let mut capabilities = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = idx + 2;
        let text = |name: &str| columns.cell(&record, name).map(ToOwned::to_owned);

        let mut capability = Capability {
            id: portfolio::normalize_id(&required_text(&columns, &record, "ID", line)?),
            title: text("Title").unwrap_or_default(),
            state: text("State").unwrap_or_default(),
            area_path: text("Area Path").unwrap_or_default(),
            tags: columns
                .cell(&record, "Tags")
                .map(portfolio::parse_tags)
                .unwrap_or_default(),
            wsjf: optional_float(columns.cell(&record, "WSJF"), "WSJF", line)?,
            time_criticality: optional_float(
                columns.cell(&record, "Time Criticality WSJF"),
                "Time Criticality WSJF",
                line,
            )?,
            risk_reduction: optional_float(
                columns.cell(&record, "Risk Reduction Opp. Enablement WSJF"),
                "Risk Reduction Opp. Enablement WSJF",
                line,
            )?,
            business_value: optional_float(
                columns.cell(&record, "Business Value WSJF"),
                "Business Value WSJF",
                line,
            )?,
            effort: optional_float(columns.cell(&record, "Effort WSJF"), "Effort WSJF", line)?,
            priority: optional_float(columns.cell(&record, "Priority"), "Priority", line)?,
            business_priority: text("OD Business Priority"),
            start_date: lenient_date(columns.cell(&record, "Start Date"), "Start Date", line),
            target_date: lenient_date(columns.cell(&record, "Target Date"), "Target Date", line),
            assigned_to: text("Assigned To"),
            budget_sp: optional_float(
                columns.cell(&record, "OD Budget Story Points"),
                "OD Budget Story Points",
                line,
            )?
            .unwrap_or(0.0),
            discovery_pi: text("Discovery PI"),
            fit_scope_pi: text("Fit-Scope PI"),
            to_be_aligned: parse_flag(columns.cell(&record, "To be aligned"), line)?,
            comment: text("Comment"),
            ..Capability::default()
        };
        for pi in &pi_columns {
            let sp = optional_float(columns.cell(&record, pi), pi, line)?.unwrap_or(0.0);
            capability
                .set_allocation(pi, sp)
                .map_err(|err| PersistenceError::InvalidData(format!("row {line}: {err}")))?;
        }
        capability
            .validate()
            .map_err(|err| PersistenceError::InvalidData(format!("row {line}: {err}")))?;
        capabilities.push(capability);
    }
    info!(count = capabilities.len(), pi_columns = pi_columns.len(), "imported capabilities");
    Ok(capabilities)
}

fn format_option<T: ToString>(value: Option<&T>) -> String {
    value.map(ToString::to_string).unwrap_or_default()
}

pub fn save_capabilities_to_csv<P: AsRef<Path>>(
    capabilities: &[Capability],
    path: P,
) -> PersistenceResult<()> {
    let pi_columns: BTreeSet<&str> = capabilities
        .iter()
        .flat_map(|capability| capability.pi_allocations.keys().map(String::as_str))
        .collect();

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    let mut header: Vec<&str> = CAPABILITY_COLUMNS.to_vec();
    header.extend(pi_columns.iter().copied());
    writer.write_record(&header)?;

    for capability in capabilities {
        let mut row = vec![
            capability.id.clone(),
            capability.title.clone(),
            capability.state.clone(),
            capability.area_path.clone(),
            capability.tags.join(";"),
            format_option(capability.wsjf.as_ref()),
            format_option(capability.time_criticality.as_ref()),
            format_option(capability.risk_reduction.as_ref()),
            format_option(capability.business_value.as_ref()),
            format_option(capability.effort.as_ref()),
            format_option(capability.priority.as_ref()),
            capability.business_priority.clone().unwrap_or_default(),
            capability
                .start_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            capability
                .target_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            capability.assigned_to.clone().unwrap_or_default(),
            capability.budget_sp.to_string(),
            capability.discovery_pi.clone().unwrap_or_default(),
            capability.fit_scope_pi.clone().unwrap_or_default(),
            capability.to_be_aligned.to_string(),
            capability.comment.clone().unwrap_or_default(),
        ];
        row.extend(pi_columns.iter().map(|pi| {
            format_option(capability.pi_allocations.get(*pi))
        }));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
