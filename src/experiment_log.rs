use crate::app::AppContext;
use crate::device::DEVICE_FILE;
use crate::error::{MdResult, MicrodropError};
use crate::events::{AppEvent, EventBus};
use crate::protocol::{Protocol, PROTOCOL_FILE};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use tracing::{info, warn};

pub type LogRecord = BTreeMap<String, Value>;

/// File name of the log records inside an experiment directory.
pub const DATA_FILE: &str = "data";

/// Prefix of the control board plugin whose step fields feed the log table.
pub const CONTROL_BOARD_PREFIX: &str = "wheelerlab.dmf_control_board_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentLog {
    #[serde(skip)]
    directory: Option<PathBuf>,
    pub experiment_id: u32,
    pub data: Vec<LogRecord>,
}

/// Numeric sub-directory names of `dir`.
fn numeric_dirs(dir: &Path) -> Vec<u32> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| e.file_name().to_str().and_then(|s| s.parse().ok()))
        .collect()
}

/// Experiment ids under `dir` that have a data file, ascending.
pub fn list_log_ids<P: AsRef<Path>>(dir: P) -> Vec<u32> {
    let dir = dir.as_ref();
    let mut ids: Vec<u32> = numeric_dirs(dir)
        .into_iter()
        .filter(|id| dir.join(id.to_string()).join(DATA_FILE).is_file())
        .collect();
    ids.sort_unstable();
    ids
}

impl ExperimentLog {
    /// A fresh log. With a directory, the id follows the highest existing one.
    pub fn new(directory: Option<PathBuf>) -> Self {
        let experiment_id = Self::next_id(directory.as_deref());
        Self {
            directory,
            experiment_id,
            data: Vec::new(),
        }
    }

    fn next_id(directory: Option<&Path>) -> u32 {
        directory
            .and_then(|d| numeric_dirs(d).into_iter().max())
            .map_or(0, |m| m + 1)
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn experiment_path(&self) -> Option<PathBuf> {
        self.directory
            .as_ref()
            .map(|d| d.join(self.experiment_id.to_string()))
    }

    pub fn add_data(&mut self, record: LogRecord) {
        self.data.push(record);
    }

    pub fn add_step(&mut self, step: usize, time: f64) {
        let mut record = LogRecord::new();
        record.insert("step".into(), Value::from(step));
        record.insert("time".into(), Value::from(time));
        self.add_data(record);
    }

    /// The value of `key` in every record, `None` where absent.
    pub fn get(&self, key: &str) -> Vec<Option<&Value>> {
        self.data.iter().map(|r| r.get(key)).collect()
    }

    /// Writes `<directory>/<id>/data` and returns the experiment directory.
    pub fn save(&self) -> MdResult<PathBuf> {
        let path = self.experiment_path().ok_or_else(|| {
            MicrodropError::validation("Experiment log has no directory (is the device named?)")
        })?;
        fs::create_dir_all(&path)?;
        fs::write(path.join(DATA_FILE), serde_json::to_string_pretty(self)?)?;
        info!("💾 Saved experiment log {} to {}", self.experiment_id, path.display());
        Ok(path)
    }

    /// Loads a data file; its directory becomes the grandparent of the file.
    pub fn load<P: AsRef<Path>>(path: P) -> MdResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MicrodropError::NotFound(format!("experiment log '{}': {}", path.display(), e))
        })?;
        let mut log: ExperimentLog = serde_json::from_str(&content)?;
        log.directory = path
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        Ok(log)
    }

    /// Drops all records and moves on to the next free id.
    pub fn clear(&mut self) {
        self.data.clear();
        self.experiment_id = Self::next_id(self.directory.as_deref())
            .max(self.experiment_id + 1);
    }
}

// === SUMMARY ===

/// Falsy values (null, "", 0, false) are skipped like empty widgets.
fn truthy_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::Bool(false) => None,
        Value::Bool(true) => Some("true".into()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn values_of(log: &ExperimentLog, key: &str) -> Vec<String> {
    log.get(key).into_iter().flatten().filter_map(truthy_text).collect()
}

fn format_ctime(secs: f64) -> Option<String> {
    let whole = secs.trunc() as i64;
    let nanos = ((secs - secs.trunc()) * 1e9) as u32;
    DateTime::from_timestamp(whole, nanos).map(|t| {
        t.with_timezone(&Local)
            .format("%a %b %e %H:%M:%S %Y")
            .to_string()
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSummary {
    pub software_version: String,
    pub device: String,
    pub protocol: String,
    pub control_board: String,
    pub experiment_time: String,
    pub notes: String,
}

impl LogSummary {
    pub fn from_log(log: &ExperimentLog) -> Self {
        let software_version = format!(
            "Software version: {}",
            values_of(log, "software version").concat()
        );
        let device = format!("Device: {}", values_of(log, "device name").concat());
        let protocol = values_of(log, "protocol name")
            .last()
            .map_or_else(|| "Protocol: None".to_string(), |p| format!("Protocol: {}", p));

        let mut control_board = format!(
            "Control board: {}",
            values_of(log, "control board name").concat()
        );
        for hw in values_of(log, "control board hardware version") {
            control_board.push_str(&format!(" v{}", hw));
        }
        for fw in values_of(log, "control board software version") {
            control_board.push_str(&format!("\n\tFirmware version:{}", fw));
        }

        let mut experiment_time = "Time of experiment: ".to_string();
        for t in log.get("start time").into_iter().flatten() {
            if let Some(s) = t.as_f64().filter(|s| *s != 0.0).and_then(format_ctime) {
                experiment_time.push_str(&s);
            }
        }

        let notes = values_of(log, "notes").pop().unwrap_or_default();

        Self {
            software_version,
            device,
            protocol,
            control_board,
            experiment_time,
            notes,
        }
    }
}

// === TABLE ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum LogColumn {
    #[strum(serialize = "Time (s)")]
    Time,
    #[strum(serialize = "Step #")]
    Step,
    #[strum(serialize = "Duration (s)")]
    Duration,
    #[strum(serialize = "Voltage (VRMS)")]
    Voltage,
    #[strum(serialize = "Frequency (kHz)")]
    Frequency,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRow {
    pub time: f64,
    /// 1-based step number.
    pub step: usize,
    pub duration_s: f64,
    pub voltage: i64,
    pub frequency_khz: f64,
}

impl LogRow {
    pub fn cell(&self, column: LogColumn) -> String {
        match column {
            LogColumn::Time => format!("{:.3}", self.time),
            LogColumn::Step => self.step.to_string(),
            LogColumn::Duration => format!("{:.3}", self.duration_s),
            LogColumn::Voltage => self.voltage.to_string(),
            LogColumn::Frequency => format!("{:.1}", self.frequency_khz),
        }
    }

    pub fn cells(&self) -> Vec<String> {
        LogColumn::iter().map(|c| self.cell(c)).collect()
    }
}

pub fn column_names() -> Vec<String> {
    LogColumn::iter().map(|c| c.to_string()).collect()
}

/// One row per record that has both a step and a time. Records whose step
/// lacks control board settings are skipped.
pub fn build_rows(log: &ExperimentLog, protocol: &Protocol) -> Vec<LogRow> {
    let mut rows = Vec::new();
    for record in &log.data {
        let (Some(step_idx), Some(time)) = (
            record.get("step").and_then(Value::as_u64),
            record.get("time").and_then(Value::as_f64),
        ) else {
            continue;
        };
        let step_idx = step_idx as usize;
        let options = protocol.step(step_idx).and_then(|s| {
            s.plugin_name_lookup(CONTROL_BOARD_PREFIX)
                .and_then(|name| s.get_data(name))
        });
        let Some(options) = options else {
            warn!("log record for step {} has no control board options", step_idx);
            continue;
        };
        let num = |k: &str| options.get(k).and_then(Value::as_f64);
        let (Some(duration), Some(voltage), Some(frequency)) =
            (num("duration"), num("voltage"), num("frequency"))
        else {
            warn!("incomplete control board options on step {}", step_idx);
            continue;
        };
        rows.push(LogRow {
            time,
            step: step_idx + 1,
            duration_s: duration / 1000.0,
            voltage: voltage.round() as i64,
            frequency_khz: frequency / 1000.0,
        });
    }
    rows
}

pub fn export_rows_csv<W: Write>(rows: &[LogRow], out: W) -> MdResult<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(column_names())?;
    for row in rows {
        wtr.write_record(row.cells())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Records whose time matches one of the selected rows.
pub fn select_records(log: &ExperimentLog, times: &[f64], bus: &mut EventBus) -> Vec<LogRecord> {
    let selected: Vec<LogRecord> = log
        .data
        .iter()
        .filter(|r| {
            r.get("time")
                .and_then(Value::as_f64)
                .is_some_and(|t| times.contains(&t))
        })
        .cloned()
        .collect();
    bus.emit(AppEvent::ExperimentLogSelectionChanged {
        times: times.to_vec(),
    });
    selected
}

/// Stores `notes` on the last record and re-saves the log.
pub fn update_notes(log: &mut ExperimentLog, notes: &str) -> MdResult<()> {
    if log.data.is_empty() {
        log.data.push(LogRecord::new());
    }
    if let Some(last) = log.data.last_mut() {
        last.insert("notes".into(), Value::from(notes));
    }
    log.save()?;
    Ok(())
}

/// Loads `<dir>/<id>/data` together with the protocol stored beside it.
pub fn load_experiment<P: AsRef<Path>>(dir: P, id: u32) -> MdResult<(ExperimentLog, Protocol)> {
    let base = dir.as_ref().join(id.to_string());
    let log = ExperimentLog::load(base.join(DATA_FILE))?;
    let protocol = Protocol::load(base.join(PROTOCOL_FILE))?;
    Ok((log, protocol))
}

// === CONTROLLER ===

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlBoardInfo {
    pub name: String,
    pub hardware_version: String,
    pub software_version: String,
}

/// Finalises the running experiment: metadata record, log, protocol and
/// device are written into the experiment directory, then a new log starts.
pub fn save_experiment(
    ctx: &mut AppContext,
    notes: &str,
    control_board: Option<&ControlBoardInfo>,
) -> MdResult<PathBuf> {
    let mut record = LogRecord::new();
    record.insert(
        "software version".into(),
        Value::from(env!("CARGO_PKG_VERSION")),
    );
    record.insert(
        "device name".into(),
        ctx.device.name.clone().map_or(Value::Null, Value::from),
    );
    record.insert(
        "protocol name".into(),
        ctx.protocol.name.clone().map_or(Value::Null, Value::from),
    );
    if let Some(board) = control_board {
        record.insert("control board name".into(), Value::from(board.name.clone()));
        record.insert(
            "control board hardware version".into(),
            Value::from(board.hardware_version.clone()),
        );
        record.insert(
            "control board software version".into(),
            Value::from(board.software_version.clone()),
        );
    }
    record.insert("notes".into(), Value::from(notes));

    ctx.experiment_log.add_data(record);
    let path = ctx.experiment_log.save()?;
    ctx.protocol.save(path.join(PROTOCOL_FILE))?;
    ctx.device.save(path.join(DEVICE_FILE))?;

    ctx.experiment_log.clear();
    ctx.bus.emit(AppEvent::ExperimentLogChanged {
        experiment_id: ctx.experiment_log.experiment_id,
    });
    Ok(path)
}

/// A device switch starts a new log under that device's `logs` directory.
pub fn on_device_changed(ctx: &mut AppContext) {
    let dir = ctx
        .device
        .name
        .as_deref()
        .map(|n| ctx.config.log_directory(n));
    ctx.experiment_log = ExperimentLog::new(dir);
    ctx.bus.emit(AppEvent::ExperimentLogChanged {
        experiment_id: ctx.experiment_log.experiment_id,
    });
}

/// Loads the device stored with experiment `id` into the context.
pub fn load_experiment_device(ctx: &mut AppContext, id: u32) -> MdResult<()> {
    let dir = ctx
        .experiment_log
        .directory()
        .map(Path::to_path_buf)
        .ok_or_else(|| MicrodropError::validation("No experiment log directory."))?;
    let path = dir.join(id.to_string()).join(DEVICE_FILE);
    if let Err(e) = crate::controller::load_device(ctx, &path) {
        ctx.bus
            .report(format!("Could not open {}", path.display()));
        return Err(e);
    }
    Ok(())
}
