//! Append-only CSV alert log, one file per UTC day, header written once per file.

use crate::error::PersistenceError;
use crate::storage::ThreatRecord;
use chrono::NaiveDate;
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: [&str; 7] = [
    "timestamp",
    "ip",
    "endpoint",
    "method",
    "prediction",
    "probability",
    "request_data",
];

const MASKED_KEYS: [&str; 1] = ["password"];

struct OpenDay {
    day: NaiveDate,
    file: File,
}

pub struct AlertLog {
    dir: PathBuf,
    current: Mutex<Option<OpenDay>>,
}

impl AlertLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: Mutex::new(None),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("alerts_{}.csv", day.format("%Y%m%d")))
    }

    /// Append one row to the file of the record's UTC day.
    pub fn append(&self, record: &ThreatRecord) -> Result<(), PersistenceError> {
        let day = record.timestamp.date_naive();
        let mut current = self.current.lock();
        if current.as_ref().map(|o| o.day) != Some(day) {
            *current = Some(self.open_day(day)?);
        }
        let Some(open) = current.as_mut() else {
            return Ok(());
        };
        let line = format_row(record);
        open.file.write_all(line.as_bytes())?;
        open.file.flush()?;
        Ok(())
    }

    /// Release the open file handle.
    pub fn close(&self) {
        if let Some(mut open) = self.current.lock().take() {
            let _ = open.file.flush();
        }
    }

    fn open_day(&self, day: NaiveDate) -> Result<OpenDay, PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(day))?;
        if file.metadata()?.len() == 0 {
            file.write_all(format!("{}\n", HEADER.join(",")).as_bytes())?;
        }
        Ok(OpenDay { day, file })
    }
}

fn format_row(record: &ThreatRecord) -> String {
    let fields = [
        record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        record.ip.clone().unwrap_or_default(),
        record.endpoint.clone().unwrap_or_default(),
        record.method.clone().unwrap_or_default(),
        record.threat_type.as_str().to_string(),
        record.probability.to_string(),
        masked(&record.request_data).to_string(),
    ];
    let mut line = fields
        .iter()
        .map(|f| escape(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push('\n');
    line
}

/// The CSV file is plaintext; credentials stay out of it.
fn masked(request: &Value) -> Value {
    let mut v = request.clone();
    if let Value::Object(map) = &mut v {
        for key in MASKED_KEYS {
            if let Some(field) = map.get_mut(key) {
                *field = Value::from("***");
            }
        }
    }
    v
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
