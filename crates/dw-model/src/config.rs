//! Run configuration for the warehouse pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Naming used for `day_name` / `month_name` in the calendar dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarLocale {
    #[default]
    English,
    Spanish,
}

const ENGLISH_DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const SPANISH_DAYS: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];
const ENGLISH_MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const SPANISH_MONTHS: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

impl CalendarLocale {
    /// Day name for a 0-based weekday counted from Monday.
    pub fn day_name(self, weekday_from_monday: u32) -> &'static str {
        let names = match self {
            Self::English => &ENGLISH_DAYS,
            Self::Spanish => &SPANISH_DAYS,
        };
        names[(weekday_from_monday % 7) as usize]
    }

    /// Month name for a 1-based month.
    pub fn month_name(self, month: u32) -> &'static str {
        let names = match self {
            Self::English => &ENGLISH_MONTHS,
            Self::Spanish => &SPANISH_MONTHS,
        };
        names[(month.clamp(1, 12) - 1) as usize]
    }
}

/// A (table, column) pair that contributes to the calendar range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateSource {
    pub table: String,
    pub column: String,
}

impl DateSource {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// Options for the derived calendar dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Date-bearing columns scanned for the range. Absent ones are skipped.
    pub sources: Vec<DateSource>,
    /// Window used when no source yields a valid date.
    pub fallback_start: NaiveDate,
    pub fallback_end: NaiveDate,
    pub locale: CalendarLocale,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        let sources = [
            ("sales_order", "order_date"),
            ("payment", "paid_at"),
            ("shipment", "shipped_at"),
            ("shipment", "delivered_at"),
            ("web_session", "started_at"),
            ("web_session", "ended_at"),
            ("nps_response", "response_date"),
            ("nps_response", "responded_at"),
            ("customer", "created_at"),
            ("product", "created_at"),
            ("store", "created_at"),
            ("address", "created_at"),
        ]
        .into_iter()
        .map(|(table, column)| DateSource::new(table, column))
        .collect();

        Self {
            sources,
            fallback_start: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap_or_default(),
            fallback_end: NaiveDate::from_ymd_opt(2021, 12, 31).unwrap_or_default(),
            locale: CalendarLocale::default(),
        }
    }
}

impl CalendarConfig {
    /// Fallback window with its bounds in ascending order.
    pub fn fallback_range(&self) -> (NaiveDate, NaiveDate) {
        if self.fallback_start <= self.fallback_end {
            (self.fallback_start, self.fallback_end)
        } else {
            (self.fallback_end, self.fallback_start)
        }
    }
}

/// Options controlling a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the raw `*.csv` extract.
    pub raw_dir: PathBuf,
    /// Directory the warehouse tables are written to.
    pub output_dir: PathBuf,
    /// Order statuses that count as a valid sale (compared trimmed, upper-cased).
    pub accepted_statuses: Vec<String>,
    pub calendar: CalendarConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw"),
            output_dir: PathBuf::from("DW"),
            accepted_statuses: vec!["PAID".to_string(), "FULFILLED".to_string()],
            calendar: CalendarConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| ModelError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ModelError::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_raw_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = dir.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_accepted_statuses(mut self, statuses: Vec<String>) -> Self {
        self.accepted_statuses = statuses;
        self
    }

    pub fn with_locale(mut self, locale: CalendarLocale) -> Self {
        self.calendar.locale = locale;
        self
    }

    /// Whether an order status counts as a valid sale.
    pub fn is_accepted_status(&self, status: &str) -> bool {
        let status = status.trim().to_uppercase();
        self.accepted_statuses
            .iter()
            .any(|accepted| accepted.trim().to_uppercase() == status)
    }

    pub fn validate(&self) -> Result<()> {
        if self.accepted_statuses.is_empty() {
            return Err(ModelError::Invalid(
                "accepted_statuses must name at least one status".to_string(),
            ));
        }
        if self.accepted_statuses.iter().any(|s| s.trim().is_empty()) {
            return Err(ModelError::Invalid(
                "accepted_statuses contains a blank status".to_string(),
            ));
        }
        if let Some(source) = self
            .calendar
            .sources
            .iter()
            .find(|s| s.table.trim().is_empty() || s.column.trim().is_empty())
        {
            return Err(ModelError::Invalid(format!(
                "calendar source has an empty table or column: {source:?}"
            )));
        }
        Ok(())
    }
}
