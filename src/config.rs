use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{ExplorerError, Result};
use crate::pipeline::{ColumnRoles, UnknownColumnPolicy};
use crate::recode::Recoding;

// Constants
pub const DEFAULT_SOURCE: &str =
    "https://github.com/manojcpatil-students/PRERNA/raw/main/SurveyData.xlsx";
pub const DEFAULT_CONFIG_FILE: &str = "explorer.json";
const DEFAULT_BIND: &str = "127.0.0.1:3000";
const MAX_SESSION_HOURS: u64 = 24 * 366;

const ENV_CONFIG: &str = "SURVEY_EXPLORER_CONFIG";
const ENV_SOURCE: &str = "SURVEY_EXPLORER_SOURCE";
const ENV_BIND: &str = "SURVEY_EXPLORER_BIND";
const ENV_PASSWORD_HASH: &str = "SURVEY_EXPLORER_PASSWORD_HASH";

/// Application configuration
///
/// Read from a JSON file; every field has a default so a partial file (or
/// none at all) is enough to start. The column lists drift between survey
/// revisions, which is why they live here and not in the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL (`http://` / `https://`) or filesystem path of the workbook.
    pub source: String,

    /// Sheet holding the survey records; the first sheet when unset.
    pub primary_sheet: Option<String>,

    /// Support filter value → auxiliary sheet shown when it is selected.
    pub auxiliary_sheets: BTreeMap<String, String>,

    pub mandatory_columns: Vec<String>,
    pub support_columns: Vec<String>,
    pub geographic_column: Option<String>,

    /// Value substitutions applied right after load.
    pub recoding: Vec<Recoding>,

    pub unknown_columns: UnknownColumnPolicy,

    /// Argon2 PHC string of the operator password.
    pub password_hash: Option<String>,

    pub bind: String,
    pub static_dir: String,
    pub session_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Config {
            source: DEFAULT_SOURCE.to_string(),
            primary_sheet: None,
            auxiliary_sheets: [("Job/Support", "JobSupport"), ("Health", "Health support")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            mandatory_columns: strings(&[
                "farmer_id",
                "Priority",
                "farmers_name_marathi",
                "village_marathi",
                "taluka_marathi",
                "informant_name",
                "informant_mobile",
            ]),
            support_columns: strings(&["Health", "AgriEqui", "Job/Support"]),
            geographic_column: Some("taluka_marathi".to_string()),
            recoding: vec![Recoding::priority_labels()],
            unknown_columns: UnknownColumnPolicy::Reject,
            password_hash: None,
            bind: DEFAULT_BIND.to_string(),
            static_dir: "static".to_string(),
            session_hours: 24,
        }
    }
}

impl Config {
    /// Parse a configuration file
    ///
    /// # Arguments
    /// * `path` - JSON file to read
    ///
    /// # Returns
    /// * `Result<Config>` - The parsed configuration, defaults filling gaps
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Resolve configuration the way the server binary does
    ///
    /// Uses the file named by `SURVEY_EXPLORER_CONFIG` (or `explorer.json` when
    /// it exists), then applies the `SURVEY_EXPLORER_SOURCE`,
    /// `SURVEY_EXPLORER_BIND` and `SURVEY_EXPLORER_PASSWORD_HASH` overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(ENV_CONFIG) {
            Ok(path) => {
                info!("loading configuration from {}", path);
                Config::load(path)?
            }
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("loading configuration from {}", DEFAULT_CONFIG_FILE);
                Config::load(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => {
                warn!("no configuration file found, using defaults");
                Config::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment-style overrides from any key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(source) = lookup(ENV_SOURCE) {
            self.source = source;
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.bind = bind;
        }
        if let Some(hash) = lookup(ENV_PASSWORD_HASH) {
            self.password_hash = Some(hash);
        }
    }

    /// How long a login stays valid
    ///
    /// # Returns
    /// * `Result<Duration>` - `session_hours` as a duration, or `InvalidSetting`
    ///   when it is zero or longer than a year
    pub fn session_lifetime(&self) -> Result<Duration> {
        let invalid = |reason: &str| ExplorerError::InvalidSetting {
            field: "session_hours",
            reason: reason.to_string(),
        };

        if self.session_hours == 0 {
            return Err(invalid("must be at least 1"));
        }
        if self.session_hours > MAX_SESSION_HOURS {
            return Err(invalid(&format!("must be at most {}", MAX_SESSION_HOURS)));
        }
        self.session_hours
            .checked_mul(60 * 60)
            .map(Duration::from_secs)
            .ok_or_else(|| invalid("out of range"))
    }

    pub fn roles(&self) -> ColumnRoles {
        ColumnRoles {
            mandatory: self.mandatory_columns.clone(),
            support: self.support_columns.clone(),
            geographic: self.geographic_column.clone(),
        }
    }
}
