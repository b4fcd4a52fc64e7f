use anyhow::Context;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::db;

pub const SCHOOL_SETTINGS_KEY: &str = "school.context";
pub const SCHOOL_FILE_NAME: &str = "school.json";
pub const WORKSPACE_ENV: &str = "TABULATORD_WORKSPACE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Display context for generated sheets. Loaded per request and passed down
/// explicitly; nothing here is cached in the process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchoolConfig {
    pub school_name: String,
    pub academic_year: String,
    pub profile: Option<Profile>,
}

impl SchoolConfig {
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let Some(saved) = db::settings_get_json(conn, SCHOOL_SETTINGS_KEY)? else {
            return Ok(Self::default());
        };
        // Malformed historical values fall back to defaults rather than blocking reports.
        Ok(serde_json::from_value(saved).unwrap_or_default())
    }

    pub fn save(&self, conn: &Connection) -> anyhow::Result<()> {
        let v = serde_json::to_value(self)?;
        db::settings_set_json(conn, SCHOOL_SETTINGS_KEY, &v)
    }

    /// Applies a camelCase patch object. Unknown keys are rejected.
    pub fn apply_patch(&mut self, patch: &serde_json::Map<String, Value>) -> Result<(), String> {
        for (k, v) in patch {
            match k.as_str() {
                "schoolName" => {
                    let Some(s) = v.as_str() else {
                        return Err("schoolName must be a string".to_string());
                    };
                    self.school_name = s.trim().to_string();
                }
                "academicYear" => {
                    let Some(s) = v.as_str() else {
                        return Err("academicYear must be a string".to_string());
                    };
                    self.academic_year = s.trim().to_string();
                }
                "profile" => {
                    if v.is_null() {
                        self.profile = None;
                        continue;
                    }
                    let profile: Profile = serde_json::from_value(v.clone())
                        .map_err(|e| format!("invalid profile: {}", e))?;
                    self.profile = Some(profile);
                }
                _ => return Err(format!("unknown school field: {}", k)),
            }
        }
        Ok(())
    }
}

/// Reads `school.json` from the workspace folder, if present.
pub fn read_school_file(workspace: &Path) -> anyhow::Result<Option<SchoolConfig>> {
    let path = workspace.join(SCHOOL_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
    let cfg = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.to_string_lossy()))?;
    Ok(Some(cfg))
}
