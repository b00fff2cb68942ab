//! Course identifiers and campuses
//!
//! Course codes are normalized `"SUBJ NNN"` strings extracted from free
//! text; campuses are a closed enum with deterministic mappings from raw
//! room/section fields and campus codes.

use crate::error::{ForecastError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subject prefix tracked by default
pub const DEFAULT_SUBJECT: &str = "FOUN";

/// Room code marking an online section
const ONLINE_ROOM: &str = "OLNOW";

// ============================================================================
// Course codes
// ============================================================================

/// Normalized course identifier, e.g. `"FOUN 110"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CourseCode(String);

impl CourseCode {
    /// Build from an already-normalized subject and three-digit number
    pub fn new(subject: &str, number: &str) -> CourseCode {
        CourseCode(format!("{} {}", subject.to_ascii_uppercase(), number))
    }

    /// Wrap a string that is already in canonical form
    pub fn from_normalized(code: impl Into<String>) -> CourseCode {
        CourseCode(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compiled course-code extraction pattern for one subject prefix
///
/// Matches the subject with optional spacing before a three-digit number,
/// case-insensitively, so "FOUN110", "foun 110", and "Foun  110" all
/// normalize to `"FOUN 110"`.
#[derive(Debug, Clone)]
pub struct CoursePattern {
    subject: String,
    regex: Regex,
}

impl CoursePattern {
    pub fn new(subject: &str) -> Result<CoursePattern> {
        let subject = subject.trim().to_ascii_uppercase();
        if subject.is_empty() {
            return Err(ForecastError::InvalidParameter {
                name: "subject".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let pattern = format!(r"(?i)\b{}\s*(\d{{3}})\b", regex::escape(&subject));
        let regex = Regex::new(&pattern).map_err(|e| ForecastError::InvalidParameter {
            name: "subject".to_string(),
            reason: e.to_string(),
        })?;
        Ok(CoursePattern { subject, regex })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Extract all course codes from free text, deduplicated in order
    pub fn extract(&self, text: &str) -> Vec<CourseCode> {
        let mut codes = Vec::new();
        for captures in self.regex.captures_iter(text) {
            if let Some(number) = captures.get(1) {
                let code = CourseCode::new(&self.subject, number.as_str());
                if !codes.contains(&code) {
                    codes.push(code);
                }
            }
        }
        codes
    }

    /// Whether a normalized course code carries this pattern's subject
    pub fn matches_subject(&self, code: &str) -> bool {
        code.to_ascii_uppercase()
            .starts_with(&format!("{} ", self.subject))
    }
}

// ============================================================================
// Campuses
// ============================================================================

/// Campus offering sections
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Campus {
    Savannah,
    #[serde(rename = "SCADnow")]
    ScadNow,
}

impl Campus {
    /// Both campuses, in output order
    pub fn all() -> [Campus; 2] {
        [Campus::Savannah, Campus::ScadNow]
    }

    /// Campus from a raw room and section pair
    ///
    /// The online campus is marked by the `OLNOW` room code or a section
    /// number starting with `N`; everything else is residential.
    pub fn from_room_and_section(room: &str, section: &str) -> Campus {
        let room = room.trim().to_ascii_uppercase();
        let section = section.trim().to_ascii_uppercase();
        if room == ONLINE_ROOM || section.starts_with('N') {
            Campus::ScadNow
        } else {
            Campus::Savannah
        }
    }

    /// Campus from a master-schedule campus code (`SAV` / `NOW`)
    pub fn from_code(code: &str) -> Option<Campus> {
        match code.trim().to_ascii_uppercase().as_str() {
            "SAV" | "SAVANNAH" => Some(Campus::Savannah),
            "NOW" | "SCADNOW" => Some(Campus::ScadNow),
            _ => None,
        }
    }

    /// Campus from a normalized sequencing-map token
    pub fn from_scope_token(token: &str) -> Option<Campus> {
        match token {
            "SAVANNAH" => Some(Campus::Savannah),
            "SCADNOW" | "SCAD NOW" => Some(Campus::ScadNow),
            _ => None,
        }
    }

    /// Display name used in forecast output
    pub fn display_name(&self) -> &'static str {
        match self {
            Campus::Savannah => "Savannah",
            Campus::ScadNow => "SCADnow",
        }
    }
}

impl fmt::Display for Campus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Which campuses a sequencing-map row applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampusScope {
    /// Applies to every campus
    General,
    /// Applies to the listed campuses only
    Named(Vec<Campus>),
}

impl CampusScope {
    /// Concrete campuses the scope covers
    pub fn expand(&self) -> Vec<Campus> {
        match self {
            CampusScope::General => Campus::all().to_vec(),
            CampusScope::Named(campuses) => campuses.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CampusScope::Named(campuses) if campuses.is_empty())
    }
}

/// Result of parsing a raw campus cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampusParse {
    pub scope: CampusScope,
    /// Tokens that matched no known campus
    pub unknown_tokens: Vec<String>,
}

/// Parse the campus-list cell of a sequencing-map row
///
/// Normalizes to uppercase with collapsed whitespace, expands `&`,
/// strips sequencing-guide title noise, then either short-circuits on
/// `GENERAL` or splits the remainder on `|`.
pub fn parse_campus_scope(cell: &str) -> CampusParse {
    let mut text = cell.to_ascii_uppercase().replace('&', " AND ");
    text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    text = text.replace("MAJOR COURSE SEQUENCING GUIDE", "");
    let text = text.trim();

    if text.contains("GENERAL") {
        return CampusParse {
            scope: CampusScope::General,
            unknown_tokens: Vec::new(),
        };
    }

    let mut campuses = Vec::new();
    let mut unknown_tokens = Vec::new();
    for token in text.split('|') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match Campus::from_scope_token(token) {
            Some(campus) => {
                if !campuses.contains(&campus) {
                    campuses.push(campus);
                }
            }
            None => unknown_tokens.push(token.to_string()),
        }
    }

    CampusParse {
        scope: CampusScope::Named(campuses),
        unknown_tokens,
    }
}
