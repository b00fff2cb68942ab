//! Academic term calendar
//!
//! Maps between human term labels ("Spring 2026"), 6-digit term codes
//! (`YYYYQQ`), and positions in the fixed quarter cycle
//! Fall → Winter → Spring → Summer. The academic year shifts by one for
//! Fall: Fall 2025 belongs to academic year 2026 and encodes as `202610`.
//!
//! ## Example
//!
//! ```rust
//! use seatcast_core::calendar::resolve_term_info;
//!
//! let info = resolve_term_info("Winter 2026").unwrap();
//! assert_eq!(info.farther.term_code.to_string(), "202540");
//! ```

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Quarter digit pairs used in term codes
const QUARTER_CODES: [(Quarter, u32); 4] = [
    (Quarter::Fall, 10),
    (Quarter::Winter, 20),
    (Quarter::Spring, 30),
    (Quarter::Summer, 40),
];

/// One quarter of the academic calendar
///
/// Variant order matches chronological order within an academic year,
/// so `Quarter` sorts the same way term codes do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Fall,
    Winter,
    Spring,
    Summer,
}

impl Quarter {
    /// Two-digit code used in the `YYYYQQ` term encoding
    pub fn code(&self) -> u32 {
        QUARTER_CODES
            .iter()
            .find(|(q, _)| q == self)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    /// Quarter for a two-digit term-code suffix
    pub fn from_code(code: u32) -> Option<Quarter> {
        QUARTER_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(q, _)| *q)
    }

    /// Canonical display name
    pub fn name(&self) -> &'static str {
        match self {
            Quarter::Fall => "Fall",
            Quarter::Winter => "Winter",
            Quarter::Spring => "Spring",
            Quarter::Summer => "Summer",
        }
    }

    /// Chronologically preceding quarter
    pub fn previous(&self) -> Quarter {
        match self {
            Quarter::Fall => Quarter::Summer,
            Quarter::Winter => Quarter::Fall,
            Quarter::Spring => Quarter::Winter,
            Quarter::Summer => Quarter::Spring,
        }
    }

    /// All four quarters in chronological order
    pub fn all() -> [Quarter; 4] {
        [
            Quarter::Fall,
            Quarter::Winter,
            Quarter::Spring,
            Quarter::Summer,
        ]
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quarter {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fall" => Ok(Quarter::Fall),
            "winter" => Ok(Quarter::Winter),
            "spring" => Ok(Quarter::Spring),
            "summer" => Ok(Quarter::Summer),
            _ => Err(ForecastError::InvalidTerm {
                input: s.to_string(),
                reason: "unknown quarter name".to_string(),
            }),
        }
    }
}

/// 6-digit academic term code `YYYYQQ`
///
/// `YYYY` is the academic year and `QQ` one of 10/20/30/40. Numeric order
/// equals chronological order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TermCode(u32);

impl TermCode {
    /// Term code for a quarter in a given calendar year
    ///
    /// Applies the Fall shift: Fall of calendar year Y belongs to academic
    /// year Y + 1.
    pub fn for_quarter(quarter: Quarter, calendar_year: i32) -> TermCode {
        let academic_year = match quarter {
            Quarter::Fall => calendar_year + 1,
            _ => calendar_year,
        };
        TermCode(academic_year as u32 * 100 + quarter.code())
    }

    /// Parse a term code from its 6-digit string form
    pub fn parse(s: &str) -> Result<TermCode> {
        let trimmed = s.trim();
        if trimmed.len() != 6 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ForecastError::InvalidTerm {
                input: s.to_string(),
                reason: "term code must be exactly 6 digits".to_string(),
            });
        }
        let value: u32 = trimmed.parse().map_err(|_| ForecastError::InvalidTerm {
            input: s.to_string(),
            reason: "term code must be exactly 6 digits".to_string(),
        })?;
        if Quarter::from_code(value % 100).is_none() {
            return Err(ForecastError::InvalidTerm {
                input: s.to_string(),
                reason: "quarter digits must be one of 10, 20, 30, 40".to_string(),
            });
        }
        Ok(TermCode(value))
    }

    /// Academic year component (`YYYY`)
    pub fn academic_year(&self) -> i32 {
        (self.0 / 100) as i32
    }

    /// Quarter component
    pub fn quarter(&self) -> Quarter {
        // Constructors guarantee a valid suffix
        Quarter::from_code(self.0 % 100).unwrap_or(Quarter::Fall)
    }

    /// Calendar year in which the quarter actually starts
    pub fn calendar_year(&self) -> i32 {
        match self.quarter() {
            Quarter::Fall => self.academic_year() - 1,
            _ => self.academic_year(),
        }
    }

    /// Human label, e.g. `"Fall 2025"` for `202610`
    pub fn label(&self) -> String {
        format!("{} {}", self.quarter(), self.calendar_year())
    }

    /// Feeder term codes (closer, farther) for this term
    pub fn feeders(&self) -> (TermCode, TermCode) {
        let (q1, y1) = step_back(self.quarter(), self.calendar_year());
        let (q2, y2) = step_back(q1, y1);
        (TermCode::for_quarter(q1, y1), TermCode::for_quarter(q2, y2))
    }

    /// The chronologically next term code
    ///
    /// In academic-year encoding only the Summer → Fall step increments
    /// the year prefix.
    pub fn next(&self) -> TermCode {
        match self.quarter() {
            Quarter::Summer => TermCode((self.academic_year() as u32 + 1) * 100 + 10),
            quarter => TermCode(self.academic_year() as u32 * 100 + quarter.code() + 10),
        }
    }
}

impl fmt::Display for TermCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl FromStr for TermCode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        TermCode::parse(s)
    }
}

/// One feeder quarter of a forecast target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeederTerm {
    pub quarter: Quarter,
    pub term_code: TermCode,
    /// Quarters back from the target (1 or 2)
    pub distance: u8,
}

/// A target term together with its two feeder terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInfo {
    pub target_quarter: Quarter,
    pub target_code: TermCode,
    pub closer: FeederTerm,
    pub farther: FeederTerm,
}

/// Step one quarter back chronologically
///
/// Only the Winter → Fall step crosses a calendar-year boundary.
fn step_back(quarter: Quarter, calendar_year: i32) -> (Quarter, i32) {
    let prev = quarter.previous();
    let year = match quarter {
        Quarter::Winter => calendar_year - 1,
        _ => calendar_year,
    };
    (prev, year)
}

/// Parse a `"Quarter YYYY"` label into its parts
pub fn parse_term_label(label: &str) -> Result<(Quarter, i32)> {
    let tokens: Vec<&str> = label.split_whitespace().collect();
    if tokens.len() != 2 {
        return Err(ForecastError::InvalidTerm {
            input: label.to_string(),
            reason: "expected '<Quarter> <Year>'".to_string(),
        });
    }
    let quarter = tokens[0].parse::<Quarter>()?;
    let year: i32 = tokens[1].parse().map_err(|_| ForecastError::InvalidTerm {
        input: label.to_string(),
        reason: "year must be a number".to_string(),
    })?;
    if !(1000..=9999).contains(&year) {
        return Err(ForecastError::InvalidTerm {
            input: label.to_string(),
            reason: "year must have four digits".to_string(),
        });
    }
    Ok((quarter, year))
}

/// Term code for a quarter/year label pair
pub fn term_code_for(quarter: Quarter, calendar_year: i32) -> TermCode {
    TermCode::for_quarter(quarter, calendar_year)
}

/// Human label for a term code string, failing on malformed codes
pub fn term_code_to_label(code: &str) -> Result<String> {
    Ok(TermCode::parse(code)?.label())
}

/// Resolve a target term label into the full feeder picture
///
/// Each quarter has its own feeder-year rule; stepping the cycle backwards
/// once and twice reproduces all four (e.g. Winter's farther feeder is the
/// previous calendar year's Summer).
pub fn resolve_term_info(label: &str) -> Result<TermInfo> {
    let (target_quarter, calendar_year) = parse_term_label(label)?;
    let target_code = TermCode::for_quarter(target_quarter, calendar_year);

    let (closer_q, closer_y) = step_back(target_quarter, calendar_year);
    let (farther_q, farther_y) = step_back(closer_q, closer_y);

    Ok(TermInfo {
        target_quarter,
        target_code,
        closer: FeederTerm {
            quarter: closer_q,
            term_code: TermCode::for_quarter(closer_q, closer_y),
            distance: 1,
        },
        farther: FeederTerm {
            quarter: farther_q,
            term_code: TermCode::for_quarter(farther_q, farther_y),
            distance: 2,
        },
    })
}

/// Sorted, deduplicated list of term codes present in a history
pub fn available_terms(codes: &[TermCode]) -> Vec<TermCode> {
    codes.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Terms whose both feeder term codes exist in the history
///
/// Considers every available term plus candidate future terms for the
/// highest academic year seen and the year after, so the next unscheduled
/// quarter shows up as soon as its feeders are on file.
pub fn forecastable_terms(available: &[TermCode]) -> Vec<TermCode> {
    let present: BTreeSet<TermCode> = available.iter().copied().collect();
    let Some(max_code) = present.iter().next_back().copied() else {
        return Vec::new();
    };

    let mut candidates: BTreeSet<TermCode> = present.clone();
    for academic_year in [max_code.academic_year(), max_code.academic_year() + 1] {
        for quarter in Quarter::all() {
            let calendar_year = match quarter {
                Quarter::Fall => academic_year - 1,
                _ => academic_year,
            };
            candidates.insert(TermCode::for_quarter(quarter, calendar_year));
        }
    }

    candidates
        .into_iter()
        .filter(|code| {
            let (closer, farther) = code.feeders();
            present.contains(&closer) && present.contains(&farther)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fall_year_shift() {
        assert_eq!(TermCode::for_quarter(Quarter::Fall, 2025).to_string(), "202610");
        assert_eq!(TermCode::for_quarter(Quarter::Winter, 2026).to_string(), "202620");
        assert_eq!(TermCode::for_quarter(Quarter::Spring, 2026).to_string(), "202630");
        assert_eq!(TermCode::for_quarter(Quarter::Summer, 2026).to_string(), "202640");
    }

    #[test]
    fn test_label_round_trip_all_quarters_and_years() {
        for year in 2020..=2030 {
            for quarter in Quarter::all() {
                let code = TermCode::for_quarter(quarter, year);
                let label = code.label();
                let (parsed_quarter, parsed_year) = parse_term_label(&label).unwrap();
                assert_eq!(parsed_quarter, quarter);
                assert_eq!(parsed_year, year);
                assert_eq!(TermCode::for_quarter(parsed_quarter, parsed_year), code);

                let reparsed = TermCode::parse(&code.to_string()).unwrap();
                assert_eq!(reparsed.label(), label);
            }
        }
    }

    #[test]
    fn test_winter_farther_feeder_crosses_year() {
        let info = resolve_term_info("Winter 2026").unwrap();
        assert_eq!(info.farther.quarter, Quarter::Summer);
        assert_eq!(info.farther.term_code.to_string(), "202540");
        assert_eq!(info.farther.distance, 2);
    }

    #[test]
    fn test_feeder_table_all_quarters() {
        // (target, closer quarter, closer code, farther quarter, farther code)
        let table = [
            ("Fall 2025", Quarter::Summer, "202540", Quarter::Spring, "202530"),
            ("Winter 2026", Quarter::Fall, "202610", Quarter::Summer, "202540"),
            ("Spring 2026", Quarter::Winter, "202620", Quarter::Fall, "202610"),
            ("Summer 2026", Quarter::Spring, "202630", Quarter::Winter, "202620"),
        ];

        for (label, closer_q, closer_code, farther_q, farther_code) in table {
            let info = resolve_term_info(label).unwrap();
            assert_eq!(info.closer.quarter, closer_q, "{}", label);
            assert_eq!(info.closer.term_code.to_string(), closer_code, "{}", label);
            assert_eq!(info.closer.distance, 1);
            assert_eq!(info.farther.quarter, farther_q, "{}", label);
            assert_eq!(info.farther.term_code.to_string(), farther_code, "{}", label);
            assert_eq!(info.farther.distance, 2);
        }
    }

    #[test]
    fn test_malformed_labels_rejected() {
        assert!(resolve_term_info("Autumn 2026").is_err());
        assert!(resolve_term_info("Spring").is_err());
        assert!(resolve_term_info("Spring 2026 extra").is_err());
        assert!(resolve_term_info("Spring twenty-six").is_err());
        assert!(resolve_term_info("Spring 26").is_err());
    }

    #[test]
    fn test_malformed_codes_rejected() {
        assert!(TermCode::parse("20261").is_err());
        assert!(TermCode::parse("2026100").is_err());
        assert!(TermCode::parse("202650").is_err());
        assert!(TermCode::parse("2026ab").is_err());
        assert!(term_code_to_label("202615").is_err());
    }

    #[test]
    fn test_term_code_label() {
        assert_eq!(term_code_to_label("202610").unwrap(), "Fall 2025");
        assert_eq!(term_code_to_label("202540").unwrap(), "Summer 2025");
    }

    #[test]
    fn test_next_walks_the_cycle() {
        let mut code = TermCode::parse("202610").unwrap();
        let mut seen = vec![code.to_string()];
        for _ in 0..4 {
            code = code.next();
            seen.push(code.to_string());
        }
        assert_eq!(seen, vec!["202610", "202620", "202630", "202640", "202710"]);
    }

    #[test]
    fn test_next_inverts_feeders() {
        for label in ["Fall 2025", "Winter 2026", "Spring 2026", "Summer 2026"] {
            let info = resolve_term_info(label).unwrap();
            assert_eq!(info.closer.term_code.next(), info.target_code, "{}", label);
        }
    }

    #[test]
    fn test_term_codes_order_chronologically() {
        let summer_2025 = TermCode::parse("202540").unwrap();
        let fall_2025 = TermCode::parse("202610").unwrap();
        let winter_2026 = TermCode::parse("202620").unwrap();
        assert!(summer_2025 < fall_2025);
        assert!(fall_2025 < winter_2026);
    }

    #[test]
    fn test_available_terms_sorted_dedup() {
        let codes = [
            TermCode::parse("202620").unwrap(),
            TermCode::parse("202540").unwrap(),
            TermCode::parse("202620").unwrap(),
        ];
        let available = available_terms(&codes);
        assert_eq!(
            available.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            vec!["202540", "202620"]
        );
    }

    #[test]
    fn test_forecastable_requires_both_feeders() {
        // Fall 2025 and Summer 2025 on file: Winter 2026 (feeders Fall 2025
        // and Summer 2025) is forecastable even though not yet scheduled.
        let available = [
            TermCode::parse("202540").unwrap(),
            TermCode::parse("202610").unwrap(),
        ];
        let forecastable = forecastable_terms(&available);
        let codes: Vec<String> = forecastable.iter().map(|c| c.to_string()).collect();
        assert!(codes.contains(&"202620".to_string()));
        // Spring 2026 needs Winter 2026, which is absent
        assert!(!codes.contains(&"202630".to_string()));
    }

    #[test]
    fn test_forecastable_empty_history() {
        assert!(forecastable_terms(&[]).is_empty());
    }
}
