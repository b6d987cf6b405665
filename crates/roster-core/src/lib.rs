//! Typed alumni records and the pure aggregation rules shared by the report
//! engine and the interactive roster UI: branch grouping, the month-token
//! heuristic, category tallies, and Pareto series construction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sentinel group label for records without a branch.
pub const UNKNOWN_BRANCH: &str = "Unknown Branch";

/// Fallback display name for records without a name.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum RecordError {
    #[error("graduate record {id} has no roll number")]
    MissingRollNo { id: i64 },
    #[error("{entity} record has no roll number")]
    MissingEntryRollNo { entity: &'static str },
}

/// One alumnus row as stored in the `graduates` table.
///
/// All profile fields are optional; the editing surface never enforces
/// completeness. Photos are raw binary payloads exactly as uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graduate {
    pub id: i64,
    pub roll_no: String,
    pub name: Option<String>,
    pub branch: Option<String>,
    pub hostel: Option<String>,
    pub dob: Option<String>,
    pub wad: Option<String>,
    pub spouse_name: Option<String>,
    pub lives_in: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_1966: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_current: Option<Vec<u8>>,
}

impl Graduate {
    /// Validate the invariants the store promises to every consumer.
    ///
    /// # Errors
    /// Returns an error when the unique roll number is missing or blank.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.roll_no.trim().is_empty() {
            return Err(RecordError::MissingRollNo { id: self.id });
        }
        Ok(())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        non_empty(&self.name).unwrap_or(UNKNOWN_NAME)
    }

    #[must_use]
    pub fn branch_label(&self) -> &str {
        non_empty(&self.branch).unwrap_or(UNKNOWN_BRANCH)
    }

    /// Comma-joined city/state/country, or `None` when all three are absent.
    #[must_use]
    pub fn location_line(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.lives_in, &self.state, &self.country]
            .into_iter()
            .filter_map(non_empty)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// One deceased alumnus, shown in the in-memoriam document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoriamEntry {
    pub roll_no: String,
    pub name: Option<String>,
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
}

impl MemoriamEntry {
    /// # Errors
    /// Returns an error when the roll number is missing or blank.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.roll_no.trim().is_empty() {
            return Err(RecordError::MissingEntryRollNo { entity: "memoriam" });
        }
        Ok(())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        non_empty(&self.name).unwrap_or(UNKNOWN_NAME)
    }
}

/// One alumnus the class has lost touch with, shown in the missing-contacts
/// document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntry {
    pub roll_no: String,
    pub name: Option<String>,
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<u8>>,
}

impl TrackedEntry {
    /// # Errors
    /// Returns an error when the roll number is missing or blank.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.roll_no.trim().is_empty() {
            return Err(RecordError::MissingEntryRollNo { entity: "tracked" });
        }
        Ok(())
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        non_empty(&self.name).unwrap_or(UNKNOWN_NAME)
    }
}

/// Treat `None` and whitespace-only strings the same way the editing forms
/// do: as an absent field.
#[must_use]
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Extract the month token from a stored date string.
///
/// The roster stores dates as `"D-Mon"` / `"DD-Mon"` (e.g. `"12-Jun"`), so
/// the token is defined as the trailing three characters. Strings shorter
/// than three characters yield no token; a string of exactly three characters
/// is returned whole. This heuristic is fixed for compatibility with the
/// historical data and silently mis-parses any other date format (ISO dates
/// included) — callers must not feed it normalized dates.
#[must_use]
pub fn month_token(date: &str) -> Option<&str> {
    let mut indices = date.char_indices().rev();
    // nth(2) from the back lands on the third-to-last character.
    let (start, _) = indices.nth(2)?;
    Some(&date[start..])
}

/// Group graduates by branch label, alphabetically, preserving the incoming
/// order within each group. Records without a branch fall under
/// [`UNKNOWN_BRANCH`].
#[must_use]
pub fn group_by_branch(records: &[Graduate]) -> BTreeMap<String, Vec<&Graduate>> {
    let mut groups: BTreeMap<String, Vec<&Graduate>> = BTreeMap::new();
    for record in records {
        groups.entry(record.branch_label().to_string()).or_default().push(record);
    }
    groups
}

/// Count occurrences of one optional categorical field across the roster.
/// Rows where the extractor yields nothing are excluded from the tally,
/// mirroring how the statistics section has always treated blanks.
#[must_use]
pub fn tally_by<'a, F>(records: &'a [Graduate], extract: F) -> BTreeMap<String, u64>
where
    F: Fn(&'a Graduate) -> Option<&'a str>,
{
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        if let Some(value) = extract(record) {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

#[must_use]
pub fn branch_tally(records: &[Graduate]) -> BTreeMap<String, u64> {
    tally_by(records, |r| non_empty(&r.branch))
}

#[must_use]
pub fn hostel_tally(records: &[Graduate]) -> BTreeMap<String, u64> {
    tally_by(records, |r| non_empty(&r.hostel))
}

#[must_use]
pub fn country_tally(records: &[Graduate]) -> BTreeMap<String, u64> {
    tally_by(records, |r| non_empty(&r.country))
}

#[must_use]
pub fn state_tally(records: &[Graduate]) -> BTreeMap<String, u64> {
    tally_by(records, |r| non_empty(&r.state))
}

#[must_use]
pub fn birth_month_tally(records: &[Graduate]) -> BTreeMap<String, u64> {
    tally_by(records, |r| non_empty(&r.dob).and_then(month_token))
}

#[must_use]
pub fn anniversary_month_tally(records: &[Graduate]) -> BTreeMap<String, u64> {
    tally_by(records, |r| non_empty(&r.wad).and_then(month_token))
}

/// Categories ranked by descending count with an aligned cumulative
/// percentage-of-total series.
///
/// The static report renderer draws only the bar series; the interactive UI
/// overlays `cumulative_pct` as a line on a secondary axis fixed to
/// `0..=`[`ParetoSeries::UI_SECONDARY_AXIS_MAX`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParetoSeries {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
    pub cumulative_pct: Vec<f64>,
}

impl ParetoSeries {
    /// Upper bound of the secondary (cumulative) axis in the UI variant.
    pub const UI_SECONDARY_AXIS_MAX: f64 = 110.0;

    /// Rank categories by descending count (ties broken by label so equal
    /// counts order deterministically) and accumulate the running
    /// percentage of total. Returns `None` when the tally is empty or all
    /// counts are zero — the caller renders a "no data" notice instead of
    /// dividing by zero.
    #[must_use]
    pub fn from_counts(counts: &BTreeMap<String, u64>) -> Option<Self> {
        let total: u64 = counts.values().sum();
        if total == 0 {
            return None;
        }

        let mut entries: Vec<(&str, u64)> =
            counts.iter().map(|(label, &count)| (label.as_str(), count)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut running: u64 = 0;
        let mut labels = Vec::with_capacity(entries.len());
        let mut sorted_counts = Vec::with_capacity(entries.len());
        let mut cumulative_pct = Vec::with_capacity(entries.len());
        #[allow(clippy::cast_precision_loss)]
        for (label, count) in entries {
            running += count;
            labels.push(label.to_string());
            sorted_counts.push(count);
            cumulative_pct.push(running as f64 / total as f64 * 100.0);
        }

        Some(Self { labels, counts: sorted_counts, cumulative_pct })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn grad(id: i64, roll: &str, name: Option<&str>, branch: Option<&str>) -> Graduate {
        Graduate {
            id,
            roll_no: roll.to_string(),
            name: name.map(str::to_string),
            branch: branch.map(str::to_string),
            ..Graduate::default()
        }
    }

    #[test]
    fn month_token_extracts_trailing_three_characters() {
        assert_eq!(month_token("12-Jun"), Some("Jun"));
        assert_eq!(month_token("5-May"), Some("May"));
    }

    #[test]
    fn month_token_rejects_short_strings() {
        assert_eq!(month_token(""), None);
        assert_eq!(month_token("5"), None);
        assert_eq!(month_token("5-"), None);
    }

    #[test]
    fn month_token_returns_three_character_strings_whole() {
        // Known heuristic limitation: a bare 3-char string is its own token.
        assert_eq!(month_token("5-M"), Some("5-M"));
        assert_eq!(month_token("Jun"), Some("Jun"));
    }

    #[test]
    fn month_token_handles_multibyte_input() {
        assert_eq!(month_token("1-Décembre"), Some("bre"));
        assert_eq!(month_token("éé"), None);
    }

    #[test]
    fn grouping_orders_branches_alphabetically_and_preserves_row_order() {
        let records = vec![
            grad(1, "R1", Some("A"), Some("CE")),
            grad(2, "R2", Some("B"), Some("EE")),
            grad(3, "R3", Some("C"), Some("CE")),
        ];
        let groups = group_by_branch(&records);
        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, ["CE", "EE"]);
        let ce: Vec<&str> = groups["CE"].iter().map(|g| g.display_name()).collect();
        assert_eq!(ce, ["A", "C"]);
    }

    #[test]
    fn missing_branch_falls_under_unknown_sentinel() {
        let records = vec![grad(1, "R1", None, None), grad(2, "R2", None, Some("  "))];
        let groups = group_by_branch(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[UNKNOWN_BRANCH].len(), 2);
    }

    #[test]
    fn nameless_records_render_as_unknown() {
        assert_eq!(grad(1, "R1", None, None).display_name(), UNKNOWN_NAME);
        assert_eq!(grad(1, "R1", Some(""), None).display_name(), UNKNOWN_NAME);
    }

    #[test]
    fn location_line_joins_present_parts_only() {
        let mut g = grad(1, "R1", None, None);
        assert_eq!(g.location_line(), None);
        g.lives_in = Some("Chennai".to_string());
        g.country = Some("India".to_string());
        assert_eq!(g.location_line().as_deref(), Some("Chennai, India"));
        g.state = Some("TN".to_string());
        assert_eq!(g.location_line().as_deref(), Some("Chennai, TN, India"));
    }

    #[test]
    fn validate_requires_roll_no() {
        assert_eq!(
            grad(7, "  ", None, None).validate(),
            Err(RecordError::MissingRollNo { id: 7 })
        );
        assert_eq!(grad(7, "EE123", None, None).validate(), Ok(()));
    }

    #[test]
    fn tallies_skip_blank_values() {
        let records = vec![
            grad(1, "R1", None, Some("CE")),
            grad(2, "R2", None, Some("CE")),
            grad(3, "R3", None, None),
        ];
        let tally = branch_tally(&records);
        assert_eq!(tally.len(), 1);
        assert_eq!(tally["CE"], 2);
    }

    #[test]
    fn month_tallies_use_the_heuristic() {
        let mut a = grad(1, "R1", None, None);
        a.dob = Some("12-Jun".to_string());
        let mut b = grad(2, "R2", None, None);
        b.dob = Some("3-Jun".to_string());
        let mut c = grad(3, "R3", None, None);
        c.dob = Some("5".to_string());
        let tally = birth_month_tally(&[a, b, c]);
        assert_eq!(tally.len(), 1);
        assert_eq!(tally["Jun"], 2);
    }

    #[test]
    fn pareto_sorts_descending_with_label_tiebreak() {
        let mut counts = BTreeMap::new();
        counts.insert("CE".to_string(), 3);
        counts.insert("EE".to_string(), 5);
        counts.insert("ME".to_string(), 3);
        let series = ParetoSeries::from_counts(&counts).unwrap();
        assert_eq!(series.labels, ["EE", "CE", "ME"]);
        assert_eq!(series.counts, [5, 3, 3]);
        assert_eq!(series.max_count(), 5);
    }

    #[test]
    fn pareto_cumulative_ends_at_one_hundred() {
        let mut counts = BTreeMap::new();
        counts.insert("A".to_string(), 1);
        counts.insert("B".to_string(), 3);
        let series = ParetoSeries::from_counts(&counts).unwrap();
        assert!((series.cumulative_pct[0] - 75.0).abs() < 1e-9);
        assert!((series.cumulative_pct[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn pareto_rejects_empty_and_all_zero_input() {
        assert_eq!(ParetoSeries::from_counts(&BTreeMap::new()), None);
        let mut zeros = BTreeMap::new();
        zeros.insert("A".to_string(), 0);
        assert_eq!(ParetoSeries::from_counts(&zeros), None);
    }

    proptest! {
        #[test]
        fn pareto_cumulative_is_monotone_and_terminal(
            entries in proptest::collection::btree_map("[A-Z]{1,6}", 0_u64..500, 0..24)
        ) {
            match ParetoSeries::from_counts(&entries) {
                None => prop_assert_eq!(entries.values().sum::<u64>(), 0),
                Some(series) => {
                    for pair in series.cumulative_pct.windows(2) {
                        prop_assert!(pair[1] >= pair[0] - 1e-9);
                    }
                    let last = series.cumulative_pct.last().copied().unwrap_or(0.0);
                    prop_assert!((last - 100.0).abs() < 1e-6);
                    for window in series.counts.windows(2) {
                        prop_assert!(window[0] >= window[1]);
                    }
                }
            }
        }
    }
}
