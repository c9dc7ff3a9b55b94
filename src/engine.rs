//! The grouping and pagination pipeline behind the match view.
//!
//! Everything here is a pure function over the source records plus a row
//! mask (`Vec<usize>` of indices into the record slice). The source records
//! are never touched; filter/sort/group only derive new masks, the same way
//! a table view maps visible rows back to data rows. No function in this
//! module panics for any well-typed input: empty inputs, absent fields and
//! out-of-range pages all produce empty or neutral results.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::trace;

use crate::domain::DEFAULT_PAGE_SIZE;
use crate::record::{Field, MatchRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Ascending,
    Descending,
}

impl SortDir {
    pub fn flipped(self) -> Self {
        match self {
            SortDir::Ascending => SortDir::Descending,
            SortDir::Descending => SortDir::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: Field,
    pub dir: SortDir,
}

impl SortSpec {
    /// Column-header click semantics: sorting on the current key flips the
    /// direction, picking a new key starts ascending.
    pub fn toggle(current: Option<SortSpec>, key: Field) -> SortSpec {
        match current {
            Some(spec) if spec.key == key => SortSpec {
                key,
                dir: spec.dir.flipped(),
            },
            _ => SortSpec {
                key,
                dir: SortDir::Ascending,
            },
        }
    }
}

/// Records of one gazette volume, in mask order.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeGroup {
    pub key: String,
    pub rows: Vec<usize>,
}

pub fn identity_mask(len: usize) -> Vec<usize> {
    (0..len).collect()
}

/// Free-text filter across the searchable field set. A blank query is the
/// identity mask; otherwise a row survives when any searchable field
/// contains the query case-insensitively. Relative order is preserved.
pub fn filter(records: &[MatchRecord], query: &str) -> Vec<usize> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return identity_mask(records.len());
    }
    let mask: Vec<usize> = records
        .par_iter()
        .enumerate()
        .filter(|&(_, record)| record_matches(record, &q))
        .map(|(idx, _)| idx)
        .collect();
    trace!("Filter \"{q}\" kept {}/{} records", mask.len(), records.len());
    mask
}

/// `query` must already be lowercased.
pub fn record_matches(record: &MatchRecord, query: &str) -> bool {
    Field::SEARCHABLE
        .iter()
        .any(|&f| record.field(f).to_lowercase().contains(query))
}

/// Stable string sort of the mask by one field. Missing fields compare as
/// "" and ties keep their mask order.
pub fn sort(records: &[MatchRecord], rows: &[usize], spec: SortSpec) -> Vec<usize> {
    let mut out = rows.to_vec();
    out.sort_by(|&a, &b| {
        let va = records[a].field(spec.key);
        let vb = records[b].field(spec.key);
        match spec.dir {
            SortDir::Ascending => va.cmp(vb),
            SortDir::Descending => vb.cmp(va),
        }
    });
    out
}

/// Partition the mask by volume key. Group order is first appearance, row
/// order within a group follows the mask; every masked row lands in exactly
/// one group.
pub fn group(records: &[MatchRecord], rows: &[usize]) -> Vec<VolumeGroup> {
    let mut groups: Vec<VolumeGroup> = Vec::new();
    let mut by_key: HashMap<&str, usize> = HashMap::new();
    for &ridx in rows {
        let key = records[ridx].volume_key();
        match by_key.get(key) {
            Some(&gidx) => groups[gidx].rows.push(ridx),
            None => {
                by_key.insert(key, groups.len());
                groups.push(VolumeGroup {
                    key: key.to_string(),
                    rows: vec![ridx],
                });
            }
        }
    }
    groups
}

/// Zero is not a usable page size; fall back to the default.
pub fn normalize_page_size(page_size: usize) -> usize {
    if page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        page_size
    }
}

/// 1-based page slice of a group's rows. Page 0 clamps to 1; a page past
/// the end yields an empty slice.
pub fn paginate(rows: &[usize], page: usize, page_size: usize) -> &[usize] {
    let size = normalize_page_size(page_size);
    let begin = page.max(1).saturating_sub(1).saturating_mul(size);
    if begin >= rows.len() {
        return &[];
    }
    let end = std::cmp::min(begin + size, rows.len());
    &rows[begin..end]
}

pub fn page_count(count: usize, page_size: usize) -> usize {
    count.div_ceil(normalize_page_size(page_size))
}

/// Page count as shown to the user: an empty group still displays "1/1".
pub fn display_page_count(count: usize, page_size: usize) -> usize {
    page_count(count, page_size).max(1)
}

/// Per-group presentation state: current page and expand/collapse flag,
/// keyed by volume. Explicit maps keep the groups independent; paging or
/// collapsing one volume never touches another.
#[derive(Debug, Clone, Default)]
pub struct GroupState {
    pages: HashMap<String, usize>,
    expanded: HashMap<String, bool>,
}

impl GroupState {
    pub fn page(&self, key: &str) -> usize {
        self.pages.get(key).copied().unwrap_or(1)
    }

    pub fn set_page(&mut self, key: &str, page: usize) {
        self.pages.insert(key.to_string(), page.max(1));
    }

    /// Groups start expanded, matching the auto-expand the registry UI
    /// applies whenever a new match set arrives.
    pub fn is_expanded(&self, key: &str) -> bool {
        self.expanded.get(key).copied().unwrap_or(true)
    }

    pub fn toggle(&mut self, key: &str) {
        let now = !self.is_expanded(key);
        self.expanded.insert(key.to_string(), now);
    }

    pub fn set_all_expanded(&mut self, groups: &[VolumeGroup], expanded: bool) {
        for g in groups {
            self.expanded.insert(g.key.clone(), expanded);
        }
    }

    pub fn clear(&mut self) {
        self.pages.clear();
        self.expanded.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(volume: Option<&str>, name: &str, cause: &str) -> MatchRecord {
        MatchRecord {
            volume_no: volume.map(|v| v.to_string()),
            name_of_deceased: Some(name.to_string()),
            cause_no: Some(cause.to_string()),
            ..MatchRecord::default()
        }
    }

    fn sample() -> Vec<MatchRecord> {
        vec![
            rec(Some("12"), "John Doe", "E1"),
            rec(Some("12"), "Jane Roe", "E2"),
            rec(None, "No Vol", "E3"),
        ]
    }

    #[test]
    fn blank_query_is_identity() {
        let records = sample();
        assert_eq!(filter(&records, ""), vec![0, 1, 2]);
        assert_eq!(filter(&records, "   "), vec![0, 1, 2]);
    }

    #[test]
    fn filter_is_an_ordered_subsequence() {
        let records = sample();
        let mask = filter(&records, "e");
        let mut sorted = mask.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(mask, sorted);
        assert!(mask.iter().all(|&i| i < records.len()));
    }

    #[test]
    fn filter_is_case_insensitive_across_fields() {
        let records = sample();
        assert_eq!(filter(&records, "jane"), vec![1]);
        assert_eq!(filter(&records, "JANE"), vec![1]);
        // volume number is part of the searchable set
        assert_eq!(filter(&records, "12"), vec![0, 1]);
        assert_eq!(filter(&records, "nothing here"), Vec::<usize>::new());
    }

    #[test]
    fn filter_tolerates_all_null_records() {
        let records = vec![MatchRecord::default(), rec(Some("1"), "A", "B")];
        assert_eq!(filter(&records, "a"), vec![1]);
    }

    #[test]
    fn sort_orders_and_flips() {
        let records = vec![rec(None, "x", "B"), rec(None, "y", "A")];
        let rows = identity_mask(records.len());
        let asc = SortSpec {
            key: Field::CauseNo,
            dir: SortDir::Ascending,
        };
        assert_eq!(sort(&records, &rows, asc), vec![1, 0]);
        let desc = SortSpec::toggle(Some(asc), Field::CauseNo);
        assert_eq!(desc.dir, SortDir::Descending);
        assert_eq!(sort(&records, &rows, desc), vec![0, 1]);
    }

    #[test]
    fn sort_on_new_key_resets_to_ascending() {
        let desc = SortSpec {
            key: Field::CauseNo,
            dir: SortDir::Descending,
        };
        let spec = SortSpec::toggle(Some(desc), Field::NameOfDeceased);
        assert_eq!(spec.key, Field::NameOfDeceased);
        assert_eq!(spec.dir, SortDir::Ascending);
        assert_eq!(
            SortSpec::toggle(None, Field::VolumeNo).dir,
            SortDir::Ascending
        );
    }

    #[test]
    fn sort_is_stable_on_equal_keys() {
        let records = vec![
            rec(Some("1"), "a", "same"),
            rec(Some("2"), "b", "same"),
            rec(Some("3"), "c", "same"),
        ];
        let rows = identity_mask(records.len());
        let spec = SortSpec {
            key: Field::CauseNo,
            dir: SortDir::Ascending,
        };
        assert_eq!(sort(&records, &rows, spec), vec![0, 1, 2]);
    }

    #[test]
    fn sort_missing_fields_compare_as_empty() {
        let records = vec![rec(None, "x", "B"), MatchRecord::default()];
        let rows = identity_mask(records.len());
        let spec = SortSpec {
            key: Field::CauseNo,
            dir: SortDir::Ascending,
        };
        // "" sorts before "B"
        assert_eq!(sort(&records, &rows, spec), vec![1, 0]);
    }

    #[test]
    fn group_partitions_with_sentinel_bucket() {
        let records = sample();
        let groups = group(&records, &identity_mask(records.len()));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key, "12");
        assert_eq!(groups[0].rows, vec![0, 1]);
        assert_eq!(groups[1].key, "Unknown Volume");
        assert_eq!(groups[1].rows, vec![2]);
    }

    #[test]
    fn group_is_total_and_disjoint() {
        let records = sample();
        let mask = identity_mask(records.len());
        let groups = group(&records, &mask);
        let mut seen: Vec<usize> = groups.iter().flat_map(|g| g.rows.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, mask);
    }

    #[test]
    fn group_keeps_first_appearance_order() {
        let records = vec![
            rec(Some("B"), "1", ""),
            rec(Some("A"), "2", ""),
            rec(Some("B"), "3", ""),
        ];
        let groups = group(&records, &identity_mask(records.len()));
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert_eq!(groups[0].rows, vec![0, 2]);
    }

    #[test]
    fn paginate_slices_and_bounds() {
        let rows: Vec<usize> = (0..120).collect();
        assert_eq!(paginate(&rows, 1, 50).len(), 50);
        let third = paginate(&rows, 3, 50);
        assert_eq!(third.len(), 20);
        assert_eq!(third[0], 100);
        assert_eq!(third[19], 119);
        assert_eq!(page_count(120, 50), 3);
        assert!(paginate(&rows, 4, 50).is_empty());
    }

    #[test]
    fn paginate_never_exceeds_page_size() {
        let rows: Vec<usize> = (0..7).collect();
        for page in 0..5 {
            assert!(paginate(&rows, page, 3).len() <= 3);
        }
    }

    #[test]
    fn paginate_clamps_degenerate_inputs() {
        let rows: Vec<usize> = (0..10).collect();
        // page 0 behaves like page 1
        assert_eq!(paginate(&rows, 0, 4), paginate(&rows, 1, 4));
        // page size 0 falls back to the default
        assert_eq!(paginate(&rows, 1, 0).len(), 10);
        assert_eq!(page_count(10, 0), 1);
    }

    #[test]
    fn empty_rows_paginate_to_empty_but_display_one_page() {
        let rows: Vec<usize> = Vec::new();
        assert!(paginate(&rows, 1, 50).is_empty());
        assert_eq!(page_count(0, 50), 0);
        assert_eq!(display_page_count(0, 50), 1);
    }

    #[test]
    fn group_state_pages_are_independent() {
        let mut state = GroupState::default();
        assert_eq!(state.page("12"), 1);
        state.set_page("12", 3);
        state.set_page("13", 2);
        assert_eq!(state.page("12"), 3);
        assert_eq!(state.page("13"), 2);
        assert_eq!(state.page("14"), 1);
        state.set_page("12", 0);
        assert_eq!(state.page("12"), 1);
    }

    #[test]
    fn group_state_expansion_defaults_and_toggles() {
        let mut state = GroupState::default();
        assert!(state.is_expanded("12"));
        state.toggle("12");
        assert!(!state.is_expanded("12"));
        assert!(state.is_expanded("13"));
        state.toggle("12");
        assert!(state.is_expanded("12"));
    }

    #[test]
    fn filter_then_group_scenario() {
        let records = sample();
        let mask = filter(&records, "jane");
        let groups = group(&records, &mask);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "12");
        assert_eq!(groups[0].rows, vec![1]);
        assert_eq!(records[1].name_of_deceased.as_deref(), Some("Jane Roe"));
    }
}
