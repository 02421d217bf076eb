//! Archive-candidate grouping.
//!
//! The grouping engine selects, from a set of archive candidates, one
//! group of data sets whose total size falls into the configured window.
//! Grouping keys are tried in configured order; the first key producing
//! a usable group wins. When no key succeeds the engine returns an empty
//! selection and reports the full decision trail through the notifier,
//! which is a normal outcome, not an error.

pub mod key;

use crate::dataset::{DataSet, TimestampMillis};
use crate::error::CoreResult;
use crate::notify::Notifier;
use self::key::GroupingKey;

use std::collections::HashMap;
use tracing::info;

/// Selects archive groups within a size window.
pub struct GroupingEngine<'a> {
    min_size: u64,
    max_size: u64,
    keys: &'a [GroupingKey],
    notifier: &'a dyn Notifier,
}

struct Group {
    members: Vec<usize>,
    total_size: u64,
    /// Most recent access among the members.
    age: TimestampMillis,
}

impl<'a> GroupingEngine<'a> {
    /// Creates an engine for the given window and ordered key list.
    #[must_use]
    pub fn new(
        min_size: u64,
        max_size: u64,
        keys: &'a [GroupingKey],
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            min_size,
            max_size,
            keys,
            notifier,
        }
    }

    /// Picks the archive group from the candidates.
    ///
    /// All candidate sizes must be known. Returns an empty vector when no
    /// key yields a group inside the window; the decision trail is then
    /// sent through the notifier.
    pub fn filter(&self, candidates: &[DataSet]) -> CoreResult<Vec<DataSet>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let sizes = candidates
            .iter()
            .map(DataSet::known_size)
            .collect::<CoreResult<Vec<u64>>>()?;

        let mut trail = Trail::default();
        trail.log(format!(
            "Search for a group of data sets with total size between {} and {}. Data sets: {}",
            render_size(self.min_size),
            render_size(self.max_size),
            render_codes(candidates.iter())
        ));

        // A candidate too large for the window on its own can never be
        // combined with anything, so it is archived alone.
        for (index, size) in sizes.iter().enumerate() {
            if *size > self.max_size {
                let selected = vec![candidates[index].clone()];
                trail.log(format!(
                    "Data set {} is with {} already larger than the maximum of {}. \
                     It will be archived on its own.",
                    candidates[index].code,
                    render_size(*size),
                    render_size(self.max_size)
                ));
                trail.log(format!("filtered data sets: {}", render_codes(selected.iter())));
                return Ok(selected);
            }
        }

        for key in self.keys {
            if let Some(selected) = self.try_key(key, candidates, &sizes, &mut trail) {
                trail.log(format!("filtered data sets: {}", render_codes(selected.iter())));
                return Ok(selected);
            }
        }

        self.notifier.notify(
            "Failed to find archive candidates",
            &format!(
                "From {} data sets no group could be found to be fit between {} and {}\n\nLog:\n{}",
                candidates.len(),
                render_size(self.min_size),
                render_size(self.max_size),
                trail.lines.join("\n")
            ),
        );
        Ok(Vec::new())
    }

    /// Tries one grouping key; `None` means the key failed and the next
    /// one should be tried.
    fn try_key(
        &self,
        key: &GroupingKey,
        candidates: &[DataSet],
        sizes: &[u64],
        trail: &mut Trail,
    ) -> Option<Vec<DataSet>> {
        let groups = partition(key, candidates, sizes);
        trail.log(format!(
            "Grouping key: '{key}' has grouped {} data sets into {} groups.",
            candidates.len(),
            groups.len()
        ));

        let mut fitting = Vec::new();
        let mut too_small = Vec::new();
        let mut too_large = 0usize;
        for (index, group) in groups.iter().enumerate() {
            if group.total_size < self.min_size {
                too_small.push(index);
            } else if group.total_size > self.max_size {
                too_large += 1;
            } else {
                fitting.push(index);
            }
        }
        trail.log(format!(
            "{} groups match in size, {} groups are too small and {} groups are too large.",
            fitting.len(),
            too_small.len(),
            too_large
        ));

        if !fitting.is_empty() {
            let selected = if fitting.len() == 1 {
                &groups[fitting[0]]
            } else {
                // Strict < keeps the first-discovered group on ties.
                let mut oldest = &groups[fitting[0]];
                for &index in &fitting[1..] {
                    if groups[index].age < oldest.age {
                        oldest = &groups[index];
                    }
                }
                trail.log(format!(
                    "All data sets of the selected group have been accessed at {} or before.",
                    oldest.age
                ));
                oldest
            };
            return Some(collect(candidates, &selected.members));
        }

        if key.is_merge_eligible() && too_small.len() >= 2 {
            return self.merge(&groups, too_small, candidates, trail);
        }
        None
    }

    /// Merges too-small groups oldest-first until the window minimum is
    /// reached. Overshooting the maximum fails the key rather than
    /// returning an oversized group.
    fn merge(
        &self,
        groups: &[Group],
        mut too_small: Vec<usize>,
        candidates: &[DataSet],
        trail: &mut Trail,
    ) -> Option<Vec<DataSet>> {
        too_small.sort_by_key(|&i| (groups[i].age, groups[i].total_size));
        let mut total = 0u64;
        let mut members = Vec::new();
        let mut merged = 0usize;
        for &index in &too_small {
            total += groups[index].total_size;
            members.extend_from_slice(&groups[index].members);
            merged += 1;
            if total >= self.min_size {
                if total > self.max_size {
                    trail.log(format!(
                        "{merged} groups have been merged, but the total size of {} \
                         is above the required maximum of {}",
                        render_size(total),
                        render_size(self.max_size)
                    ));
                    return None;
                }
                trail.log(format!("{merged} groups have been merged."));
                return Some(collect(candidates, &members));
            }
        }
        trail.log(format!(
            "Merging all {merged} groups gives a total size of {} \
             which is still below required minimum of {}",
            render_size(total),
            render_size(self.min_size)
        ));
        None
    }
}

/// Partitions candidates into groups, preserving first-discovery order.
fn partition(key: &GroupingKey, candidates: &[DataSet], sizes: &[u64]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index_by_label: HashMap<Vec<String>, usize> = HashMap::new();
    for (index, data_set) in candidates.iter().enumerate() {
        let label = key.evaluate(data_set);
        let group_index = *index_by_label.entry(label).or_insert_with(|| {
            groups.push(Group {
                members: Vec::new(),
                total_size: 0,
                age: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[group_index];
        group.total_size += sizes[index];
        group.age = group.age.max(data_set.access_timestamp);
        group.members.push(index);
    }
    groups
}

fn collect(candidates: &[DataSet], members: &[usize]) -> Vec<DataSet> {
    members.iter().map(|&i| candidates[i].clone()).collect()
}

fn render_codes<'a>(data_sets: impl Iterator<Item = &'a DataSet>) -> String {
    let codes: Vec<&str> = data_sets.map(|d| d.code.as_str()).collect();
    format!("[{}]", codes.join(", "))
}

/// Renders a byte count the way operators read it: whole units, largest
/// unit first.
fn render_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{bytes} bytes")
    }
}

/// Decision trail: every line is logged immediately and kept for the
/// failure notification.
#[derive(Default)]
struct Trail {
    lines: Vec<String>,
}

impl Trail {
    fn log(&mut self, line: String) {
        info!("{line}");
        self.lines.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, subject: &str, body: &str) {
            self.messages
                .lock()
                .push((subject.to_string(), body.to_string()));
        }
    }

    struct Fixture {
        keys: Vec<GroupingKey>,
        notifier: RecordingNotifier,
        min: u64,
        max: u64,
    }

    impl Fixture {
        fn new(min: u64, max: u64, keys: &str) -> Self {
            Self {
                keys: GroupingKey::parse_list(keys).unwrap(),
                notifier: RecordingNotifier::default(),
                min,
                max,
            }
        }

        fn filter(&self, candidates: &[DataSet]) -> Vec<String> {
            let engine = GroupingEngine::new(self.min, self.max, &self.keys, &self.notifier);
            engine
                .filter(candidates)
                .unwrap()
                .into_iter()
                .map(|d| d.code)
                .collect()
        }

        fn notifications(&self) -> Vec<(String, String)> {
            self.notifier.messages.lock().clone()
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn ds(
        space: &str,
        project: &str,
        experiment: &str,
        type_code: &str,
        sample: Option<&str>,
        code: &str,
        access: u64,
        size: u64,
    ) -> DataSet {
        DataSet {
            code: code.to_string(),
            size: Some(size),
            share_id: "1".to_string(),
            location: format!("uuid/{code}"),
            space: space.to_string(),
            project: project.to_string(),
            experiment: experiment.to_string(),
            sample: sample.map(str::to_string),
            type_code: type_code.to_string(),
            access_timestamp: access,
        }
    }

    #[test]
    fn empty_input_yields_empty_output_silently() {
        let fixture = Fixture::new(40, 100, "All");
        assert!(fixture.filter(&[]).is_empty());
        assert!(fixture.notifications().is_empty());
    }

    #[test]
    fn all_key_groups_everything_together() {
        let fixture = Fixture::new(40, 100, "All");
        let candidates = [
            ds("s1", "p1", "e3", "dt1", None, "ds1", 0, 10),
            ds("s2", "p2", "e4", "dt2", None, "ds2", 0, 10),
            ds("s3", "p3", "e5", "dt3", None, "ds3", 0, 10),
            ds("s4", "p4", "e6", "dt4", None, "ds4", 0, 10),
        ];
        assert_eq!(fixture.filter(&candidates), vec!["ds1", "ds2", "ds3", "ds4"]);
        assert!(fixture.notifications().is_empty());
    }

    #[test]
    fn single_too_small_group_without_merge_fails_and_notifies() {
        let fixture = Fixture::new(25, 100, "Space:merge");
        let candidates = [ds("s1", "p1", "e1", "dt1", None, "ds1", 0, 10)];
        assert!(fixture.filter(&candidates).is_empty());

        let notifications = fixture.notifications();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0]
            .1
            .starts_with("From 1 data sets no group could be found to be fit between 25 bytes and 100 bytes"));
        assert!(notifications[0]
            .1
            .contains("Grouping key: 'Space:merge' has grouped 1 data sets into 1 groups."));
        assert!(notifications[0]
            .1
            .contains("0 groups match in size, 1 groups are too small and 0 groups are too large."));
    }

    #[test]
    fn merge_accumulates_oldest_groups_first() {
        let fixture = Fixture::new(25, 100 * 1024 * 1024, "Space:merge");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", None, "ds1", 7000, 10),
            ds("s2", "p1", "e1", "dt1", None, "ds2", 4000, 11),
            ds("s3", "p1", "e1", "dt1", None, "ds3", 6000, 12),
            ds("s4", "p1", "e1", "dt1", None, "ds4", 2000, 13),
        ];
        // Oldest first: ds4 (2000), ds2 (4000), ds3 (6000); 13+11=24 < 25,
        // +12=36 reaches the minimum with three groups.
        assert_eq!(fixture.filter(&candidates), vec!["ds4", "ds2", "ds3"]);
    }

    #[test]
    fn merge_ties_are_broken_by_group_size() {
        let fixture = Fixture::new(20, 30, "DataSetType#Experiment#Sample:merge");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", Some("smp1"), "ds1", 0, 15),
            ds("s1", "p1", "e2", "dt1", Some("smp1"), "ds2", 0, 18),
            ds("s1", "p1", "e2", "dt1", Some("smp2"), "ds3", 0, 19),
            ds("s1", "p2", "e1", "dt2", Some("smp1"), "ds4", 0, 16),
        ];
        // All timestamps tie, so the two smallest groups merge first:
        // 15+16=31 overshoots the maximum of 30 and the key fails.
        assert!(fixture.filter(&candidates).is_empty());
        let notifications = fixture.notifications();
        assert!(notifications[0]
            .1
            .contains("2 groups have been merged, but the total size of 31 bytes \
                       is above the required maximum of 30 bytes"));
    }

    #[test]
    fn merge_reports_total_below_minimum() {
        let kb = 1024;
        let fixture = Fixture::new(20 * kb, 30 * kb, "DataSetType#Project:merge");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", Some("smp1"), "ds1", 0, 6 * kb),
            ds("s1", "p1", "e1", "dt1", Some("smp1"), "ds2", 0, 2 * kb),
            ds("s2", "p1", "e1", "dt1", Some("smp2"), "ds3", 0, 8 * kb),
            ds("s1", "p1", "e1", "dt2", Some("smp1"), "ds4", 0, kb),
        ];
        assert!(fixture.filter(&candidates).is_empty());
        let notifications = fixture.notifications();
        assert!(notifications[0].1.contains(
            "Merging all 3 groups gives a total size of 17 KB \
             which is still below required minimum of 20 KB"
        ));
    }

    #[test]
    fn oldest_fitting_group_wins() {
        let fixture = Fixture::new(25, 100, "Space");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", None, "ds1", 0, 10),
            ds("s1", "p1", "e1", "dt2", None, "ds2", 0, 10),
            ds("s2", "p1", "e1", "dt3", None, "ds3", 200_000, 50),
            ds("s3", "p1", "e1", "dt4", None, "ds4", 100_000, 70),
            ds("s4", "p1", "e1", "dt5", None, "ds5", 50_000, 30),
        ];
        // Three fitting groups; ds5 at 50000 is the least recently
        // accessed of ds3 (200000), ds4 (100000) and ds5.
        assert_eq!(fixture.filter(&candidates), vec!["ds5"]);
    }

    #[test]
    fn group_age_is_the_most_recent_member_access() {
        let fixture = Fixture::new(25, 100, "Project#DataSetType");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", None, "ds1", 20_000, 71),
            ds("s1", "p2", "e1", "dt1", None, "ds2", 10_000, 42),
            ds("s1", "p2", "e1", "dt1", None, "ds3", 30_000, 42),
            ds("s1", "p1", "e1", "dt2", None, "ds4", 15_000, 73),
            ds("s1", "p2", "e1", "dt2", None, "ds5", 40_000, 74),
        ];
        // The {ds2, ds3} group is aged 30000 by its youngest member, so
        // the {ds4} group at 15000 is the oldest of the four.
        assert_eq!(fixture.filter(&candidates), vec!["ds4"]);
    }

    #[test]
    fn exactly_one_fitting_group_is_returned_directly() {
        let fixture = Fixture::new(25, 100, "Space");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", None, "ds1", 0, 10),
            ds("s1", "p1", "e1", "dt1", None, "ds2", 0, 10),
            ds("s2", "p1", "e1", "dt1", None, "ds3", 0, 50),
            ds("s2", "p1", "e1", "dt1", None, "ds4", 0, 50),
        ];
        assert_eq!(fixture.filter(&candidates), vec!["ds3", "ds4"]);
    }

    #[test]
    fn later_key_succeeds_after_earlier_key_fails() {
        let fixture = Fixture::new(25, 100, "Project, Project#DataSetType");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", None, "ds1", 20_000, 71),
            ds("s1", "p2", "e1", "dt1", None, "ds2", 10_000, 42),
            ds("s1", "p2", "e1", "dt1", None, "ds3", 30_000, 42),
            ds("s1", "p1", "e1", "dt2", None, "ds4", 15_000, 73),
            ds("s1", "p2", "e1", "dt2", None, "ds5", 40_000, 74),
        ];
        // Both project groups are too large, the composite key fits.
        assert_eq!(fixture.filter(&candidates), vec!["ds4"]);
        assert!(fixture.notifications().is_empty());
    }

    #[test]
    fn oversized_candidate_short_circuits_as_singleton() {
        let fixture = Fixture::new(25, 100, "Space");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", None, "ds1", 0, 40),
            ds("s2", "p1", "e1", "dt1", None, "ds2", 0, 101),
            ds("s3", "p1", "e1", "dt1", None, "ds3", 0, 102),
        ];
        // First oversized candidate in input order wins.
        assert_eq!(fixture.filter(&candidates), vec!["ds2"]);
    }

    #[test]
    fn unknown_size_is_a_hard_error() {
        let keys = GroupingKey::parse_list("All").unwrap();
        let notifier = RecordingNotifier::default();
        let engine = GroupingEngine::new(0, 100, &keys, &notifier);
        let mut candidate = ds("s1", "p1", "e1", "dt1", None, "ds1", 0, 10);
        candidate.size = None;
        assert!(engine.filter(&[candidate]).is_err());
    }

    #[test]
    fn filtering_is_idempotent() {
        let fixture = Fixture::new(25, 100, "Space");
        let candidates = [
            ds("s1", "p1", "e1", "dt1", None, "ds1", 500, 30),
            ds("s2", "p1", "e1", "dt1", None, "ds2", 500, 30),
            ds("s3", "p1", "e1", "dt1", None, "ds3", 400, 30),
        ];
        let first = fixture.filter(&candidates);
        let second = fixture.filter(&candidates);
        assert_eq!(first, second);
        assert_eq!(first, vec!["ds3"]);
    }

    #[test]
    fn size_rendering_uses_whole_units() {
        assert_eq!(render_size(25), "25 bytes");
        assert_eq!(render_size(17 * 1024), "17 KB");
        assert_eq!(render_size(100 * 1024 * 1024), "100 MB");
        assert_eq!(render_size(3 * 1024 * 1024 * 1024), "3 GB");
    }
}
