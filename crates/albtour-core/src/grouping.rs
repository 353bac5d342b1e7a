//! Municipality grouping and ranking.
//!
//! A flat event list is partitioned by municipality name, ranked by event
//! count, and split into a "featured" head and a searchable remainder. All
//! of it is pure and recomputed from the source list whenever it changes.

use std::collections::HashMap;

use crate::models::{Beach, Event};
use crate::utils::{cmp_ignore_case, contains_ignore_case};

/// Events shown inline per municipality before "see more"
pub const DISPLAY_LIMIT: usize = 4;

/// Municipalities shown in the featured section
pub const FEATURED_COUNT: usize = 5;

const SELECTED_MUNICIPALITY_FALLBACK: &str = "Selected Municipality";

#[derive(Debug, Clone, PartialEq)]
pub struct GroupedMunicipality {
    pub municipality_name: String,
    pub municipality_id: i64,
    pub all_events: Vec<Event>,
    pub total_count: usize,
    /// First `DISPLAY_LIMIT` of `all_events`
    pub display_events: Vec<Event>,
    pub has_more: bool,
}

impl GroupedMunicipality {
    fn new(municipality_name: String, municipality_id: i64, all_events: Vec<Event>) -> Self {
        let total_count = all_events.len();
        let display_events = all_events.iter().take(DISPLAY_LIMIT).cloned().collect();
        Self {
            municipality_name,
            municipality_id,
            all_events,
            total_count,
            display_events,
            has_more: total_count > DISPLAY_LIMIT,
        }
    }

    pub fn hidden_count(&self) -> usize {
        self.total_count.saturating_sub(DISPLAY_LIMIT)
    }
}

/// Partition events by municipality name, keeping first-seen order inside
/// each group, in first-seen group order.
fn partition_by_municipality<T>(
    items: &[T],
    name_of: impl Fn(&T) -> &str,
    id_of: impl Fn(&T) -> i64,
) -> Vec<(String, i64, Vec<T>)>
where
    T: Clone,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, i64, Vec<T>)> = Vec::new();

    for item in items {
        let name = name_of(item);
        match index.get(name) {
            Some(&i) => groups[i].2.push(item.clone()),
            None => {
                index.insert(name, groups.len());
                groups.push((name.to_string(), id_of(item), vec![item.clone()]));
            }
        }
    }
    groups
}

/// Group events by municipality, ranked by event count descending.
///
/// Ties are broken alphabetically (case-insensitive, then exact name, then
/// municipality id) so the output is fully deterministic.
pub fn group_events(events: &[Event]) -> Vec<GroupedMunicipality> {
    let mut groups: Vec<GroupedMunicipality> = partition_by_municipality(
        events,
        |e| e.municipality.name.as_str(),
        |e| e.municipality.id,
    )
    .into_iter()
    .map(|(name, id, events)| GroupedMunicipality::new(name, id, events))
    .collect();

    groups.sort_by(|a, b| {
        b.total_count
            .cmp(&a.total_count)
            .then_with(|| cmp_ignore_case(&a.municipality_name, &b.municipality_name))
            .then_with(|| a.municipality_name.cmp(&b.municipality_name))
            .then_with(|| a.municipality_id.cmp(&b.municipality_id))
    });
    groups
}

/// Present a list already filtered to one municipality as a single group.
///
/// The group is named after the first event's municipality; an empty list
/// still yields one (empty) group so the screen can show its header.
pub fn group_filtered_events(events: &[Event]) -> Vec<GroupedMunicipality> {
    let (name, id) = events
        .first()
        .map(|e| (e.municipality.name.clone(), e.municipality.id))
        .unwrap_or_else(|| (SELECTED_MUNICIPALITY_FALLBACK.to_string(), 0));
    vec![GroupedMunicipality::new(name, id, events.to_vec())]
}

#[derive(Debug, Clone, PartialEq)]
pub struct BeachGroup {
    pub municipality_name: String,
    pub municipality_id: i64,
    pub beaches: Vec<Beach>,
}

/// Group beaches by municipality, alphabetically by municipality name.
pub fn group_beaches_by_municipality(beaches: &[Beach]) -> Vec<BeachGroup> {
    let mut groups: Vec<BeachGroup> = partition_by_municipality(
        beaches,
        |b| b.municipality.name.as_str(),
        |b| b.municipality.id,
    )
    .into_iter()
    .map(|(municipality_name, municipality_id, beaches)| BeachGroup {
        municipality_name,
        municipality_id,
        beaches,
    })
    .collect();

    groups.sort_by(|a, b| {
        cmp_ignore_case(&a.municipality_name, &b.municipality_name)
            .then_with(|| a.municipality_name.cmp(&b.municipality_name))
    });
    groups
}

/// Ranked municipality groups plus the featured/search views over them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MunicipalityRanking {
    groups: Vec<GroupedMunicipality>,
}

impl MunicipalityRanking {
    pub fn from_events(events: &[Event]) -> Self {
        Self {
            groups: group_events(events),
        }
    }

    /// Every group, ranked
    pub fn groups(&self) -> &[GroupedMunicipality] {
        &self.groups
    }

    pub fn total_events(&self) -> usize {
        self.groups.iter().map(|g| g.total_count).sum()
    }

    /// The top `FEATURED_COUNT` municipalities by event count
    pub fn featured(&self) -> &[GroupedMunicipality] {
        &self.groups[..self.groups.len().min(FEATURED_COUNT)]
    }

    /// Groups matching `term` as a case-insensitive substring of the name.
    ///
    /// A blank term returns everything outside the featured head, so
    /// `featured()` and `search("")` partition the ranking. A non-blank
    /// term scans every group, featured ones included.
    pub fn search(&self, term: &str) -> Vec<&GroupedMunicipality> {
        let term = term.trim();
        if term.is_empty() {
            return self.groups.iter().skip(FEATURED_COUNT).collect();
        }
        self.groups
            .iter()
            .filter(|g| contains_ignore_case(&g.municipality_name, term))
            .collect()
    }

    /// Full group for one municipality (the "see more" screen)
    pub fn find(&self, municipality_id: i64) -> Option<&GroupedMunicipality> {
        self.groups.iter().find(|g| g.municipality_id == municipality_id)
    }
}
