use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::models::{
    project::Project,
    tag::{FILTER_CATEGORIES, Phase, find_category, label_for_tag},
};

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("Filter '{0}' must look like category:value")]
    Malformed(String),

    #[error("Unknown filter category '{0}'")]
    UnknownCategory(String),
}

/// Selected tag values per category key. An empty set means the category
/// does not constrain the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    selected: BTreeMap<String, BTreeSet<String>>,
}

/// One selected value, as shown in the active filter row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveChip {
    pub category_key: String,
    pub value: String,
    pub label: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterState {
    /// One empty entry per declared category.
    pub fn new() -> Self {
        let selected = FILTER_CATEGORIES
            .iter()
            .map(|c| (c.key.to_string(), BTreeSet::new()))
            .collect();
        Self { selected }
    }

    pub fn selected(&self, category_key: &str) -> Option<&BTreeSet<String>> {
        self.selected.get(category_key)
    }

    pub fn toggle(&self, category_key: &str, value: &str) -> Self {
        let mut next = self.clone();
        let set = next.selected.entry(category_key.to_string()).or_default();
        if !set.remove(value) {
            set.insert(value.to_string());
        }
        next.drop_empty_undeclared(category_key);
        next
    }

    pub fn clear_category(&self, category_key: &str) -> Self {
        let mut next = self.clone();
        if let Some(set) = next.selected.get_mut(category_key) {
            set.clear();
        }
        next.drop_empty_undeclared(category_key);
        next
    }

    /// Undeclared keys only live in the map while they hold a selection.
    fn drop_empty_undeclared(&mut self, category_key: &str) {
        if find_category(category_key).is_none()
            && self.selected.get(category_key).is_some_and(BTreeSet::is_empty)
        {
            self.selected.remove(category_key);
        }
    }

    pub fn has_active_filters(&self) -> bool {
        self.selected.values().any(|set| !set.is_empty())
    }

    pub fn count_active(&self) -> usize {
        self.selected.values().map(BTreeSet::len).sum()
    }

    pub fn count_active_in(&self, phase: Phase) -> usize {
        self.selected
            .iter()
            .filter(|(key, _)| find_category(key).is_some_and(|c| c.phase == phase))
            .map(|(_, set)| set.len())
            .sum()
    }

    /// Selected values in taxonomy order.
    pub fn active_chips(&self) -> Vec<ActiveChip> {
        FILTER_CATEGORIES
            .iter()
            .filter_map(|c| self.selected.get(c.key).map(|set| (c.key, set)))
            .flat_map(|(key, set)| {
                set.iter().map(move |value| ActiveChip {
                    category_key: key.to_string(),
                    value: value.clone(),
                    label: label_for_tag(value),
                })
            })
            .collect()
    }

    /// Whether `project` satisfies every constrained category.
    pub fn matches(&self, project: &Project) -> bool {
        self.selected
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .all(|(key, set)| {
                project.tags.iter().any(|tag| {
                    tag.strip_prefix(key.as_str())
                        .is_some_and(|rest| rest.starts_with(':'))
                        && set.contains(tag)
                })
            })
    }
}

/// Builds a state from `category:value` selections, toggling each in turn.
pub fn state_from_selections<S: AsRef<str>>(
    selections: &[S],
) -> Result<FilterState, SelectionError> {
    selections.iter().try_fold(FilterState::new(), |state, raw| {
        let tag = raw.as_ref().trim().to_lowercase();
        let (key, value) = tag
            .split_once(':')
            .ok_or_else(|| SelectionError::Malformed(raw.as_ref().to_string()))?;
        if value.is_empty() {
            return Err(SelectionError::Malformed(raw.as_ref().to_string()));
        }
        let category =
            find_category(key).ok_or_else(|| SelectionError::UnknownCategory(key.to_string()))?;
        Ok(state.toggle(category.key, &tag))
    })
}

/// Projects that satisfy `state`, in their original order.
///
/// Categories combine with AND, values inside one category with OR.
pub fn apply_filters<'a>(projects: &'a [Project], state: &FilterState) -> Vec<&'a Project> {
    projects.iter().filter(|p| state.matches(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str, tags: &[&str]) -> Project {
        Project {
            id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Project::default()
        }
    }

    fn sample_projects() -> Vec<Project> {
        vec![
            project("Mini Cactus", &["type:amigurumi", "skill:beginner"]),
            project("Ocean Cardigan", &["type:wearable", "skill:intermediate", "color:pastel"]),
            project("Market Bag", &["type:bag", "gift"]),
            project("Untagged Swatch", &[]),
            project("Bunny", &["type:amigurumi", "skill:easy", "collection:spring"]),
        ]
    }

    fn names(projects: &[&Project]) -> Vec<String> {
        projects.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_new_state_has_every_category_empty() {
        let state = FilterState::new();
        for category in FILTER_CATEGORIES {
            assert_eq!(state.selected(category.key), Some(&BTreeSet::new()));
        }
        assert_eq!(state.count_active(), 0);
        assert!(!state.has_active_filters());
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let empty = FilterState::new();
        let once = empty.toggle("type", "type:bag");

        assert!(once.selected("type").unwrap().contains("type:bag"));
        assert!(empty.selected("type").unwrap().is_empty(), "input must not change");

        let twice = once.toggle("type", "type:bag");
        assert_eq!(twice, empty);
    }

    #[test]
    fn test_toggle_unknown_category_creates_entry() {
        let state = FilterState::new().toggle("mood", "mood:cozy");
        assert_eq!(state.count_active(), 1);
        assert!(state.selected("mood").unwrap().contains("mood:cozy"));
    }

    #[test]
    fn test_toggle_twice_restores_state_for_any_key() {
        let base = FilterState::new().toggle("type", "type:bag");
        for (key, value) in [("type", "type:baby"), ("mood", "mood:cozy"), ("", "x")] {
            assert_eq!(base.toggle(key, value).toggle(key, value), base);
        }
    }

    #[test]
    fn test_clear_unknown_category() {
        let empty = FilterState::new();
        assert_eq!(empty.clear_category("mood"), empty);

        let cleared = empty.toggle("mood", "mood:cozy").clear_category("mood");
        assert_eq!(cleared, empty);
        assert!(cleared.selected("mood").is_none());
    }

    #[test]
    fn test_clear_category() {
        let state = FilterState::new()
            .toggle("type", "type:bag")
            .toggle("type", "type:baby")
            .toggle("skill", "skill:easy");

        let cleared = state.clear_category("type");

        assert_eq!(cleared.count_active(), 1);
        assert!(cleared.selected("type").unwrap().is_empty());
        assert_eq!(state.count_active(), 3);
    }

    #[test]
    fn test_count_active_in_phase() {
        let state = FilterState::new()
            .toggle("type", "type:bag")
            .toggle("size", "size:mini")
            .toggle("collection", "collection:spring");

        assert_eq!(state.count_active_in(Phase::Primary), 1);
        assert_eq!(state.count_active_in(Phase::Secondary), 2);
    }

    #[test]
    fn test_active_chips_follow_taxonomy_order() {
        let state = FilterState::new()
            .toggle("skill", "skill:easy")
            .toggle("type", "type:home-decor");

        let chips = state.active_chips();

        assert_eq!(
            chips,
            vec![
                ActiveChip {
                    category_key: String::from("type"),
                    value: String::from("type:home-decor"),
                    label: String::from("Home Décor"),
                },
                ActiveChip {
                    category_key: String::from("skill"),
                    value: String::from("skill:easy"),
                    label: String::from("Easy"),
                },
            ]
        );
    }

    #[test]
    fn test_no_active_filters_returns_everything() {
        let projects = sample_projects();
        let filtered = apply_filters(&projects, &FilterState::new());
        assert_eq!(filtered.len(), projects.len());
        assert!(filtered.iter().zip(&projects).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn test_single_project_scenario() {
        let projects = vec![project("Mini Cactus", &["type:amigurumi", "skill:beginner"])];

        let included = FilterState::new().toggle("type", "type:amigurumi");
        assert_eq!(apply_filters(&projects, &included).len(), 1);

        let excluded = FilterState::new().toggle("type", "type:wearable");
        assert!(apply_filters(&projects, &excluded).is_empty());
    }

    #[test]
    fn test_or_within_category_and_across_categories() {
        let projects = sample_projects();

        let either_type = FilterState::new()
            .toggle("type", "type:amigurumi")
            .toggle("type", "type:bag");
        assert_eq!(
            names(&apply_filters(&projects, &either_type)),
            vec!["Mini Cactus", "Market Bag", "Bunny"]
        );

        let amigurumi_for_beginners = FilterState::new()
            .toggle("type", "type:amigurumi")
            .toggle("skill", "skill:beginner");
        assert_eq!(
            names(&apply_filters(&projects, &amigurumi_for_beginners)),
            vec!["Mini Cactus"]
        );
    }

    #[test]
    fn test_project_without_tags_in_constrained_category_is_excluded() {
        let projects = sample_projects();
        let state = FilterState::new().toggle("color", "color:pastel");
        assert_eq!(names(&apply_filters(&projects, &state)), vec!["Ocean Cardigan"]);
    }

    #[test]
    fn test_selected_value_must_carry_category_prefix() {
        let projects = vec![project("Market Bag", &["type:bag", "gift"])];
        let state = FilterState::new().toggle("type", "gift");
        assert!(apply_filters(&projects, &state).is_empty());
    }

    #[test]
    fn test_state_from_selections() {
        let state = state_from_selections(&[" Type:Amigurumi", "skill:easy", "type:bag"]).unwrap();

        assert_eq!(state.count_active(), 3);
        assert!(state.selected("type").unwrap().contains("type:amigurumi"));
        assert_eq!(
            state_from_selections(&["type:bag", "type:bag"]).unwrap(),
            FilterState::new()
        );
    }

    #[test]
    fn test_state_from_selections_rejects_bad_input() {
        assert_eq!(
            state_from_selections(&["gift"]),
            Err(SelectionError::Malformed(String::from("gift")))
        );
        assert_eq!(
            state_from_selections(&["type:"]),
            Err(SelectionError::Malformed(String::from("type:")))
        );
        assert_eq!(
            state_from_selections(&["mood:cozy"]),
            Err(SelectionError::UnknownCategory(String::from("mood")))
        );
    }

    #[test]
    fn test_filtered_result_is_ordered_subset() {
        let projects = sample_projects();
        let states = [
            FilterState::new().toggle("type", "type:amigurumi"),
            FilterState::new().toggle("skill", "skill:easy").toggle("skill", "skill:intermediate"),
            FilterState::new().toggle("collection", "collection:spring"),
            FilterState::new().toggle("fiber", "fiber:wool"),
        ];

        for state in &states {
            let filtered = apply_filters(&projects, state);
            let mut positions = filtered
                .iter()
                .map(|p| projects.iter().position(|q| std::ptr::eq(*p, q)).unwrap());
            let mut last = None;
            for position in positions.by_ref() {
                assert!(last.is_none_or(|l| l < position));
                last = Some(position);
            }
        }
    }
}
