//! Semantic projection of a snapshot
//!
//! A [`Profile`] names the raw axis and button indices of a physical controller
//! layout and groups them ("D-Pad", "Sticks", ...). [`SemanticView`] reads a
//! [`Snapshot`] through that table without keeping any state of its own.

use crate::controller::reducer::Snapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a labelled control reads its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSource {
    Axis(usize),
    Button(usize),
}

impl ControlSource {
    pub fn index(&self) -> usize {
        match self {
            ControlSource::Axis(index) | ControlSource::Button(index) => *index,
        }
    }

    pub fn is_button(&self) -> bool {
        matches!(self, ControlSource::Button(_))
    }

    fn read(&self, snapshot: &Snapshot) -> i32 {
        match *self {
            ControlSource::Axis(index) => i32::from(snapshot.axis(index)),
            ControlSource::Button(index) => i32::from(snapshot.button(index)),
        }
    }
}

impl fmt::Display for ControlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSource::Axis(index) => write!(f, "axis {}", index),
            ControlSource::Button(index) => write!(f, "button {}", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlBinding {
    pub label: String,
    pub source: ControlSource,
}

impl ControlBinding {
    pub fn axis(label: &str, index: usize) -> Self {
        Self {
            label: label.to_string(),
            source: ControlSource::Axis(index),
        }
    }

    pub fn button(label: &str, index: usize) -> Self {
        Self {
            label: label.to_string(),
            source: ControlSource::Button(index),
        }
    }
}

/// Named region of the controller, e.g. "Face Buttons"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlGroup {
    pub name: String,
    pub controls: Vec<ControlBinding>,
}

/// Label table for one physical controller layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub groups: Vec<ControlGroup>,
}

impl Default for Profile {
    fn default() -> Self {
        Self::steam_deck()
    }
}

impl Profile {
    /// Steam Deck numbering as reported by its SDL joystick device
    pub fn steam_deck() -> Self {
        let group = |name: &str, controls: Vec<ControlBinding>| ControlGroup {
            name: name.to_string(),
            controls,
        };

        Self {
            name: "Steam Deck".to_string(),
            groups: vec![
                group(
                    "D-Pad",
                    vec![
                        ControlBinding::button("Up", 11),
                        ControlBinding::button("Down", 12),
                        ControlBinding::button("Left", 13),
                        ControlBinding::button("Right", 14),
                    ],
                ),
                group(
                    "Face Buttons",
                    vec![
                        ControlBinding::button("A", 0),
                        ControlBinding::button("B", 1),
                        ControlBinding::button("X", 2),
                        ControlBinding::button("Y", 3),
                    ],
                ),
                group(
                    "Shoulders",
                    vec![
                        ControlBinding::button("L1", 9),
                        ControlBinding::button("R1", 10),
                        ControlBinding::axis("L2", 4),
                        ControlBinding::axis("R2", 5),
                    ],
                ),
                group(
                    "Sticks",
                    vec![
                        ControlBinding::axis("LX", 0),
                        ControlBinding::axis("LY", 1),
                        ControlBinding::axis("RX", 2),
                        ControlBinding::axis("RY", 3),
                        ControlBinding::button("L3", 7),
                        ControlBinding::button("R3", 8),
                    ],
                ),
                group(
                    "Back Grips",
                    vec![
                        ControlBinding::button("L4", 17),
                        ControlBinding::button("R4", 16),
                        ControlBinding::button("L5", 19),
                        ControlBinding::button("R5", 18),
                    ],
                ),
            ],
        }
    }

    pub fn group(&self, name: &str) -> Option<&ControlGroup> {
        self.groups.iter().find(|group| group.name == name)
    }

    fn bindings(&self) -> impl Iterator<Item = &ControlBinding> {
        self.groups.iter().flat_map(|group| group.controls.iter())
    }

    pub fn max_axis_index(&self) -> Option<usize> {
        self.bindings()
            .filter_map(|binding| match binding.source {
                ControlSource::Axis(index) => Some(index),
                ControlSource::Button(_) => None,
            })
            .max()
    }

    pub fn max_button_index(&self) -> Option<usize> {
        self.bindings()
            .filter_map(|binding| match binding.source {
                ControlSource::Button(index) => Some(index),
                ControlSource::Axis(_) => None,
            })
            .max()
    }

    /// Lists bindings that reference indices outside the given domain.
    ///
    /// Such bindings still project, they just always read 0.
    pub fn check_domain(&self, num_axes: usize, num_buttons: usize) -> Vec<String> {
        self.groups
            .iter()
            .flat_map(|group| {
                group.controls.iter().filter_map(move |binding| {
                    let limit = match binding.source {
                        ControlSource::Axis(_) => num_axes,
                        ControlSource::Button(_) => num_buttons,
                    };
                    (binding.source.index() >= limit).then(|| {
                        format!(
                            "{}/{} uses {} but only {} are tracked",
                            group.name, binding.label, binding.source, limit
                        )
                    })
                })
            })
            .collect()
    }
}

/// One labelled value of a projected group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlReading<'a> {
    pub label: &'a str,
    pub source: ControlSource,
    pub value: i32,
}

/// A group read out of a snapshot, in profile order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState<'a> {
    pub name: &'a str,
    pub readings: Vec<ControlReading<'a>>,
}

impl GroupState<'_> {
    pub fn get(&self, label: &str) -> Option<i32> {
        self.readings
            .iter()
            .find(|reading| reading.label == label)
            .map(|reading| reading.value)
    }
}

/// Stateless reader of snapshots through a [`Profile`]
#[derive(Debug, Clone)]
pub struct SemanticView {
    profile: Profile,
}

impl SemanticView {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Reads one group; `None` when the profile has no group of that name
    pub fn project<'a>(&'a self, snapshot: &Snapshot, group_name: &str) -> Option<GroupState<'a>> {
        self.profile
            .group(group_name)
            .map(|group| Self::read_group(group, snapshot))
    }

    pub fn project_all<'a>(&'a self, snapshot: &Snapshot) -> Vec<GroupState<'a>> {
        self.profile
            .groups
            .iter()
            .map(|group| Self::read_group(group, snapshot))
            .collect()
    }

    /// Raw data without labels
    pub fn full_state(&self, snapshot: Snapshot) -> Snapshot {
        snapshot
    }

    fn read_group<'a>(group: &'a ControlGroup, snapshot: &Snapshot) -> GroupState<'a> {
        GroupState {
            name: &group.name,
            readings: group
                .controls
                .iter()
                .map(|binding| ControlReading {
                    label: &binding.label,
                    source: binding.source,
                    value: binding.source.read(snapshot),
                })
                .collect(),
        }
    }
}

impl Default for SemanticView {
    fn default() -> Self {
        Self::new(Profile::steam_deck())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reducer::{RawEvent, StateReducer};

    fn snapshot_after(events: &[RawEvent]) -> Snapshot {
        let mut reducer = StateReducer::new(6, 20);
        reducer.apply(events);
        reducer.snapshot()
    }

    fn press(button_index: usize) -> RawEvent {
        RawEvent::ButtonChange {
            button_index,
            pressed: true,
        }
    }

    #[test]
    fn dpad_up_pressed() {
        let view = SemanticView::default();
        let snapshot = snapshot_after(&[press(11)]);

        let dpad = view.project(&snapshot, "D-Pad").unwrap();
        let values: Vec<(&str, i32)> = dpad
            .readings
            .iter()
            .map(|reading| (reading.label, reading.value))
            .collect();
        assert_eq!(
            values,
            vec![("Up", 1), ("Down", 0), ("Left", 0), ("Right", 0)]
        );
    }

    #[test]
    fn shoulders_mix_buttons_and_axes() {
        let view = SemanticView::default();
        let snapshot = snapshot_after(&[
            press(9),
            RawEvent::AxisMotion {
                axis_index: 4,
                value: -32768,
            },
            RawEvent::AxisMotion {
                axis_index: 5,
                value: 21530,
            },
        ]);

        let shoulders = view.project(&snapshot, "Shoulders").unwrap();
        assert_eq!(shoulders.get("L1"), Some(1));
        assert_eq!(shoulders.get("R1"), Some(0));
        assert_eq!(shoulders.get("L2"), Some(-32768));
        assert_eq!(shoulders.get("R2"), Some(21530));
    }

    #[test]
    fn back_grips_use_crossed_numbering() {
        let view = SemanticView::default();
        let snapshot = snapshot_after(&[press(16), press(19)]);

        let grips = view.project(&snapshot, "Back Grips").unwrap();
        assert_eq!(grips.get("R4"), Some(1));
        assert_eq!(grips.get("L5"), Some(1));
        assert_eq!(grips.get("L4"), Some(0));
        assert_eq!(grips.get("R5"), Some(0));
    }

    #[test]
    fn indices_beyond_domain_read_as_zero() {
        let mut reducer = StateReducer::new(2, 10);
        reducer.apply(&[press(17)]);
        let view = SemanticView::default();

        let grips = view.project(&reducer.snapshot(), "Back Grips").unwrap();
        assert!(grips.readings.iter().all(|reading| reading.value == 0));
        let sticks = view.project(&reducer.snapshot(), "Sticks").unwrap();
        assert_eq!(sticks.get("RY"), Some(0));
    }

    #[test]
    fn unknown_group_projects_nothing() {
        let view = SemanticView::default();
        assert!(view.project(&snapshot_after(&[]), "Paddles").is_none());
    }

    #[test]
    fn project_all_follows_profile_order() {
        let view = SemanticView::default();
        let names: Vec<&str> = view
            .project_all(&snapshot_after(&[]))
            .iter()
            .map(|group| group.name)
            .collect();
        assert_eq!(
            names,
            vec!["D-Pad", "Face Buttons", "Shoulders", "Sticks", "Back Grips"]
        );
    }

    #[test]
    fn full_state_passes_snapshot_through() {
        let snapshot = snapshot_after(&[press(2)]);
        assert_eq!(SemanticView::default().full_state(snapshot.clone()), snapshot);
    }

    #[test]
    fn steam_deck_profile_bounds() {
        let profile = Profile::steam_deck();
        assert_eq!(profile.max_axis_index(), Some(5));
        assert_eq!(profile.max_button_index(), Some(19));
        assert!(profile.check_domain(6, 20).is_empty());

        let degraded = profile.check_domain(6, 18);
        assert_eq!(degraded.len(), 2);
        assert!(degraded.iter().any(|line| line.starts_with("Back Grips/L5")));
    }

    #[test]
    fn profile_parses_from_toml() {
        let profile: Profile = toml::from_str(
            r#"
            name = "Arcade Stick"

            [[groups]]
            name = "Buttons"
            controls = [
                { label = "Punch", source = { button = 0 } },
                { label = "Lever X", source = { axis = 0 } },
            ]
            "#,
        )
        .unwrap();

        assert_eq!(profile.name, "Arcade Stick");
        let group = profile.group("Buttons").unwrap();
        assert_eq!(group.controls[0], ControlBinding::button("Punch", 0));
        assert_eq!(group.controls[1], ControlBinding::axis("Lever X", 0));
    }
}
