//! # View Selector
//!
//! Exactly one of the three boards is visible at a time.
//!
//! - Starts on all-time
//! - Selecting a view always lands on that view, there are no in-between states
//! - Selecting the view already shown changes nothing
//! - The control for the shown view reports itself disabled
use serde::{Deserialize, Serialize};

use crate::records::Scores;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    AllTime,
    Yearly,
    Monthly,
}

impl ViewMode {
    pub const ALL: [ViewMode; 3] = [ViewMode::AllTime, ViewMode::Yearly, ViewMode::Monthly];

    /// Score counter this view ranks by.
    pub fn score(&self, scores: &Scores) -> Option<i64> {
        match self {
            ViewMode::AllTime => scores.all_time,
            ViewMode::Yearly => scores.yearly,
            ViewMode::Monthly => scores.monthly,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::AllTime => "All time",
            ViewMode::Yearly => "Yearly",
            ViewMode::Monthly => "Monthly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Selection {
    Changed { from: ViewMode, to: ViewMode },
    Unchanged,
}

impl Selection {
    pub fn changed(&self) -> bool {
        matches!(self, Selection::Changed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewControl {
    pub view: ViewMode,
    pub label: &'static str,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewSelector {
    active: ViewMode,
}

impl ViewSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_view(&self) -> ViewMode {
        self.active
    }

    pub fn select(&mut self, view: ViewMode) -> Selection {
        if self.active == view {
            return Selection::Unchanged;
        }

        let from = self.active;
        self.active = view;

        Selection::Changed { from, to: view }
    }

    pub fn controls(&self) -> [ViewControl; 3] {
        ViewMode::ALL.map(|view| ViewControl {
            view,
            label: view.label(),
            disabled: view == self.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_all_time() {
        assert_eq!(ViewSelector::new().active_view(), ViewMode::AllTime);
    }

    #[test]
    fn reselecting_is_a_no_op() {
        let mut selector = ViewSelector::new();

        assert_eq!(
            selector.select(ViewMode::Monthly),
            Selection::Changed {
                from: ViewMode::AllTime,
                to: ViewMode::Monthly
            }
        );
        assert_eq!(selector.select(ViewMode::Monthly), Selection::Unchanged);
        assert_eq!(selector.active_view(), ViewMode::Monthly);
    }

    #[test]
    fn only_active_control_is_disabled() {
        let mut selector = ViewSelector::new();

        for view in ViewMode::ALL {
            selector.select(view);

            let controls = selector.controls();
            let disabled: Vec<ViewMode> = controls
                .iter()
                .filter(|control| control.disabled)
                .map(|control| control.view)
                .collect();

            assert_eq!(disabled, vec![view]);
        }
    }

    #[test]
    fn wire_names() {
        assert_eq!(
            serde_json::to_string(&ViewMode::AllTime).unwrap(),
            "\"all-time\""
        );
        assert_eq!(
            serde_json::from_str::<ViewMode>("\"monthly\"").unwrap(),
            ViewMode::Monthly
        );
        assert!(serde_json::from_str::<ViewMode>("\"weekly\"").is_err());
    }
}
