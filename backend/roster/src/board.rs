//! # Leaderboard
//!
//! Holds one roster snapshot plus the view selector and renders the active
//! board. Ranks are recomputed from scratch on every render.
use serde::Serialize;

use crate::{
    rank::{RankedEntry, rank},
    records::UserScoreRecord,
    view::{Selection, ViewControl, ViewMode, ViewSelector},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub id: String,
    pub name: String,
    pub title: String,
    pub avatar: String,
    pub score: Option<i64>,
    pub groups: Vec<String>,
}

impl LeaderboardRow {
    fn from_entry(entry: &RankedEntry, view: ViewMode) -> Self {
        Self {
            rank: entry.rank,
            id: entry.record.id.clone(),
            name: entry.record.name.clone(),
            title: entry.record.title.clone(),
            avatar: entry.record.avatar.clone(),
            score: entry.score(view),
            groups: entry.record.groups.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardPage {
    pub view: ViewMode,
    pub controls: [ViewControl; 3],
    pub entries: Vec<LeaderboardRow>,
}

#[derive(Debug, Clone, Default)]
pub struct Leaderboard {
    roster: Vec<UserScoreRecord>,
    selector: ViewSelector,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roster(roster: Vec<UserScoreRecord>) -> Self {
        Self {
            roster,
            selector: ViewSelector::new(),
        }
    }

    /// Swaps the whole snapshot. Returns the previous one.
    pub fn replace_roster(&mut self, roster: Vec<UserScoreRecord>) -> Vec<UserScoreRecord> {
        std::mem::replace(&mut self.roster, roster)
    }

    pub fn active_view(&self) -> ViewMode {
        self.selector.active_view()
    }

    pub fn select(&mut self, view: ViewMode) -> Selection {
        self.selector.select(view)
    }

    pub fn controls(&self) -> [ViewControl; 3] {
        self.selector.controls()
    }

    pub fn ranked(&self) -> Vec<RankedEntry<'_>> {
        rank(&self.roster, self.active_view())
    }

    pub fn render(&self) -> LeaderboardPage {
        let view = self.active_view();

        LeaderboardPage {
            view,
            controls: self.controls(),
            entries: self
                .ranked()
                .iter()
                .map(|entry| LeaderboardRow::from_entry(entry, view))
                .collect(),
        }
    }
}
