//! # Records
//!
//! Typed snapshot of a club user as the leaderboard sees it.
//!
//! The BaaS hands back loosely shaped `_User` objects. Everything is checked
//! and converted here so the ranking code only ever sees a `UserScoreRecord`.
//!
//! ## Remote Shape
//! - objectId: **string**, required
//! - displayName, title: **string**, default empty
//! - avatar: pointer with `file.url`, a bare `url`, or a plain string
//! - userScore, yearlyScore, monthlyScore: **number**, absent if not numeric
//! - groupNames: list of **string**, a single **string**, or missing
//! - roleName: `"coach"` or anything else (member)
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub const FIELD_ID: &str = "objectId";
pub const FIELD_NAME: &str = "displayName";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_AVATAR: &str = "avatar";
pub const FIELD_ALL_TIME: &str = "userScore";
pub const FIELD_YEARLY: &str = "yearlyScore";
pub const FIELD_MONTHLY: &str = "monthlyScore";
pub const FIELD_GROUPS: &str = "groupNames";
pub const FIELD_ROLE: &str = "roleName";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record is not an object")]
    NotAnObject,

    #[error("Record has no objectId")]
    MissingId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Coach,
}

impl Role {
    pub fn from_remote(role_name: Option<&str>) -> Self {
        match role_name {
            Some("coach") => Role::Coach,
            Some("member") => Role::Member,
            Some(other) => {
                warn!("Unknown role {other:?}, treating as member");
                Role::Member
            }
            None => Role::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Coach => "coach",
        }
    }
}

/// Three independent score counters. `None` means the backend did not send a
/// usable number for that counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub all_time: Option<i64>,
    pub yearly: Option<i64>,
    pub monthly: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserScoreRecord {
    pub id: String,
    pub name: String,
    pub title: String,
    pub avatar: String,
    pub scores: Scores,
    pub groups: Vec<String>,
    pub role: Role,
}

impl UserScoreRecord {
    pub fn from_remote(value: &Value) -> Result<Self, RecordError> {
        let object = value.as_object().ok_or(RecordError::NotAnObject)?;

        let id = object
            .get(FIELD_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or(RecordError::MissingId)?
            .to_string();

        Ok(Self {
            id,
            name: string_field(object.get(FIELD_NAME)),
            title: string_field(object.get(FIELD_TITLE)),
            avatar: avatar_url(object.get(FIELD_AVATAR)),
            scores: Scores {
                all_time: score_field(object.get(FIELD_ALL_TIME)),
                yearly: score_field(object.get(FIELD_YEARLY)),
                monthly: score_field(object.get(FIELD_MONTHLY)),
            },
            groups: group_names(object.get(FIELD_GROUPS)),
            role: Role::from_remote(object.get(FIELD_ROLE).and_then(Value::as_str)),
        })
    }

    pub fn is_member(&self) -> bool {
        self.role == Role::Member
    }
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Integers pass through, finite floats truncate toward zero, everything else is absent.
pub fn score_field(value: Option<&Value>) -> Option<i64> {
    let Value::Number(number) = value? else {
        return None;
    };

    if let Some(score) = number.as_i64() {
        return Some(score);
    }

    number
        .as_f64()
        .filter(|score| score.is_finite())
        .map(|score| score.trunc() as i64)
}

fn avatar_url(value: Option<&Value>) -> String {
    let Some(value) = value else {
        return String::new();
    };

    if let Some(url) = value.as_str() {
        return url.to_string();
    }

    value
        .pointer("/file/url")
        .or_else(|| value.get("url"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

pub fn group_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(group)) if !group.is_empty() => vec![group.clone()],
        Some(Value::Array(groups)) => groups
            .iter()
            .filter_map(Value::as_str)
            .filter(|group| !group.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Whole roster snapshot from one fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    pub records: Vec<UserScoreRecord>,
}

impl Roster {
    /// Bad entries are skipped so one broken user cannot blank the board.
    pub fn from_remote(results: &[Value]) -> Self {
        let records = results
            .iter()
            .enumerate()
            .filter_map(|(index, value)| match UserScoreRecord::from_remote(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping roster entry {index}: {e}");
                    None
                }
            })
            .collect();

        Self { records }
    }

    /// Coaches are not ranked.
    pub fn members(self) -> Vec<UserScoreRecord> {
        self.records
            .into_iter()
            .filter(UserScoreRecord::is_member)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn record(
    id: &str,
    all_time: Option<i64>,
    yearly: Option<i64>,
    monthly: Option<i64>,
) -> UserScoreRecord {
    UserScoreRecord {
        id: id.to_string(),
        name: id.to_uppercase(),
        title: String::new(),
        avatar: String::new(),
        scores: Scores {
            all_time,
            yearly,
            monthly,
        },
        groups: Vec::new(),
        role: Role::Member,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn converts_full_user() {
        let value = json!({
            "objectId": "u1",
            "displayName": "Ana K",
            "title": "Captain",
            "avatar": { "file": { "__type": "File", "url": "https://cdn/a.png" } },
            "userScore": 42,
            "yearlyScore": -3,
            "monthlyScore": 7,
            "groupNames": ["U12", "Seniors"],
            "roleName": "member"
        });

        let record = UserScoreRecord::from_remote(&value).unwrap();

        assert_eq!(record.id, "u1");
        assert_eq!(record.name, "Ana K");
        assert_eq!(record.title, "Captain");
        assert_eq!(record.avatar, "https://cdn/a.png");
        assert_eq!(
            record.scores,
            Scores {
                all_time: Some(42),
                yearly: Some(-3),
                monthly: Some(7)
            }
        );
        assert_eq!(record.groups, vec!["U12", "Seniors"]);
        assert_eq!(record.role, Role::Member);
    }

    #[test]
    fn missing_fields_degrade() {
        let value = json!({ "objectId": "u2", "userScore": "12", "monthlyScore": null });

        let record = UserScoreRecord::from_remote(&value).unwrap();

        assert_eq!(record.name, "");
        assert_eq!(record.avatar, "");
        assert_eq!(record.scores, Scores::default());
        assert!(record.groups.is_empty());
        assert_eq!(record.role, Role::Member);
    }

    #[test]
    fn floats_truncate() {
        assert_eq!(score_field(Some(&json!(9.9))), Some(9));
        assert_eq!(score_field(Some(&json!(-2.5))), Some(-2));
        assert_eq!(score_field(Some(&json!(true))), None);
    }

    #[test]
    fn single_group_string_becomes_list() {
        assert_eq!(group_names(Some(&json!("U14"))), vec!["U14"]);
        assert!(group_names(Some(&json!(""))).is_empty());
        assert_eq!(group_names(Some(&json!(["A", 3, "", "B"]))), vec!["A", "B"]);
    }

    #[test]
    fn rejects_missing_id() {
        assert_eq!(
            UserScoreRecord::from_remote(&json!({ "objectId": "" })),
            Err(RecordError::MissingId)
        );
        assert_eq!(
            UserScoreRecord::from_remote(&json!([1, 2])),
            Err(RecordError::NotAnObject)
        );
    }

    #[test]
    fn roster_skips_bad_entries_and_drops_coaches() {
        let results = vec![
            json!({ "objectId": "a", "roleName": "member" }),
            json!({ "displayName": "no id" }),
            json!({ "objectId": "c", "roleName": "coach" }),
            json!({ "objectId": "d", "roleName": "parent" }),
        ];

        let roster = Roster::from_remote(&results);
        assert_eq!(roster.len(), 3);

        let members: Vec<String> = roster.members().into_iter().map(|r| r.id).collect();
        assert_eq!(members, vec!["a", "d"]);
    }
}
