//! # Forms
//!
//! Submissions checked locally before they are dispatched to a cloud function.
//! Error messages are shown to the user as-is.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::records::Role;

pub const MAX_NAME_LEN: usize = 10;
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Name cannot be empty and cannot be longer than 10 characters.")]
    InvalidName,

    #[error("Surname cannot be empty and cannot be longer than 10 characters.")]
    InvalidSurname,

    #[error("Please enter a valid email")]
    MissingEmail,

    #[error("Password must be longer than 8 characters")]
    ShortPassword,

    #[error("Score cannot be a negative number")]
    NegativeScore,

    #[error("Please select a user.")]
    NoUserSelected,

    #[error("Score change cannot be zero.")]
    ZeroScoreChange,

    #[error("Please select a user to send score to.")]
    NoReceiver,

    #[error("Please select a valid receiver.")]
    InvalidReceiver,

    #[error("You cannot send score to yourself.")]
    SelfTransfer,

    #[error("Score can only be sent to members.")]
    CoachReceiver,

    #[error("Please enter a score.")]
    NonPositiveScore,

    #[error("You can only transfer score to users with at least one common group.")]
    NoCommonGroup,

    #[error("Please enter your old password.")]
    MissingOldPassword,

    #[error("Your old password is incorrect.")]
    WrongOldPassword,

    #[error("Passwords do not match.")]
    PasswordMismatch,

    #[error("Reset token is missing.")]
    MissingToken,

    #[error("Please select an avatar.")]
    NoAvatarSelected,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub group_names: Vec<String>,
    pub role_name: Role,
    #[serde(default)]
    pub user_score: i64,
}

impl Registration {
    pub fn validate(mut self) -> Result<Self, FormError> {
        self.name = self.name.trim().to_string();
        self.surname = self.surname.trim().to_string();
        self.email = self.email.trim().to_string();

        if !name_fits(&self.name) {
            return Err(FormError::InvalidName);
        }
        if !name_fits(&self.surname) {
            return Err(FormError::InvalidSurname);
        }
        if self.email.is_empty() {
            return Err(FormError::MissingEmail);
        }
        check_password(&self.password)?;
        if self.user_score < 0 {
            return Err(FormError::NegativeScore);
        }

        self.group_names = dedup_groups(self.group_names);

        Ok(self)
    }
}

fn name_fits(name: &str) -> bool {
    let len = name.chars().count();
    len > 0 && len <= MAX_NAME_LEN
}

fn check_password(password: &str) -> Result<(), FormError> {
    if password.trim().chars().count() < MIN_PASSWORD_LEN {
        return Err(FormError::ShortPassword);
    }

    Ok(())
}

/// Trims, drops blanks and repeats, keeps first-seen order.
pub fn dedup_groups(groups: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(groups.len());

    for group in groups {
        let group = group.trim();
        if !group.is_empty() && !out.iter().any(|seen| seen == group) {
            out.push(group.to_string());
        }
    }

    out
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAdjustment {
    pub display_name: String,
    pub score: i64,
}

impl ScoreAdjustment {
    pub fn validate(mut self) -> Result<Self, FormError> {
        self.display_name = self.display_name.trim().to_string();

        if self.display_name.is_empty() {
            return Err(FormError::NoUserSelected);
        }
        if self.score == 0 {
            return Err(FormError::ZeroScoreChange);
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEdit {
    pub display_name: String,
    #[serde(default)]
    pub group_names: Vec<String>,
}

impl GroupEdit {
    pub fn validate(mut self) -> Result<Self, FormError> {
        self.display_name = self.display_name.trim().to_string();

        if self.display_name.is_empty() {
            return Err(FormError::NoUserSelected);
        }

        self.group_names = dedup_groups(self.group_names);

        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub receiver_id: String,
    pub score: i64,
}

impl Transfer {
    pub fn validate(mut self, sender_id: &str) -> Result<Self, FormError> {
        self.receiver_id = self.receiver_id.trim().to_string();

        if self.receiver_id.is_empty() {
            return Err(FormError::NoReceiver);
        }
        if !is_object_id(&self.receiver_id) {
            return Err(FormError::InvalidReceiver);
        }
        if self.receiver_id == sender_id {
            return Err(FormError::SelfTransfer);
        }
        if self.score <= 0 {
            return Err(FormError::NonPositiveScore);
        }

        Ok(self)
    }
}

/// Backend object ids are plain alphanumerics.
pub fn is_object_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn check_common_group(sender: &[String], receiver: &[String]) -> Result<(), FormError> {
    if sender.iter().any(|group| receiver.contains(group)) {
        Ok(())
    } else {
        Err(FormError::NoCommonGroup)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdate {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordUpdate {
    pub fn validate(self) -> Result<Self, FormError> {
        if self.old_password.is_empty() {
            return Err(FormError::MissingOldPassword);
        }
        check_password(&self.new_password)?;
        if self.new_password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordReset {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordReset {
    pub fn validate(self) -> Result<Self, FormError> {
        if self.token.trim().is_empty() {
            return Err(FormError::MissingToken);
        }
        if self.new_password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        check_password(&self.new_password)?;

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "  Ana ".to_string(),
            surname: "Kovač".to_string(),
            email: "ana@club.org".to_string(),
            password: "longenough".to_string(),
            group_names: vec!["U12".to_string(), " U12".to_string(), "".to_string()],
            role_name: Role::Member,
            user_score: 0,
        }
    }

    #[test]
    fn registration_normalizes() {
        let form = registration().validate().unwrap();

        assert_eq!(form.name, "Ana");
        assert_eq!(form.group_names, vec!["U12"]);
    }

    #[test]
    fn registration_checks_in_order() {
        let mut form = registration();
        form.name = "Bartholomew".to_string();
        assert_eq!(form.validate(), Err(FormError::InvalidName));

        let mut form = registration();
        form.surname = "   ".to_string();
        assert_eq!(form.validate(), Err(FormError::InvalidSurname));

        let mut form = registration();
        form.email = " ".to_string();
        assert_eq!(form.validate(), Err(FormError::MissingEmail));

        let mut form = registration();
        form.password = " short  ".to_string();
        assert_eq!(form.validate(), Err(FormError::ShortPassword));

        let mut form = registration();
        form.user_score = -1;
        assert_eq!(form.validate(), Err(FormError::NegativeScore));
    }

    #[test]
    fn name_length_counts_characters() {
        let mut form = registration();
        form.surname = "ĆĆĆĆĆĆĆĆĆĆ".to_string();

        assert!(form.validate().is_ok());
    }

    #[test]
    fn registration_reads_camel_case() {
        let form: Registration = serde_json::from_str(
            r#"{"name":"Ana","surname":"K","email":"a@b","password":"12345678","roleName":"coach"}"#,
        )
        .unwrap();

        assert_eq!(form.role_name, Role::Coach);
        assert!(form.group_names.is_empty());
        assert_eq!(form.user_score, 0);
    }

    #[test]
    fn score_adjustment_rules() {
        let form = ScoreAdjustment {
            display_name: "".to_string(),
            score: 3,
        };
        assert_eq!(form.validate(), Err(FormError::NoUserSelected));

        let form = ScoreAdjustment {
            display_name: "Ana K".to_string(),
            score: 0,
        };
        assert_eq!(form.validate(), Err(FormError::ZeroScoreChange));

        let form = ScoreAdjustment {
            display_name: "Ana K".to_string(),
            score: -5,
        };
        assert!(form.validate().is_ok());
    }

    #[test]
    fn transfer_rules() {
        let transfer = |receiver: &str, score| Transfer {
            receiver_id: receiver.to_string(),
            score,
        };

        assert_eq!(transfer("", 1).validate("me"), Err(FormError::NoReceiver));
        assert_eq!(transfer("me", 1).validate("me"), Err(FormError::SelfTransfer));
        assert_eq!(
            transfer("you", 0).validate("me"),
            Err(FormError::NonPositiveScore)
        );
        assert!(transfer("you", 2).validate("me").is_ok());
        assert_eq!(
            transfer(" me ", 1).validate("me"),
            Err(FormError::SelfTransfer)
        );
    }

    #[test]
    fn transfer_receiver_must_be_an_object_id() {
        let transfer = |receiver: &str| Transfer {
            receiver_id: receiver.to_string(),
            score: 1,
        };

        for receiver in ["../../users/me", "a/b", "a?where=1", "a%2Fb", "..", "ab cd"] {
            assert_eq!(
                transfer(receiver).validate("me"),
                Err(FormError::InvalidReceiver),
                "{receiver}"
            );
        }
        assert!(transfer("x7Gk2LmQ9p").validate("me").is_ok());
    }

    #[test]
    fn common_group() {
        let sender = vec!["A".to_string(), "B".to_string()];

        assert!(check_common_group(&sender, &["B".to_string()]).is_ok());
        assert_eq!(
            check_common_group(&sender, &["C".to_string()]),
            Err(FormError::NoCommonGroup)
        );
        assert_eq!(check_common_group(&[], &[]), Err(FormError::NoCommonGroup));
    }

    #[test]
    fn password_update_rules() {
        let update = |old: &str, new: &str, confirm: &str| PasswordUpdate {
            old_password: old.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        };

        assert_eq!(
            update("", "newpassword", "newpassword").validate(),
            Err(FormError::MissingOldPassword)
        );
        assert_eq!(
            update("old", "short", "short").validate(),
            Err(FormError::ShortPassword)
        );
        assert_eq!(
            update("old", "newpassword", "newpasswort").validate(),
            Err(FormError::PasswordMismatch)
        );
        assert!(update("old", "newpassword", "newpassword").validate().is_ok());
    }

    #[test]
    fn password_reset_rules() {
        let reset = |token: &str, new: &str, confirm: &str| PasswordReset {
            token: token.to_string(),
            new_password: new.to_string(),
            confirm_password: confirm.to_string(),
        };

        assert_eq!(
            reset(" ", "newpassword", "newpassword").validate(),
            Err(FormError::MissingToken)
        );
        assert_eq!(
            reset("t", "newpassword", "other").validate(),
            Err(FormError::PasswordMismatch)
        );
        assert!(reset("t", "newpassword", "newpassword").validate().is_ok());
    }
}
