//! Achievement references: the authoritative workflow record of an achievement
use super::achievement::{ContentId, TimeStamp};
use super::error::{TransitionError, ValidationError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum AchievementStatus {
    #[n(0)]
    Draft,
    #[n(1)]
    Submitted,
    #[n(2)]
    Verified,
    #[n(3)]
    Rejected,
}

impl AchievementStatus {
    pub const ALL: [AchievementStatus; 4] = [
        AchievementStatus::Draft,
        AchievementStatus::Submitted,
        AchievementStatus::Verified,
        AchievementStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementStatus::Draft => "draft",
            AchievementStatus::Submitted => "submitted",
            AchievementStatus::Verified => "verified",
            AchievementStatus::Rejected => "rejected",
        }
    }

    /// Verified and rejected achievements accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, AchievementStatus::Verified | AchievementStatus::Rejected)
    }
}

impl FromStr for AchievementStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidStatus(s.to_string()))
    }
}

impl fmt::Display for AchievementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, minicbor::Encode, minicbor::Decode)]
pub struct AchievementReference {
    #[n(0)]
    pub id: String, // bech32m, prefix `ref`
    #[n(1)]
    pub student_id: String,
    #[n(2)]
    pub content_id: ContentId,
    #[n(3)]
    pub status: AchievementStatus,
    #[n(4)]
    pub submitted_at: Option<TimeStamp>,
    #[n(5)]
    pub verified_at: Option<TimeStamp>,
    #[n(6)]
    pub verified_by: Option<String>, // lecturer id
    #[n(7)]
    pub rejection_note: Option<String>,
    #[n(8)]
    pub created_at: TimeStamp,
    #[n(9)]
    pub updated_at: TimeStamp,
}

impl AchievementReference {
    pub fn new_draft(id: String, student_id: String, content_id: ContentId, now: TimeStamp) -> Self {
        Self {
            id,
            student_id,
            content_id,
            status: AchievementStatus::Draft,
            submitted_at: None,
            verified_at: None,
            verified_by: None,
            rejection_note: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn require(&self, expected: AchievementStatus, to: AchievementStatus) -> Result<(), TransitionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status,
                to,
            })
        }
    }

    /// draft -> submitted
    pub fn submitted(&self, at: TimeStamp) -> Result<Self, TransitionError> {
        self.require(AchievementStatus::Draft, AchievementStatus::Submitted)?;

        Ok(Self {
            status: AchievementStatus::Submitted,
            submitted_at: Some(at),
            updated_at: at,
            ..self.clone()
        })
    }

    /// submitted -> verified
    pub fn verified(&self, lecturer_id: &str, at: TimeStamp) -> Result<Self, TransitionError> {
        self.require(AchievementStatus::Submitted, AchievementStatus::Verified)?;

        Ok(Self {
            status: AchievementStatus::Verified,
            verified_at: Some(at),
            verified_by: Some(lecturer_id.to_string()),
            rejection_note: None,
            updated_at: at,
            ..self.clone()
        })
    }

    /// submitted -> rejected
    pub fn rejected(&self, note: &str, at: TimeStamp) -> Result<Self, TransitionError> {
        self.require(AchievementStatus::Submitted, AchievementStatus::Rejected)?;

        Ok(Self {
            status: AchievementStatus::Rejected,
            rejection_note: Some(note.to_string()),
            verified_at: None,
            verified_by: None,
            updated_at: at,
            ..self.clone()
        })
    }

    pub fn is_deletable(&self) -> bool {
        self.status == AchievementStatus::Draft
    }

    /// Checks that the audit fields agree with the status
    pub fn audit_fields_consistent(&self) -> bool {
        let decided = self.verified_at.is_some() || self.verified_by.is_some();
        match self.status {
            AchievementStatus::Draft => {
                self.submitted_at.is_none() && !decided && self.rejection_note.is_none()
            }
            AchievementStatus::Submitted => {
                self.submitted_at.is_some() && !decided && self.rejection_note.is_none()
            }
            AchievementStatus::Verified => {
                self.verified_at.is_some()
                    && self.verified_by.is_some()
                    && self.rejection_note.is_none()
            }
            AchievementStatus::Rejected => self.rejection_note.is_some() && !decided,
        }
    }
}
