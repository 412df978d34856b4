//! Statistics over the achievements a principal may see
//!
//! Status counts and the student ranking come straight from the ledger. The
//! breakdowns by type, period and competition level are computed by the
//! content store over the content ids of the eligible references.
use super::achievement::ContentId;
use super::auth::{Permission, Principal, Role};
use super::error::WorkflowError;
use super::identity::IdentityDirectory;
use super::reference::AchievementStatus;
use super::store::ledger::tally_status;
use super::store::{ContentStore, ReferenceLedger, ReferenceScope, StudentTally};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Size of the verified-achievement ranking
pub const TOP_STUDENTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementStatistics {
    pub total: u64,
    pub by_status: BTreeMap<AchievementStatus, u64>,
    pub by_type: BTreeMap<String, u64>,
    pub by_period: BTreeMap<String, u64>,
    pub by_competition_level: BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_students: Option<Vec<StudentTally>>,
}

impl AchievementStatistics {
    fn empty(ranked: bool) -> Self {
        Self {
            total: 0,
            by_status: tally_status(&[]),
            by_type: BTreeMap::new(),
            by_period: BTreeMap::new(),
            by_competition_level: BTreeMap::new(),
            top_students: ranked.then(Vec::new),
        }
    }
}

pub struct StatisticsAggregator {
    directory: Arc<dyn IdentityDirectory>,
    contents: Arc<dyn ContentStore>,
    ledger: Arc<dyn ReferenceLedger>,
}

impl StatisticsAggregator {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        contents: Arc<dyn ContentStore>,
        ledger: Arc<dyn ReferenceLedger>,
    ) -> Self {
        Self {
            directory,
            contents,
            ledger,
        }
    }

    /// Statistics over the calling student's own achievements
    pub fn my_statistics(&self, principal: &Principal) -> Result<AchievementStatistics, WorkflowError> {
        let student = self
            .directory
            .resolve_student(&principal.user_id)?
            .ok_or_else(|| WorkflowError::forbidden("User is not a student or the student record was not found"))?;

        self.aggregate(&ReferenceScope::students([student.id]), false)
    }

    /// Statistics over every advisee of the calling lecturer
    pub fn advisee_statistics(&self, principal: &Principal) -> Result<AchievementStatistics, WorkflowError> {
        principal.require(Permission::VerifyAchievements)?;
        let lecturer = self
            .directory
            .resolve_lecturer(&principal.user_id)?
            .ok_or_else(|| WorkflowError::forbidden("User is not a lecturer or the lecturer record was not found"))?;

        let advisees = self.directory.advisees(&lecturer.id)?;
        let scope = ReferenceScope::students(advisees.into_iter().map(|student| student.id));
        self.aggregate(&scope, true)
    }

    /// Statistics over the whole ledger, for administrators
    pub fn all_statistics(&self, principal: &Principal) -> Result<AchievementStatistics, WorkflowError> {
        principal.require_role(Role::Admin)?;
        principal.require(Permission::ReadAchievements)?;
        self.aggregate(&ReferenceScope::All, true)
    }

    fn aggregate(&self, scope: &ReferenceScope, ranked: bool) -> Result<AchievementStatistics, WorkflowError> {
        if scope.is_empty() {
            return Ok(AchievementStatistics::empty(ranked));
        }

        let references = self.ledger.scan(scope)?;
        if references.is_empty() {
            return Ok(AchievementStatistics::empty(ranked));
        }

        let ids: Vec<ContentId> = references.iter().map(|r| r.content_id.clone()).collect();
        let top_students = if ranked {
            Some(self.ledger.top_students(scope, TOP_STUDENTS, AchievementStatus::Verified)?)
        } else {
            None
        };
        let stats = AchievementStatistics {
            total: references.len() as u64,
            by_status: self.ledger.count_by_status(scope)?,
            by_type: self.contents.count_by_type(&ids)?,
            by_period: self.contents.count_by_period(&ids)?,
            by_competition_level: self.contents.count_by_competition_level(&ids)?,
            top_students,
        };

        tracing::debug!(total = stats.total, "statistics aggregated");
        Ok(stats)
    }
}
