//! Service layer API for the achievement verification workflow
//!
//! Every operation resolves the caller through the identity directory, checks
//! its preconditions against the reference ledger and only then writes. The
//! content store and the ledger do not share a transaction, so multi-store
//! operations order their writes and undo the first one when the second fails:
//!
//! * create writes content, then the reference; a failed reference insert
//!   hard-deletes the new content.
//! * delete soft-deletes content, then removes the reference; if the reference
//!   changed in the meantime the content is restored, unless the reference is
//!   already gone.
use super::achievement::{AchievementContent, AchievementDraft, ContentId, TimeStamp};
use super::auth::{Permission, Principal};
use super::error::{StoreError, TransitionError, ValidationError, WorkflowError};
use super::identity::{IdentityDirectory, Lecturer, Student};
use super::notify::{AdvisorNotifier, LogNotifier};
use super::page::{ListQuery, Page};
use super::reference::{AchievementReference, AchievementStatus};
use super::store::{ContentStore, ReferenceFilter, ReferenceLedger};
use super::utils;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Reference and content of one achievement, joined on the content id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AchievementView {
    pub reference_id: String,
    pub achievement_id: ContentId,
    pub student_id: String,
    pub status: AchievementStatus,
    pub submitted_at: Option<TimeStamp>,
    pub verified_at: Option<TimeStamp>,
    pub verified_by: Option<String>,
    pub rejection_note: Option<String>,
    pub created_at: TimeStamp,
    pub updated_at: TimeStamp,
    pub achievement: AchievementContent,
}

impl AchievementView {
    pub fn merge(reference: AchievementReference, content: AchievementContent) -> Self {
        Self {
            reference_id: reference.id,
            achievement_id: reference.content_id,
            student_id: reference.student_id,
            status: reference.status,
            submitted_at: reference.submitted_at,
            verified_at: reference.verified_at,
            verified_by: reference.verified_by,
            rejection_note: reference.rejection_note,
            created_at: reference.created_at,
            updated_at: reference.updated_at,
            achievement: content,
        }
    }
}

pub struct AchievementService {
    directory: Arc<dyn IdentityDirectory>,
    contents: Arc<dyn ContentStore>,
    ledger: Arc<dyn ReferenceLedger>,
    notifier: Arc<dyn AdvisorNotifier>,
}

impl AchievementService {
    pub fn new(
        directory: Arc<dyn IdentityDirectory>,
        contents: Arc<dyn ContentStore>,
        ledger: Arc<dyn ReferenceLedger>,
    ) -> Self {
        Self {
            directory,
            contents,
            ledger,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn AdvisorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn student_for(&self, principal: &Principal) -> Result<Student, WorkflowError> {
        self.directory
            .resolve_student(&principal.user_id)?
            .ok_or_else(|| WorkflowError::forbidden("User is not a student or the student record was not found"))
    }

    fn lecturer_for(&self, principal: &Principal) -> Result<Lecturer, WorkflowError> {
        self.directory
            .resolve_lecturer(&principal.user_id)?
            .ok_or_else(|| WorkflowError::forbidden("User is not a lecturer or the lecturer record was not found"))
    }

    fn reference_for(&self, content_id: &ContentId) -> Result<AchievementReference, WorkflowError> {
        self.ledger
            .get_by_content_id(content_id)?
            .ok_or_else(|| WorkflowError::not_found("Achievement not found"))
    }

    /// Precondition chain shared by the student operations:
    /// valid id, caller is a student, reference exists, caller owns it.
    fn owned_reference(
        &self,
        principal: &Principal,
        raw_id: &str,
    ) -> Result<(Student, AchievementReference), WorkflowError> {
        let content_id = ContentId::parse(raw_id)?;
        let student = self.student_for(principal)?;
        let reference = self.reference_for(&content_id)?;

        if reference.student_id != student.id {
            return Err(WorkflowError::forbidden(
                "You do not have access to this achievement",
            ));
        }
        Ok((student, reference))
    }

    /// Precondition chain shared by verify and reject:
    /// valid id, caller is a lecturer, reference exists, it is submitted,
    /// and the caller is the owning student's assigned advisor.
    fn advised_reference(
        &self,
        principal: &Principal,
        raw_id: &str,
    ) -> Result<(Lecturer, AchievementReference), WorkflowError> {
        let content_id = ContentId::parse(raw_id)?;
        let lecturer = self.lecturer_for(principal)?;
        let reference = self.reference_for(&content_id)?;

        if reference.status != AchievementStatus::Submitted {
            return Err(WorkflowError::invalid_transition(
                "Only submitted achievements can be verified or rejected",
                reference.status,
            ));
        }

        let owner = self.directory.student(&reference.student_id)?;
        if !owner.is_some_and(|student| student.is_advised_by(&lecturer)) {
            return Err(WorkflowError::forbidden(
                "You are not the assigned advisor of this student",
            ));
        }
        Ok((lecturer, reference))
    }

    fn transition_error(message: &str) -> impl FnOnce(TransitionError) -> WorkflowError + '_ {
        move |err| WorkflowError::invalid_transition(message, err.from)
    }

    /// Explains a refused optimistic write using the row as it is now
    fn stale(&self, read: &AchievementReference) -> WorkflowError {
        match self.ledger.get(&read.id) {
            Ok(latest) => Self::superseded(latest),
            Err(err) => err.into(),
        }
    }

    fn superseded(latest: Option<AchievementReference>) -> WorkflowError {
        match latest {
            Some(latest) => WorkflowError::invalid_transition(
                "Achievement was changed by another request",
                latest.status,
            ),
            None => WorkflowError::not_found("Achievement not found"),
        }
    }

    fn commit(
        &self,
        current: &AchievementReference,
        next: AchievementReference,
    ) -> Result<AchievementReference, WorkflowError> {
        match self.ledger.update(current, &next) {
            Ok(()) => Ok(next),
            Err(StoreError::Stale) => Err(self.stale(current)),
            Err(err) => Err(err.into()),
        }
    }

    /// Create a new draft achievement for the calling student
    pub fn create_achievement(
        &self,
        principal: &Principal,
        draft: AchievementDraft,
    ) -> Result<AchievementView, WorkflowError> {
        principal.require(Permission::WriteAchievements)?;
        let body = draft.validate_and_finalise()?;
        let student = self.student_for(principal)?;
        let reference_id = utils::new_uuid_to_bech32("ref").map_err(StoreError::encode)?;

        let content = self.contents.insert(&student.id, body)?;
        let reference = AchievementReference::new_draft(
            reference_id,
            student.id.clone(),
            content.id.clone(),
            content.created_at,
        );

        if let Err(err) = self.ledger.insert(&reference) {
            tracing::error!(content_id = %content.id, error = %err, "reference insert failed, removing content");
            if let Err(cleanup) = self.contents.hard_delete(&content.id) {
                tracing::warn!(content_id = %content.id, error = %cleanup, "compensating content delete failed");
            }
            return Err(err.into());
        }

        tracing::info!(
            reference_id = %reference.id,
            content_id = %content.id,
            student_id = %student.id,
            "achievement saved as draft"
        );
        Ok(AchievementView::merge(reference, content))
    }

    /// Replace the content of a draft
    pub fn update_draft(
        &self,
        principal: &Principal,
        raw_id: &str,
        draft: AchievementDraft,
    ) -> Result<AchievementView, WorkflowError> {
        principal.require(Permission::WriteAchievements)?;
        let (_, reference) = self.owned_reference(principal, raw_id)?;

        if reference.status != AchievementStatus::Draft {
            return Err(WorkflowError::invalid_transition(
                "Only draft achievements can be edited",
                reference.status,
            ));
        }
        let body = draft.validate_and_finalise()?;

        let content = self
            .contents
            .update(&reference.content_id, body)?
            .ok_or_else(|| WorkflowError::not_found("Achievement not found"))?;

        tracing::info!(content_id = %content.id, "draft updated");
        Ok(AchievementView::merge(reference, content))
    }

    /// Move a draft to submitted and notify the advisor
    pub fn submit_for_verification(
        &self,
        principal: &Principal,
        raw_id: &str,
    ) -> Result<AchievementReference, WorkflowError> {
        principal.require(Permission::WriteAchievements)?;
        let (student, reference) = self.owned_reference(principal, raw_id)?;

        let next = reference
            .submitted(TimeStamp::now())
            .map_err(Self::transition_error("Achievement can only be submitted while in draft"))?;
        let submitted = self.commit(&reference, next)?;

        if let Err(err) = self.notifier.achievement_submitted(&student, &submitted) {
            tracing::warn!(content_id = %submitted.content_id, error = %err, "advisor notification failed");
        }

        tracing::info!(content_id = %submitted.content_id, student_id = %student.id, "achievement submitted");
        Ok(submitted)
    }

    /// Remove a draft. Returns the reference as it was before deletion.
    pub fn delete_achievement(
        &self,
        principal: &Principal,
        raw_id: &str,
    ) -> Result<AchievementReference, WorkflowError> {
        principal.require(Permission::WriteAchievements)?;
        let (_, reference) = self.owned_reference(principal, raw_id)?;

        if !reference.is_deletable() {
            return Err(WorkflowError::invalid_transition(
                "Only draft achievements can be deleted",
                reference.status,
            ));
        }

        self.contents.soft_delete(&reference.content_id)?;
        match self.ledger.delete(&reference) {
            Ok(()) => {}
            Err(StoreError::Stale) => {
                // a concurrent delete that won leaves no row; its content stays deleted
                let latest = self.ledger.get(&reference.id)?;
                if latest.is_some() {
                    if let Err(err) = self.contents.restore(&reference.content_id) {
                        tracing::warn!(content_id = %reference.content_id, error = %err, "failed to restore content");
                    }
                }
                return Err(Self::superseded(latest));
            }
            Err(err) => return Err(err.into()),
        }

        tracing::info!(content_id = %reference.content_id, "draft achievement deleted");
        Ok(reference)
    }

    /// Accept a submitted achievement of one of the caller's advisees
    pub fn verify_achievement(
        &self,
        principal: &Principal,
        raw_id: &str,
    ) -> Result<AchievementReference, WorkflowError> {
        principal.require(Permission::VerifyAchievements)?;
        let (lecturer, reference) = self.advised_reference(principal, raw_id)?;

        let next = reference
            .verified(&lecturer.id, TimeStamp::now())
            .map_err(Self::transition_error("Only submitted achievements can be verified"))?;
        let verified = self.commit(&reference, next)?;

        tracing::info!(content_id = %verified.content_id, lecturer_id = %lecturer.id, "achievement verified");
        Ok(verified)
    }

    /// Turn down a submitted achievement of one of the caller's advisees
    pub fn reject_achievement(
        &self,
        principal: &Principal,
        raw_id: &str,
        note: &str,
    ) -> Result<AchievementReference, WorkflowError> {
        principal.require(Permission::VerifyAchievements)?;
        if note.trim().is_empty() {
            return Err(ValidationError::EmptyRejectionNote.into());
        }
        let (lecturer, reference) = self.advised_reference(principal, raw_id)?;

        let next = reference
            .rejected(note, TimeStamp::now())
            .map_err(Self::transition_error("Only submitted achievements can be rejected"))?;
        let rejected = self.commit(&reference, next)?;

        tracing::info!(content_id = %rejected.content_id, lecturer_id = %lecturer.id, "achievement rejected");
        Ok(rejected)
    }

    /// Single achievement, visible to its owner, the owner's advisor and readers
    pub fn achievement_detail(
        &self,
        principal: &Principal,
        raw_id: &str,
    ) -> Result<AchievementView, WorkflowError> {
        let content_id = ContentId::parse(raw_id)?;
        let reference = self.reference_for(&content_id)?;

        if !self.may_read(principal, &reference)? {
            return Err(WorkflowError::forbidden(
                "You do not have access to this achievement",
            ));
        }

        let content = self
            .contents
            .get(&content_id)?
            .ok_or_else(|| WorkflowError::not_found("Achievement not found"))?;
        Ok(AchievementView::merge(reference, content))
    }

    fn may_read(&self, principal: &Principal, reference: &AchievementReference) -> Result<bool, WorkflowError> {
        if principal.has(Permission::ReadAchievements) {
            return Ok(true);
        }
        if let Some(student) = self.directory.resolve_student(&principal.user_id)? {
            if student.id == reference.student_id {
                return Ok(true);
            }
        }
        if let Some(lecturer) = self.directory.resolve_lecturer(&principal.user_id)? {
            let owner = self.directory.student(&reference.student_id)?;
            return Ok(owner.is_some_and(|student| student.is_advised_by(&lecturer)));
        }
        Ok(false)
    }

    /// The calling student's own achievements
    pub fn list_own_achievements(
        &self,
        principal: &Principal,
        query: &ListQuery,
    ) -> Result<Page<AchievementView>, WorkflowError> {
        principal.require(Permission::WriteAchievements)?;
        let student = self.student_for(principal)?;
        let page = self.ledger.list_by_student_ids(&[student.id], query)?;
        self.join(page)
    }

    /// Achievements of every student advised by the calling lecturer
    pub fn list_advisee_achievements(
        &self,
        principal: &Principal,
        query: &ListQuery,
    ) -> Result<Page<AchievementView>, WorkflowError> {
        principal.require(Permission::VerifyAchievements)?;
        let lecturer = self.lecturer_for(principal)?;
        let student_ids: Vec<String> = self
            .directory
            .advisees(&lecturer.id)?
            .into_iter()
            .map(|student| student.id)
            .collect();

        if student_ids.is_empty() {
            return Ok(Page::empty(query));
        }
        let page = self.ledger.list_by_student_ids(&student_ids, query)?;
        self.join(page)
    }

    /// Every achievement, optionally filtered
    pub fn list_all_achievements(
        &self,
        principal: &Principal,
        filter: &ReferenceFilter,
        query: &ListQuery,
    ) -> Result<Page<AchievementView>, WorkflowError> {
        principal.require(Permission::ReadAchievements)?;
        let page = self.ledger.list_all(filter, query)?;
        self.join(page)
    }

    // references whose content is missing or soft deleted are left out
    fn join(&self, page: Page<AchievementReference>) -> Result<Page<AchievementView>, WorkflowError> {
        if page.items.is_empty() {
            return Ok(page.with_items(Vec::new()));
        }

        let ids: Vec<ContentId> = page.items.iter().map(|r| r.content_id.clone()).collect();
        let mut contents: HashMap<ContentId, AchievementContent> = self
            .contents
            .find_by_ids(&ids, true)?
            .into_iter()
            .map(|content| (content.id.clone(), content))
            .collect();

        let mut views = Vec::with_capacity(page.items.len());
        for reference in &page.items {
            match contents.remove(&reference.content_id) {
                Some(content) => views.push(AchievementView::merge(reference.clone(), content)),
                None => tracing::debug!(content_id = %reference.content_id, "no content for reference, skipping"),
            }
        }
        Ok(page.with_items(views))
    }
}
