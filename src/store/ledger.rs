//! Achievement reference ledger
//!
//! The authoritative record of workflow status and ownership. Each reference
//! points at exactly one content record through `content_id`; the ledger keeps
//! a secondary index on that key and refuses a second reference for the same
//! content.
//!
//! Updates and deletes are optimistic. Callers pass the record they read, and
//! the ledger refuses with [`StoreError::Stale`] if the stored row no longer
//! matches it.
use crate::achievement::ContentId;
use crate::error::StoreError;
use crate::page::{ListQuery, Page};
use crate::reference::{AchievementReference, AchievementStatus};
use serde::Serialize;
use sled::Transactional;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Which references a read is allowed to see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceScope {
    All,
    Students(BTreeSet<String>),
}

impl ReferenceScope {
    pub fn students<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Students(ids.into_iter().map(Into::into).collect())
    }

    pub fn includes(&self, student_id: &str) -> bool {
        match self {
            ReferenceScope::All => true,
            ReferenceScope::Students(ids) => ids.contains(student_id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ReferenceScope::Students(ids) if ids.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceFilter {
    pub status: Option<AchievementStatus>,
    pub student_id: Option<String>,
}

impl ReferenceFilter {
    pub fn matches(&self, reference: &AchievementReference) -> bool {
        self.status.is_none_or(|status| reference.status == status)
            && self
                .student_id
                .as_deref()
                .is_none_or(|student_id| reference.student_id == student_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentTally {
    pub student_id: String,
    pub count: u64,
}

pub trait ReferenceLedger: Send + Sync {
    /// Fails with [`StoreError::DuplicateContent`] if the content already has a reference
    fn insert(&self, reference: &AchievementReference) -> Result<(), StoreError>;
    fn get(&self, id: &str) -> Result<Option<AchievementReference>, StoreError>;
    fn get_by_content_id(&self, content_id: &ContentId) -> Result<Option<AchievementReference>, StoreError>;
    /// Replaces `current` with `next`, provided the stored row still equals `current`
    fn update(&self, current: &AchievementReference, next: &AchievementReference) -> Result<(), StoreError>;
    /// Removes `reference`, provided the stored row still equals it
    fn delete(&self, reference: &AchievementReference) -> Result<(), StoreError>;
    /// Every reference visible in `scope`, unordered
    fn scan(&self, scope: &ReferenceScope) -> Result<Vec<AchievementReference>, StoreError>;

    fn list_by_student_ids(&self, student_ids: &[String], query: &ListQuery) -> Result<Page<AchievementReference>, StoreError> {
        if student_ids.is_empty() {
            return Ok(Page::empty(query));
        }
        let scope = ReferenceScope::students(student_ids.iter().cloned());
        Ok(query.apply(self.scan(&scope)?))
    }

    fn list_all(&self, filter: &ReferenceFilter, query: &ListQuery) -> Result<Page<AchievementReference>, StoreError> {
        let matching = self
            .scan(&ReferenceScope::All)?
            .into_iter()
            .filter(|reference| filter.matches(reference))
            .collect();
        Ok(query.apply(matching))
    }

    fn count_by_status(&self, scope: &ReferenceScope) -> Result<BTreeMap<AchievementStatus, u64>, StoreError> {
        Ok(tally_status(&self.scan(scope)?))
    }

    fn top_students(
        &self,
        scope: &ReferenceScope,
        limit: usize,
        status: AchievementStatus,
    ) -> Result<Vec<StudentTally>, StoreError> {
        Ok(rank_students(&self.scan(scope)?, status, limit))
    }
}

/// Counts per status; every status is present, zero when unused
pub fn tally_status(references: &[AchievementReference]) -> BTreeMap<AchievementStatus, u64> {
    let mut counts: BTreeMap<AchievementStatus, u64> =
        AchievementStatus::ALL.into_iter().map(|status| (status, 0)).collect();
    for reference in references {
        *counts.entry(reference.status).or_insert(0) += 1;
    }
    counts
}

/// Students ordered by how many references they hold in `status`, most first
pub fn rank_students(
    references: &[AchievementReference],
    status: AchievementStatus,
    limit: usize,
) -> Vec<StudentTally> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for reference in references.iter().filter(|r| r.status == status) {
        *counts.entry(reference.student_id.as_str()).or_insert(0) += 1;
    }

    let mut ranking: Vec<StudentTally> = counts
        .into_iter()
        .map(|(student_id, count)| StudentTally {
            student_id: student_id.to_string(),
            count,
        })
        .collect();
    ranking.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.student_id.cmp(&b.student_id)));
    ranking.truncate(limit);
    ranking
}

pub struct SledReferenceLedger {
    references: sled::Tree,
    by_content: sled::Tree,
}

impl SledReferenceLedger {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            references: db.open_tree("references")?,
            by_content: db.open_tree("references_by_content")?,
        })
    }
}

fn abort(err: impl Into<StoreError>) -> ConflictableTransactionError<StoreError> {
    ConflictableTransactionError::Abort(err.into())
}

impl ReferenceLedger for SledReferenceLedger {
    fn insert(&self, reference: &AchievementReference) -> Result<(), StoreError> {
        let cbor = minicbor::to_vec(reference).map_err(StoreError::encode)?;
        let content_key = reference.content_id.as_str().as_bytes();

        (&self.references, &self.by_content).transaction(
            |(references, by_content)| -> ConflictableTransactionResult<(), StoreError> {
                if by_content.get(content_key)?.is_some() {
                    return Err(abort(StoreError::DuplicateContent(
                        reference.content_id.to_string(),
                    )));
                }
                references.insert(reference.id.as_bytes(), cbor.as_slice())?;
                by_content.insert(content_key, reference.id.as_bytes())?;
                Ok(())
            },
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<AchievementReference>, StoreError> {
        match self.references.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn get_by_content_id(&self, content_id: &ContentId) -> Result<Option<AchievementReference>, StoreError> {
        match self.by_content.get(content_id.as_str().as_bytes())? {
            Some(reference_id) => match self.references.get(&reference_id)? {
                Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    fn update(&self, current: &AchievementReference, next: &AchievementReference) -> Result<(), StoreError> {
        debug_assert_eq!(current.id, next.id);
        debug_assert_eq!(current.content_id, next.content_id);

        let Some(stored) = self.references.get(current.id.as_bytes())? else {
            return Err(StoreError::Stale);
        };
        let decoded: AchievementReference = minicbor::decode(&stored)?;
        if decoded != *current {
            return Err(StoreError::Stale);
        }

        let cbor = minicbor::to_vec(next).map_err(StoreError::encode)?;
        match self
            .references
            .compare_and_swap(current.id.as_bytes(), Some(stored), Some(cbor))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(StoreError::Stale),
        }
    }

    fn delete(&self, reference: &AchievementReference) -> Result<(), StoreError> {
        (&self.references, &self.by_content).transaction(
            |(references, by_content)| -> ConflictableTransactionResult<(), StoreError> {
                let Some(stored) = references.get(reference.id.as_bytes())? else {
                    return Err(abort(StoreError::Stale));
                };
                let decoded: AchievementReference = minicbor::decode(&stored).map_err(abort)?;
                if decoded != *reference {
                    return Err(abort(StoreError::Stale));
                }
                references.remove(reference.id.as_bytes())?;
                by_content.remove(reference.content_id.as_str().as_bytes())?;
                Ok(())
            },
        )?;
        Ok(())
    }

    fn scan(&self, scope: &ReferenceScope) -> Result<Vec<AchievementReference>, StoreError> {
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in self.references.iter() {
            let (_, bytes) = entry?;
            let reference: AchievementReference = minicbor::decode(&bytes)?;
            if scope.includes(&reference.student_id) {
                found.push(reference);
            }
        }
        Ok(found)
    }
}
