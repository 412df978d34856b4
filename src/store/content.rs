//! Achievement content store
//!
//! Holds the descriptive payload of every achievement. Records are never
//! removed by normal flows: deletion sets `deleted_at` and every read path
//! filters those records out. A hard delete exists only to undo an insert
//! whose paired reference could not be written.
use crate::achievement::{AchievementBody, AchievementContent, AchievementType, ContentId, TimeStamp};
use crate::error::StoreError;
use std::collections::BTreeMap;

/// Bucket used when a competition carries no level
pub const UNKNOWN_LEVEL: &str = "unknown";

pub trait ContentStore: Send + Sync {
    /// Stores a new record under a freshly generated id
    fn insert(&self, student_id: &str, body: AchievementBody) -> Result<AchievementContent, StoreError>;
    /// Alive record with the given id
    fn get(&self, id: &ContentId) -> Result<Option<AchievementContent>, StoreError>;
    /// Replaces the body of an alive record. `None` when there is nothing to update.
    fn update(&self, id: &ContentId, body: AchievementBody) -> Result<Option<AchievementContent>, StoreError>;
    fn soft_delete(&self, id: &ContentId) -> Result<(), StoreError>;
    /// Clears `deleted_at` again. Used when the ledger refuses the matching delete.
    fn restore(&self, id: &ContentId) -> Result<(), StoreError>;
    fn hard_delete(&self, id: &ContentId) -> Result<(), StoreError>;
    fn find_by_ids(&self, ids: &[ContentId], exclude_deleted: bool) -> Result<Vec<AchievementContent>, StoreError>;

    fn count_by_type(&self, ids: &[ContentId]) -> Result<BTreeMap<String, u64>, StoreError> {
        Ok(tally_by_type(&self.find_by_ids(ids, true)?))
    }

    fn count_by_period(&self, ids: &[ContentId]) -> Result<BTreeMap<String, u64>, StoreError> {
        Ok(tally_by_period(&self.find_by_ids(ids, true)?))
    }

    fn count_by_competition_level(&self, ids: &[ContentId]) -> Result<BTreeMap<String, u64>, StoreError> {
        Ok(tally_by_competition_level(&self.find_by_ids(ids, true)?))
    }
}

pub fn tally_by_type(contents: &[AchievementContent]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for content in contents {
        *counts
            .entry(content.body.achievement_type.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Counts per `YYYY-MM` of creation
pub fn tally_by_period(contents: &[AchievementContent]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for content in contents {
        *counts.entry(content.created_at.period()).or_insert(0) += 1;
    }
    counts
}

pub fn tally_by_competition_level(contents: &[AchievementContent]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for content in contents
        .iter()
        .filter(|c| c.body.achievement_type == AchievementType::Competition)
    {
        let level = content
            .competition_level()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .unwrap_or(UNKNOWN_LEVEL);
        *counts.entry(level.to_string()).or_insert(0) += 1;
    }
    counts
}

pub struct SledContentStore {
    achievements: sled::Tree,
}

impl SledContentStore {
    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self {
            achievements: db.open_tree("achievements")?,
        })
    }

    // includes soft deleted records
    fn load(&self, id: &ContentId) -> Result<Option<AchievementContent>, StoreError> {
        match self.achievements.get(id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, content: &AchievementContent) -> Result<(), StoreError> {
        let cbor = minicbor::to_vec(content).map_err(StoreError::encode)?;
        self.achievements.insert(content.id.as_str().as_bytes(), cbor)?;
        Ok(())
    }
}

impl ContentStore for SledContentStore {
    fn insert(&self, student_id: &str, body: AchievementBody) -> Result<AchievementContent, StoreError> {
        let content = AchievementContent::new(ContentId::generate(), student_id.to_string(), body, TimeStamp::now());
        self.save(&content)?;
        Ok(content)
    }

    fn get(&self, id: &ContentId) -> Result<Option<AchievementContent>, StoreError> {
        Ok(self.load(id)?.filter(|content| !content.is_deleted()))
    }

    fn update(&self, id: &ContentId, body: AchievementBody) -> Result<Option<AchievementContent>, StoreError> {
        let Some(mut content) = self.get(id)? else {
            return Ok(None);
        };
        content.body = body;
        content.updated_at = TimeStamp::now();
        self.save(&content)?;
        Ok(Some(content))
    }

    fn soft_delete(&self, id: &ContentId) -> Result<(), StoreError> {
        if let Some(mut content) = self.get(id)? {
            let now = TimeStamp::now();
            content.deleted_at = Some(now);
            content.updated_at = now;
            self.save(&content)?;
        }
        Ok(())
    }

    fn restore(&self, id: &ContentId) -> Result<(), StoreError> {
        if let Some(mut content) = self.load(id)? {
            if content.deleted_at.take().is_some() {
                content.updated_at = TimeStamp::now();
                self.save(&content)?;
            }
        }
        Ok(())
    }

    fn hard_delete(&self, id: &ContentId) -> Result<(), StoreError> {
        self.achievements.remove(id.as_str().as_bytes())?;
        Ok(())
    }

    fn find_by_ids(&self, ids: &[ContentId], exclude_deleted: bool) -> Result<Vec<AchievementContent>, StoreError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load(id)? {
                Some(content) if exclude_deleted && content.is_deleted() => {}
                Some(content) => found.push(content),
                None => {}
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievement::{AchievementDetails, AchievementDraft};

    fn store() -> (tempfile::TempDir, SledContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path().join("content.db")).unwrap();
        (dir, SledContentStore::open(&db).unwrap())
    }

    fn competition(level: Option<&str>) -> AchievementBody {
        AchievementDraft::new()
            .set_title("Programming contest")
            .set_type("competition")
            .set_details(AchievementDetails {
                competition_level: level.map(str::to_string),
                ..Default::default()
            })
            .validate_and_finalise()
            .unwrap()
    }

    #[test]
    fn soft_deleted_records_are_hidden() {
        let (_dir, store) = store();
        let kept = store.insert("s1", competition(Some("national"))).unwrap();
        let gone = store.insert("s1", competition(None)).unwrap();

        store.soft_delete(&gone.id).unwrap();

        assert!(store.get(&gone.id).unwrap().is_none());
        let ids = vec![kept.id.clone(), gone.id.clone()];
        assert_eq!(store.find_by_ids(&ids, true).unwrap().len(), 1);
        let all = store.find_by_ids(&ids, false).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|c| c.id == gone.id && c.deleted_at.is_some()));
        assert!(store.update(&gone.id, competition(None)).unwrap().is_none());

        store.restore(&gone.id).unwrap();
        assert!(store.get(&gone.id).unwrap().is_some());
    }

    #[test]
    fn hard_delete_removes_record() {
        let (_dir, store) = store();
        let content = store.insert("s1", competition(None)).unwrap();
        store.hard_delete(&content.id).unwrap();
        assert!(store.find_by_ids(&[content.id], false).unwrap().is_empty());
    }

    #[test]
    fn aggregations_bucket_levels_and_periods() {
        let (_dir, store) = store();
        let a = store.insert("s1", competition(Some("national"))).unwrap();
        let b = store.insert("s1", competition(None)).unwrap();
        let c = store
            .insert(
                "s2",
                AchievementDraft::new()
                    .set_title("Certified cloud practitioner")
                    .set_type("certification")
                    .validate_and_finalise()
                    .unwrap(),
            )
            .unwrap();
        let ids = vec![a.id.clone(), b.id, c.id];

        let by_type = store.count_by_type(&ids).unwrap();
        assert_eq!(by_type["competition"], 2);
        assert_eq!(by_type["certification"], 1);

        let by_level = store.count_by_competition_level(&ids).unwrap();
        assert_eq!(by_level["national"], 1);
        assert_eq!(by_level[UNKNOWN_LEVEL], 1);
        assert_eq!(by_level.values().sum::<u64>(), 2);

        let by_period = store.count_by_period(&ids).unwrap();
        assert_eq!(by_period.get(&a.created_at.period()), Some(&3));
    }
}
