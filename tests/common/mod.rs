//! Shared fixture: a throw-away campus with two advisors and three students.
#![allow(dead_code)]

use achievement_workflow::achievement::{AchievementDetails, AchievementDraft};
use achievement_workflow::auth::{Permission, Principal, Role};
use achievement_workflow::identity::{Lecturer, SledIdentityDirectory, Student};
use achievement_workflow::store::{SledContentStore, SledReferenceLedger, SledStores};
use achievement_workflow::{AchievementService, AppState, StatisticsAggregator};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

/// advisor of student S
pub const ADVISOR_A: &str = "lec-a";
/// advisor of student T
pub const LECTURER_B: &str = "lec-b";
/// lecturer without advisees
pub const LECTURER_C: &str = "lec-c";

pub const STUDENT_S: &str = "stu-s";
pub const STUDENT_T: &str = "stu-t";
/// student without an advisor
pub const STUDENT_U: &str = "stu-u";

pub fn user_of(profile_id: &str) -> String {
    format!("user-{profile_id}")
}

pub struct Campus {
    // Sled keeps a file lock per database, so every test gets its own directory.
    _dir: TempDir,
    pub directory: Arc<SledIdentityDirectory>,
    pub contents: Arc<SledContentStore>,
    pub ledger: Arc<SledReferenceLedger>,
}

impl Campus {
    pub fn open() -> anyhow::Result<Self> {
        let dir = tempdir()?;
        let stores = SledStores::open(&dir.path().join("ledger"), &dir.path().join("content"))?;

        for (id, number) in [(ADVISOR_A, "L-001"), (LECTURER_B, "L-002"), (LECTURER_C, "L-003")] {
            stores.directory.put_lecturer(&Lecturer {
                id: id.to_string(),
                user_id: user_of(id),
                lecturer_number: number.to_string(),
                department: "Informatics".to_string(),
            })?;
        }

        for (id, number, advisor) in [
            (STUDENT_S, "2021-0001", Some(ADVISOR_A)),
            (STUDENT_T, "2021-0002", Some(LECTURER_B)),
            (STUDENT_U, "2021-0003", None),
        ] {
            stores.directory.put_student(&Student {
                id: id.to_string(),
                user_id: user_of(id),
                student_number: number.to_string(),
                program_study: "Computer Science".to_string(),
                academic_year: "2021".to_string(),
                advisor_id: advisor.map(str::to_string),
            })?;
        }

        Ok(Self {
            _dir: dir,
            directory: Arc::new(stores.directory),
            contents: Arc::new(stores.contents),
            ledger: Arc::new(stores.ledger),
        })
    }

    pub fn service(&self) -> AchievementService {
        AchievementService::new(self.directory.clone(), self.contents.clone(), self.ledger.clone())
    }

    pub fn stats(&self) -> StatisticsAggregator {
        StatisticsAggregator::new(self.directory.clone(), self.contents.clone(), self.ledger.clone())
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(self.directory.clone(), self.contents.clone(), self.ledger.clone())
    }
}

pub fn student(profile_id: &str) -> Principal {
    Principal::new(user_of(profile_id), Role::Student).with_permission(Permission::WriteAchievements)
}

pub fn lecturer(profile_id: &str) -> Principal {
    Principal::new(user_of(profile_id), Role::Lecturer).with_permission(Permission::VerifyAchievements)
}

pub fn admin() -> Principal {
    Principal::new("user-admin", Role::Admin).with_permission(Permission::ReadAchievements)
}

pub fn competition(title: &str, level: Option<&str>) -> AchievementDraft {
    AchievementDraft::new()
        .set_type("competition")
        .set_title(title)
        .set_description("National programming contest")
        .set_details(AchievementDetails {
            competition_name: Some("Gemastik".to_string()),
            competition_level: level.map(str::to_string),
            rank: Some(2),
            ..Default::default()
        })
        .add_tag("programming")
}

pub fn publication(title: &str) -> AchievementDraft {
    AchievementDraft::new()
        .set_type("publication")
        .set_title(title)
        .set_details(AchievementDetails {
            publication_type: Some("journal".to_string()),
            publisher: Some("IEEE".to_string()),
            ..Default::default()
        })
}
