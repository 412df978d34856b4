//! Property-based tests for the achievement state machine
//!
//! Random sequences of transitions are applied to a reference. Whatever the
//! sequence, the audit fields must agree with the status, status only moves
//! forward, and a decided reference never changes again.
mod common;

use achievement_workflow::achievement::{ContentId, TimeStamp};
use achievement_workflow::reference::{AchievementReference, AchievementStatus};
use achievement_workflow::store::ReferenceLedger;
use common::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Submit,
    Verify(String),
    Reject(String),
}

/// Strategy to generate a single transition attempt
fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Submit),
        "lec-[a-c]".prop_map(Step::Verify),
        "[a-zA-Z ]{1,40}".prop_map(Step::Reject),
    ]
}

fn rank(status: AchievementStatus) -> u8 {
    match status {
        AchievementStatus::Draft => 0,
        AchievementStatus::Submitted => 1,
        AchievementStatus::Verified | AchievementStatus::Rejected => 2,
    }
}

fn apply(reference: &AchievementReference, step: &Step, at: TimeStamp) -> Option<AchievementReference> {
    match step {
        Step::Submit => reference.submitted(at).ok(),
        Step::Verify(lecturer) => reference.verified(lecturer, at).ok(),
        Step::Reject(note) => reference.rejected(note, at).ok(),
    }
}

fn draft() -> AchievementReference {
    AchievementReference::new_draft(
        "ref-prop".to_string(),
        STUDENT_S.to_string(),
        ContentId::generate(),
        TimeStamp::now(),
    )
}

proptest! {
    #[test]
    fn audit_fields_follow_status(steps in prop::collection::vec(step_strategy(), 0..12)) {
        let mut reference = draft();
        prop_assert!(reference.audit_fields_consistent());

        for step in &steps {
            let before = reference.clone();
            match apply(&reference, step, TimeStamp::now()) {
                Some(next) => {
                    prop_assert!(rank(next.status) == rank(before.status) + 1);
                    prop_assert_eq!(&next.id, &before.id);
                    prop_assert_eq!(&next.student_id, &before.student_id);
                    prop_assert_eq!(&next.content_id, &before.content_id);
                    prop_assert_eq!(next.created_at, before.created_at);
                    reference = next;
                }
                None => prop_assert_eq!(&reference, &before),
            }
            prop_assert!(reference.audit_fields_consistent());
        }

        if reference.status.is_terminal() {
            for step in [Step::Submit, Step::Verify("lec-a".into()), Step::Reject("again".into())] {
                prop_assert!(apply(&reference, &step, TimeStamp::now()).is_none());
            }
        }
    }
}

proptest! {
    // each case opens fresh sled databases
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn ledger_persists_every_valid_transition(steps in prop::collection::vec(step_strategy(), 1..8)) {
        let campus = Campus::open().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let mut current = draft();
        campus.ledger.insert(&current).map_err(|e| TestCaseError::fail(e.to_string()))?;

        for step in &steps {
            if let Some(next) = apply(&current, step, TimeStamp::now()) {
                campus.ledger.update(&current, &next).map_err(|e| TestCaseError::fail(e.to_string()))?;
                // the row we replaced is now stale
                prop_assert!(campus.ledger.update(&current, &next).is_err());
                current = next;
            }
        }

        let stored = campus
            .ledger
            .get_by_content_id(&current.content_id)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(stored, Some(current));
    }
}
