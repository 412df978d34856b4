//! Paging and ordering of reference listings
mod common;

use achievement_workflow::achievement::{AchievementDraft, ContentId, TimeStamp};
use achievement_workflow::page::{ListQuery, PageLimits, PageParams, SortField, SortOrder};
use achievement_workflow::reference::AchievementReference;
use achievement_workflow::store::{ContentStore, ReferenceFilter, ReferenceLedger};
use common::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Inserts `count` drafts for student S, created one second apart.
/// Reference ids are `ref-00`, `ref-01`, ... in creation order.
fn seed(campus: &Campus, count: u32) -> anyhow::Result<()> {
    for i in 0..count {
        let body = AchievementDraft::new()
            .set_type("academic")
            .set_title(&format!("Achievement {i}"))
            .validate_and_finalise()?;
        let content = campus.contents.insert(STUDENT_S, body)?;
        let created = TimeStamp::from_ymd_hms(2024, 3, 1, 8, 0, i)
            .ok_or_else(|| anyhow::anyhow!("bad timestamp"))?;
        let reference = AchievementReference::new_draft(
            format!("ref-{i:02}"),
            STUDENT_S.to_string(),
            content.id,
            created,
        );
        campus.ledger.insert(&reference)?;
    }
    Ok(())
}

fn params(page: &str, limit: &str, sort: &str) -> PageParams {
    PageParams {
        page: Some(page.to_string()),
        limit: Some(limit.to_string()),
        sort: Some(sort.to_string()),
        order: None,
    }
}

#[test]
fn second_page_holds_records_eleven_to_twenty() -> anyhow::Result<()> {
    let campus = Campus::open()?;
    seed(&campus, 25)?;

    let query = ListQuery::resolve(&params("2", "10", "created_at"), PageLimits::default());
    let page = campus
        .service()
        .list_all_achievements(&admin(), &ReferenceFilter::default(), &query)?;

    // newest first: ref-24 is record 1, so records 11..=20 are ref-14 down to ref-05
    let ids: Vec<&str> = page.items.iter().map(|v| v.reference_id.as_str()).collect();
    let expected: Vec<String> = (5..=14).rev().map(|i| format!("ref-{i:02}")).collect();
    assert_eq!(ids, expected);
    assert_eq!(page.pagination.total, 25);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.page, 2);
    Ok(())
}

#[test]
fn unknown_sort_falls_back_to_created_at() -> anyhow::Result<()> {
    let campus = Campus::open()?;
    seed(&campus, 12)?;
    let service = campus.service();

    let fallback = ListQuery::resolve(&params("1", "5", "title; drop table"), PageLimits::default());
    assert_eq!(fallback.sort, SortField::CreatedAt);
    assert_eq!(fallback.order, SortOrder::Desc);

    let explicit = ListQuery::resolve(&params("1", "5", "created_at"), PageLimits::default());
    let a = service.list_all_achievements(&admin(), &ReferenceFilter::default(), &fallback)?;
    let b = service.list_all_achievements(&admin(), &ReferenceFilter::default(), &explicit)?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn ascending_submitted_at_puts_drafts_first() -> anyhow::Result<()> {
    let campus = Campus::open()?;
    seed(&campus, 3)?;
    let service = campus.service();

    let newest = campus
        .ledger
        .get("ref-02")?
        .ok_or_else(|| anyhow::anyhow!("missing"))?
        .content_id;
    service.submit_for_verification(&student(STUDENT_S), newest.as_str())?;

    let query = ListQuery::new(1, 10).sorted_by(SortField::SubmittedAt, SortOrder::Asc);
    let page = service.list_own_achievements(&student(STUDENT_S), &query)?;
    let ids: Vec<&str> = page.items.iter().map(|v| v.reference_id.as_str()).collect();
    assert_eq!(ids, vec!["ref-00", "ref-01", "ref-02"]);

    let query = query.sorted_by(SortField::SubmittedAt, SortOrder::Desc);
    let page = service.list_own_achievements(&student(STUDENT_S), &query)?;
    let ids: Vec<&str> = page.items.iter().map(|v| v.reference_id.as_str()).collect();
    // ties among the drafts still break on id ascending
    assert_eq!(ids, vec!["ref-02", "ref-00", "ref-01"]);
    Ok(())
}

// PROPERTY TESTS

fn references(count: usize) -> Vec<AchievementReference> {
    (0..count)
        .map(|i| {
            let created = TimeStamp::from_ymd_hms(2024, 1, 1 + (i % 28) as u32, 0, 0, 0)
                .unwrap_or_else(TimeStamp::now);
            AchievementReference::new_draft(
                format!("ref-{i:03}"),
                STUDENT_S.to_string(),
                ContentId::generate(),
                created,
            )
        })
        .collect()
}

proptest! {
    #[test]
    fn pages_partition_the_result_set(count in 0usize..80, limit in 1u32..15, asc in any::<bool>()) {
        let order = if asc { SortOrder::Asc } else { SortOrder::Desc };
        let refs = references(count);
        let total_pages = (count as u32).div_ceil(limit);

        let mut seen = BTreeSet::new();
        for page_no in 1..=total_pages.max(1) + 1 {
            let query = ListQuery::new(page_no, limit).sorted_by(SortField::CreatedAt, order);
            let page = query.apply(refs.clone());

            prop_assert_eq!(page.pagination.total, count as u64);
            prop_assert_eq!(page.pagination.total_pages, total_pages as u64);
            let expected_len = count.saturating_sub(query.offset()).min(limit as usize);
            prop_assert_eq!(page.items.len(), expected_len);

            for reference in page.items {
                prop_assert!(seen.insert(reference.id));
            }
        }
        prop_assert_eq!(seen.len(), count);
    }

    #[test]
    fn pages_are_ordered(count in 1usize..60, limit in 1u32..20, asc in any::<bool>()) {
        let order = if asc { SortOrder::Asc } else { SortOrder::Desc };
        let page = ListQuery::new(1, limit)
            .sorted_by(SortField::CreatedAt, order)
            .apply(references(count));

        for pair in page.items.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            match order {
                SortOrder::Asc => prop_assert!(a.created_at <= b.created_at),
                SortOrder::Desc => prop_assert!(a.created_at >= b.created_at),
            }
            if a.created_at == b.created_at {
                prop_assert!(a.id < b.id);
            }
        }
    }

    #[test]
    fn limits_are_clamped(page in -5i64..50, limit in -5i64..500) {
        let limits = PageLimits::default();
        let query = ListQuery::resolve(
            &PageParams {
                page: Some(page.to_string()),
                limit: Some(limit.to_string()),
                sort: None,
                order: None,
            },
            limits,
        );
        prop_assert!(query.page >= 1);
        prop_assert!(query.limit >= 1 && query.limit <= limits.max_size);
        if limit < 1 {
            prop_assert_eq!(query.limit, limits.default_size);
        }
        if page < 1 {
            prop_assert_eq!(query.page, 1);
        }
    }
}
