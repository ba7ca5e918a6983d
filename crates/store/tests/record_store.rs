//! Behaviour every `RecordStore` backend must share. Each case runs against
//! both the in-memory and the SQLite store.

use chrono::{Duration, NaiveDate, Utc};
use fieldrep_core::error::StoreError;
use fieldrep_core::record::{
    InteractionKind, InteractionPatch, NewHcp, NewInteraction, Sentiment,
};
use fieldrep_core::store::RecordStore;
use fieldrep_store::{InMemoryStore, SqliteStore, seed_if_empty};
use std::sync::Arc;

async fn backends() -> Vec<Arc<dyn RecordStore>> {
    vec![
        Arc::new(InMemoryStore::new()),
        Arc::new(SqliteStore::in_memory().await.unwrap()),
    ]
}

async fn seeded() -> Vec<Arc<dyn RecordStore>> {
    let stores = backends().await;
    for store in &stores {
        seed_if_empty(store.as_ref()).await.unwrap();
    }
    stores
}

#[tokio::test]
async fn hcp_create_and_get() {
    for store in backends().await {
        let created = store
            .create_hcp(
                NewHcp::new("John Smith", "Cardiology", "City General Hospital")
                    .with_contact("john.smith@citygeneral.com", "+1-555-0101"),
            )
            .await
            .unwrap();
        let fetched = store.get_hcp(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "John Smith", "{}", store.name());
        assert_eq!(fetched.email, "john.smith@citygeneral.com");
        assert!(store.get_hcp(created.id + 100).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn empty_hcp_name_is_rejected() {
    for store in backends().await {
        let err = store.create_hcp(NewHcp::new("   ", "", "")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "{}", store.name());
        assert_eq!(store.count_hcps().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn name_lookup_strips_titles() {
    for store in seeded().await {
        let smith = store.find_hcp_by_name("Dr. Smith").await.unwrap().unwrap();
        assert_eq!(smith.name, "John Smith", "{}", store.name());

        let chen = store.find_hcp_by_name("chen").await.unwrap().unwrap();
        assert_eq!(chen.name, "Michael Chen");

        assert!(store.find_hcp_by_name("Dr. Nobody").await.unwrap().is_none());
        assert!(store.find_hcp_by_name("Dr.").await.unwrap().is_none());
        assert!(store.find_hcp_by_name("").await.unwrap().is_none());
    }
}

#[tokio::test]
async fn matching_folds_non_ascii_case() {
    for store in backends().await {
        let emile = store
            .create_hcp(NewHcp::new("Émile Ångström", "Néphrologie", "CHU Île-de-France"))
            .await
            .unwrap();

        let found = store.find_hcp_by_name("Dr. ÉMILE").await.unwrap();
        assert_eq!(found.map(|h| h.id), Some(emile.id), "{}", store.name());
        assert!(store.find_hcp_by_name("ångström").await.unwrap().is_some());

        assert_eq!(store.search_hcps("émile", 10).await.unwrap().len(), 1);
        assert_eq!(store.search_hcps("NÉPHRO", 10).await.unwrap().len(), 1);
        assert_eq!(store.search_hcps("île-de", 10).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn name_lookup_prefers_lowest_id() {
    for store in backends().await {
        let first = store.create_hcp(NewHcp::new("Anna Lee", "", "")).await.unwrap();
        store.create_hcp(NewHcp::new("Bruce Lee", "", "")).await.unwrap();
        let found = store.find_hcp_by_name("Lee").await.unwrap().unwrap();
        assert_eq!(found.id, first.id, "{}", store.name());
    }
}

#[tokio::test]
async fn search_matches_name_specialty_and_hospital() {
    for store in seeded().await {
        let by_specialty = store.search_hcps("oncology", 10).await.unwrap();
        assert_eq!(by_specialty.len(), 1, "{}", store.name());
        assert_eq!(by_specialty[0].name, "Michael Chen");

        let by_hospital = store.search_hcps("INSTITUTE", 10).await.unwrap();
        let names: Vec<&str> = by_hospital.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["Michael Chen", "Robert Taylor"]);

        assert!(store.search_hcps("veterinary", 10).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn search_respects_limit_and_is_stable() {
    for store in backends().await {
        for i in 0..15 {
            store
                .create_hcp(NewHcp::new(format!("Doctor {i}"), "Cardiology", "Heart Center"))
                .await
                .unwrap();
        }
        let first = store.search_hcps("cardio", 10).await.unwrap();
        let second = store.search_hcps("cardio", 10).await.unwrap();
        assert_eq!(first.len(), 10, "{}", store.name());
        assert_eq!(first, second);
        assert!(first.windows(2).all(|w| w[0].id < w[1].id));
    }
}

#[tokio::test]
async fn interaction_requires_existing_hcp() {
    for store in backends().await {
        let err = store
            .create_interaction(NewInteraction::new(42, InteractionKind::Visit, "nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)), "{}", store.name());
        assert_eq!(store.count_interactions().await.unwrap(), 0);
    }
}

#[tokio::test]
async fn interactions_listed_newest_first() {
    for store in backends().await {
        let hcp = store.create_hcp(NewHcp::new("A", "", "")).await.unwrap();
        let now = Utc::now();
        let old = store
            .create_interaction(
                NewInteraction::new(hcp.id, InteractionKind::Email, "old")
                    .created_at(now - Duration::days(3)),
            )
            .await
            .unwrap();
        let new = store
            .create_interaction(
                NewInteraction::new(hcp.id, InteractionKind::Call, "new")
                    .created_at(now - Duration::hours(1)),
            )
            .await
            .unwrap();
        let ids: Vec<i64> = store
            .list_interactions()
            .await
            .unwrap()
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![new.id, old.id], "{}", store.name());
    }
}

#[tokio::test]
async fn recent_interactions_window_and_limit() {
    for store in seeded().await {
        let smith = store.find_hcp_by_name("John Smith").await.unwrap().unwrap();

        let week = store
            .recent_interactions(smith.id, Utc::now() - Duration::days(7), 10)
            .await
            .unwrap();
        assert_eq!(week.len(), 1, "{}", store.name());

        let month = store
            .recent_interactions(smith.id, Utc::now() - Duration::days(30), 10)
            .await
            .unwrap();
        assert_eq!(month.len(), 2);

        let capped = store
            .recent_interactions(smith.id, Utc::now() - Duration::days(30), 1)
            .await
            .unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].id, month[0].id);
    }
}

#[tokio::test]
async fn update_applies_patch_and_bumps_updated_at() {
    for store in backends().await {
        let hcp = store.create_hcp(NewHcp::new("A", "", "")).await.unwrap();
        let created = store
            .create_interaction(
                NewInteraction::new(hcp.id, InteractionKind::Visit, "original")
                    .with_products("CardioMax")
                    .created_at(Utc::now() - Duration::days(1)),
            )
            .await
            .unwrap();

        let patch = InteractionPatch {
            kind: Some(InteractionKind::Call),
            sentiment: Some(Sentiment::Positive),
            ..Default::default()
        };
        let updated = store
            .update_interaction(created.id, patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.kind, InteractionKind::Call, "{}", store.name());
        assert_eq!(updated.sentiment, Some(Sentiment::Positive));
        assert_eq!(updated.notes, "original");
        assert_eq!(updated.products_discussed.as_deref(), Some("CardioMax"));
        assert!(updated.updated_at > created.updated_at);

        let missing = store
            .update_interaction(created.id + 1, InteractionPatch::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}

#[tokio::test]
async fn schedule_follow_up_sets_flag_and_date() {
    for store in seeded().await {
        let date = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let before = store.get_interaction(2).await.unwrap().unwrap();
        assert!(!before.follow_up_required, "{}", store.name());

        let after = store.schedule_follow_up(2, date).await.unwrap().unwrap();
        assert!(after.follow_up_required);
        assert_eq!(after.followup_date, Some(date));

        assert!(store.schedule_follow_up(999, date).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn delete_reports_whether_a_row_went_away() {
    for store in seeded().await {
        assert!(store.delete_interaction(1).await.unwrap(), "{}", store.name());
        assert!(!store.delete_interaction(1).await.unwrap());
        assert!(store.get_interaction(1).await.unwrap().is_none());
        assert_eq!(store.count_interactions().await.unwrap(), 4);
    }
}
