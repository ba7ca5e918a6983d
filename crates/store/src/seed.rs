//! Sample data for local development and demos.
//!
//! Eight HCPs across specialties and five interactions spread over the
//! last ten days. Inserted only when the HCP table is empty.

use chrono::{Duration, Utc};
use fieldrep_core::error::StoreError;
use fieldrep_core::record::{InteractionKind, NewHcp, NewInteraction};
use fieldrep_core::store::RecordStore;
use tracing::info;

/// What a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub hcps: usize,
    pub interactions: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        self.hcps == 0 && self.interactions == 0
    }
}

const SAMPLE_HCPS: [(&str, &str, &str, &str, &str); 8] = [
    ("John Smith", "Cardiology", "City General Hospital", "john.smith@citygeneral.com", "+1-555-0101"),
    ("Sarah Johnson", "Endocrinology", "Metro Medical Center", "sarah.johnson@metromedical.com", "+1-555-0102"),
    ("Michael Chen", "Oncology", "Regional Cancer Institute", "michael.chen@rci.org", "+1-555-0103"),
    ("Emily Williams", "Neurology", "Brain & Spine Clinic", "emily.williams@brainspine.com", "+1-555-0104"),
    ("David Martinez", "Rheumatology", "Joint Care Center", "david.martinez@jointcare.com", "+1-555-0105"),
    ("Lisa Anderson", "Gastroenterology", "Digestive Health Hospital", "lisa.anderson@digestivehealth.com", "+1-555-0106"),
    ("Robert Taylor", "Pulmonology", "Respiratory Care Institute", "robert.taylor@respcare.org", "+1-555-0107"),
    ("Jennifer Brown", "Dermatology", "Skin Health Clinic", "jennifer.brown@skinhealth.com", "+1-555-0108"),
];

/// (index into SAMPLE_HCPS, kind, notes, products, follow-up, days ago)
const SAMPLE_INTERACTIONS: [(usize, InteractionKind, &str, &str, bool, i64); 5] = [
    (
        0,
        InteractionKind::Visit,
        "Discussed new cardiovascular drug trials. Dr. Smith showed high interest in efficacy data for hypertension patients. Requested detailed clinical study results.",
        "CardioMax, HeartGuard",
        true,
        2,
    ),
    (
        1,
        InteractionKind::Call,
        "Phone consultation about diabetes management solutions. Dr. Johnson interested in latest glucose monitoring technology and patient compliance tools.",
        "GlucoControl, DiabetesCare Pro",
        false,
        5,
    ),
    (
        2,
        InteractionKind::Email,
        "Responded to inquiry about oncology drug side effects. Provided comprehensive documentation on patient safety profiles and clinical outcomes.",
        "OncoSafe, CancerGuard",
        true,
        7,
    ),
    (
        0,
        InteractionKind::Webinar,
        "Attended product webinar on cardiovascular innovations. Asked detailed questions about drug interactions and contraindications.",
        "CardioMax",
        false,
        10,
    ),
    (
        3,
        InteractionKind::Visit,
        "In-person meeting to discuss neurological disorder treatments. Dr. Williams very receptive to new Alzheimer's disease therapies.",
        "NeuroPlus, BrainCare",
        true,
        3,
    ),
];

/// Insert the sample HCPs and interactions if the store has no HCPs yet.
pub async fn seed_if_empty(store: &dyn RecordStore) -> Result<SeedReport, StoreError> {
    if store.count_hcps().await? > 0 {
        info!("Store already has HCPs, skipping sample data");
        return Ok(SeedReport::default());
    }

    let mut ids = Vec::with_capacity(SAMPLE_HCPS.len());
    for (name, specialty, hospital, email, phone) in SAMPLE_HCPS {
        let hcp = store
            .create_hcp(NewHcp::new(name, specialty, hospital).with_contact(email, phone))
            .await?;
        ids.push(hcp.id);
    }

    let now = Utc::now();
    for (index, kind, notes, products, follow_up, days_ago) in SAMPLE_INTERACTIONS {
        store
            .create_interaction(
                NewInteraction::new(ids[index], kind, notes)
                    .with_products(products)
                    .with_follow_up(follow_up)
                    .created_at(now - Duration::days(days_ago)),
            )
            .await?;
    }

    let report = SeedReport {
        hcps: SAMPLE_HCPS.len(),
        interactions: SAMPLE_INTERACTIONS.len(),
    };
    info!(hcps = report.hcps, interactions = report.interactions, "Sample data inserted");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    #[tokio::test]
    async fn seeds_once() {
        let store = InMemoryStore::new();
        let first = seed_if_empty(&store).await.unwrap();
        assert_eq!(first, SeedReport { hcps: 8, interactions: 5 });

        let second = seed_if_empty(&store).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(store.count_hcps().await.unwrap(), 8);
        assert_eq!(store.count_interactions().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn sample_interactions_reference_the_right_hcps() {
        let store = InMemoryStore::new();
        seed_if_empty(&store).await.unwrap();

        let smith = store.find_hcp_by_name("Dr. Smith").await.unwrap().unwrap();
        let since = Utc::now() - Duration::days(30);
        let recent = store.recent_interactions(smith.id, since, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first: the visit two days ago, then the webinar.
        assert_eq!(recent[0].kind, InteractionKind::Visit);
        assert_eq!(recent[1].kind, InteractionKind::Webinar);
    }
}
