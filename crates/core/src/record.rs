//! CRM records: healthcare professionals and the interactions logged
//! against them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The only accepted follow-up date layout.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a follow-up date in strict `YYYY-MM-DD` form.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).ok()
}

/// Drop a leading title ("Dr.", "Doctor", "Prof.") and surrounding space
/// from a free-text HCP reference.
pub fn strip_honorific(name: &str) -> &str {
    const TITLES: [&str; 5] = ["doctor ", "prof. ", "prof ", "dr. ", "dr "];
    let trimmed = name.trim();
    let lower = trimmed.to_ascii_lowercase();
    for title in TITLES {
        if lower.starts_with(title) {
            return trimmed[title.len()..].trim_start();
        }
    }
    // "Dr.Smith"
    if lower.starts_with("dr.") {
        return trimmed[3..].trim_start();
    }
    trimmed
}

/// A healthcare professional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hcp {
    pub id: i64,
    pub name: String,
    pub specialty: String,
    pub hospital: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Hcp {
    /// Case-insensitive substring match on the name. `needle` must already
    /// be lowercased with `str::to_lowercase`.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
    }

    /// Case-insensitive substring match over name, specialty and hospital.
    /// `needle` must already be lowercased; an empty needle matches.
    pub fn matches_query(&self, needle: &str) -> bool {
        self.name_contains(needle)
            || self.specialty.to_lowercase().contains(needle)
            || self.hospital.to_lowercase().contains(needle)
    }
}

/// Fields for creating an HCP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewHcp {
    pub name: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub hospital: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl NewHcp {
    pub fn new(
        name: impl Into<String>,
        specialty: impl Into<String>,
        hospital: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            specialty: specialty.into(),
            hospital: hospital.into(),
            ..Default::default()
        }
    }

    pub fn with_contact(mut self, email: impl Into<String>, phone: impl Into<String>) -> Self {
        self.email = email.into();
        self.phone = phone.into();
        self
    }

    /// A name is the only thing an HCP cannot exist without.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("HCP name must not be empty".into());
        }
        Ok(())
    }
}

/// How the representative made contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Visit,
    Call,
    Email,
    Webinar,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 4] = [Self::Visit, Self::Call, Self::Email, Self::Webinar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visit => "visit",
            Self::Call => "call",
            Self::Email => "email",
            Self::Webinar => "webinar",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visit" | "meeting" | "in-person" | "in person" => Ok(Self::Visit),
            "call" | "phone" | "phone call" => Ok(Self::Call),
            "email" | "e-mail" => Ok(Self::Email),
            "webinar" | "video" | "online" => Ok(Self::Webinar),
            other => Err(format!("unknown interaction type '{other}'")),
        }
    }
}

/// The representative's read of how the contact went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(format!("unknown sentiment '{other}'")),
        }
    }
}

/// A logged contact event between a representative and an HCP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: i64,
    pub hcp_id: i64,
    #[serde(rename = "interaction_type")]
    pub kind: InteractionKind,
    pub notes: String,
    pub products_discussed: Option<String>,
    pub materials_shared: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub follow_up_required: bool,
    pub followup_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating an interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInteraction {
    pub hcp_id: i64,
    #[serde(rename = "interaction_type")]
    pub kind: InteractionKind,
    pub notes: String,
    #[serde(default)]
    pub products_discussed: Option<String>,
    #[serde(default)]
    pub materials_shared: Option<String>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub follow_up_required: bool,
    /// Backdating is only used by sample-data seeding.
    #[serde(skip)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewInteraction {
    pub fn new(hcp_id: i64, kind: InteractionKind, notes: impl Into<String>) -> Self {
        Self {
            hcp_id,
            kind,
            notes: notes.into(),
            products_discussed: None,
            materials_shared: None,
            sentiment: None,
            follow_up_required: false,
            created_at: None,
        }
    }

    pub fn with_products(mut self, products: impl Into<String>) -> Self {
        let products = products.into();
        self.products_discussed = (!products.trim().is_empty()).then_some(products);
        self
    }

    pub fn with_follow_up(mut self, required: bool) -> Self {
        self.follow_up_required = required;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionPatch {
    #[serde(default, rename = "interaction_type")]
    pub kind: Option<InteractionKind>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub products_discussed: Option<String>,
    #[serde(default)]
    pub materials_shared: Option<String>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
    #[serde(default)]
    pub follow_up_required: Option<bool>,
}

impl InteractionPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply this patch onto a record in place. Does not touch `updated_at`.
    pub fn apply_to(&self, record: &mut Interaction) {
        if let Some(kind) = self.kind {
            record.kind = kind;
        }
        if let Some(notes) = &self.notes {
            record.notes = notes.clone();
        }
        if let Some(products) = &self.products_discussed {
            record.products_discussed = Some(products.clone());
        }
        if let Some(materials) = &self.materials_shared {
            record.materials_shared = Some(materials.clone());
        }
        if let Some(sentiment) = self.sentiment {
            record.sentiment = Some(sentiment);
        }
        if let Some(required) = self.follow_up_required {
            record.follow_up_required = required;
        }
    }
}

/// The closed set of fields the edit tool may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableField {
    Notes,
    Kind,
    Products,
}

impl EditableField {
    /// The field name shown back to the model.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Kind => "interaction_type",
            Self::Products => "products_discussed",
        }
    }

    /// Turn a raw value into a single-field patch.
    pub fn apply(&self, value: &str) -> Result<InteractionPatch, String> {
        let mut patch = InteractionPatch::default();
        match self {
            Self::Notes => patch.notes = Some(value.to_string()),
            Self::Products => patch.products_discussed = Some(value.to_string()),
            Self::Kind => {
                let kind: InteractionKind = value.parse().map_err(|_| {
                    format!("Invalid interaction type '{value}'. Use one of: visit, call, email, webinar.")
                })?;
                patch.kind = Some(kind);
            }
        }
        Ok(patch)
    }
}

impl fmt::Display for EditableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditableField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notes" => Ok(Self::Notes),
            "kind" | "type" | "interaction_type" => Ok(Self::Kind),
            "products" | "products_discussed" => Ok(Self::Products),
            _ => Err(format!(
                "Invalid field '{s}'. Editable fields: notes, interaction_type, products_discussed."
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!("Visit".parse::<InteractionKind>().unwrap(), InteractionKind::Visit);
        assert_eq!("meeting".parse::<InteractionKind>().unwrap(), InteractionKind::Visit);
        assert_eq!("phone".parse::<InteractionKind>().unwrap(), InteractionKind::Call);
        assert_eq!(" online ".parse::<InteractionKind>().unwrap(), InteractionKind::Webinar);
        assert!("fax".parse::<InteractionKind>().is_err());
    }

    #[test]
    fn hcp_matching_is_unicode_case_insensitive() {
        let hcp = Hcp {
            id: 1,
            name: "Émile Ångström".into(),
            specialty: "Cardiology".into(),
            hospital: "Hôpital Saint-Louis".into(),
            email: String::new(),
            phone: String::new(),
            created_at: Utc::now(),
        };
        assert!(hcp.name_contains("émile"));
        assert!(hcp.matches_query("hôpital"));
        assert!(hcp.matches_query("cardio"));
        assert!(hcp.matches_query(""));
        assert!(!hcp.name_contains("cardio"));
    }

    #[test]
    fn editable_field_rejects_unknown_names() {
        assert_eq!("notes".parse::<EditableField>().unwrap(), EditableField::Notes);
        assert_eq!("type".parse::<EditableField>().unwrap(), EditableField::Kind);
        assert_eq!(
            "products_discussed".parse::<EditableField>().unwrap(),
            EditableField::Products
        );

        let err = "outcomes".parse::<EditableField>().unwrap_err();
        assert!(err.contains("Invalid field 'outcomes'"));
        assert!("hcp_id".parse::<EditableField>().is_err());
        assert!("created_at".parse::<EditableField>().is_err());
    }

    #[test]
    fn editable_field_builds_single_field_patch() {
        let patch = EditableField::Products.apply("CardioMax").unwrap();
        assert_eq!(patch.products_discussed.as_deref(), Some("CardioMax"));
        assert!(patch.notes.is_none());
        assert!(patch.kind.is_none());

        let patch = EditableField::Kind.apply("call").unwrap();
        assert_eq!(patch.kind, Some(InteractionKind::Call));

        assert!(EditableField::Kind.apply("carrier pigeon").is_err());
    }

    #[test]
    fn honorifics_are_stripped() {
        assert_eq!(strip_honorific("Dr. Smith"), "Smith");
        assert_eq!(strip_honorific("dr chen"), "chen");
        assert_eq!(strip_honorific("Doctor  Emily Williams"), "Emily Williams");
        assert_eq!(strip_honorific("Prof. Taylor"), "Taylor");
        assert_eq!(strip_honorific("Dr.Brown"), "Brown");
        assert_eq!(strip_honorific("Drake"), "Drake");
        assert_eq!(strip_honorific("  Lisa "), "Lisa");
    }

    #[test]
    fn date_parsing_is_strict() {
        assert_eq!(parse_date("2025-04-19"), NaiveDate::from_ymd_opt(2025, 4, 19));
        assert!(parse_date("2025-13-40").is_none());
        assert!(parse_date("04/19/2025").is_none());
        assert!(parse_date("tomorrow").is_none());
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let now = Utc::now();
        let mut record = Interaction {
            id: 1,
            hcp_id: 1,
            kind: InteractionKind::Visit,
            notes: "original".into(),
            products_discussed: Some("CardioMax".into()),
            materials_shared: None,
            sentiment: None,
            follow_up_required: false,
            followup_date: None,
            created_at: now,
            updated_at: now,
        };
        let patch = InteractionPatch {
            notes: Some("updated".into()),
            sentiment: Some(Sentiment::Positive),
            ..Default::default()
        };
        patch.apply_to(&mut record);
        assert_eq!(record.notes, "updated");
        assert_eq!(record.products_discussed.as_deref(), Some("CardioMax"));
        assert_eq!(record.sentiment, Some(Sentiment::Positive));
        assert!(InteractionPatch::default().is_empty());
    }

    #[test]
    fn interaction_serializes_kind_as_interaction_type() {
        let new: NewInteraction = serde_json::from_value(serde_json::json!({
            "hcp_id": 3,
            "interaction_type": "email",
            "notes": "sent safety profile"
        }))
        .unwrap();
        assert_eq!(new.kind, InteractionKind::Email);
        assert!(!new.follow_up_required);
        assert!(new.created_at.is_none());
    }

    #[test]
    fn new_hcp_requires_name() {
        assert!(NewHcp::new("  ", "Cardiology", "City General").validate().is_err());
        assert!(NewHcp::new("John Smith", "", "").validate().is_ok());
    }
}
