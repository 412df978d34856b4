//! Achievement content: the descriptive payload kept in the content store
use super::error::ValidationError;
use super::utils;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }
    pub fn from_ymd_hms(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    /// Reporting bucket in the form `YYYY-MM`
    pub fn period(&self) -> String {
        self.0.format("%Y-%m").to_string()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl Serialize for TimeStamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Key of a content record, also the join key stored on its reference.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, minicbor::Encode, minicbor::Decode,
)]
#[serde(transparent)]
pub struct ContentId(#[n(0)] String);

impl ContentId {
    pub fn generate() -> Self {
        Self(utils::new_uuid_hex())
    }
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if utils::is_uuid_hex(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ValidationError::InvalidContentId(value.to_string()))
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum AchievementType {
    #[n(0)]
    Academic,
    #[n(1)]
    Competition,
    #[n(2)]
    Organization,
    #[n(3)]
    Publication,
    #[n(4)]
    Certification,
    #[n(5)]
    Other,
}

impl AchievementType {
    pub const ALL: [AchievementType; 6] = [
        AchievementType::Academic,
        AchievementType::Competition,
        AchievementType::Organization,
        AchievementType::Publication,
        AchievementType::Certification,
        AchievementType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementType::Academic => "academic",
            AchievementType::Competition => "competition",
            AchievementType::Organization => "organization",
            AchievementType::Publication => "publication",
            AchievementType::Certification => "certification",
            AchievementType::Other => "other",
        }
    }
}

impl FromStr for AchievementType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AchievementType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidType(s.to_string()))
    }
}

impl fmt::Display for AchievementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type specific details. Only the fields relevant to the achievement type are filled.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode,
)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementDetails {
    // competition
    #[n(0)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition_name: Option<String>,
    #[n(1)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competition_level: Option<String>,
    #[n(2)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[n(3)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medal_type: Option<String>,
    // shared event data
    #[n(4)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[n(5)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[n(6)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organizer: Option<String>,
    // publication
    #[n(7)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_type: Option<String>,
    #[n(8)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[n(9)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,
    // certification
    #[n(10)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certification_name: Option<String>,
    #[n(11)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
    #[n(12)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certification_number: Option<String>,
    #[n(13)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, minicbor::Encode, minicbor::Decode,
)]
#[serde(default)]
pub struct Attachment {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub url: String,
    #[n(2)]
    pub kind: String,
}

/// Free-form fields supplied by the student. Persisted as a json string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFields(pub serde_json::Map<String, serde_json::Value>);

impl<C> minicbor::Encode<C> for CustomFields {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let json = serde_json::to_string(&self.0)
            .map_err(|_| minicbor::encode::Error::message("failed to serialise custom fields"))?;
        e.str(&json)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for CustomFields {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let json = d.str()?;

        serde_json::from_str(json)
            .map(CustomFields)
            .map_err(|_| minicbor::decode::Error::message("custom fields are not valid json"))
    }
}

/// Validated, student editable part of an achievement.
#[derive(Debug, Clone, PartialEq, Serialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct AchievementBody {
    #[n(0)]
    pub achievement_type: AchievementType,
    #[n(1)]
    pub title: String,
    #[n(2)]
    pub description: String,
    #[n(3)]
    pub details: AchievementDetails,
    #[n(4)]
    pub custom_fields: CustomFields,
    #[n(5)]
    pub attachments: Vec<Attachment>,
    #[n(6)]
    pub tags: Vec<String>,
}

/// A stored content record. `deleted_at` marks a soft delete.
#[derive(Debug, Clone, PartialEq, Serialize, minicbor::Encode, minicbor::Decode)]
#[serde(rename_all = "camelCase")]
pub struct AchievementContent {
    #[n(0)]
    pub id: ContentId,
    #[n(1)]
    pub student_id: String,
    #[n(2)]
    #[serde(flatten)]
    pub body: AchievementBody,
    #[n(3)]
    pub points: i64,
    #[n(4)]
    pub created_at: TimeStamp,
    #[n(5)]
    pub updated_at: TimeStamp,
    #[n(6)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<TimeStamp>,
}

impl AchievementContent {
    pub fn new(id: ContentId, student_id: String, body: AchievementBody, now: TimeStamp) -> Self {
        Self {
            id,
            student_id,
            body,
            points: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
    pub fn competition_level(&self) -> Option<&str> {
        self.body.details.competition_level.as_deref()
    }
}

/// Unvalidated achievement input, as submitted by a student.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AchievementDraft {
    achievement_type: Option<String>,
    title: Option<String>,
    description: Option<String>,
    details: AchievementDetails,
    custom_fields: CustomFields,
    attachments: Option<Vec<Attachment>>,
    tags: Option<Vec<String>>,
}

impl AchievementDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_type(mut self, achievement_type: &str) -> Self {
        self.achievement_type = Some(achievement_type.to_string());
        self
    }
    pub fn set_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }
    pub fn set_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
    pub fn set_details(mut self, details: AchievementDetails) -> Self {
        self.details = details;
        self
    }
    pub fn set_custom_field(mut self, key: &str, value: serde_json::Value) -> Self {
        self.custom_fields.0.insert(key.to_string(), value);
        self
    }
    pub fn add_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.get_or_insert_with(Vec::new).push(attachment);
        self
    }
    pub fn add_tag(mut self, tag: &str) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(tag.to_string());
        self
    }
    // Checks required fields and returns the storable body
    pub fn validate_and_finalise(self) -> Result<AchievementBody, ValidationError> {
        let title = match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => return Err(ValidationError::EmptyTitle),
        };
        let achievement_type = match self.achievement_type.as_deref().map(str::trim) {
            None | Some("") => return Err(ValidationError::MissingType),
            Some(kind) => kind.parse::<AchievementType>()?,
        };

        Ok(AchievementBody {
            achievement_type,
            title,
            description: self.description.unwrap_or_default(),
            details: self.details,
            custom_fields: self.custom_fields,
            attachments: self.attachments.unwrap_or_default(),
            tags: self.tags.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::now();

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: TimeStamp = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn period_is_year_and_month() {
        let ts = TimeStamp::from_ymd_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(ts.period(), "2024-03");
    }

    #[test]
    fn draft_requires_title() {
        let err = AchievementDraft::new()
            .set_type("competition")
            .set_title("   ")
            .validate_and_finalise()
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyTitle);
    }

    #[test]
    fn draft_requires_known_type() {
        let missing = AchievementDraft::new().set_title("Hackathon").validate_and_finalise();
        assert_eq!(missing.unwrap_err(), ValidationError::MissingType);

        let unknown = AchievementDraft::new()
            .set_title("Hackathon")
            .set_type("sports")
            .validate_and_finalise();
        assert_eq!(
            unknown.unwrap_err(),
            ValidationError::InvalidType("sports".into())
        );
    }

    #[test]
    fn draft_defaults_optional_collections() {
        let body = AchievementDraft::new()
            .set_title("Dean's list")
            .set_type("academic")
            .validate_and_finalise()
            .unwrap();

        assert_eq!(body.achievement_type, AchievementType::Academic);
        assert!(body.attachments.is_empty());
        assert!(body.tags.is_empty());
        assert_eq!(body.description, "");
    }

    #[test]
    fn draft_deserialises_camel_case() {
        let draft: AchievementDraft = serde_json::from_value(serde_json::json!({
            "achievementType": "competition",
            "title": "Regional robotics",
            "details": { "competitionLevel": "national", "rank": 2 },
            "customFields": { "team": "Byte" },
            "tags": ["robotics"]
        }))
        .unwrap();

        let body = draft.validate_and_finalise().unwrap();
        assert_eq!(body.details.competition_level.as_deref(), Some("national"));
        assert_eq!(body.details.rank, Some(2));
        assert_eq!(body.custom_fields.0["team"], "Byte");
    }

    #[test]
    fn content_survives_storage_encoding() {
        let body = AchievementDraft::new()
            .set_title("Paper")
            .set_type("publication")
            .set_custom_field("doi", serde_json::json!("10.1000/182"))
            .add_attachment(Attachment {
                name: "paper.pdf".into(),
                url: "https://files.example/paper.pdf".into(),
                kind: "application/pdf".into(),
            })
            .validate_and_finalise()
            .unwrap();
        let content = AchievementContent::new(ContentId::generate(), "s-1".into(), body, TimeStamp::now());

        let bytes = minicbor::to_vec(&content).unwrap();
        let decoded: AchievementContent = minicbor::decode(&bytes).unwrap();
        assert_eq!(content, decoded);
    }

    #[test]
    fn content_id_rejects_malformed_input() {
        assert!(ContentId::parse("64f1c2").is_err());
        let id = ContentId::generate();
        assert_eq!(ContentId::parse(id.as_str()).unwrap(), id);
    }
}
