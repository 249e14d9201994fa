//! Data models for the `adapters` crate.
//!
//! These models are the typed rows exchanged with the hosted voting backend
//! (universities, categories, candidates, votes and the payloads of the remote
//! procedures). Every implementation of `VotingService` speaks these types, so
//! the application never handles raw JSON.

use std::{convert::Infallible, fmt, str::FromStr};

use chrono::{DateTime, Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

pub type UniversityId = Uuid;
pub type CategoryId = Uuid;
pub type CandidateId = Uuid;

/// Pseudo-anonymous key for one installation, used by the backend to partition vote quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub Uuid);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Gender bucket of a candidate or category.
///
/// The backend stores free text ("Male", "male", "FEMALE"), so parsing is
/// case-insensitive and unknown values are kept lowercased in `Other`. Two
/// values compare equal exactly when their text matches ignoring case.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Other(String),
}

impl Gender {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "male" => Gender::Male,
            "female" => Gender::Female,
            other => Gender::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other(raw) => raw,
        }
    }

    /// Lowercase form used for grouping keys.
    pub fn key(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl FromStr for Gender {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Gender::parse(s))
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Gender {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Gender::parse(&raw))
    }
}

/// Contest a category runs. Wire values are lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryType {
    King,
    Style,
    Popular,
    Innocent,
    Other(String),
}

impl CategoryType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "king" => CategoryType::King,
            "style" => CategoryType::Style,
            "popular" => CategoryType::Popular,
            "innocent" => CategoryType::Innocent,
            other => CategoryType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryType::King => "king",
            CategoryType::Style => "style",
            CategoryType::Popular => "popular",
            CategoryType::Innocent => "innocent",
            CategoryType::Other(raw) => raw,
        }
    }
}

impl FromStr for CategoryType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CategoryType::parse(s))
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CategoryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CategoryType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CategoryType::parse(&raw))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct University {
    pub id: UniversityId,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub university_id: UniversityId,
    pub gender: Gender,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub waist_number: Option<i32>,
    pub gender: Gender,
    pub university_id: UniversityId,
    #[serde(default)]
    pub height_cm: Option<f32>,
    #[serde(default, deserialize_with = "deserialize_birthday")]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub hobby: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Candidate {
    /// Whole years between the birthday and `today`, never negative.
    pub fn age_on(&self, today: NaiveDate) -> Option<u32> {
        let birthday = self.birthday?;
        let mut age = today.year() - birthday.year();
        if (today.month(), today.day()) < (birthday.month(), birthday.day()) {
            age -= 1;
        }
        Some(age.max(0) as u32)
    }

    /// Birthday as `DD Mon YYYY`, e.g. `07 Mar 2003`.
    pub fn birthday_display(&self) -> Option<String> {
        self.birthday.map(|day| day.format("%d %b %Y").to_string())
    }
}

/// Accepts both plain dates and full timestamps, since the column type varies between deployments.
fn deserialize_birthday<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };

    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|ts| Some(ts.date_naive()))
        .map_err(serde::de::Error::custom)
}

/// Reduced candidate row used by the public live results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CandidatePreview {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub gender: Gender,
}

impl From<&Candidate> for CandidatePreview {
    fn from(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.name.clone(),
            image_url: candidate.image_url.clone(),
            gender: candidate.gender.clone(),
        }
    }
}

/// One row of `get_device_ticket_usage`: what is left for a device in one gender bucket.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TicketUsage {
    pub gender: Gender,
    pub remaining_tickets: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NewVote {
    pub university_id: UniversityId,
    pub category_id: CategoryId,
    pub candidate_id: CandidateId,
    pub device_id: DeviceId,
}

/// One tally row of `get_admin_full_results_secure`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdminResultRow {
    pub university_id: UniversityId,
    pub category_id: CategoryId,
    pub gender: Gender,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub candidate_id: CandidateId,
    pub waist_number: Option<i32>,
    pub name: String,
    pub votes: i64,
}

/// Leading candidate of one category, as exposed by the `public_top_results` view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TopResult {
    pub category_id: CategoryId,
    pub candidate_id: CandidateId,
    pub votes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}
