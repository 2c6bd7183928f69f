//! # School Record Module
//!
//! ## Purpose
//! Read-only flattened school attributes consumed by the filter engine, plus
//! normalization of raw directory payloads. The directory collaborator owns
//! record lifecycle; this module never mutates records after normalization.
//!
//! ## Input/Output Specification
//! - **Input**: Raw per-school JSON payloads from the school directory
//! - **Output**: `SchoolRecord` values with fallbacks resolved once
//! - **Normalization**: same-category fallbacks ("rating or system rating",
//!   "monthly fee or price per month") are resolved here, so filter
//!   predicates read plain optionals instead of chasing fallback chains

use crate::{GeoPoint, SortOption};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flattened per-school attributes used for filtering and sorting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchoolRecord {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub address: String,
    /// Free-text type description ("частная школа-гимназия")
    pub school_type: String,
    /// Free-text languages of instruction
    pub languages: String,
    pub curricula: Vec<String>,
    pub subjects: Vec<String>,
    pub specialists: Vec<String>,
    pub has_transfer: bool,
    pub has_pool: bool,
    pub has_extended_day: bool,
    pub has_security: bool,
    pub has_license: bool,
    pub has_certificates: bool,
    pub exam_required: bool,
    /// Free-text meals description
    pub meals: String,
    pub rating: Option<f32>,
    pub reviews_count: Option<u32>,
    pub monthly_fee: Option<u32>,
    pub class_size: Option<u32>,
    pub clubs_count: Option<u32>,
    pub location: Option<GeoPoint>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for SchoolRecord {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            name: String::new(),
            city: String::new(),
            address: String::new(),
            school_type: String::new(),
            languages: String::new(),
            curricula: Vec::new(),
            subjects: Vec::new(),
            specialists: Vec::new(),
            has_transfer: false,
            has_pool: false,
            has_extended_day: false,
            has_security: false,
            has_license: false,
            has_certificates: false,
            exam_required: false,
            meals: String::new(),
            rating: None,
            reviews_count: None,
            monthly_fee: None,
            class_size: None,
            clubs_count: None,
            location: None,
            updated_at: None,
        }
    }
}

impl SchoolRecord {
    /// Concatenated searchable text for remainder full-text matching,
    /// already lowercased.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![
            &self.name,
            &self.city,
            &self.address,
            &self.school_type,
            &self.languages,
            &self.meals,
        ];
        parts.extend(self.curricula.iter().map(String::as_str));
        parts.extend(self.subjects.iter().map(String::as_str));
        parts.extend(self.specialists.iter().map(String::as_str));
        parts.join(" ").to_lowercase()
    }

    /// Boolean flag for a canonical service name. Unknown names are false,
    /// which under ALL-of semantics rejects the record rather than passing it.
    pub fn service_flag(&self, service: &str) -> bool {
        match service {
            "Transfer" => self.has_transfer,
            "Pool" => self.has_pool,
            "Extended day" => self.has_extended_day,
            "Security" => self.has_security,
            _ => false,
        }
    }

    /// Sort key for timestamp ordering, missing = 0.
    pub fn updated_ts(&self) -> i64 {
        self.updated_at.map(|t| t.timestamp()).unwrap_or(0)
    }
}

/// Raw directory payload before normalization. Carries the legacy fallback
/// pairs the directory still emits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSchoolRecord {
    pub id: Option<Uuid>,
    pub name: String,
    pub city: String,
    pub address: String,
    pub school_type: String,
    pub languages: String,
    pub curricula: Vec<String>,
    pub subjects: Vec<String>,
    pub specialists: Vec<String>,
    pub has_transfer: bool,
    pub has_pool: bool,
    pub has_extended_day: bool,
    pub has_security: bool,
    pub has_license: bool,
    pub has_certificates: bool,
    pub exam_required: bool,
    pub meals: String,
    pub rating: Option<f32>,
    /// Legacy aggregate rating, used when `rating` is absent
    pub system_rating: Option<f32>,
    pub reviews_count: Option<u32>,
    /// Legacy review counter
    pub reviews: Option<u32>,
    pub monthly_fee: Option<u32>,
    /// Legacy fee field
    pub price_per_month: Option<u32>,
    pub class_size: Option<u32>,
    pub clubs_count: Option<u32>,
    pub location: Option<GeoPoint>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<RawSchoolRecord> for SchoolRecord {
    /// Resolve fallback chains once, at normalization time. Non-finite
    /// ratings and coordinates are dropped rather than propagated.
    fn from(raw: RawSchoolRecord) -> Self {
        SchoolRecord {
            id: raw.id.unwrap_or_else(Uuid::new_v4),
            name: raw.name,
            city: raw.city,
            address: raw.address,
            school_type: raw.school_type,
            languages: raw.languages,
            curricula: raw.curricula,
            subjects: raw.subjects,
            specialists: raw.specialists,
            has_transfer: raw.has_transfer,
            has_pool: raw.has_pool,
            has_extended_day: raw.has_extended_day,
            has_security: raw.has_security,
            has_license: raw.has_license,
            has_certificates: raw.has_certificates,
            exam_required: raw.exam_required,
            meals: raw.meals,
            rating: raw.rating.or(raw.system_rating).filter(|r| r.is_finite()),
            reviews_count: raw.reviews_count.or(raw.reviews),
            monthly_fee: raw.monthly_fee.or(raw.price_per_month),
            class_size: raw.class_size,
            clubs_count: raw.clubs_count,
            location: raw.location.filter(GeoPoint::is_finite),
            updated_at: raw.updated_at,
        }
    }
}

/// Ordered sequence of filtered records, recomputed per search.
#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub records: Vec<SchoolRecord>,
    /// Sort actually applied, `relevance` when none was requested
    pub sort: SortOption,
}
