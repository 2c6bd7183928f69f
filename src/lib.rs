//! # School Match Search
//!
//! ## Overview
//! This library implements the "AI match" query pipeline for the school
//! directory: a free-text search phrase (mixed Latin/Cyrillic) is parsed into
//! a structured filter, which is then applied to school records with
//! deterministic filtering and stable multi-key sorting.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `keywords`: Static keyword tables mapping canonical filter values to
//!   multi-language trigger substrings
//! - `extract`: Regex-based numeric extraction (price ranges, rating
//!   thresholds, minimum counts)
//! - `parser`: Local heuristic query parser producing a `ParsedFilter`
//! - `remote`: Remote LLM-backed parser collaborator with timeout and
//!   transparent fallback to the local parser
//! - `record`: School record model and raw-payload normalization
//! - `engine`: Filter/sort engine applying a `ParsedFilter` to records
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Free-text search queries, school directory records (JSON)
//! - **Output**: `ParsedFilter` objects and ordered, filtered record lists
//! - **Guarantees**: Parsing and filtering are pure, deterministic and never
//!   panic on malformed input
//!
//! ## Usage
//! ```rust,no_run
//! use school_match_search::{FilterEngine, GeoContext, LocalQueryParser};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let parser = LocalQueryParser::new()?;
//!     let filter = parser.parse_query("Private school in Almaty under 200000 ₸");
//!     let engine = FilterEngine::new(GeoContext::default());
//!     let results = engine.apply(&[], &filter);
//!     println!("Found {} results", results.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod config;
pub mod errors;
pub mod keywords;
pub mod extract;
pub mod parser;
pub mod remote;
pub mod record;
pub mod engine;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use engine::{FilterEngine, GeoContext};
pub use errors::{MatchError, Result};
pub use parser::{LocalQueryParser, ParsedFilter, ParserSource, SchoolQueryParser};
pub use record::SchoolRecord;
pub use remote::{FallbackParser, RemoteQueryParser};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lower bound of the monthly fee domain (currency-agnostic integer units).
pub const PRICE_MIN: u32 = 0;

/// Upper bound of the monthly fee domain (currency-agnostic integer units).
pub const PRICE_MAX: u32 = 400_000;

/// Geographic coordinate pair used for nearby filtering and distance sorting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
}

impl GeoPoint {
    /// Whether both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Fixed set of result orderings the parser can request and the engine applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    /// Preserve input order (no reordering)
    Relevance,
    /// Numeric rating, descending, missing = 0
    RatingDesc,
    /// Monthly fee ascending, missing fees sort last
    PriceAsc,
    /// Monthly fee descending, missing fees sort last
    PriceDesc,
    /// Case-insensitive name comparison, ascending
    NameAsc,
    /// Review count descending, missing = 0
    ReviewsDesc,
    /// Haversine distance ascending, missing coordinates sort last
    DistanceAsc,
    /// Last-updated timestamp descending, missing = 0
    UpdatedDesc,
}

impl SortOption {
    /// Wire identifier used in the `ParsedFilter` contract.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOption::Relevance => "relevance",
            SortOption::RatingDesc => "rating_desc",
            SortOption::PriceAsc => "price_asc",
            SortOption::PriceDesc => "price_desc",
            SortOption::NameAsc => "name_asc",
            SortOption::ReviewsDesc => "reviews_desc",
            SortOption::DistanceAsc => "distance_asc",
            SortOption::UpdatedDesc => "updated_desc",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOption {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "relevance" => Ok(SortOption::Relevance),
            "rating_desc" => Ok(SortOption::RatingDesc),
            "price_asc" => Ok(SortOption::PriceAsc),
            "price_desc" => Ok(SortOption::PriceDesc),
            "name_asc" => Ok(SortOption::NameAsc),
            "reviews_desc" => Ok(SortOption::ReviewsDesc),
            "distance_asc" => Ok(SortOption::DistanceAsc),
            "updated_desc" => Ok(SortOption::UpdatedDesc),
            other => Err(MatchError::Validation {
                field: "sort_option".to_string(),
                reason: format!("unknown sort option '{}'", other),
            }),
        }
    }
}

/// Exam requirement detected in a query ("with entrance exam" / "no exam").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamRequirement {
    Yes,
    No,
}
