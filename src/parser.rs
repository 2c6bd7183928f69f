//! # Query Parser Module
//!
//! ## Purpose
//! Local heuristic parser turning a free-text search phrase into a structured
//! [`ParsedFilter`]. It orchestrates keyword-table matching and numeric
//! extraction over a lowercased copy of the query, tracks every consumed
//! substring and computes a residual free-text remainder for full-text search.
//!
//! ## Input/Output Specification
//! - **Input**: Raw query string (UTF-8, mixed Latin/Cyrillic)
//! - **Output**: `ParsedFilter` with canonical-domain values only
//! - **Guarantees**: Pure, deterministic, never panics; worst case is an
//!   all-default filter whose `query` is a cleaned copy of the input
//!
//! ## Documented Heuristics
//! - A bare "cambridge"/"кембридж" mention with no specific programme keyword
//!   selects "Cambridge IGCSE" as a reasonable default.
//! - Any price signal implicitly adds the "Private" school type, since fee
//!   filters only make sense for fee-charging schools in this domain.
//! - A district mention selects the parent city even when the city itself is
//!   not named.
//! - "no exam" keywords beat "exam required" keywords when both are present.

use crate::errors::Result;
use crate::extract::{clamp_range, NumericExtractors};
use crate::keywords::{self, KeywordTable};
use crate::utils::TextUtils;
use crate::{ExamRequirement, SortOption, PRICE_MAX, PRICE_MIN};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured filter produced by a query parser (local or remote).
///
/// Every list field holds de-duplicated canonical-domain values in
/// first-match order; nothing freeform leaks through [`ParsedFilter::sanitize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParsedFilter {
    /// Residual free-text tokens not consumed by structured matches
    pub query: String,
    pub cities: Vec<String>,
    /// Selected districts per city
    pub city_areas: BTreeMap<String, Vec<String>>,
    pub types: Vec<String>,
    pub languages: Vec<String>,
    pub curricula: Vec<String>,
    pub subjects: Vec<String>,
    pub specialists: Vec<String>,
    pub services: Vec<String>,
    pub meals: Vec<String>,
    pub accreditations: Vec<String>,
    pub exam: Option<ExamRequirement>,
    /// Minimum rating threshold in [0, 5]
    pub rating: Option<f32>,
    /// Minimum clubs count, 0 = unset
    pub min_clubs: u32,
    /// Minimum class size, 0 = unset
    pub min_class_size: u32,
    /// Monthly fee range, defaults to the full domain
    pub price_range: (u32, u32),
    pub use_nearby: bool,
    pub sort_option: Option<SortOption>,
}

impl Default for ParsedFilter {
    fn default() -> Self {
        Self {
            query: String::new(),
            cities: Vec::new(),
            city_areas: BTreeMap::new(),
            types: Vec::new(),
            languages: Vec::new(),
            curricula: Vec::new(),
            subjects: Vec::new(),
            specialists: Vec::new(),
            services: Vec::new(),
            meals: Vec::new(),
            accreditations: Vec::new(),
            exam: None,
            rating: None,
            min_clubs: 0,
            min_class_size: 0,
            price_range: (PRICE_MIN, PRICE_MAX),
            use_nearby: false,
            sort_option: None,
        }
    }
}

impl ParsedFilter {
    /// Whether the filter carries no structured constraints at all.
    pub fn is_default(&self) -> bool {
        *self == Self {
            query: self.query.clone(),
            ..Self::default()
        }
    }

    /// Coerce the filter back into the canonical domains.
    ///
    /// Mandatory for every parser source before the filter reaches the
    /// engine: out-of-domain list values are silently dropped (partial
    /// trust), the rating is clamped into [0, 5] and the price range is
    /// clamped and reordered. Local parses already produce canonical values,
    /// so for them this is a no-op.
    pub fn sanitize(&mut self) {
        retain_canonical(&mut self.cities, keywords::CITY_KEYWORDS);
        retain_canonical(&mut self.types, keywords::TYPE_KEYWORDS);
        retain_canonical(&mut self.languages, keywords::LANGUAGE_KEYWORDS);
        retain_canonical(&mut self.curricula, keywords::CURRICULUM_KEYWORDS);
        retain_canonical(&mut self.subjects, keywords::SUBJECT_KEYWORDS);
        retain_canonical(&mut self.specialists, keywords::SPECIALIST_KEYWORDS);
        retain_canonical(&mut self.services, keywords::SERVICE_KEYWORDS);
        retain_canonical(&mut self.meals, keywords::MEAL_KEYWORDS);
        retain_canonical(&mut self.accreditations, keywords::ACCREDITATION_KEYWORDS);

        let mut areas = BTreeMap::new();
        for (city, list) in std::mem::take(&mut self.city_areas) {
            if !keywords::is_canonical(keywords::CITY_KEYWORDS, &city) {
                continue;
            }
            let domain = keywords::areas_of(&city);
            let mut kept: Vec<String> = list
                .into_iter()
                .filter(|a| domain.iter().any(|(d, _)| d == a))
                .collect();
            dedup_in_order(&mut kept);
            if !kept.is_empty() {
                areas.insert(city, kept);
            }
        }
        self.city_areas = areas;

        self.rating = self
            .rating
            .filter(|r| r.is_finite())
            .map(|r| r.clamp(0.0, 5.0));
        self.price_range = clamp_range(self.price_range.0, self.price_range.1);
        self.query = self.query.trim().to_string();
    }

    /// District names active for the selected cities (union).
    pub fn active_areas(&self) -> Vec<&str> {
        self.cities
            .iter()
            .filter_map(|c| self.city_areas.get(c))
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Which parser produced a `ParsedFilter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserSource {
    /// Local heuristic parser, chosen directly
    Local,
    /// Remote LLM-backed parser
    Remote,
    /// Local parser used because the remote collaborator failed
    LocalFallback,
}

impl ParserSource {
    /// Non-fatal "used local matching" indicator for the caller.
    pub fn is_fallback(&self) -> bool {
        matches!(self, ParserSource::LocalFallback)
    }
}

impl std::fmt::Display for ParserSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParserSource::Local => "local",
            ParserSource::Remote => "remote",
            ParserSource::LocalFallback => "local_fallback",
        };
        f.write_str(name)
    }
}

/// Capability interface shared by the local and remote parsers.
#[async_trait]
pub trait SchoolQueryParser: Send + Sync {
    /// Parse a free-text query into a sanitized `ParsedFilter`.
    async fn parse(&self, query: &str) -> Result<ParsedFilter>;

    /// Which implementation this is, for logging and the fallback indicator.
    fn source(&self) -> ParserSource;
}

/// Local heuristic parser: keyword tables + numeric extraction, no I/O.
pub struct LocalQueryParser {
    extractors: NumericExtractors,
}

impl LocalQueryParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            extractors: NumericExtractors::new()?,
        })
    }

    /// Parse a raw query. Pure and deterministic; identical input always
    /// yields identical output.
    pub fn parse_query(&self, raw: &str) -> ParsedFilter {
        let folded = TextUtils::fold(raw);
        tracing::debug!(
            query = %TextUtils::truncate(&folded, 80),
            words = TextUtils::word_count(&folded),
            "parsing query"
        );

        let mut filter = ParsedFilter::default();
        let mut consumed: Vec<String> = Vec::new();

        // Structured category matching over the lowercased query.
        self.match_cities(&folded, &mut filter, &mut consumed);
        scan_table(&folded, keywords::TYPE_KEYWORDS, &mut filter.types, &mut consumed);
        scan_table(&folded, keywords::LANGUAGE_KEYWORDS, &mut filter.languages, &mut consumed);
        scan_table(&folded, keywords::CURRICULUM_KEYWORDS, &mut filter.curricula, &mut consumed);
        scan_table(&folded, keywords::SUBJECT_KEYWORDS, &mut filter.subjects, &mut consumed);
        scan_table(&folded, keywords::SPECIALIST_KEYWORDS, &mut filter.specialists, &mut consumed);
        scan_table(&folded, keywords::SERVICE_KEYWORDS, &mut filter.services, &mut consumed);
        scan_table(&folded, keywords::MEAL_KEYWORDS, &mut filter.meals, &mut consumed);
        scan_table(&folded, keywords::ACCREDITATION_KEYWORDS, &mut filter.accreditations, &mut consumed);

        // Bare "cambridge" defaults to Cambridge IGCSE (documented heuristic).
        for token in ["cambridge", "кембридж"] {
            if folded.contains(token) {
                push_unique(&mut filter.curricula, keywords::CAMBRIDGE_DEFAULT);
                consumed.push(token.to_string());
            }
        }

        // Numeric extraction. Counts and rating run first and their spans are
        // masked out of the text the price patterns see, so "от 10 кружков"
        // never becomes a fee floor.
        let mut masked = folded.clone();
        if let Some(e) = self.extractors.extract_min_clubs(&masked) {
            filter.min_clubs = e.value;
            consume(&mut masked, &mut consumed, e.consumed);
        }
        if let Some(e) = self.extractors.extract_min_class_size(&masked) {
            filter.min_class_size = e.value;
            consume(&mut masked, &mut consumed, e.consumed);
        }
        if let Some(e) = self.extractors.extract_rating(&masked) {
            filter.rating = Some(e.value);
            consume(&mut masked, &mut consumed, e.consumed);
        }
        if let Some(e) = self.extractors.extract_price(&masked) {
            filter.price_range = e.value;
            consume(&mut masked, &mut consumed, e.consumed);
            // Price signals imply a fee-charging school (documented heuristic).
            push_unique(&mut filter.types, keywords::PRIVATE_TYPE);
        }

        // Exam requirement: the "no exam" family wins ties.
        let mut no_exam = false;
        let mut yes_exam = false;
        for kw in keywords::EXAM_NO_KEYWORDS {
            if folded.contains(kw) {
                no_exam = true;
                consumed.push((*kw).to_string());
            }
        }
        for kw in keywords::EXAM_YES_KEYWORDS {
            if folded.contains(kw) {
                yes_exam = true;
                consumed.push((*kw).to_string());
            }
        }
        filter.exam = if no_exam {
            Some(ExamRequirement::No)
        } else if yes_exam {
            Some(ExamRequirement::Yes)
        } else {
            None
        };

        // Sort intent: first match in table-declaration order wins.
        for (option, kws) in keywords::SORT_KEYWORDS {
            let mut matched = false;
            for kw in *kws {
                if folded.contains(kw) {
                    matched = true;
                    consumed.push((*kw).to_string());
                }
            }
            if matched {
                filter.sort_option = Some(*option);
                break;
            }
        }
        // Nearby keywords force the flag regardless of the chosen sort.
        for kw in keywords::NEARBY_KEYWORDS {
            if folded.contains(kw) {
                filter.use_nearby = true;
                consumed.push((*kw).to_string());
            }
        }

        filter.query = remainder(&folded, &consumed);
        filter.sanitize();
        filter
    }

    /// Cities match on aliases, on the raw city name itself, and indirectly
    /// through district keywords (a district selects its parent city).
    fn match_cities(&self, folded: &str, filter: &mut ParsedFilter, consumed: &mut Vec<String>) {
        for (city, kws) in keywords::CITY_KEYWORDS {
            let name = city.to_lowercase();
            if folded.contains(&name) {
                push_unique(&mut filter.cities, city);
                consumed.push(name);
            }
            for kw in *kws {
                if folded.contains(kw) {
                    push_unique(&mut filter.cities, city);
                    consumed.push((*kw).to_string());
                }
            }
        }
        for (city, areas) in keywords::CITY_AREAS {
            let mut hit: Vec<String> = Vec::new();
            for (area, kws) in *areas {
                for kw in *kws {
                    if folded.contains(kw) {
                        push_unique(&mut hit, area);
                        consumed.push((*kw).to_string());
                    }
                }
            }
            if !hit.is_empty() {
                push_unique(&mut filter.cities, city);
                filter.city_areas.insert((*city).to_string(), hit);
            }
        }
    }
}

#[async_trait]
impl SchoolQueryParser for LocalQueryParser {
    async fn parse(&self, query: &str) -> Result<ParsedFilter> {
        Ok(self.parse_query(query))
    }

    fn source(&self) -> ParserSource {
        ParserSource::Local
    }
}

/// Scan one keyword table: every keyword found as a substring selects its
/// canonical value (inclusive-OR, de-duplicated, first-seen order).
fn scan_table(text: &str, table: KeywordTable, out: &mut Vec<String>, consumed: &mut Vec<String>) {
    for (canonical, kws) in table {
        for kw in *kws {
            if text.contains(kw) {
                push_unique(out, canonical);
                consumed.push((*kw).to_string());
            }
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn dedup_in_order(list: &mut Vec<String>) {
    let mut seen = Vec::new();
    list.retain(|v| {
        if seen.contains(v) {
            false
        } else {
            seen.push(v.clone());
            true
        }
    });
}

fn retain_canonical(list: &mut Vec<String>, table: KeywordTable) {
    list.retain(|v| keywords::is_canonical(table, v));
    dedup_in_order(list);
}

/// Record extraction spans: mask them out of the working text (so later
/// extractors cannot re-read them) and add them to the consumed set.
fn consume(masked: &mut String, consumed: &mut Vec<String>, spans: Vec<String>) {
    for span in spans {
        *masked = masked.replace(&span, " ");
        consumed.push(span);
    }
}

/// Compute the residual free-text query.
///
/// Multi-word consumed phrases are removed as literal substrings; single
/// words are removed leniently together with attached alphanumeric affixes to
/// catch simple inflected forms ("robot" strips "robotics"). Remaining
/// punctuation is stripped, stop-words and tokens of two characters or fewer
/// are dropped (purely numeric tokens survive), and the survivors are joined
/// with single spaces.
fn remainder(folded: &str, consumed: &[String]) -> String {
    let mut text = folded.to_string();

    // Longer spans first, so a short alias cannot break up a phrase before
    // the phrase itself is removed.
    let mut spans: Vec<&String> = consumed.iter().collect();
    spans.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));

    for span in spans {
        if span.chars().any(char::is_whitespace) {
            text = text.replace(span.as_str(), " ");
        } else {
            let pattern = format!(r"[\p{{L}}\p{{N}}]*{}[\p{{L}}\p{{N}}]*", regex::escape(span));
            match Regex::new(&pattern) {
                Ok(re) => text = re.replace_all(&text, " ").into_owned(),
                Err(_) => text = text.replace(span.as_str(), " "),
            }
        }
    }

    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| !keywords::STOP_WORDS.contains(t))
        .filter(|t| t.chars().count() > 2 || t.chars().all(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
}
