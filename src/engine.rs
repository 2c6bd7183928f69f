//! # Filter/Sort Engine Module
//!
//! ## Purpose
//! Applies a [`ParsedFilter`] to a collection of school records with defined
//! per-field match semantics (ANY-of vs ALL-of), then sorts the survivors by
//! one of the fixed total orders. Pure and synchronous; safe to call
//! concurrently.
//!
//! ## Input/Output Specification
//! - **Input**: School records (read-only), a sanitized `ParsedFilter`, geo
//!   context (user location + nearby radius)
//! - **Output**: Filtered, ordered record list; input order preserved for
//!   `relevance` and between equal sort keys (stable sorting)
//!
//! ## Match Semantics
//! A record must satisfy every non-empty field (logical AND across
//! categories). Cities, areas, types, languages and meals are ANY-of via the
//! shared keyword tables; curricula, subjects and specialists are ALL-of
//! exact membership; services and accreditations are ALL-of boolean flags.
//! The price range only binds fee-charging (Private) selections, and the
//! nearby constraint needs both a user location and record coordinates.

use crate::keywords::{self, KeywordTable};
use crate::parser::ParsedFilter;
use crate::record::SchoolRecord;
use crate::utils::Timer;
use crate::{ExamRequirement, GeoPoint, SortOption};

/// Mean Earth radius in kilometers, for haversine distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Caller-supplied geographic context. Not part of `ParsedFilter`: the radius
/// and user location arrive from the device layer alongside the filter.
#[derive(Debug, Clone, Copy)]
pub struct GeoContext {
    pub user_location: Option<GeoPoint>,
    pub radius_km: f64,
}

impl Default for GeoContext {
    fn default() -> Self {
        Self {
            user_location: None,
            radius_km: 5.0,
        }
    }
}

/// Deterministic filter/sort engine over school records.
pub struct FilterEngine {
    geo: GeoContext,
}

impl FilterEngine {
    pub fn new(geo: GeoContext) -> Self {
        Self { geo }
    }

    /// Filter records against every non-empty field of the filter, then sort
    /// by the requested option. Records are never mutated.
    pub fn apply(&self, records: &[SchoolRecord], filter: &ParsedFilter) -> Vec<SchoolRecord> {
        // An all-default filter selects everything in input order.
        if filter.is_default() && filter.query.is_empty() {
            return records.to_vec();
        }
        let timer = Timer::new("filter_apply");
        let mut results: Vec<SchoolRecord> = records
            .iter()
            .filter(|r| self.matches(r, filter))
            .cloned()
            .collect();

        tracing::debug!(
            total = records.len(),
            matched = results.len(),
            sort = ?filter.sort_option,
            elapsed_ms = timer.elapsed_ms(),
            "filter applied"
        );

        if let Some(option) = filter.sort_option {
            self.sort(&mut results, option);
        }
        results
    }

    /// Stable sort by one of the fixed total orders.
    pub fn sort(&self, records: &mut [SchoolRecord], option: SortOption) {
        match option {
            // Stable input order preserved.
            SortOption::Relevance => {}
            SortOption::RatingDesc => records.sort_by(|a, b| {
                let (ka, kb) = (a.rating.unwrap_or(0.0), b.rating.unwrap_or(0.0));
                kb.total_cmp(&ka)
            }),
            // Missing fees sort last in both directions via infinity sentinels.
            SortOption::PriceAsc => records.sort_by(|a, b| {
                let key = |r: &SchoolRecord| r.monthly_fee.map(f64::from).unwrap_or(f64::INFINITY);
                key(a).total_cmp(&key(b))
            }),
            SortOption::PriceDesc => records.sort_by(|a, b| {
                let key =
                    |r: &SchoolRecord| r.monthly_fee.map(f64::from).unwrap_or(f64::NEG_INFINITY);
                key(b).total_cmp(&key(a))
            }),
            SortOption::ReviewsDesc => records.sort_by(|a, b| {
                let (ka, kb) = (a.reviews_count.unwrap_or(0), b.reviews_count.unwrap_or(0));
                kb.cmp(&ka)
            }),
            SortOption::DistanceAsc => {
                let origin = self.geo.user_location;
                records.sort_by(|a, b| {
                    let key = |r: &SchoolRecord| distance_km(origin, r.location);
                    key(a).total_cmp(&key(b))
                });
            }
            SortOption::NameAsc => {
                records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            }
            SortOption::UpdatedDesc => records.sort_by(|a, b| b.updated_ts().cmp(&a.updated_ts())),
        }
    }

    fn matches(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        self.matches_query(record, filter)
            && self.matches_cities(record, filter)
            && self.matches_areas(record, filter)
            && matches_any_keyword(&record.school_type, &filter.types, keywords::TYPE_KEYWORDS)
            && matches_any_keyword(&record.languages, &filter.languages, keywords::LANGUAGE_KEYWORDS)
            && matches_any_keyword(&record.meals, &filter.meals, keywords::MEAL_KEYWORDS)
            && matches_all_members(&record.curricula, &filter.curricula)
            && matches_all_members(&record.subjects, &filter.subjects)
            && matches_all_members(&record.specialists, &filter.specialists)
            && filter.services.iter().all(|s| record.service_flag(s))
            && self.matches_accreditations(record, filter)
            && self.matches_exam(record, filter)
            && self.matches_counts(record, filter)
            && self.matches_price(record, filter)
            && self.matches_rating(record, filter)
            && self.matches_nearby(record, filter)
    }

    /// Remainder text: case-insensitive substring over the record's
    /// searchable fields; an empty remainder matches everything.
    fn matches_query(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        if filter.query.is_empty() {
            return true;
        }
        record.searchable_text().contains(&filter.query.to_lowercase())
    }

    /// ANY-of: city/address text contains any alias of any selected city.
    fn matches_cities(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        if filter.cities.is_empty() {
            return true;
        }
        let haystack = format!("{} {}", record.city, record.address).to_lowercase();
        filter.cities.iter().any(|city| {
            if haystack.contains(&city.to_lowercase()) {
                return true;
            }
            keywords::CITY_KEYWORDS
                .iter()
                .find(|(c, _)| c == city)
                .map(|(_, kws)| kws.iter().any(|kw| haystack.contains(kw)))
                .unwrap_or(false)
        })
    }

    /// ANY-of over the union of selected districts.
    fn matches_areas(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        let active = filter.active_areas();
        if active.is_empty() {
            return true;
        }
        let haystack = format!("{} {}", record.city, record.address).to_lowercase();
        active.iter().any(|area| {
            if haystack.contains(&area.to_lowercase()) {
                return true;
            }
            keywords::CITY_AREAS.iter().any(|(_, areas)| {
                areas
                    .iter()
                    .find(|(a, _)| a == area)
                    .map(|(_, kws)| kws.iter().any(|kw| haystack.contains(kw)))
                    .unwrap_or(false)
            })
        })
    }

    /// ALL-of: each selected accreditation requires its presence flag.
    fn matches_accreditations(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        filter.accreditations.iter().all(|a| match a.as_str() {
            "License" => record.has_license,
            "Certificates" => record.has_certificates,
            _ => false,
        })
    }

    fn matches_exam(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        match filter.exam {
            None => true,
            Some(required) => record.exam_required == (required == ExamRequirement::Yes),
        }
    }

    /// Numeric thresholds pass when unset (0) or when the record value is
    /// present and at least the threshold.
    fn matches_counts(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        let clubs_ok =
            filter.min_clubs == 0 || record.clubs_count.map_or(false, |n| n >= filter.min_clubs);
        let class_ok = filter.min_class_size == 0
            || record.class_size.map_or(false, |n| n >= filter.min_class_size);
        clubs_ok && class_ok
    }

    /// The fee range only binds when the Private type is selected and the
    /// record actually has a fee; otherwise it passes unconditionally.
    fn matches_price(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        if !filter.types.iter().any(|t| t == keywords::PRIVATE_TYPE) {
            return true;
        }
        match record.monthly_fee {
            None => true,
            Some(fee) => fee >= filter.price_range.0 && fee <= filter.price_range.1,
        }
    }

    fn matches_rating(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        match filter.rating {
            None => true,
            Some(threshold) => record.rating.unwrap_or(0.0) >= threshold,
        }
    }

    /// Nearby needs both sides of the distance: no user location (geolocation
    /// denied upstream) or no record coordinates means the constraint cannot
    /// bind and the record passes.
    fn matches_nearby(&self, record: &SchoolRecord, filter: &ParsedFilter) -> bool {
        if !filter.use_nearby {
            return true;
        }
        let origin = match self.geo.user_location {
            Some(p) if p.is_finite() => p,
            _ => return true,
        };
        match record.location {
            Some(loc) if loc.is_finite() => {
                haversine_km(origin, loc) <= self.geo.radius_km
            }
            _ => false,
        }
    }
}

/// ANY-of via the shared keyword tables: the record's free-text field must
/// contain any alias (or the canonical name) of any selected value.
fn matches_any_keyword(field: &str, selected: &[String], table: KeywordTable) -> bool {
    if selected.is_empty() {
        return true;
    }
    let haystack = field.to_lowercase();
    selected.iter().any(|value| {
        if haystack.contains(&value.to_lowercase()) {
            return true;
        }
        table
            .iter()
            .find(|(c, _)| c == value)
            .map(|(_, kws)| kws.iter().any(|kw| haystack.contains(kw)))
            .unwrap_or(false)
    })
}

/// ALL-of exact item membership (case-insensitive, trimmed), not substring
/// matching on raw text.
fn matches_all_members(items: &[String], selected: &[String]) -> bool {
    selected.iter().all(|want| {
        let want = want.trim().to_lowercase();
        items.iter().any(|have| have.trim().to_lowercase() == want)
    })
}

/// Distance sort key: infinity when either endpoint is missing, so those
/// records sort last.
fn distance_km(origin: Option<GeoPoint>, target: Option<GeoPoint>) -> f64 {
    match (origin, target) {
        (Some(a), Some(b)) if a.is_finite() && b.is_finite() => haversine_km(a, b),
        _ => f64::INFINITY,
    }
}

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SchoolRecord;

    fn school(name: &str) -> SchoolRecord {
        SchoolRecord {
            name: name.to_string(),
            ..SchoolRecord::default()
        }
    }

    fn engine() -> FilterEngine {
        FilterEngine::new(GeoContext::default())
    }

    #[test]
    fn default_filter_returns_everything_in_order() {
        let records = vec![school("A"), school("B"), school("C")];
        let results = engine().apply(&records, &ParsedFilter::default());
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn price_range_binds_private_schools_only() {
        let cheap = SchoolRecord {
            monthly_fee: Some(150_000),
            ..school("Cheap Private")
        };
        let pricey = SchoolRecord {
            monthly_fee: Some(250_000),
            ..school("Pricey Private")
        };
        let filter = ParsedFilter {
            types: vec!["Private".to_string()],
            price_range: (0, 200_000),
            ..ParsedFilter::default()
        };
        // Type matching is keyword-based, give both a matching type text.
        let cheap = SchoolRecord {
            school_type: "частная школа".to_string(),
            ..cheap
        };
        let pricey = SchoolRecord {
            school_type: "частная школа".to_string(),
            ..pricey
        };
        let results = engine().apply(&[cheap, pricey], &filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Cheap Private");
    }

    #[test]
    fn price_range_is_ignored_without_private_selection() {
        let expensive = SchoolRecord {
            monthly_fee: Some(399_000),
            ..school("Any")
        };
        let filter = ParsedFilter {
            price_range: (0, 100),
            ..ParsedFilter::default()
        };
        assert_eq!(engine().apply(&[expensive], &filter).len(), 1);
    }

    #[test]
    fn services_are_all_of() {
        let pool_only = SchoolRecord {
            has_pool: true,
            ..school("Pool only")
        };
        let both = SchoolRecord {
            has_pool: true,
            has_transfer: true,
            ..school("Both")
        };
        let records = vec![pool_only, both];

        let pool = ParsedFilter {
            services: vec!["Pool".to_string()],
            ..ParsedFilter::default()
        };
        let transfer = ParsedFilter {
            services: vec!["Transfer".to_string()],
            ..ParsedFilter::default()
        };
        let combined = ParsedFilter {
            services: vec!["Pool".to_string(), "Transfer".to_string()],
            ..ParsedFilter::default()
        };

        let e = engine();
        let pass_pool: Vec<_> = e.apply(&records, &pool);
        let pass_transfer: Vec<_> = e.apply(&records, &transfer);
        let pass_both: Vec<_> = e.apply(&records, &combined);

        // AND semantics: the combined result is a subset of each single result.
        for r in &pass_both {
            assert!(pass_pool.iter().any(|x| x.name == r.name));
            assert!(pass_transfer.iter().any(|x| x.name == r.name));
        }
        assert_eq!(pass_both.len(), 1);
        assert_eq!(pass_both[0].name, "Both");
    }

    #[test]
    fn curricula_subjects_are_all_of_membership() {
        let record = SchoolRecord {
            subjects: vec!["Robotics".to_string(), "Math".to_string()],
            ..school("S")
        };
        let one = ParsedFilter {
            subjects: vec!["Robotics".to_string()],
            ..ParsedFilter::default()
        };
        let two = ParsedFilter {
            subjects: vec!["Robotics".to_string(), "Chess".to_string()],
            ..ParsedFilter::default()
        };
        let e = engine();
        assert_eq!(e.apply(std::slice::from_ref(&record), &one).len(), 1);
        assert_eq!(e.apply(std::slice::from_ref(&record), &two).len(), 0);
    }

    #[test]
    fn subject_membership_is_not_substring_matching() {
        let record = SchoolRecord {
            subjects: vec!["Mathematics olympiad".to_string()],
            ..school("S")
        };
        let filter = ParsedFilter {
            subjects: vec!["Math".to_string()],
            ..ParsedFilter::default()
        };
        assert_eq!(engine().apply(&[record], &filter).len(), 0);
    }

    #[test]
    fn city_matches_on_aliases() {
        let record = SchoolRecord {
            city: "г. Алматы".to_string(),
            ..school("S")
        };
        let filter = ParsedFilter {
            cities: vec!["Almaty".to_string()],
            ..ParsedFilter::default()
        };
        assert_eq!(engine().apply(&[record], &filter).len(), 1);
    }

    #[test]
    fn exam_requirement_must_match() {
        let with_exam = SchoolRecord {
            exam_required: true,
            ..school("Exam")
        };
        let without = school("No exam");
        let filter = ParsedFilter {
            exam: Some(crate::ExamRequirement::No),
            ..ParsedFilter::default()
        };
        let results = engine().apply(&[with_exam, without], &filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "No exam");
    }

    #[test]
    fn rating_threshold_treats_missing_as_zero() {
        let rated = SchoolRecord {
            rating: Some(4.5),
            ..school("Rated")
        };
        let unrated = school("Unrated");
        let filter = ParsedFilter {
            rating: Some(4.0),
            ..ParsedFilter::default()
        };
        let results = engine().apply(&[rated, unrated], &filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Rated");
    }

    #[test]
    fn rating_sort_is_stable_for_equal_keys() {
        let mut records = Vec::new();
        for name in ["first", "second", "third"] {
            records.push(SchoolRecord {
                rating: Some(4.0),
                ..school(name)
            });
        }
        let filter = ParsedFilter {
            sort_option: Some(SortOption::RatingDesc),
            ..ParsedFilter::default()
        };
        let results = engine().apply(&records, &filter);
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn missing_fees_sort_last_in_both_directions() {
        let priced = SchoolRecord {
            monthly_fee: Some(100_000),
            ..school("Priced")
        };
        let free_floating = school("No fee");
        let e = engine();

        let mut asc = vec![free_floating.clone(), priced.clone()];
        e.sort(&mut asc, SortOption::PriceAsc);
        assert_eq!(asc.last().unwrap().name, "No fee");

        let mut desc = vec![free_floating, priced];
        e.sort(&mut desc, SortOption::PriceDesc);
        assert_eq!(desc.last().unwrap().name, "No fee");
    }

    #[test]
    fn distance_sort_and_nearby_filter() {
        let downtown = GeoPoint {
            lat: 43.238949,
            lon: 76.889709,
        };
        let close = SchoolRecord {
            location: Some(GeoPoint {
                lat: 43.25,
                lon: 76.9,
            }),
            ..school("Close")
        };
        let far = SchoolRecord {
            location: Some(GeoPoint {
                lat: 51.169392,
                lon: 71.449074,
            }),
            ..school("Far away")
        };
        let nowhere = school("No coords");

        let engine = FilterEngine::new(GeoContext {
            user_location: Some(downtown),
            radius_km: 10.0,
        });
        let filter = ParsedFilter {
            use_nearby: true,
            sort_option: Some(SortOption::DistanceAsc),
            ..ParsedFilter::default()
        };
        let results = engine.apply(&[far.clone(), close.clone(), nowhere], &filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Close");

        // Without the nearby constraint, missing coordinates sort last.
        let mut all = vec![far, SchoolRecord::default(), close];
        engine.sort(&mut all, SortOption::DistanceAsc);
        assert_eq!(all[0].name, "Close");
        assert_eq!(all[1].name, "Far away");
    }

    #[test]
    fn nearby_without_user_location_does_not_bind() {
        let record = school("Anywhere");
        let filter = ParsedFilter {
            use_nearby: true,
            ..ParsedFilter::default()
        };
        assert_eq!(engine().apply(&[record], &filter).len(), 1);
    }

    #[test]
    fn haversine_matches_known_distance() {
        // Almaty to Astana is roughly 970 km.
        let almaty = GeoPoint {
            lat: 43.238949,
            lon: 76.889709,
        };
        let astana = GeoPoint {
            lat: 51.169392,
            lon: 71.449074,
        };
        let d = haversine_km(almaty, astana);
        assert!((950.0..1000.0).contains(&d), "got {d}");
    }

    #[test]
    fn name_sort_is_case_insensitive() {
        let mut records = vec![school("beta"), school("Alpha")];
        engine().sort(&mut records, SortOption::NameAsc);
        assert_eq!(records[0].name, "Alpha");
    }

    #[test]
    fn remainder_query_matches_searchable_text() {
        let montessori = SchoolRecord {
            name: "Montessori Almaty".to_string(),
            ..school("ignored")
        };
        let other = school("Other");
        let filter = ParsedFilter {
            query: "montessori".to_string(),
            ..ParsedFilter::default()
        };
        let results = engine().apply(&[montessori, other], &filter);
        assert_eq!(results.len(), 1);
    }
}
