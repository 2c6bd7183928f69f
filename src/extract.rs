//! # Numeric Extractors Module
//!
//! ## Purpose
//! Regex-based extraction of numeric filter signals from free text: monthly
//! fee ranges and thresholds (with ₸/тг/тенге currency normalization), rating
//! thresholds and "at least N of X" minimum counts for clubs and class size.
//! Context keywords are recognized in both Latin and Cyrillic ("до"/"under",
//! "от"/"above", "рейтинг"/"rating", "не меньше"/"at least").
//!
//! ## Input/Output Specification
//! - **Input**: An already-lowercased query string
//! - **Output**: Extracted values plus the exact substrings each extraction
//!   consumed, so the parser can exclude them from the free-text remainder
//! - **Price priority**: explicit range > ceiling/floor keywords (combinable)
//!   > bare number next to a currency token (treated as ceiling)
//!
//! All amounts are clamped into `[PRICE_MIN, PRICE_MAX]`; an inverted range
//! is swapped rather than rejected.

use crate::errors::{MatchError, Result};
use crate::{PRICE_MAX, PRICE_MIN};
use regex::Regex;

/// A successful extraction: the value plus the substrings it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<T> {
    pub value: T,
    pub consumed: Vec<String>,
}

/// Compiled extraction patterns, built once and reused for every query.
pub struct NumericExtractors {
    currency: Regex,
    amount: Regex,
    price_range: Regex,
    price_ceiling: Regex,
    price_floor: Regex,
    rating_keyword: Regex,
    rating_plus: Regex,
    min_clubs: Regex,
    min_class_size: Regex,
}

/// Number with optional thousands-separating spaces, e.g. "200 000".
const AMOUNT: &str = r"\d{1,3}(?:\s\d{3})+|\d+";

impl NumericExtractors {
    /// Compile all extraction patterns.
    pub fn new() -> Result<Self> {
        Ok(Self {
            currency: compile(r"₸|тенге|tenge|\bтг\b|\bkzt\b")?,
            amount: compile(&format!(r"(?:{AMOUNT})"))?,
            price_range: compile(&format!(r"({AMOUNT})\s*[-–—]\s*({AMOUNT})"))?,
            price_ceiling: compile(&format!(
                r"\b(?:не дороже|дешевле чем|дешевле|under|below|max|up to|менее|до)\s*({AMOUNT})"
            ))?,
            price_floor: compile(&format!(
                r"\b(?:не менее|не меньше|минимум|дороже|above|over|more than|from|min|от)\s*({AMOUNT})"
            ))?,
            rating_keyword: compile(
                r"(?:рейтинг(?:ом)?|rating|не ниже|минимум)\s*:?\s*([3-5](?:[.,]\d)?)\b",
            )?,
            rating_plus: compile(r"\b([3-5](?:[.,]\d)?)\s*\+")?,
            min_clubs: compile(
                r"\b(?:(?:не меньше|не менее|минимум|мин|min|от|>=)\s*)?(\d{1,3})\s*(?:круж|секц|club)",
            )?,
            min_class_size: compile(
                r"\b(?:(?:не меньше|не менее|минимум|мин|min|от|>=)\s*)?(\d{1,3})\s*(?:класс|ученик|человек|дет)",
            )?,
        })
    }

    /// Extract a fee range from free text.
    ///
    /// Pattern priority: (1) explicit "NUM - NUM" range, (2)/(3) ceiling and
    /// floor keywords which combine when both are present, (4) a bare number
    /// co-occurring with a currency token, treated as a ceiling. Currency
    /// tokens are consumed alongside whichever pattern matched.
    pub fn extract_price(&self, text: &str) -> Option<Extraction<(u32, u32)>> {
        let currency_tokens: Vec<String> = self
            .currency
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        if let Some(caps) = self.price_range.captures(text) {
            let min = parse_amount(&caps[1]);
            let max = parse_amount(&caps[2]);
            let mut consumed = vec![caps[0].to_string()];
            consumed.extend(currency_tokens);
            return Some(Extraction {
                value: clamp_range(min, max),
                consumed,
            });
        }

        let ceiling = self
            .price_ceiling
            .captures(text)
            .map(|caps| (parse_amount(&caps[1]), caps[0].to_string()));
        let floor = self
            .price_floor
            .captures(text)
            .map(|caps| (parse_amount(&caps[1]), caps[0].to_string()));

        match (floor, ceiling) {
            (Some((lo, lo_span)), Some((hi, hi_span))) => {
                let mut consumed = vec![lo_span, hi_span];
                consumed.extend(currency_tokens);
                Some(Extraction {
                    value: clamp_range(lo, hi),
                    consumed,
                })
            }
            (None, Some((hi, span))) => {
                let mut consumed = vec![span];
                consumed.extend(currency_tokens);
                Some(Extraction {
                    value: clamp_range(PRICE_MIN, hi),
                    consumed,
                })
            }
            (Some((lo, span)), None) => {
                let mut consumed = vec![span];
                consumed.extend(currency_tokens);
                Some(Extraction {
                    value: clamp_range(lo, PRICE_MAX),
                    consumed,
                })
            }
            (None, None) => {
                if currency_tokens.is_empty() {
                    return None;
                }
                let bare = self.amount.find(text)?;
                let mut consumed = vec![bare.as_str().to_string()];
                consumed.extend(currency_tokens);
                Some(Extraction {
                    value: clamp_range(PRICE_MIN, parse_amount(bare.as_str())),
                    consumed,
                })
            }
        }
    }

    /// Extract a rating threshold in [3, 5].
    ///
    /// Either a rating keyword followed by a number, or a bare "N+"/"N.N+"
    /// mention. The first match wins; later mentions are ignored.
    pub fn extract_rating(&self, text: &str) -> Option<Extraction<f32>> {
        for re in [&self.rating_keyword, &self.rating_plus] {
            if let Some(caps) = re.captures(text) {
                if let Some(value) = parse_rating(&caps[1]) {
                    return Some(Extraction {
                        value,
                        consumed: vec![caps[0].to_string()],
                    });
                }
            }
        }
        None
    }

    /// Minimum number of clubs/sections, e.g. "не меньше 10 кружков".
    pub fn extract_min_clubs(&self, text: &str) -> Option<Extraction<u32>> {
        extract_count(&self.min_clubs, text)
    }

    /// Minimum class size, e.g. "от 20 учеников в классе".
    pub fn extract_min_class_size(&self, text: &str) -> Option<Extraction<u32>> {
        extract_count(&self.min_class_size, text)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| MatchError::Internal {
        message: format!("Invalid extraction regex: {}", e),
    })
}

/// Only the first match per category is used.
fn extract_count(re: &Regex, text: &str) -> Option<Extraction<u32>> {
    let caps = re.captures(text)?;
    let value = caps[1].parse::<u32>().ok()?;
    Some(Extraction {
        value,
        consumed: vec![caps[0].to_string()],
    })
}

/// Parse an amount, dropping separator spaces, clamped into the fee domain.
fn parse_amount(raw: &str) -> u32 {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let value = digits.parse::<u64>().unwrap_or(PRICE_MAX as u64);
    value.min(PRICE_MAX as u64).max(PRICE_MIN as u64) as u32
}

pub(crate) fn clamp_range(min: u32, max: u32) -> (u32, u32) {
    let min = min.clamp(PRICE_MIN, PRICE_MAX);
    let max = max.clamp(PRICE_MIN, PRICE_MAX);
    if min > max {
        (max, min)
    } else {
        (min, max)
    }
}

fn parse_rating(raw: &str) -> Option<f32> {
    let value = raw.replace(',', ".").parse::<f32>().ok()?;
    if (3.0..=5.0).contains(&value) {
        Some(value)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractors() -> NumericExtractors {
        NumericExtractors::new().unwrap()
    }

    #[test]
    fn explicit_range_with_spaces_and_currency() {
        let e = extractors()
            .extract_price("школа 100 000 - 250 000 тг в месяц")
            .unwrap();
        assert_eq!(e.value, (100_000, 250_000));
        assert!(e.consumed.iter().any(|s| s.contains('-')));
        assert!(e.consumed.iter().any(|s| s == "тг"));
    }

    #[test]
    fn ceiling_keyword() {
        let e = extractors().extract_price("до 200000").unwrap();
        assert_eq!(e.value, (0, 200_000));
    }

    #[test]
    fn english_ceiling_keyword() {
        let e = extractors().extract_price("under 200000 ₸").unwrap();
        assert_eq!(e.value, (0, 200_000));
        assert!(e.consumed.contains(&"₸".to_string()));
    }

    #[test]
    fn floor_keyword() {
        let e = extractors().extract_price("от 150 000 тенге").unwrap();
        assert_eq!(e.value, (150_000, PRICE_MAX));
    }

    #[test]
    fn floor_and_ceiling_combine() {
        let e = extractors().extract_price("от 100000 до 300000").unwrap();
        assert_eq!(e.value, (100_000, 300_000));
        assert_eq!(e.consumed.len(), 2);
    }

    #[test]
    fn bare_number_with_currency_is_a_ceiling() {
        let e = extractors().extract_price("150000 тенге").unwrap();
        assert_eq!(e.value, (0, 150_000));
    }

    #[test]
    fn bare_number_without_currency_is_ignored() {
        assert!(extractors().extract_price("гимназия номер 25").is_none());
    }

    #[test]
    fn amounts_clamp_into_the_fee_domain() {
        let e = extractors().extract_price("до 9000000").unwrap();
        assert_eq!(e.value, (0, PRICE_MAX));
    }

    #[test]
    fn inverted_range_is_swapped() {
        let e = extractors().extract_price("300000 - 100000").unwrap();
        assert_eq!(e.value, (100_000, 300_000));
    }

    #[test]
    fn rating_with_keyword() {
        let e = extractors().extract_rating("рейтинг 4.5").unwrap();
        assert_eq!(e.value, 4.5);
        assert_eq!(e.consumed, vec!["рейтинг 4.5".to_string()]);
    }

    #[test]
    fn rating_with_comma_decimal() {
        let e = extractors().extract_rating("рейтинг не ниже 4,5").unwrap();
        assert_eq!(e.value, 4.5);
    }

    #[test]
    fn bare_plus_rating() {
        let e = extractors().extract_rating("cambridge school 4+").unwrap();
        assert_eq!(e.value, 4.0);
    }

    #[test]
    fn rating_outside_three_to_five_is_rejected() {
        assert!(extractors().extract_rating("2+ language tracks").is_none());
        assert!(extractors().extract_rating("rating 6").is_none());
    }

    #[test]
    fn rating_keyword_never_bites_into_a_longer_number() {
        assert!(extractors().extract_rating("минимум 300000").is_none());
    }

    #[test]
    fn first_rating_mention_wins() {
        let e = extractors().extract_rating("рейтинг 4 или рейтинг 5").unwrap();
        assert_eq!(e.value, 4.0);
    }

    #[test]
    fn min_clubs_with_qualifier() {
        let e = extractors()
            .extract_min_clubs("не меньше 10 кружков и секций")
            .unwrap();
        assert_eq!(e.value, 10);
        assert!(e.consumed[0].contains("10 круж"));
    }

    #[test]
    fn min_clubs_english() {
        let e = extractors().extract_min_clubs("at least 5 clubs").unwrap();
        assert_eq!(e.value, 5);
    }

    #[test]
    fn min_class_size() {
        let e = extractors()
            .extract_min_class_size("от 20 учеников в классе")
            .unwrap();
        assert_eq!(e.value, 20);
    }

    #[test]
    fn counts_absent() {
        assert!(extractors().extract_min_clubs("школа с бассейном").is_none());
        assert!(extractors().extract_min_class_size("школа с бассейном").is_none());
    }
}
