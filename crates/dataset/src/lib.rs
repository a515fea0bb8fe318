use std::io::Read;

use rand::Rng;
use shared::{domain::Review, error::IngestionError};
use tracing::{info, warn};

mod source;

pub use source::{source_from_location, DatasetSource, FileSource, HttpSource};

/// Resource name ingested when nothing else is configured.
pub const DEFAULT_DATASET: &str = "reviews_test.tsv";
pub const TEXT_COLUMN: &str = "text";

/// In-memory holder of the ingested reviews.
///
/// `loaded` is only ever true while `reviews` is non-empty.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    reviews: Vec<Review>,
    loaded: bool,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.reviews = Vec::new();
        self.loaded = false;
    }

    pub fn replace(&mut self, reviews: Vec<Review>) {
        self.loaded = !reviews.is_empty();
        self.reviews = reviews;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    /// Picks one review, every index equally likely.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<&Review> {
        if self.reviews.is_empty() {
            return None;
        }
        let index = rng.random_range(0..self.reviews.len());
        self.reviews.get(index)
    }
}

/// Parses a tab-delimited file with a header row and returns the usable
/// values of its `text` column in file order.
pub fn parse_reviews<R: Read>(reader: R) -> Result<Vec<Review>, IngestionError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| IngestionError::Parse(e.to_string()))?;
    let Some(text_index) = headers.iter().position(|h| h == TEXT_COLUMN) else {
        return Err(IngestionError::MissingColumn);
    };

    let mut reviews = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| IngestionError::Parse(e.to_string()))?;
        let Some(cell) = record.get(text_index) else {
            continue;
        };
        if !is_textual(cell) {
            continue;
        }
        if let Some(review) = Review::parse(cell) {
            reviews.push(review);
        }
    }
    Ok(reviews)
}

/// Magnitude above which a numeric-looking cell stays a string.
const SAFE_NUMBER_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Cells the parser would type as numbers or booleans are not review text.
fn is_textual(cell: &str) -> bool {
    if matches!(cell, "true" | "TRUE" | "false" | "FALSE") {
        return false;
    }
    !is_number_literal(cell)
}

/// `-?(digits[.digits]|.digits)([eE][+-]?digits)?` within the safe integer range.
fn is_number_literal(cell: &str) -> bool {
    let literal = cell.trim();
    let unsigned = literal.strip_prefix('-').unwrap_or(literal);
    let (mantissa, exponent) = match unsigned.find(|c| c == 'e' || c == 'E') {
        Some(at) => (&unsigned[..at], Some(&unsigned[at + 1..])),
        None => (unsigned, None),
    };
    let mantissa_ok = match mantissa.split_once('.') {
        None => all_digits(mantissa),
        Some(("", frac)) => all_digits(frac),
        Some((int, frac)) => all_digits(int) && (frac.is_empty() || all_digits(frac)),
    };
    let exponent_ok = exponent.map_or(true, |exp| {
        let digits = exp
            .strip_prefix('+')
            .or_else(|| exp.strip_prefix('-'))
            .unwrap_or(exp);
        all_digits(digits)
    });
    if !mantissa_ok || !exponent_ok {
        return false;
    }
    matches!(literal.parse::<f64>(), Ok(value) if value.abs() < SAFE_NUMBER_LIMIT)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Fetches and parses `source` into `store`.
///
/// The store is reset before anything else happens, so a failed attempt
/// leaves it empty even if a previous load succeeded.
pub async fn ingest(
    source: &dyn DatasetSource,
    store: &mut DatasetStore,
) -> Result<usize, IngestionError> {
    store.reset();
    let location = source.describe();

    let bytes = source.fetch().await.map_err(|e| {
        warn!(source = %location, error = %e, "dataset: fetch failed");
        IngestionError::Transport(format!("{e:#}"))
    })?;

    let reviews = parse_reviews(bytes.as_slice()).inspect_err(|e| {
        warn!(source = %location, error = %e, "dataset: parse failed");
    })?;

    if reviews.is_empty() {
        warn!(source = %location, "dataset: no usable rows");
        return Err(IngestionError::Empty);
    }

    let count = reviews.len();
    store.replace(reviews);
    info!(source = %location, count, "dataset: loaded");
    Ok(count)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
