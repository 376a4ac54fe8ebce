//! Synthetic bronze data with deliberate quality problems: missing names,
//! mixed phone formats, `"unknown"` and out-of-range ages, negative
//! salaries, blank addresses, day-first dates, inconsistent status casing
//! and duplicated rows.

use chrono::{Duration, NaiveDate, Utc};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::domain::{RecordBatch, Schema, Value};
use crate::error::{EtlError, Result, Stage};

const FIRST_NAMES: [&str; 16] = [
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David", "Elizabeth", "William",
    "Barbara", "Richard", "Susan", "Joseph", "Jessica",
];
const LAST_NAMES: [&str; 16] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez", "Martinez",
    "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas",
];
const EMAIL_DOMAINS: [&str; 5] = ["example.com", "example.org", "example.net", "mail.com", "test.io"];
const STREETS: [&str; 8] = [
    "Main St", "Oak Avenue", "Pine Road", "Maple Drive", "Cedar Lane", "Elm Street", "Lake View", "Hill Court",
];
const CITIES: [(&str, &str); 6] = [
    ("Springfield", "IL"),
    ("Portland", "OR"),
    ("Austin", "TX"),
    ("Madison", "WI"),
    ("Boulder", "CO"),
    ("Raleigh", "NC"),
];
const STATUSES: [&str; 6] = ["active", "ACTIVE", "inactive", "INACTIVE", "pending", ""];
const STATUS_WEIGHTS: [f64; 6] = [8.0, 8.0, 4.0, 4.0, 1.0, 0.5];

/// Generator for bronze-layer batches
pub struct BronzeGenerator {
    rng: StdRng,
    today: NaiveDate,
}

impl Default for BronzeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl BronzeGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            today: Utc::now().date_naive(),
        }
    }

    /// Reproducible generator.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            today: Utc::now().date_naive(),
        }
    }

    /// Anchor for the "last five years" signup window.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Generate `num_records` rows, then append `num_duplicates` rows sampled
    /// from them without replacement.
    pub fn generate(&mut self, num_records: usize, num_duplicates: usize) -> Result<RecordBatch> {
        if num_records == 0 {
            return Err(EtlError::validation("num_records must be a positive integer"));
        }
        if num_duplicates > num_records {
            return Err(EtlError::validation(format!(
                "cannot sample {} duplicates from {} records",
                num_duplicates, num_records
            )));
        }
        info!(num_records, num_duplicates, "Generating bronze records");

        let ages = WeightedIndex::new((0..=150).map(|age| if (18..=65).contains(&age) { 15 } else { 1 }))
            .map_err(|e| EtlError::unexpected(Stage::Generate, e))?;
        let statuses =
            WeightedIndex::new(STATUS_WEIGHTS).map_err(|e| EtlError::unexpected(Stage::Generate, e))?;

        let mut rows: Vec<Vec<Value>> = (0..num_records)
            .map(|_| self.record(&ages, &statuses))
            .collect();

        let picks = rand::seq::index::sample(&mut self.rng, num_records, num_duplicates);
        let duplicates: Vec<Vec<Value>> = picks.iter().map(|i| rows[i].clone()).collect();
        rows.extend(duplicates);

        RecordBatch::from_rows(Schema::bronze(), rows)
    }

    fn record(&mut self, ages: &WeightedIndex<i32>, statuses: &WeightedIndex<f64>) -> Vec<Value> {
        let first = *FIRST_NAMES.choose(&mut self.rng).unwrap_or(&"Alex");
        let last = *LAST_NAMES.choose(&mut self.rng).unwrap_or(&"Doe");

        let name = if self.rng.gen_bool(0.97) {
            Value::Text(format!("{} {}", first, last))
        } else {
            Value::Null
        };

        let domain = EMAIL_DOMAINS.choose(&mut self.rng).unwrap_or(&"example.com");
        let email = format!(
            "{}.{}{}@{}",
            first.to_lowercase(),
            last.to_lowercase(),
            self.rng.gen_range(1..10_000),
            domain
        );

        let phone = if self.rng.gen_bool(0.8) {
            format!(
                "({}) {}-{}",
                self.rng.gen_range(100..=999),
                self.rng.gen_range(100..=999),
                self.rng.gen_range(1000..=9999)
            )
        } else {
            self.rng.gen_range(1_000_000_000_i64..=9_999_999_999).to_string()
        };

        let age = if self.rng.gen_bool(0.95) {
            ages.sample(&mut self.rng).to_string()
        } else {
            "unknown".to_string()
        };

        let salary: i64 = if self.rng.gen_bool(0.08) {
            self.rng.gen_range(2000..=50_000)
        } else {
            self.rng.gen_range(-5000..=19_999)
        };

        let address = if self.rng.gen_bool(0.8) {
            let (city, state) = CITIES.choose(&mut self.rng).copied().unwrap_or(("Springfield", "IL"));
            format!(
                "{} {} {}, {} {:05}",
                self.rng.gen_range(1..=9999),
                STREETS.choose(&mut self.rng).unwrap_or(&"Main St"),
                city,
                state,
                self.rng.gen_range(1000..=99_999)
            )
        } else {
            "   ".to_string()
        };

        let signup_date = if self.rng.gen_bool(0.9) {
            let days_back = self.rng.gen_range(0..=5 * 365);
            (self.today - Duration::days(days_back)).format("%Y-%m-%d").to_string()
        } else {
            format!(
                "{}/{}/{}",
                self.rng.gen_range(1..=31),
                self.rng.gen_range(1..=12),
                self.rng.gen_range(2019..=2025)
            )
        };

        let status = STATUSES[statuses.sample(&mut self.rng)];

        vec![
            name,
            Value::Text(email),
            Value::Text(phone),
            Value::Text(age),
            Value::Int(salary),
            Value::Text(address),
            Value::Text(signup_date),
            Value::from(status),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::columns;

    #[test]
    fn test_generates_records_plus_duplicates() {
        let batch = BronzeGenerator::with_seed(7).generate(200, 20).unwrap();
        assert_eq!(batch.len(), 220);
        assert_eq!(batch.schema(), &Schema::bronze());

        // every appended row is a copy of an original row
        let originals = &batch.rows()[..200];
        for dup in &batch.rows()[200..] {
            assert!(originals.contains(dup));
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let a = BronzeGenerator::with_seed(42).with_today(today).generate(50, 5).unwrap();
        let b = BronzeGenerator::with_seed(42).with_today(today).generate(50, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_injects_quality_problems() {
        let batch = BronzeGenerator::with_seed(1).generate(2000, 0).unwrap();

        let null_names = batch.column(columns::NAME).unwrap().filter(|v| v.is_null()).count();
        assert!(null_names > 0);
        let unknown_ages = batch
            .column(columns::AGE)
            .unwrap()
            .filter(|v| v.as_str() == Some("unknown"))
            .count();
        assert!(unknown_ages > 0);
        let blank_addresses = batch
            .column(columns::ADDRESS)
            .unwrap()
            .filter(|v| v.as_str().is_some_and(|s| s.trim().is_empty()))
            .count();
        assert!(blank_addresses > 0);
        let slash_dates = batch
            .column(columns::SIGNUP_DATE)
            .unwrap()
            .filter(|v| v.as_str().is_some_and(|s| s.contains('/')))
            .count();
        assert!(slash_dates > 0);
    }

    #[test]
    fn test_rejects_invalid_counts() {
        let mut generator = BronzeGenerator::with_seed(3);
        assert!(generator.generate(0, 0).unwrap_err().is_validation());
        assert!(generator.generate(5, 6).unwrap_err().is_validation());
    }
}
