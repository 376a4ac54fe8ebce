//! Bronze -> silver cleaning.
//!
//! Steps run in a fixed order because later steps rely on the invariants
//! established by earlier ones: name repair, email dedup and validation,
//! phone, age, salary, address, signup date, status.

pub mod rules;

use std::collections::HashSet;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{columns, UNKNOWN_PLACEHOLDER};
use crate::domain::{FieldType, RecordBatch, Schema, Value};
use crate::error::{EtlError, Result, Stage};

/// Trait for the bronze -> silver transformation
pub trait Cleaner {
    /// Clean a batch and report how many rows each step removed. The input
    /// is left untouched.
    fn clean_with_report(&self, batch: &RecordBatch) -> Result<(RecordBatch, CleaningReport)>;

    /// Produce a fresh silver batch.
    fn clean(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        self.clean_with_report(batch).map(|(silver, _)| silver)
    }
}

/// Bounds and placeholders used by [`DefaultCleaner`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningRules {
    pub min_age: i64,
    pub max_age: i64,
    pub min_salary: i64,
    pub max_salary: i64,
    /// Replacement for blank addresses and statuses
    pub placeholder: String,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self {
            min_age: 18,
            max_age: 75,
            min_salary: 0,
            max_salary: 200_000,
            placeholder: UNKNOWN_PLACEHOLDER.to_string(),
        }
    }
}

impl CleaningRules {
    pub fn validate(&self) -> Result<()> {
        if self.min_age > self.max_age {
            return Err(EtlError::validation(format!(
                "min_age {} exceeds max_age {}",
                self.min_age, self.max_age
            )));
        }
        if self.min_salary > self.max_salary {
            return Err(EtlError::validation(format!(
                "min_salary {} exceeds max_salary {}",
                self.min_salary, self.max_salary
            )));
        }
        Ok(())
    }
}

/// Row counts collected while cleaning one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub dropped_null_name: usize,
    pub dropped_duplicate_email: usize,
    pub dropped_invalid_email: usize,
    pub dropped_age_out_of_range: usize,
    pub dropped_invalid_signup_date: usize,
}

impl CleaningReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in - self.rows_out
    }
}

/// Row being repaired. Fields start as raw cells and are narrowed step by step.
#[derive(Debug, Clone)]
struct WorkingRow {
    name: String,
    email: Option<String>,
    phone: Option<String>,
    age: i64,
    raw_age: Value,
    salary: i64,
    raw_salary: Value,
    address: Option<String>,
    signup_date: Option<String>,
    status: Option<String>,
}

/// Default cleaner configured by [`CleaningRules`]
#[derive(Debug, Clone, Default)]
pub struct DefaultCleaner {
    pub rules: CleaningRules,
}

impl DefaultCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: CleaningRules) -> Self {
        Self { rules }
    }

    fn run_steps(&self, batch: &RecordBatch) -> anyhow::Result<(RecordBatch, CleaningReport)> {
        let mut report = CleaningReport {
            rows_in: batch.len(),
            ..Default::default()
        };

        let mut rows = self.repair_names(batch, &mut report);
        rows = self.dedup_and_validate_emails(rows, &mut report);
        self.normalize_phones(&mut rows);
        rows = self.filter_ages(rows, &mut report);
        self.clamp_salaries(&mut rows)?;
        self.repair_addresses(&mut rows);
        rows = self.normalize_signup_dates(rows, &mut report);
        self.normalize_statuses(&mut rows);

        let silver = self.into_silver(rows)?;
        report.rows_out = silver.len();
        debug!(?report, "Cleaning steps finished");
        Ok((silver, report))
    }

    /// Step 1: drop rows without a name, trim the rest.
    fn repair_names(&self, batch: &RecordBatch, report: &mut CleaningReport) -> Vec<WorkingRow> {
        let schema = batch.schema();
        let idx = |name: &str| schema.index_of(name).unwrap_or_default();
        let (name_i, email_i, phone_i, age_i, salary_i, address_i, date_i, status_i) = (
            idx(columns::NAME),
            idx(columns::EMAIL),
            idx(columns::PHONE),
            idx(columns::AGE),
            idx(columns::SALARY),
            idx(columns::ADDRESS),
            idx(columns::SIGNUP_DATE),
            idx(columns::STATUS),
        );

        let mut rows = Vec::with_capacity(batch.len());
        for row in batch.rows() {
            let Some(name) = row[name_i].to_text() else {
                report.dropped_null_name += 1;
                continue;
            };
            rows.push(WorkingRow {
                name: name.trim().to_string(),
                email: row[email_i].to_text(),
                phone: row[phone_i].to_text(),
                age: 0,
                raw_age: row[age_i].clone(),
                salary: 0,
                raw_salary: row[salary_i].clone(),
                address: row[address_i].to_text(),
                signup_date: row[date_i].to_text(),
                status: row[status_i].to_text(),
            });
        }
        rows
    }

    /// Step 2: first occurrence of each email wins, then malformed emails are dropped.
    fn dedup_and_validate_emails(&self, rows: Vec<WorkingRow>, report: &mut CleaningReport) -> Vec<WorkingRow> {
        let mut seen: HashSet<Option<String>> = HashSet::with_capacity(rows.len());
        let before = rows.len();
        let unique: Vec<WorkingRow> = rows
            .into_iter()
            .filter(|row| seen.insert(row.email.clone()))
            .collect();
        report.dropped_duplicate_email = before - unique.len();

        let before = unique.len();
        let valid: Vec<WorkingRow> = unique
            .into_iter()
            .filter(|row| row.email.as_deref().is_some_and(rules::is_valid_email))
            .collect();
        report.dropped_invalid_email = before - valid.len();
        valid
    }

    /// Step 3
    fn normalize_phones(&self, rows: &mut [WorkingRow]) {
        for row in rows {
            row.phone = row.phone.as_deref().map(rules::normalize_phone);
        }
    }

    /// Step 4: coerce to an integer (non-numeric -> -1) and keep the configured range.
    fn filter_ages(&self, rows: Vec<WorkingRow>, report: &mut CleaningReport) -> Vec<WorkingRow> {
        let range = self.rules.min_age..=self.rules.max_age;
        let before = rows.len();
        let kept: Vec<WorkingRow> = rows
            .into_iter()
            .map(|mut row| {
                row.age = rules::coerce_age(&row.raw_age);
                row
            })
            .filter(|row| range.contains(&row.age))
            .collect();
        report.dropped_age_out_of_range = before - kept.len();
        kept
    }

    /// Step 5: clip into the salary range; never drops rows.
    fn clamp_salaries(&self, rows: &mut [WorkingRow]) -> anyhow::Result<()> {
        for row in rows {
            let salary = rules::parse_integer(&row.raw_salary).ok_or_else(|| {
                anyhow!("salary {:?} for {:?} is not numeric", row.raw_salary, row.email)
            })?;
            row.salary = salary.clamp(self.rules.min_salary, self.rules.max_salary);
        }
        Ok(())
    }

    /// Step 6
    fn repair_addresses(&self, rows: &mut [WorkingRow]) {
        for row in rows {
            row.address = Some(rules::normalize_address(row.address.as_deref(), &self.rules.placeholder));
        }
    }

    /// Step 7: reformat to `YYYY-MM-DD`, dropping rows whose date does not parse.
    fn normalize_signup_dates(&self, rows: Vec<WorkingRow>, report: &mut CleaningReport) -> Vec<WorkingRow> {
        let before = rows.len();
        let kept: Vec<WorkingRow> = rows
            .into_iter()
            .filter_map(|mut row| {
                row.signup_date = row.signup_date.as_deref().and_then(rules::normalize_signup_date);
                row.signup_date.is_some().then_some(row)
            })
            .collect();
        report.dropped_invalid_signup_date = before - kept.len();
        kept
    }

    /// Step 8
    fn normalize_statuses(&self, rows: &mut [WorkingRow]) {
        for row in rows {
            row.status = Some(rules::normalize_status(row.status.as_deref(), &self.rules.placeholder));
        }
    }

    /// Project into the silver layout, asserting that no email went missing.
    fn into_silver(&self, rows: Vec<WorkingRow>) -> anyhow::Result<RecordBatch> {
        if rows.iter().any(|row| row.email.is_none()) {
            return Err(EtlError::validation("null emails present after cleaning").into());
        }

        let silver_rows = rows
            .into_iter()
            .map(|row| {
                vec![
                    Value::Text(row.name),
                    Value::from(row.email),
                    Value::from(row.phone),
                    Value::Int(row.age),
                    Value::Int(row.salary),
                    Value::from(row.address),
                    Value::from(row.signup_date),
                    Value::from(row.status),
                ]
            })
            .collect();

        Ok(RecordBatch::from_rows(Schema::silver(), silver_rows)?)
    }
}

impl Cleaner for DefaultCleaner {
    fn clean_with_report(&self, batch: &RecordBatch) -> Result<(RecordBatch, CleaningReport)> {
        self.rules.validate()?;
        batch.schema().require(&columns::REQUIRED)?;

        match self.run_steps(batch) {
            Ok(out) => Ok(out),
            // Schema/validation errors surface unchanged; anything else is wrapped.
            Err(e) => match e.downcast::<EtlError>() {
                Ok(etl) => Err(etl),
                Err(other) => Err(EtlError::unexpected(Stage::Clean, other)),
            },
        }
    }
}

/// Re-express a silver batch in the bronze layout so it can be cleaned again.
pub fn silver_as_bronze(silver: &RecordBatch) -> Result<RecordBatch> {
    let bronze = Schema::bronze();
    let rows = silver
        .rows()
        .iter()
        .map(|row| {
            bronze
                .fields()
                .iter()
                .map(|field| {
                    let value = silver
                        .schema()
                        .index_of(&field.name)
                        .map(|i| row[i].clone())
                        .unwrap_or(Value::Null);
                    match (field.field_type, value) {
                        (FieldType::Text, Value::Int(i)) => Value::Text(i.to_string()),
                        (_, v) => v,
                    }
                })
                .collect()
        })
        .collect();
    RecordBatch::from_rows(bronze, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn bronze_row(name: Option<&str>, email: &str, age: &str, salary: i64, date: &str, status: &str) -> Vec<Value> {
        vec![
            name.map(Value::from).unwrap_or(Value::Null),
            Value::from(email),
            Value::from("555-123-4567"),
            Value::from(age),
            Value::Int(salary),
            Value::from("  1 Main   St "),
            Value::from(date),
            Value::from(status),
        ]
    }

    fn bronze(rows: Vec<Vec<Value>>) -> RecordBatch {
        RecordBatch::from_rows(Schema::bronze(), rows).unwrap()
    }

    #[test]
    fn test_dedup_keeps_first_and_drops_bad_email() {
        let batch = bronze(vec![
            bronze_row(Some("Ann"), "a@x.com", "30", 1000, "2022-01-01", "active"),
            bronze_row(Some("Bob"), "a@x.com", "40", 2000, "2022-01-01", "active"),
            bronze_row(Some("Cat"), "bad-email", "50", 3000, "2022-01-01", "active"),
        ]);

        let (silver, report) = DefaultCleaner::new().clean_with_report(&batch).unwrap();
        assert_eq!(silver.len(), 1);
        assert_eq!(silver.value(0, columns::NAME), Some(&Value::text("Ann")));
        assert_eq!(report.dropped_duplicate_email, 1);
        assert_eq!(report.dropped_invalid_email, 1);
        assert_eq!(report.rows_dropped(), 2);
    }

    #[test]
    fn test_field_repairs() {
        let row = bronze_row(Some("  Ann Lee "), "ann@x.com", "33", -50, "15/03/2022", "  INACTIVE ");
        let mut blank = bronze_row(Some("Bo"), "bo@x.com", "25", 250_000, "2021-07-04", "");
        blank[5] = Value::from("   ");
        blank[2] = Value::from("123");

        let silver = DefaultCleaner::new().clean(&bronze(vec![row, blank])).unwrap();
        assert_eq!(silver.len(), 2);

        assert_eq!(silver.value(0, columns::NAME), Some(&Value::text("Ann Lee")));
        assert_eq!(silver.value(0, columns::PHONE), Some(&Value::text("(555) 123-4567")));
        assert_eq!(silver.value(0, columns::AGE), Some(&Value::Int(33)));
        assert_eq!(silver.value(0, columns::SALARY), Some(&Value::Int(0)));
        assert_eq!(silver.value(0, columns::ADDRESS), Some(&Value::text("1 Main St")));
        assert_eq!(silver.value(0, columns::SIGNUP_DATE), Some(&Value::text("2022-03-15")));
        assert_eq!(silver.value(0, columns::STATUS), Some(&Value::text("Inactive")));

        assert_eq!(silver.value(1, columns::PHONE), Some(&Value::text("123")));
        assert_eq!(silver.value(1, columns::SALARY), Some(&Value::Int(200_000)));
        assert_eq!(silver.value(1, columns::ADDRESS), Some(&Value::text("Unknown")));
        assert_eq!(silver.value(1, columns::STATUS), Some(&Value::text("Unknown")));
    }

    #[test]
    fn test_rows_dropped_for_name_age_and_date() {
        let batch = bronze(vec![
            bronze_row(None, "a@x.com", "30", 1000, "2022-01-01", "active"),
            bronze_row(Some("B"), "b@x.com", "unknown", 1000, "2022-01-01", "active"),
            bronze_row(Some("C"), "c@x.com", "17", 1000, "2022-01-01", "active"),
            bronze_row(Some("D"), "d@x.com", "76", 1000, "2022-01-01", "active"),
            bronze_row(Some("E"), "e@x.com", "18", 1000, "31/2/2021", "active"),
            bronze_row(Some("F"), "f@x.com", "75", 1000, "2020-02-29", "pending"),
        ]);

        let (silver, report) = DefaultCleaner::new().clean_with_report(&batch).unwrap();
        assert_eq!(silver.len(), 1);
        assert_eq!(silver.value(0, columns::EMAIL), Some(&Value::text("f@x.com")));
        assert_eq!(report.dropped_null_name, 1);
        assert_eq!(report.dropped_age_out_of_range, 3);
        assert_eq!(report.dropped_invalid_signup_date, 1);
    }

    #[test]
    fn test_missing_columns_is_schema_error() {
        let schema = Schema::new(
            Schema::bronze()
                .fields()
                .iter()
                .filter(|f| f.name != columns::AGE && f.name != columns::STATUS)
                .cloned()
                .collect(),
        );
        let batch = RecordBatch::empty(schema);

        match DefaultCleaner::new().clean(&batch) {
            Err(EtlError::Schema { missing }) => {
                assert_eq!(missing, vec!["age".to_string(), "status".to_string()])
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_salary_is_unexpected() {
        let mut row = bronze_row(Some("Ann"), "a@x.com", "30", 0, "2022-01-01", "active");
        row[4] = Value::from("lots");

        let err = DefaultCleaner::new().clean(&bronze(vec![row])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.to_string(), "cleaning failed");
    }

    #[test]
    fn test_input_is_not_mutated_and_recleaning_is_stable() {
        let batch = bronze(vec![
            bronze_row(Some(" Ann "), "a@x.com", "30", -1, "15/03/2022", "ACTIVE"),
            bronze_row(Some("Bob"), "b@x.com", "44", 300_000, "2020-12-01", "pending"),
        ]);
        let snapshot = batch.clone();

        let cleaner = DefaultCleaner::new();
        let once = cleaner.clean(&batch).unwrap();
        assert_eq!(batch, snapshot);

        let twice = cleaner.clean(&silver_as_bronze(&once).unwrap()).unwrap();
        assert_eq!(once.rows(), twice.rows());
    }

    #[test]
    fn test_custom_rules() {
        let rules = CleaningRules {
            min_age: 30,
            max_salary: 5_000,
            ..Default::default()
        };
        let batch = bronze(vec![
            bronze_row(Some("A"), "a@x.com", "29", 1000, "2022-01-01", "active"),
            bronze_row(Some("B"), "b@x.com", "31", 9000, "2022-01-01", "active"),
        ]);

        let silver = DefaultCleaner::with_rules(rules).clean(&batch).unwrap();
        assert_eq!(silver.len(), 1);
        assert_eq!(silver.value(0, columns::SALARY), Some(&Value::Int(5_000)));
    }
}
