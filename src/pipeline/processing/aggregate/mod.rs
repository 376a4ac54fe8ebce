//! Silver -> gold aggregation.

pub mod stats;

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::constants::{columns, tables, ACTIVE_STATUS};
use crate::domain::{Field, FieldType, RecordBatch, Schema, Table, Value};
use crate::error::{EtlError, Result, Stage};

/// Trait for the silver -> gold transformation
pub trait Aggregator {
    /// Produce every gold table, or fail as a whole.
    fn aggregate(&self, batch: &RecordBatch) -> Result<GoldTables>;
}

/// Age band: `lower <= age < upper`, except the last band which closes at 110.
struct AgeBand {
    lower: f64,
    upper: f64,
    label: &'static str,
}

const AGE_BANDS: [AgeBand; 7] = [
    AgeBand { lower: 18.0, upper: 25.0, label: "18-24" },
    AgeBand { lower: 25.0, upper: 35.0, label: "25-34" },
    AgeBand { lower: 35.0, upper: 45.0, label: "35-44" },
    AgeBand { lower: 45.0, upper: 55.0, label: "45-54" },
    AgeBand { lower: 55.0, upper: 65.0, label: "55-64" },
    AgeBand { lower: 65.0, upper: 75.0, label: "65-74" },
    AgeBand { lower: 75.0, upper: 110.0, label: "75+" },
];

fn age_band_index(age: f64) -> Option<usize> {
    let last = AGE_BANDS.len() - 1;
    AGE_BANDS.iter().enumerate().position(|(i, band)| {
        age >= band.lower && (age < band.upper || (i == last && age <= band.upper))
    })
}

/// Label of the age group `age` falls into; `None` outside `[18, 110]`.
pub fn age_group(age: f64) -> Option<&'static str> {
    age_band_index(age).map(|i| AGE_BANDS[i].label)
}

/// The six gold tables, in production order.
#[derive(Debug, Clone, PartialEq)]
pub struct GoldTables {
    tables: Vec<Table>,
}

impl GoldTables {
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl IntoIterator for GoldTables {
    type Item = Table;
    type IntoIter = std::vec::IntoIter<Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

/// Typed view of the silver columns the aggregations read.
struct SilverView<'a> {
    row: &'a [Value],
    status: Option<String>,
    signup: Option<NaiveDate>,
    age: Option<f64>,
    salary: Option<f64>,
    has_email: bool,
}

/// Running group state: email count plus the numeric samples.
#[derive(Default)]
struct Accumulator {
    user_count: i64,
    ages: Vec<f64>,
    salaries: Vec<f64>,
}

impl Accumulator {
    fn add(&mut self, view: &SilverView<'_>) {
        if view.has_email {
            self.user_count += 1;
        }
        self.ages.extend(view.age);
        self.salaries.extend(view.salary);
    }
}

/// One `time_analytics` row, kept typed for the executive roll-up.
struct MonthlyStats {
    year: i32,
    month: u32,
    user_count: i64,
    avg_age: Option<f64>,
    avg_salary: Option<f64>,
    median_salary: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAggregator;

impl DefaultAggregator {
    pub fn new() -> Self {
        Self
    }

    fn run(&self, batch: &RecordBatch) -> anyhow::Result<GoldTables> {
        if batch.is_empty() {
            return Err(EtlError::validation("input batch is empty").into());
        }
        batch.schema().require(&columns::AGGREGATION_REQUIRED)?;

        let views = silver_views(batch)?;
        let active: Vec<&SilverView<'_>> = views
            .iter()
            .filter(|v| v.status.as_deref() == Some(ACTIVE_STATUS))
            .collect();
        debug!(rows = views.len(), active = active.len(), "Aggregating silver batch");

        let monthly = monthly_stats(&active);
        let gold = vec![
            Table::new(tables::ACTIVE_USERS, active_users(batch.schema(), &active)?),
            Table::new(tables::TIME_ANALYTICS, time_analytics(&monthly)?),
            Table::new(tables::DEMOGRAPHIC_ANALYTICS, demographic_analytics(&active)?),
            Table::new(tables::STATUS_SUMMARY, status_summary(&views)?),
            Table::new(tables::YEARLY_GROWTH, yearly_growth(&views)?),
            Table::new(tables::EXEC_DASHBOARD, exec_dashboard(&monthly)?),
        ];

        if let Some(empty) = gold.iter().find(|t| t.is_empty()) {
            return Err(EtlError::validation(format!("empty table generated for {}", empty.name)).into());
        }
        Ok(GoldTables { tables: gold })
    }
}

impl Aggregator for DefaultAggregator {
    fn aggregate(&self, batch: &RecordBatch) -> Result<GoldTables> {
        self.run(batch).map_err(|e| match e.downcast::<EtlError>() {
            Ok(etl) => etl,
            Err(other) => EtlError::unexpected(Stage::Aggregate, other),
        })
    }
}

fn silver_views(batch: &RecordBatch) -> anyhow::Result<Vec<SilverView<'_>>> {
    let schema = batch.schema();
    let idx = |name: &str| schema.index_of(name).unwrap_or_default();
    let (status_i, date_i, age_i, salary_i, email_i) = (
        idx(columns::STATUS),
        idx(columns::SIGNUP_DATE),
        idx(columns::AGE),
        idx(columns::SALARY),
        idx(columns::EMAIL),
    );

    batch
        .rows()
        .iter()
        .enumerate()
        .map(|(n, row)| {
            let signup = match &row[date_i] {
                Value::Null => None,
                Value::Text(s) => Some(
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .with_context(|| format!("row {}: signup_date {:?} is not an ISO date", n, s))?,
                ),
                other => bail!("row {}: signup_date {:?} is not text", n, other),
            };
            Ok(SilverView {
                row,
                status: row[status_i].to_text(),
                signup,
                age: row[age_i].as_f64(),
                salary: row[salary_i].as_f64(),
                has_email: !row[email_i].is_null(),
            })
        })
        .collect()
}

fn active_users(silver: &Schema, active: &[&SilverView<'_>]) -> Result<RecordBatch> {
    let schema = silver.extend([
        Field::nullable(columns::SIGNUP_YEAR, FieldType::Int),
        Field::nullable(columns::SIGNUP_MONTH, FieldType::Int),
        Field::nullable(columns::AGE_GROUP, FieldType::Text),
    ]);
    let rows = active
        .iter()
        .map(|v| {
            let mut row = v.row.to_vec();
            row.push(v.signup.map_or(Value::Null, |d| Value::Int(d.year() as i64)));
            row.push(v.signup.map_or(Value::Null, |d| Value::Int(d.month() as i64)));
            row.push(v.age.and_then(age_group).map_or(Value::Null, Value::from));
            row
        })
        .collect();
    RecordBatch::from_rows(schema, rows)
}

fn monthly_stats(active: &[&SilverView<'_>]) -> Vec<MonthlyStats> {
    let mut groups: BTreeMap<(i32, u32), Accumulator> = BTreeMap::new();
    for v in active {
        if let Some(d) = v.signup {
            groups.entry((d.year(), d.month())).or_default().add(v);
        }
    }
    groups
        .into_iter()
        .map(|((year, month), acc)| MonthlyStats {
            year,
            month,
            user_count: acc.user_count,
            avg_age: stats::mean(&acc.ages),
            avg_salary: stats::mean(&acc.salaries),
            median_salary: stats::median(&acc.salaries),
        })
        .collect()
}

fn time_analytics(monthly: &[MonthlyStats]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::required(columns::SIGNUP_YEAR, FieldType::Int),
        Field::required(columns::SIGNUP_MONTH, FieldType::Int),
        Field::required(columns::USER_COUNT, FieldType::Int),
        Field::nullable(columns::AVG_AGE, FieldType::Float),
        Field::nullable(columns::AVG_SALARY, FieldType::Float),
        Field::nullable(columns::MEDIAN_SALARY, FieldType::Float),
    ]);
    let rows = monthly
        .iter()
        .map(|m| {
            vec![
                Value::Int(m.year as i64),
                Value::Int(m.month as i64),
                Value::Int(m.user_count),
                Value::from(m.avg_age),
                Value::from(m.avg_salary),
                Value::from(m.median_salary),
            ]
        })
        .collect();
    RecordBatch::from_rows(schema, rows)
}

fn demographic_analytics(active: &[&SilverView<'_>]) -> Result<RecordBatch> {
    let mut groups: BTreeMap<usize, Accumulator> = BTreeMap::new();
    for v in active {
        if let Some(band) = v.age.and_then(age_band_index) {
            groups.entry(band).or_default().add(v);
        }
    }

    let schema = Schema::new(vec![
        Field::required(columns::AGE_GROUP, FieldType::Text),
        Field::required(columns::USER_COUNT, FieldType::Int),
        Field::nullable(columns::AVG_SALARY, FieldType::Float),
        Field::nullable(columns::SALARY_STD, FieldType::Float),
    ]);
    let rows = groups
        .into_iter()
        .map(|(band, acc)| {
            vec![
                Value::from(AGE_BANDS[band].label),
                Value::Int(acc.user_count),
                Value::from(stats::mean(&acc.salaries)),
                Value::from(stats::sample_std(&acc.salaries)),
            ]
        })
        .collect();
    RecordBatch::from_rows(schema, rows)
}

fn status_summary(views: &[SilverView<'_>]) -> Result<RecordBatch> {
    let mut groups: BTreeMap<&str, Accumulator> = BTreeMap::new();
    for v in views {
        if let Some(status) = v.status.as_deref() {
            groups.entry(status).or_default().add(v);
        }
    }

    let schema = Schema::new(vec![
        Field::required(columns::STATUS, FieldType::Text),
        Field::required(columns::USER_COUNT, FieldType::Int),
        Field::nullable(columns::AVG_AGE, FieldType::Float),
        Field::nullable(columns::AVG_SALARY, FieldType::Float),
    ]);
    let rows = groups
        .into_iter()
        .map(|(status, acc)| {
            vec![
                Value::from(status),
                Value::Int(acc.user_count),
                Value::from(stats::mean(&acc.ages)),
                Value::from(stats::mean(&acc.salaries)),
            ]
        })
        .collect();
    RecordBatch::from_rows(schema, rows)
}

fn yearly_growth(views: &[SilverView<'_>]) -> Result<RecordBatch> {
    let mut groups: BTreeMap<i32, Accumulator> = BTreeMap::new();
    for v in views {
        if let Some(d) = v.signup {
            groups.entry(d.year()).or_default().add(v);
        }
    }

    let schema = Schema::new(vec![
        Field::required(columns::YEAR, FieldType::Int),
        Field::required(columns::NEW_USERS, FieldType::Int),
        Field::nullable(columns::GROWTH_PCT, FieldType::Float),
    ]);
    let mut previous: Option<i64> = None;
    let mut rows = Vec::with_capacity(groups.len());
    for (year, acc) in groups {
        let growth = previous.and_then(|prev| stats::pct_change(prev as f64, acc.user_count as f64));
        rows.push(vec![
            Value::Int(year as i64),
            Value::Int(acc.user_count),
            Value::from(growth),
        ]);
        previous = Some(acc.user_count);
    }
    RecordBatch::from_rows(schema, rows)
}

/// Per-year roll-up of `time_analytics`. `avg_salary` is the mean of the
/// monthly averages, not a mean weighted by user count.
fn exec_dashboard(monthly: &[MonthlyStats]) -> Result<RecordBatch> {
    let mut groups: BTreeMap<i32, (i64, Vec<f64>)> = BTreeMap::new();
    for m in monthly {
        let entry = groups.entry(m.year).or_default();
        entry.0 += m.user_count;
        entry.1.extend(m.avg_salary);
    }

    let schema = Schema::new(vec![
        Field::required(columns::SIGNUP_YEAR, FieldType::Int),
        Field::required(columns::TOTAL_USERS, FieldType::Int),
        Field::nullable(columns::AVG_SALARY, FieldType::Float),
    ]);
    let rows = groups
        .into_iter()
        .map(|(year, (total, avg_salaries))| {
            vec![
                Value::Int(year as i64),
                Value::Int(total),
                Value::from(stats::mean(&avg_salaries)),
            ]
        })
        .collect();
    RecordBatch::from_rows(schema, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn silver_row(email: &str, age: i64, salary: i64, date: &str, status: &str) -> Vec<Value> {
        vec![
            Value::from("Someone"),
            Value::from(email),
            Value::from("(555) 123-4567"),
            Value::Int(age),
            Value::Int(salary),
            Value::from("1 Main St"),
            Value::from(date),
            Value::from(status),
        ]
    }

    fn sample_batch() -> RecordBatch {
        RecordBatch::from_rows(
            Schema::silver(),
            vec![
                silver_row("a@x.com", 20, 1000, "2021-01-10", "Active"),
                silver_row("b@x.com", 30, 3000, "2021-01-20", "Active"),
                silver_row("c@x.com", 40, 5000, "2021-02-05", "Active"),
                silver_row("d@x.com", 50, 7000, "2022-03-01", "Inactive"),
                silver_row("e@x.com", 75, 9000, "2022-03-02", "Active"),
                silver_row("f@x.com", 22, 2000, "2023-06-30", "Pending"),
            ],
        )
        .unwrap()
    }

    fn float(table: &Table, row: usize, col: &str) -> Option<f64> {
        table.batch.value(row, col).and_then(Value::as_f64)
    }

    #[test]
    fn test_age_group_boundaries() {
        assert_eq!(age_group(17.0), None);
        assert_eq!(age_group(18.0), Some("18-24"));
        assert_eq!(age_group(24.0), Some("18-24"));
        assert_eq!(age_group(25.0), Some("25-34"));
        assert_eq!(age_group(74.0), Some("65-74"));
        assert_eq!(age_group(75.0), Some("75+"));
        assert_eq!(age_group(110.0), Some("75+"));
        assert_eq!(age_group(111.0), None);
    }

    #[test]
    fn test_produces_six_tables_in_order() {
        let gold = DefaultAggregator::new().aggregate(&sample_batch()).unwrap();
        assert_eq!(gold.names(), tables::ALL.iter().map(|s| s.to_string()).collect::<Vec<_>>());

        let active = gold.get(tables::ACTIVE_USERS).unwrap();
        assert_eq!(active.len(), 4);
        assert_eq!(active.batch.value(0, columns::SIGNUP_YEAR), Some(&Value::Int(2021)));
        assert_eq!(active.batch.value(0, columns::SIGNUP_MONTH), Some(&Value::Int(1)));
        assert_eq!(active.batch.value(3, columns::AGE_GROUP), Some(&Value::text("75+")));
    }

    #[test]
    fn test_time_analytics_and_exec_dashboard() {
        let gold = DefaultAggregator::new().aggregate(&sample_batch()).unwrap();

        let time = gold.get(tables::TIME_ANALYTICS).unwrap();
        assert_eq!(time.len(), 3);
        assert_eq!(time.batch.value(0, columns::USER_COUNT), Some(&Value::Int(2)));
        assert_eq!(float(time, 0, columns::AVG_AGE), Some(25.0));
        assert_eq!(float(time, 0, columns::AVG_SALARY), Some(2000.0));
        assert_eq!(float(time, 0, columns::MEDIAN_SALARY), Some(2000.0));

        // 2021: months average 2000 and 5000 -> mean of means 3500, not 3000
        let exec = gold.get(tables::EXEC_DASHBOARD).unwrap();
        assert_eq!(exec.len(), 2);
        assert_eq!(exec.batch.value(0, columns::TOTAL_USERS), Some(&Value::Int(3)));
        assert_eq!(float(exec, 0, columns::AVG_SALARY), Some(3500.0));
    }

    #[test]
    fn test_demographics_partition_active_users() {
        let gold = DefaultAggregator::new().aggregate(&sample_batch()).unwrap();
        let demo = gold.get(tables::DEMOGRAPHIC_ANALYTICS).unwrap();

        let labels: Vec<_> = demo.batch.column(columns::AGE_GROUP).unwrap().cloned().collect();
        assert_eq!(
            labels,
            vec![Value::from("18-24"), Value::from("25-34"), Value::from("35-44"), Value::from("75+")]
        );
        let total: i64 = demo.batch.column(columns::USER_COUNT).unwrap().filter_map(Value::as_i64).sum();
        assert_eq!(total, 4);
        // singleton groups have no sample deviation
        assert_eq!(demo.batch.value(0, columns::SALARY_STD), Some(&Value::Null));
    }

    #[test]
    fn test_status_summary_and_growth() {
        let gold = DefaultAggregator::new().aggregate(&sample_batch()).unwrap();

        let status = gold.get(tables::STATUS_SUMMARY).unwrap();
        let names: Vec<_> = status.batch.column(columns::STATUS).unwrap().cloned().collect();
        assert_eq!(names, vec![Value::from("Active"), Value::from("Inactive"), Value::from("Pending")]);
        assert_eq!(status.batch.value(0, columns::USER_COUNT), Some(&Value::Int(4)));

        let growth = gold.get(tables::YEARLY_GROWTH).unwrap();
        assert_eq!(growth.len(), 3);
        assert_eq!(growth.batch.value(0, columns::GROWTH_PCT), Some(&Value::Null));
        assert_eq!(growth.batch.value(0, columns::NEW_USERS), Some(&Value::Int(3)));
        let second = float(growth, 1, columns::GROWTH_PCT).unwrap();
        assert!((second + 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(float(growth, 2, columns::GROWTH_PCT), Some(-50.0));
    }

    #[test]
    fn test_no_active_users_fails_validation() {
        let batch = RecordBatch::from_rows(
            Schema::silver(),
            vec![silver_row("a@x.com", 30, 1000, "2021-01-10", "Inactive")],
        )
        .unwrap();

        let err = DefaultAggregator::new().aggregate(&batch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains(tables::ACTIVE_USERS));
    }

    #[test]
    fn test_empty_input_and_missing_columns() {
        let err = DefaultAggregator::new()
            .aggregate(&RecordBatch::empty(Schema::silver()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let schema = Schema::new(vec![Field::required(columns::STATUS, FieldType::Text)]);
        let batch = RecordBatch::from_rows(schema, vec![vec![Value::from("Active")]]).unwrap();
        match DefaultAggregator::new().aggregate(&batch) {
            Err(EtlError::Schema { missing }) => {
                assert_eq!(missing, vec!["signup_date", "age", "salary", "email"]);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_date_is_unexpected() {
        let batch = RecordBatch::from_rows(
            Schema::silver(),
            vec![silver_row("a@x.com", 30, 1000, "15/03/2022", "Active")],
        )
        .unwrap();

        let err = DefaultAggregator::new().aggregate(&batch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.to_string(), "aggregation failed");
    }
}
