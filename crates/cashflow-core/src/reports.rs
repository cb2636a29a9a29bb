//! Aggregation engine and report shapes
//!
//! Pure computation over an already-fetched set of visible transactions.
//! Nothing here touches the database; `db::reports` fetches the row set and
//! delegates. All arithmetic is decimal so sums never drift, and an empty
//! row set is always a valid input, never an error.
//!
//! Window rules:
//! - Monthly history covers a trailing window of calendar months and always
//!   emits one bucket per month, zero-valued when empty.
//! - Trends come in three granularities: daily (trailing 30 days), weekly
//!   (trailing 12 ISO weeks, Monday start), monthly (trailing 12 months),
//!   ordered oldest to newest with every period present.

use std::collections::HashMap;

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Category, Transaction, TransactionType};

/// Number of trailing days covered by the default summary window
pub const DEFAULT_SUMMARY_DAYS: u64 = 30;

/// Number of trailing months covered by monthly history by default
pub const DEFAULT_HISTORY_MONTHS: u32 = 12;

/// Daily trend window length
pub const DAILY_TREND_DAYS: u64 = 30;

/// Weekly trend window length (ISO weeks)
pub const WEEKLY_TREND_WEEKS: i64 = 12;

/// Monthly trend window length
pub const MONTHLY_TREND_MONTHS: u32 = 12;

/// The date range a report actually covered, echoed back so a consumer can
/// verify what window produced the numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Totals over a filtered transaction set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    /// Always exactly `total_income - total_expense`
    pub balance: Decimal,
    pub transaction_count: i64,
}

/// Per-day averages over a summary window, quantized to two decimals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyAverages {
    pub avg_daily_income: Decimal,
    pub avg_daily_expense: Decimal,
    pub avg_daily_transactions: Decimal,
}

/// Summary report: statistics plus daily averages over the applied period
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub period: ReportPeriod,
    #[serde(flatten)]
    pub statistics: Statistics,
    #[serde(flatten)]
    pub averages: DailyAverages,
}

/// One category bucket in a breakdown report
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    /// `None` is the sentinel "uncategorized" bucket
    pub category_id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub total: Decimal,
    pub transaction_count: i64,
    /// `100 * total / grand_total`, half-up to one decimal place;
    /// zero when the grand total is zero
    pub percentage: Decimal,
}

/// Spending grouped by category over a period
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdownReport {
    pub period: ReportPeriod,
    /// Sum of all group totals; the percentage denominator
    pub grand_total: Decimal,
    pub categories: Vec<CategoryGroup>,
}

/// One calendar month in a history report
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

/// Trailing calendar-month history, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub period: ReportPeriod,
    pub months: Vec<MonthlyBucket>,
}

/// One period in a trend report
#[derive(Debug, Clone, Serialize)]
pub struct TrendPoint {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

/// Trend report over a fixed trailing window, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub granularity: TrendGranularity,
    pub period: ReportPeriod,
    pub points: Vec<TrendPoint>,
}

/// Trend bucketing granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendGranularity {
    Daily,
    Weekly,
    Monthly,
}

impl TrendGranularity {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(TrendGranularity::Daily),
            "weekly" => Ok(TrendGranularity::Weekly),
            "monthly" => Ok(TrendGranularity::Monthly),
            other => Err(Error::Validation(format!(
                "Invalid trend granularity '{}', expected 'daily', 'weekly' or 'monthly'",
                other
            ))),
        }
    }
}

/// Compute totals over a visible transaction set. Empty input yields zeros.
pub fn statistics(rows: &[Transaction]) -> Statistics {
    let mut total_income = Decimal::ZERO;
    let mut total_expense = Decimal::ZERO;
    for tx in rows {
        match tx.kind {
            TransactionType::Income => total_income += tx.amount,
            TransactionType::Expense => total_expense += tx.amount,
        }
    }
    Statistics {
        balance: total_income - total_expense,
        total_income,
        total_expense,
        transaction_count: rows.len() as i64,
    }
}

/// Number of days covered by a summary window.
///
/// With an explicit range this is the inclusive day count, floored at 1.
/// Without one, it is the span between the earliest and latest matching
/// transaction dates, or 1 when there are no rows to span.
fn days_in_period(rows: &[Transaction], range: Option<(NaiveDate, NaiveDate)>) -> i64 {
    let (start, end) = match range {
        Some(bounds) => bounds,
        None => {
            let min = rows.iter().map(|t| t.date).min();
            let max = rows.iter().map(|t| t.date).max();
            match (min, max) {
                (Some(min), Some(max)) => (min, max),
                _ => return 1,
            }
        }
    };
    ((end - start).num_days() + 1).max(1)
}

/// Build a summary report over `rows`, which must already be filtered to
/// the `period` and to visible rows only.
pub fn summary(rows: &[Transaction], period: ReportPeriod) -> SummaryReport {
    let stats = statistics(rows);
    let days = Decimal::from(days_in_period(rows, Some((period.start_date, period.end_date))));

    let quantize = |v: Decimal| v.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let averages = DailyAverages {
        avg_daily_income: quantize(stats.total_income / days),
        avg_daily_expense: quantize(stats.total_expense / days),
        avg_daily_transactions: quantize(Decimal::from(stats.transaction_count) / days),
    };

    SummaryReport {
        period,
        statistics: stats,
        averages,
    }
}

/// Group rows by category and compute totals and percentages.
///
/// Rows without a category land in the sentinel "Uncategorized" bucket and
/// participate in the same grand total. Groups are ordered largest first.
pub fn by_category(
    rows: &[Transaction],
    categories: &[Category],
    period: ReportPeriod,
) -> CategoryBreakdownReport {
    let lookup: HashMap<i64, &Category> = categories.iter().map(|c| (c.id, c)).collect();

    let mut buckets: HashMap<Option<i64>, (Decimal, i64)> = HashMap::new();
    for tx in rows {
        let entry = buckets.entry(tx.category_id).or_insert((Decimal::ZERO, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }

    let grand_total: Decimal = buckets.values().map(|(total, _)| *total).sum();

    let mut groups: Vec<CategoryGroup> = buckets
        .into_iter()
        .map(|(category_id, (total, count))| {
            let (name, kind) = match category_id.and_then(|id| lookup.get(&id)) {
                Some(cat) => (cat.name.clone(), Some(cat.kind)),
                None => ("Uncategorized".to_string(), None),
            };
            CategoryGroup {
                category_id,
                name,
                kind,
                total,
                transaction_count: count,
                percentage: percentage_of(total, grand_total),
            }
        })
        .collect();

    // Largest buckets first; stable name tiebreak keeps output deterministic
    groups.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

    CategoryBreakdownReport {
        period,
        grand_total,
        categories: groups,
    }
}

/// `100 * part / whole`, half-up to one decimal place; zero when `whole` is zero.
fn percentage_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part * Decimal::ONE_HUNDRED / whole)
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

/// First day of the month containing `date`
fn first_of_month(date: NaiveDate) -> NaiveDate {
    // with_day(1) cannot fail for day 1
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`
fn last_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date) + Months::new(1) - Days::new(1)
}

/// Monday of the ISO week containing `date`
fn iso_week_start(date: NaiveDate) -> NaiveDate {
    let week = date.iso_week();
    NaiveDate::from_isoywd_opt(week.year(), week.week(), Weekday::Mon).unwrap_or(date)
}

/// Sum income and expense over rows whose date falls in `[start, end]`
fn window_totals(rows: &[Transaction], start: NaiveDate, end: NaiveDate) -> (Decimal, Decimal) {
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for tx in rows {
        if tx.date >= start && tx.date <= end {
            match tx.kind {
                TransactionType::Income => income += tx.amount,
                TransactionType::Expense => expense += tx.amount,
            }
        }
    }
    (income, expense)
}

/// Trailing `months` calendar months of history ending in the month of
/// `today`. Every month in the window appears, zero-valued when empty;
/// the window length is never data-dependent.
pub fn monthly_history(rows: &[Transaction], months: u32, today: NaiveDate) -> MonthlyReport {
    let months = months.max(1);
    let current = first_of_month(today);
    let start = current - Months::new(months - 1);

    let mut buckets = Vec::with_capacity(months as usize);
    let mut cursor = start;
    while cursor <= current {
        let (income, expense) = window_totals(rows, cursor, last_of_month(cursor));
        buckets.push(MonthlyBucket {
            year: cursor.year(),
            month: cursor.month(),
            income,
            expense,
            balance: income - expense,
        });
        cursor = cursor + Months::new(1);
    }

    MonthlyReport {
        period: ReportPeriod {
            start_date: start,
            end_date: last_of_month(current),
        },
        months: buckets,
    }
}

/// Trend analysis at the requested granularity, anchored at `today`.
pub fn trends(rows: &[Transaction], granularity: TrendGranularity, today: NaiveDate) -> TrendReport {
    let points = match granularity {
        TrendGranularity::Daily => {
            let start = today - Days::new(DAILY_TREND_DAYS - 1);
            let mut points = Vec::with_capacity(DAILY_TREND_DAYS as usize);
            let mut day = start;
            while day <= today {
                points.push(trend_point(rows, day, day));
                day = day + Days::new(1);
            }
            points
        }
        TrendGranularity::Weekly => {
            let start = iso_week_start(today) - chrono::Duration::weeks(WEEKLY_TREND_WEEKS - 1);
            (0..WEEKLY_TREND_WEEKS)
                .map(|i| {
                    let monday = start + chrono::Duration::weeks(i);
                    trend_point(rows, monday, monday + Days::new(6))
                })
                .collect()
        }
        TrendGranularity::Monthly => {
            let start = first_of_month(today) - Months::new(MONTHLY_TREND_MONTHS - 1);
            (0..MONTHLY_TREND_MONTHS)
                .map(|i| {
                    let first = start + Months::new(i);
                    trend_point(rows, first, last_of_month(first))
                })
                .collect()
        }
    };

    let period = ReportPeriod {
        start_date: points.first().map(|p| p.period_start).unwrap_or(today),
        end_date: points.last().map(|p| p.period_end).unwrap_or(today),
    };

    TrendReport {
        granularity,
        period,
        points,
    }
}

fn trend_point(rows: &[Transaction], start: NaiveDate, end: NaiveDate) -> TrendPoint {
    let (income, expense) = window_totals(rows, start, end);
    TrendPoint {
        period_start: start,
        period_end: end,
        income,
        expense,
        balance: income - expense,
    }
}
