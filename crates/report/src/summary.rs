use chrono::NaiveDate;
use famex_core::{Money, Source, YearMonth};
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::path::PathBuf;

use crate::config::{AccountGroup, ReportSettings};
use crate::processor::{Flow, ProcessedTransaction};
use crate::writer::ReportWriter;
use crate::ReportError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    amount: Money,
    abs_amount: Money,
    count: usize,
}

impl Totals {
    fn add(&mut self, tx: &ProcessedTransaction) {
        self.amount += tx.amount;
        self.abs_amount += tx.abs_amount;
        self.count += 1;
    }
}

/// Groups rows by `key`, keeping groups in first-seen order.
fn group_by<'a, K, F>(rows: impl IntoIterator<Item = &'a ProcessedTransaction>, key: F) -> Vec<(K, Totals)>
where
    K: Eq + Hash + Clone,
    F: Fn(&ProcessedTransaction) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Totals)> = Vec::new();

    for tx in rows {
        let k = key(tx);
        let slot = match index.get(&k) {
            Some(&i) => i,
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, Totals::default()));
                groups.len() - 1
            }
        };
        groups[slot].1.add(tx);
    }

    groups
}

/// Largest absolute total first; ties keep first-seen order.
fn sort_by_abs_desc<K>(groups: &mut [(K, Totals)]) {
    groups.sort_by(|a, b| b.1.abs_amount.cmp(&a.1.abs_amount));
}

fn expenses(rows: &[ProcessedTransaction]) -> impl Iterator<Item = &ProcessedTransaction> {
    rows.iter().filter(|tx| tx.is_expense())
}

fn in_group<'a>(
    rows: &'a [ProcessedTransaction],
    group: &'a AccountGroup,
) -> impl Iterator<Item = &'a ProcessedTransaction> {
    rows.iter().filter(move |tx| group.contains(tx.source))
}

// ── Intermediate summaries ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummaryRow {
    pub master_category: String,
    pub account_group: String,
    pub total_amount: Money,
    pub transaction_count: usize,
    pub avg_amount: Money,
    pub total_abs_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantSummaryRow {
    pub merchant: String,
    pub account_group: String,
    pub total_amount: Money,
    pub transaction_count: usize,
    pub avg_amount: Money,
    pub total_abs_amount: Money,
}

pub fn category_summary(rows: &[ProcessedTransaction]) -> Vec<CategorySummaryRow> {
    let mut groups = group_by(rows, |tx| (tx.master_category.clone(), tx.account_group.clone()));
    sort_by_abs_desc(&mut groups);
    groups
        .into_iter()
        .map(|((master_category, account_group), t)| CategorySummaryRow {
            master_category,
            account_group,
            total_amount: t.amount.rounded(),
            transaction_count: t.count,
            avg_amount: t.amount.mean(t.count),
            total_abs_amount: t.abs_amount.rounded(),
        })
        .collect()
}

pub fn merchant_summary(rows: &[ProcessedTransaction]) -> Vec<MerchantSummaryRow> {
    let mut groups = group_by(rows, |tx| (tx.merchant.clone(), tx.account_group.clone()));
    sort_by_abs_desc(&mut groups);
    groups
        .into_iter()
        .map(|((merchant, account_group), t)| MerchantSummaryRow {
            merchant,
            account_group,
            total_amount: t.amount.rounded(),
            transaction_count: t.count,
            avg_amount: t.amount.mean(t.count),
            total_abs_amount: t.abs_amount.rounded(),
        })
        .collect()
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashflowRow {
    pub account_group: String,
    pub income: Money,
    pub expense: Money,
    pub net_cashflow: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopExpenseRow {
    pub date: NaiveDate,
    pub description: String,
    pub merchant: String,
    pub master_category: String,
    pub amount: Money,
    pub account_group: String,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotalRow {
    pub master_category: String,
    pub amount: Money,
    pub abs_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantTotalRow {
    pub merchant: String,
    pub total_spent: Money,
    pub total_abs_amount: Money,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCategoryRow {
    pub year_month: YearMonth,
    pub master_category: String,
    pub amount: Money,
    pub abs_amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAccountRow {
    pub year_month: YearMonth,
    pub account_group: String,
    pub transaction_type: Flow,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCashflowRow {
    pub year_month: YearMonth,
    pub income: Money,
    pub expense: Money,
    pub net_cashflow: Money,
}

/// Income, expense and net per account group, groups in name order.
pub fn cashflow_summary(rows: &[ProcessedTransaction]) -> Vec<CashflowRow> {
    let mut groups = group_by(rows, |tx| (tx.account_group.clone(), tx.flow));
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out: Vec<CashflowRow> = Vec::new();
    for ((account_group, flow), t) in groups {
        if out.last().map(|r| &r.account_group) != Some(&account_group) {
            out.push(CashflowRow {
                account_group,
                income: Money::zero(),
                expense: Money::zero(),
                net_cashflow: Money::zero(),
            });
        }
        if let Some(row) = out.last_mut() {
            match flow {
                Flow::Income => row.income = t.amount.rounded(),
                Flow::Expense => row.expense = t.amount.rounded(),
            }
            row.net_cashflow = row.income + row.expense;
        }
    }
    out
}

pub fn top_expenses(rows: &[ProcessedTransaction], n: usize) -> Vec<TopExpenseRow> {
    let mut sorted: Vec<&ProcessedTransaction> = expenses(rows).collect();
    sorted.sort_by(|a, b| b.abs_amount.cmp(&a.abs_amount));
    sorted
        .into_iter()
        .take(n)
        .map(|tx| TopExpenseRow {
            date: tx.date,
            description: tx.description.clone(),
            merchant: tx.merchant.clone(),
            master_category: tx.master_category.clone(),
            amount: tx.amount.rounded(),
            account_group: tx.account_group.clone(),
            source: tx.source,
        })
        .collect()
}

/// Expense totals by master category for one group's sources.
pub fn top_categories(rows: &[ProcessedTransaction], group: &AccountGroup, n: usize) -> Vec<CategoryTotalRow> {
    let mut groups = group_by(in_group(rows, group).filter(|tx| tx.is_expense()), |tx| {
        tx.master_category.clone()
    });
    sort_by_abs_desc(&mut groups);
    groups
        .into_iter()
        .take(n)
        .map(|(master_category, t)| CategoryTotalRow {
            master_category,
            amount: t.amount.rounded(),
            abs_amount: t.abs_amount.rounded(),
        })
        .collect()
}

/// Discretionary spending by merchant for one group's sources: expenses of
/// at least the configured minimum, outside the fixed categories.
pub fn top_merchants(
    rows: &[ProcessedTransaction],
    group: &AccountGroup,
    settings: &ReportSettings,
) -> Vec<MerchantTotalRow> {
    let eligible = in_group(rows, group).filter(|tx| {
        tx.is_expense()
            && tx.abs_amount >= settings.min_transaction_amount
            && !settings.is_fixed_category(&tx.master_category)
    });
    let mut groups = group_by(eligible, |tx| tx.merchant.clone());
    sort_by_abs_desc(&mut groups);
    groups
        .into_iter()
        .take(settings.top_n_merchants)
        .map(|(merchant, t)| MerchantTotalRow {
            merchant,
            total_spent: t.amount.rounded(),
            total_abs_amount: t.abs_amount.rounded(),
            transaction_count: t.count,
        })
        .collect()
}

pub fn monthly_spending_by_category(rows: &[ProcessedTransaction]) -> Vec<MonthlyCategoryRow> {
    let mut groups = group_by(expenses(rows), |tx| (tx.year_month, tx.master_category.clone()));
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
        .into_iter()
        .map(|((year_month, master_category), t)| MonthlyCategoryRow {
            year_month,
            master_category,
            amount: t.amount.rounded(),
            abs_amount: t.abs_amount.rounded(),
        })
        .collect()
}

pub fn monthly_totals_by_account(rows: &[ProcessedTransaction]) -> Vec<MonthlyAccountRow> {
    let mut groups = group_by(rows, |tx| (tx.year_month, tx.account_group.clone(), tx.flow));
    groups.sort_by(|a, b| a.0.cmp(&b.0));
    groups
        .into_iter()
        .map(|((year_month, account_group, transaction_type), t)| MonthlyAccountRow {
            year_month,
            account_group,
            transaction_type,
            amount: t.amount.rounded(),
        })
        .collect()
}

pub fn monthly_cashflow(rows: &[ProcessedTransaction]) -> Vec<MonthlyCashflowRow> {
    let mut groups = group_by(rows, |tx| (tx.year_month, tx.flow));
    groups.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out: Vec<MonthlyCashflowRow> = Vec::new();
    for ((year_month, flow), t) in groups {
        if out.last().map(|r| r.year_month) != Some(year_month) {
            out.push(MonthlyCashflowRow {
                year_month,
                income: Money::zero(),
                expense: Money::zero(),
                net_cashflow: Money::zero(),
            });
        }
        if let Some(row) = out.last_mut() {
            match flow {
                Flow::Income => row.income = t.amount.rounded(),
                Flow::Expense => row.expense = t.amount.rounded(),
            }
            row.net_cashflow = row.income + row.expense;
        }
    }
    out
}

// ── Summary statistics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub account_group: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCount {
    pub source: Source,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub total_transactions: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_income: Money,
    pub total_expenses: Money,
    pub net_cashflow: Money,
    /// Net amount per account group, in name order.
    pub by_account_group: Vec<GroupTotal>,
    /// Most transactions first.
    pub by_source: Vec<SourceCount>,
}

impl SummaryStatistics {
    pub fn compute(rows: &[ProcessedTransaction]) -> Self {
        let total_income: Money = rows.iter().filter(|tx| tx.is_income()).map(|tx| tx.amount).sum();
        let total_expenses: Money = expenses(rows).map(|tx| tx.amount).sum();

        let mut by_group = group_by(rows, |tx| tx.account_group.clone());
        by_group.sort_by(|a, b| a.0.cmp(&b.0));

        let mut by_source = group_by(rows, |tx| tx.source);
        by_source.sort_by(|a, b| b.1.count.cmp(&a.1.count));

        SummaryStatistics {
            total_transactions: rows.len(),
            first_date: rows.iter().map(|tx| tx.date).min(),
            last_date: rows.iter().map(|tx| tx.date).max(),
            total_income: total_income.rounded(),
            total_expenses: total_expenses.rounded(),
            net_cashflow: (total_income + total_expenses).rounded(),
            by_account_group: by_group
                .into_iter()
                .map(|(account_group, t)| GroupTotal {
                    account_group,
                    amount: t.amount.rounded(),
                })
                .collect(),
            by_source: by_source
                .into_iter()
                .map(|(source, t)| SourceCount { source, count: t.count })
                .collect(),
        }
    }
}

/// Every report for one run, computed up front so the binary can both save
/// and print them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reports {
    pub summary: SummaryStatistics,
    pub cashflow: Vec<CashflowRow>,
    pub top_expenses: Vec<TopExpenseRow>,
    /// Per reporting group, in configured order; groups without expenses are
    /// left out.
    pub top_categories: Vec<(String, Vec<CategoryTotalRow>)>,
    pub top_merchants: Vec<(String, Vec<MerchantTotalRow>)>,
    pub monthly_spending_by_category: Vec<MonthlyCategoryRow>,
    pub monthly_totals_by_account: Vec<MonthlyAccountRow>,
    pub monthly_cashflow: Vec<MonthlyCashflowRow>,
}

impl Reports {
    pub fn build(rows: &[ProcessedTransaction], settings: &ReportSettings) -> Self {
        let top_categories = settings
            .reporting_groups()
            .map(|g| (g.name.clone(), top_categories(rows, g, settings.top_n_categories)))
            .filter(|(_, r)| !r.is_empty())
            .collect();
        let top_merchants = settings
            .reporting_groups()
            .map(|g| (g.name.clone(), top_merchants(rows, g, settings)))
            .filter(|(_, r)| !r.is_empty())
            .collect();

        Reports {
            summary: SummaryStatistics::compute(rows),
            cashflow: cashflow_summary(rows),
            top_expenses: top_expenses(rows, settings.top_n_transactions),
            top_categories,
            top_merchants,
            monthly_spending_by_category: monthly_spending_by_category(rows),
            monthly_totals_by_account: monthly_totals_by_account(rows),
            monthly_cashflow: monthly_cashflow(rows),
        }
    }

    /// Saves every report table as CSV in `writer`'s directory.
    pub fn write(&self, writer: &ReportWriter) -> Result<Vec<PathBuf>, ReportError> {
        let mut paths = vec![
            writer.write("cashflow_summary.csv", &self.cashflow)?,
            writer.write("top_expenses.csv", &self.top_expenses)?,
        ];
        for (group, rows) in &self.top_categories {
            paths.push(writer.write(&format!("top_categories_{group}.csv"), rows)?);
        }
        for (group, rows) in &self.top_merchants {
            paths.push(writer.write(&format!("top_merchants_{group}.csv"), rows)?);
        }
        paths.push(writer.write("monthly_spending_by_category.csv", &self.monthly_spending_by_category)?);
        paths.push(writer.write("monthly_totals_by_account.csv", &self.monthly_totals_by_account)?);
        paths.push(writer.write("monthly_cashflow_summary.csv", &self.monthly_cashflow)?);

        tracing::info!("Saved {} reports to {}", paths.len(), writer.dir().display());
        Ok(paths)
    }
}
