use anyhow::{Context, Result};
use famex_report::summary::{
    CashflowRow, CategoryTotalRow, MerchantTotalRow, MonthlyCashflowRow, SummaryStatistics, TopExpenseRow,
};
use famex_rules::PipelineStats;
use serde::Serialize;

use crate::Run;

/// Rows shown on the console; the CSV files hold the full top-N lists.
const CONSOLE_ROWS: usize = 10;

#[derive(Serialize)]
struct JsonOutput<'a> {
    pipeline: &'a PipelineStats,
    summary: &'a SummaryStatistics,
}

pub fn print_json(run: &Run) -> Result<()> {
    let output = JsonOutput {
        pipeline: &run.pipeline,
        summary: &run.reports.summary,
    };
    let json = serde_json::to_string_pretty(&output).context("Failed to serialize summary")?;
    println!("{json}");
    Ok(())
}

pub fn print_run(run: &Run) {
    let reports = &run.reports;

    print_summary(&reports.summary);
    print_cashflow(&reports.cashflow);
    print_top_expenses(&reports.top_expenses);
    for (group, rows) in &reports.top_categories {
        print_top_categories(group, rows);
    }
    for (group, rows) in &reports.top_merchants {
        print_top_merchants(group, rows, &run.fixed_categories);
    }
    print_monthly_cashflow(&reports.monthly_cashflow);

    println!("\nReports saved to: {}", run.reports_dir.display());
}

fn print_summary(stats: &SummaryStatistics) {
    println!("\n=== SUMMARY STATISTICS ===");
    println!("Total Transactions: {}", stats.total_transactions);
    if let (Some(first), Some(last)) = (stats.first_date, stats.last_date) {
        println!("Date Range: {first} to {last}");
    }

    println!("\nTotal Income: {}", stats.total_income);
    println!("Total Expenses: {}", stats.total_expenses);
    println!("Net Cashflow: {}", stats.net_cashflow);

    println!("\nBy Account Group:");
    for group in &stats.by_account_group {
        println!("  {}: {}", group.account_group, group.amount);
    }

    println!("\nTransactions by Source:");
    for source in &stats.by_source {
        println!("  {}: {}", source.source, source.count);
    }
}

fn print_cashflow(rows: &[CashflowRow]) {
    println!("\n--- CASHFLOW SUMMARY ---");
    println!("{:<12} {:>14} {:>14} {:>14}", "Group", "Income", "Expense", "Net");
    for row in rows {
        println!(
            "{:<12} {:>14} {:>14} {:>14}",
            row.account_group,
            row.income.to_string(),
            row.expense.to_string(),
            row.net_cashflow.to_string()
        );
    }
}

fn print_top_expenses(rows: &[TopExpenseRow]) {
    println!("\n--- TOP {CONSOLE_ROWS} EXPENSES ---");
    println!("{:<10} {:<28} {:>12} {:<20} {:<8}", "Date", "Merchant", "Amount", "Category", "Group");
    for row in rows.iter().take(CONSOLE_ROWS) {
        println!(
            "{:<10} {:<28} {:>12} {:<20} {:<8}",
            row.date.to_string(),
            truncate(&row.merchant, 28),
            row.amount.to_string(),
            truncate(&row.master_category, 20),
            row.account_group
        );
    }
}

fn print_top_categories(group: &str, rows: &[CategoryTotalRow]) {
    println!("\n--- TOP EXPENSE CATEGORIES: {} ---", group.to_uppercase());
    println!("{:<24} {:>14}", "Category", "Total Spent");
    for row in rows.iter().take(CONSOLE_ROWS) {
        println!("{:<24} {:>14}", truncate(&row.master_category, 24), row.amount.to_string());
    }
}

fn print_top_merchants(group: &str, rows: &[MerchantTotalRow], fixed_categories: &[String]) {
    println!("\n--- TOP DISCRETIONARY MERCHANTS: {} ---", group.to_uppercase());
    if !fixed_categories.is_empty() {
        println!("(Excludes: {})", fixed_categories.join(", "));
    }
    println!("{:<28} {:>14} {:>12}", "Merchant", "Total Spent", "Transactions");
    for row in rows.iter().take(CONSOLE_ROWS) {
        println!(
            "{:<28} {:>14} {:>12}",
            truncate(&row.merchant, 28),
            row.total_spent.to_string(),
            row.transaction_count
        );
    }
}

fn print_monthly_cashflow(rows: &[MonthlyCashflowRow]) {
    println!("\n--- MONTHLY CASHFLOW TRENDS ---");
    println!("{:<8} {:>14} {:>14} {:>14}", "Month", "Income", "Expense", "Net");
    for row in rows {
        println!(
            "{:<8} {:>14} {:>14} {:>14}",
            row.year_month.to_string(),
            row.income.to_string(),
            row.expense.to_string(),
            row.net_cashflow.to_string()
        );
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}
