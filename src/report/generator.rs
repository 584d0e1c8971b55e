//! Markdown and JSON report generation.
//!
//! This module renders the run report: run metadata, the recent activity
//! window, per-agency totals, drop-off events and the year-over-year view.

use crate::models::{
    month_name, ActivitySummary, AgencyId, AgencyTotal, DropoffEvent, NormalizedRow, Report,
    ReportMetadata, YearOverYear, YoyPoint,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# Dataset Publication Activity\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));

    match report.summary {
        Some(ref summary) => {
            output.push_str(&generate_window_section(summary));
            output.push_str(&generate_totals_section(&summary.totals));
            output.push_str(&generate_dropoff_section(&summary.dropoffs));
            output.push_str(&generate_yoy_section(&summary.year_over_year));
        }
        None => output.push_str(&generate_no_data_section()),
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Start Year:** {}\n", metadata.start_year));
    if metadata.agencies_fetched.is_empty() {
        section.push_str("- **Agencies Fetched:** none (cached artifacts)\n");
    } else {
        section.push_str(&format!(
            "- **Agencies Fetched:** {}\n",
            agency_list(&metadata.agencies_fetched)
        ));
    }
    section.push_str(&format!(
        "- **Agencies With Data:** {}\n",
        agency_list(&metadata.agencies_with_data)
    ));
    if !metadata.agencies_without_data.is_empty() {
        section.push_str(&format!(
            "- **Agencies Without Data:** {}\n",
            agency_list(&metadata.agencies_without_data)
        ));
    }
    section.push_str(&format!("- **Months Covered:** {}\n", metadata.months_covered));
    section.push_str(&format!(
        "- **Run Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

fn agency_list(agencies: &[AgencyId]) -> String {
    if agencies.is_empty() {
        return "none".to_string();
    }
    agencies
        .iter()
        .map(AgencyId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate the explicit "no data" section.
fn generate_no_data_section() -> String {
    let mut section = String::new();

    section.push_str("## No Data\n\n");
    section.push_str(
        "No agency produced any usable records, so there is no activity to report.\n\n",
    );

    section
}

/// Generate the recent activity table.
fn generate_window_section(summary: &ActivitySummary) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "## Recent Activity (last {} months)\n\n",
        summary.window_months
    ));
    section.push_str(&format!(
        "*Since {}{}*\n\n",
        summary.window_start.format("%Y-%m"),
        if summary.include_current_month {
            ", including the current month"
        } else {
            ", excluding the current month"
        }
    ));

    if summary.recent.is_empty() {
        section.push_str("No activity recorded in this window.\n\n");
        return section;
    }

    section.push_str("| Month | Agency | Datasets | Index |\n");
    section.push_str("|:---|:---|---:|---:|\n");
    for row in &summary.recent {
        section.push_str(&generate_window_row(row));
    }
    section.push('\n');

    section
}

fn generate_window_row(row: &NormalizedRow) -> String {
    format!(
        "| {} | {} | {} | {:.2} |\n",
        row.month.format("%Y-%m"),
        row.agency,
        row.count,
        row.normalized
    )
}

/// Generate the per-agency totals table.
fn generate_totals_section(totals: &[AgencyTotal]) -> String {
    if totals.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Totals by Agency\n\n");
    section.push_str("| Agency | Datasets |\n");
    section.push_str("|:---|---:|\n");

    let mut sorted = totals.to_vec();
    sorted.sort_by_key(|total| std::cmp::Reverse(total.total));
    for total in sorted {
        section.push_str(&format!("| {} | {} |\n", total.agency, total.total));
    }
    section.push('\n');

    section
}

/// Generate the drop-off section.
fn generate_dropoff_section(dropoffs: &[DropoffEvent]) -> String {
    let mut section = String::new();

    section.push_str("## Drop-offs\n\n");

    if dropoffs.is_empty() {
        section.push_str("No agency went from publishing to zero activity in this window.\n\n");
        return section;
    }

    for event in dropoffs {
        section.push_str(&format!(
            "- **{}** stopped publishing in {}\n",
            event.agency,
            event.month.format("%B %Y")
        ));
    }
    section.push('\n');

    section
}

/// Generate the year-over-year section.
fn generate_yoy_section(yoy: &YearOverYear) -> String {
    let mut section = String::new();

    match yoy {
        YearOverYear::Insufficient {
            month,
            years_available,
        } => {
            section.push_str(&format!("## Year over Year: {}\n\n", month_name(*month)));
            section.push_str(&format!(
                "Insufficient data: {} year(s) with {} activity, at least 2 needed.\n\n",
                years_available.len(),
                month_name(*month)
            ));
        }
        YearOverYear::Grouped {
            month,
            years,
            points,
        } => {
            section.push_str(&format!("## Year over Year: {}\n\n", month_name(*month)));
            section.push_str(&generate_yoy_table(years, points));
        }
    }

    section
}

/// One row per agency, one column per year (oldest first). Missing cells
/// are blank, not zero.
fn generate_yoy_table(years: &[i32], points: &[YoyPoint]) -> String {
    let mut columns = years.to_vec();
    columns.sort();

    let mut agencies: Vec<AgencyId> = points.iter().map(|p| p.agency).collect();
    agencies.sort();
    agencies.dedup();

    let mut table = String::new();

    table.push_str("| Agency |");
    for year in &columns {
        table.push_str(&format!(" {} |", year));
    }
    table.push('\n');
    table.push_str("|:---|");
    for _ in &columns {
        table.push_str("---:|");
    }
    table.push('\n');

    for agency in agencies {
        table.push_str(&format!("| {} |", agency));
        for year in &columns {
            match points
                .iter()
                .find(|p| p.agency == agency && p.year == *year)
            {
                Some(point) => table.push_str(&format!(" {} |", point.count)),
                None => table.push_str("  |"),
            }
        }
        table.push('\n');
    }
    table.push('\n');

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by pubtrack v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
