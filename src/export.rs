//! Render a completed analysis result as a CSV table or a standalone HTML
//! report. Pure presentation over the already-computed matrix.

use chrono::{DateTime, Utc};
use url::Url;

use crate::matrix::MatrixSummary;
use crate::types::AnalysisResult;

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Html,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(ExportFormat::Csv),
            "html" | "report" => Some(ExportFormat::Html),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
        }
    }
}

/// Render the export artifact in the requested format.
pub fn render(result: &AnalysisResult, format: ExportFormat, generated_at: DateTime<Utc>) -> String {
    match format {
        ExportFormat::Csv => matrix_csv(result),
        ExportFormat::Html => report_html(result, generated_at),
    }
}

/// Hostname of a site URL, for column headers. Falls back to the raw URL.
pub fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// CSV export: `Page,Feature,<hostA>,<hostB>` header, one row per matrix
/// entry in matrix order, `O`/`X` presence markers.
pub fn matrix_csv(result: &AnalysisResult) -> String {
    let mut out = String::new();
    write_csv_row(
        &mut out,
        &[
            "Page",
            "Feature",
            &host_of(&result.site_a.url),
            &host_of(&result.site_b.url),
        ],
    );
    for entry in result.feature_matrix.entries() {
        write_csv_row(
            &mut out,
            &[
                entry.page.display_name(),
                entry.feature.display_name(),
                if entry.site_a { "O" } else { "X" },
                if entry.site_b { "O" } else { "X" },
            ],
        );
    }
    out
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_csv_row(out: &mut String, row: &[&str]) {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if needs_quotes(cell) {
            out.push('"');
            out.push_str(&cell.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(cell);
        }
    }
    out.push('\n');
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Standalone HTML report: compared sites, the matrix table, and the derived
/// per-site summary.
pub fn report_html(result: &AnalysisResult, generated_at: DateTime<Utc>) -> String {
    let host_a = html_escape(&host_of(&result.site_a.url));
    let host_b = html_escape(&host_of(&result.site_b.url));
    let summary = MatrixSummary::from_matrix(&result.feature_matrix);

    let mut rows = String::new();
    for entry in result.feature_matrix.entries() {
        let mark = |present: bool| {
            if present {
                "<td class=\"yes\">Yes</td>"
            } else {
                "<td class=\"no\">No</td>"
            }
        };
        rows.push_str(&format!(
            "      <tr><td>{}</td><td>{}</td>{}{}</tr>\n",
            entry.page.display_name(),
            entry.feature.display_name(),
            mark(entry.site_a),
            mark(entry.site_b),
        ));
    }

    let list = |keys: &[String]| -> String {
        if keys.is_empty() {
            "<li><em>none</em></li>".to_string()
        } else {
            keys.iter()
                .map(|k| format!("<li>{}</li>", html_escape(k)))
                .collect::<Vec<_>>()
                .join("")
        }
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Competitor Feature Comparison Report</title>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; color: #222; }}
    table {{ border-collapse: collapse; margin: 1rem 0; }}
    th, td {{ border: 1px solid #ccc; padding: 6px 12px; text-align: left; }}
    th {{ background: #f0f0f0; }}
    tr:nth-child(even) {{ background: #f9f9f9; }}
    td.yes {{ color: #28a745; }}
    td.no {{ color: #dc3545; }}
  </style>
</head>
<body>
  <h1>Competitor Feature Comparison Report</h1>
  <p>Generated: {generated}</p>
  <h2>Compared Websites</h2>
  <p>Site A: {host_a} ({url_a})<br>Site B: {host_b} ({url_b})</p>
  <h2>Feature Comparison Matrix</h2>
  <table>
    <thead>
      <tr><th>Page</th><th>Feature</th><th>{host_a}</th><th>{host_b}</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
  <h2>Summary</h2>
  <p>{host_a}: {count_a} features detected<br>{host_b}: {count_b} features detected</p>
  <h3>Common to both</h3>
  <ul>{common}</ul>
  <h3>Only {host_a}</h3>
  <ul>{unique_a}</ul>
  <h3>Only {host_b}</h3>
  <ul>{unique_b}</ul>
</body>
</html>
"#,
        generated = generated_at.format("%Y-%m-%d %H:%M UTC"),
        url_a = html_escape(&result.site_a.url),
        url_b = html_escape(&result.site_b.url),
        count_a = summary.site_a_count,
        count_b = summary.site_b_count,
        common = list(&summary.common),
        unique_a = list(&summary.unique_to_a),
        unique_b = list(&summary.unique_to_b),
    )
}

/// Artifact file name for a job export.
pub fn artifact_filename(job_id: &str, format: ExportFormat) -> String {
    format!(
        "analysis_{}_{}.{}",
        job_id,
        Utc::now().timestamp_millis(),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::reconcile;
    use crate::types::{FeatureKey, PageId, SiteAnalysis};
    use std::collections::BTreeMap;

    fn result() -> AnalysisResult {
        let mut page_a = BTreeMap::new();
        page_a.insert(FeatureKey::Cart, true);
        page_a.insert(FeatureKey::SearchBar, false);
        let mut features_a = BTreeMap::new();
        features_a.insert(PageId::Home, page_a);

        let mut page_b = BTreeMap::new();
        page_b.insert(FeatureKey::Cart, false);
        page_b.insert(FeatureKey::SearchBar, true);
        let mut features_b = BTreeMap::new();
        features_b.insert(PageId::Home, page_b);

        AnalysisResult {
            feature_matrix: reconcile(&features_a, &features_b),
            site_a: SiteAnalysis {
                url: "https://shop-a.example/".to_string(),
                screenshots: BTreeMap::new(),
                features: features_a,
            },
            site_b: SiteAnalysis {
                url: "https://shop-b.example/".to_string(),
                screenshots: BTreeMap::new(),
                features: features_b,
            },
        }
    }

    #[test]
    fn csv_has_header_and_one_row_per_entry() {
        let csv = matrix_csv(&result());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Page,Feature,shop-a.example,shop-b.example");
        assert_eq!(lines[1], "Homepage,Search Function,X,O");
        assert_eq!(lines[2], "Homepage,Shopping Cart,O,X");
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let mut out = String::new();
        write_csv_row(&mut out, &["a,b", "plain", "say \"hi\""]);
        assert_eq!(out, "\"a,b\",plain,\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn html_report_contains_matrix_and_summary() {
        let html = report_html(&result(), Utc::now());
        assert!(html.contains("shop-a.example"));
        assert!(html.contains("Shopping Cart"));
        assert!(html.contains("home_searchBar")); // unique to B
        assert!(html.contains("<em>none</em>")); // nothing common
    }

    #[test]
    fn format_parsing() {
        assert_eq!(ExportFormat::parse("csv"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("HTML"), Some(ExportFormat::Html));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }

    #[test]
    fn host_falls_back_to_raw_input() {
        assert_eq!(host_of("https://shop-a.example/x"), "shop-a.example");
        assert_eq!(host_of("not a url"), "not a url");
    }
}
