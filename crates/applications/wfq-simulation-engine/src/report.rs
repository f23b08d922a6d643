//! Run summaries and human-readable rendering

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wfq_core::{CompletionRecord, SiteId, SiteShare, ValidationError};

use crate::balancer::RunReport;

/// Per-site outcome of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub site_id: SiteId,
    pub completed: usize,
    /// Actual time of the site's last completion, 0 if it served nothing
    pub last_actual_time: u64,
}

/// Aggregate metrics of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub completed_requests: usize,
    pub rejected_requests: usize,
    pub rejected_sites: usize,
    /// Actual time of the last completion
    pub makespan: u64,
    pub mean_completion_time: f64,
    pub per_site: Vec<SiteSummary>,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        let mut per_site: BTreeMap<SiteId, SiteSummary> = report
            .shares
            .iter()
            .map(|share| {
                (
                    share.site_id,
                    SiteSummary {
                        site_id: share.site_id,
                        completed: 0,
                        last_actual_time: 0,
                    },
                )
            })
            .collect();

        for record in &report.completions {
            let entry = per_site.entry(record.site_id).or_insert(SiteSummary {
                site_id: record.site_id,
                completed: 0,
                last_actual_time: 0,
            });
            entry.completed += 1;
            entry.last_actual_time = record.actual_time;
        }

        let rejected_requests = report
            .rejected
            .iter()
            .filter(|err| err.request_id().is_some())
            .count();

        let mean_completion_time = if report.completions.is_empty() {
            0.0
        } else {
            report
                .completions
                .iter()
                .map(|c| c.actual_time as f64)
                .sum::<f64>()
                / report.completions.len() as f64
        };

        RunSummary {
            completed_requests: report.completions.len(),
            rejected_requests,
            rejected_sites: report.rejected.len() - rejected_requests,
            makespan: report.completions.last().map_or(0, |c| c.actual_time),
            mean_completion_time,
            per_site: per_site.into_values().collect(),
        }
    }

    pub fn submitted_requests(&self) -> usize {
        self.completed_requests + self.rejected_requests
    }
}

/// Weight table, one line per site
pub fn render_weights(shares: &[SiteShare]) -> String {
    let mut lines = vec![String::from("Site Weights (Normalized):")];
    lines.extend(shares.iter().map(|share| {
        format!(
            "Site ID: {} (Bandwidth: {}, Processing Power: {}, Total Weight: {}) -> {:.4}",
            share.site_id,
            share.bandwidth,
            share.processing_power,
            share.capacity_weight,
            share.weight_fraction
        )
    }));
    terminated(lines)
}

/// Completion records in service order
pub fn render_completions(completions: &[CompletionRecord]) -> String {
    let lines = completions.iter().map(|record| {
        format!(
            "Processed Request ID: {} for Site ID: {} at Actual Time: {}",
            record.request_id, record.site_id, record.actual_time
        )
    });
    terminated(lines)
}

pub fn render_rejections(rejected: &[ValidationError]) -> String {
    terminated(rejected.iter().map(|err| format!("Error: {}", err)))
}

pub fn render_summary(summary: &RunSummary) -> String {
    let rule = "-".repeat(42);
    let mut lines = vec![
        format!("{:<10} {:>12} {:>18}", "Site", "Completed", "Last Actual Time"),
        rule.clone(),
    ];
    lines.extend(summary.per_site.iter().map(|site| {
        format!(
            "{:<10} {:>12} {:>18}",
            site.site_id, site.completed, site.last_actual_time
        )
    }));
    lines.push(rule);
    lines.push(format!(
        "Requests: {} submitted, {} completed, {} rejected",
        summary.submitted_requests(),
        summary.completed_requests,
        summary.rejected_requests
    ));
    if summary.rejected_sites > 0 {
        lines.push(format!("Sites rejected: {}", summary.rejected_sites));
    }
    lines.push(format!(
        "Makespan: {}  Mean completion time: {:.2}",
        summary.makespan, summary.mean_completion_time
    ));
    terminated(lines)
}

// Newline after every line, including the last
fn terminated(lines: impl IntoIterator<Item = String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share(site_id: SiteId, weight_fraction: f64) -> SiteShare {
        SiteShare {
            site_id,
            bandwidth: 50,
            processing_power: 50,
            capacity_weight: 100,
            weight_fraction,
        }
    }

    fn record(request_id: u64, site_id: SiteId, actual_time: u64) -> CompletionRecord {
        CompletionRecord {
            request_id,
            site_id,
            actual_time,
        }
    }

    fn sample_report() -> RunReport {
        RunReport {
            shares: vec![share(1, 0.5), share(2, 0.5), share(3, 0.0)],
            completions: vec![record(1, 1, 50), record(2, 2, 100), record(3, 1, 150)],
            rejected: vec![
                ValidationError::UnknownSiteReference {
                    request_id: 9,
                    site_id: 99,
                },
                ValidationError::DuplicateSiteId { site_id: 2 },
            ],
        }
    }

    #[test]
    fn test_summary_counts() {
        let summary = RunSummary::from_report(&sample_report());

        assert_eq!(summary.completed_requests, 3);
        assert_eq!(summary.rejected_requests, 1);
        assert_eq!(summary.rejected_sites, 1);
        assert_eq!(summary.submitted_requests(), 4);
        assert_eq!(summary.makespan, 150);
        assert!((summary.mean_completion_time - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_per_site_includes_idle_sites() {
        let summary = RunSummary::from_report(&sample_report());

        assert_eq!(
            summary.per_site,
            vec![
                SiteSummary {
                    site_id: 1,
                    completed: 2,
                    last_actual_time: 150
                },
                SiteSummary {
                    site_id: 2,
                    completed: 1,
                    last_actual_time: 100
                },
                SiteSummary {
                    site_id: 3,
                    completed: 0,
                    last_actual_time: 0
                },
            ]
        );
    }

    #[test]
    fn test_empty_report_summary() {
        let summary = RunSummary::from_report(&RunReport::default());
        assert_eq!(summary.makespan, 0);
        assert_eq!(summary.mean_completion_time, 0.0);
        assert!(summary.per_site.is_empty());
    }

    #[test]
    fn test_render_completions() {
        let text = render_completions(&[record(4, 2, 50), record(1, 3, 75)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Processed Request ID: 4 for Site ID: 2 at Actual Time: 50",
                "Processed Request ID: 1 for Site ID: 3 at Actual Time: 75",
            ]
        );
    }

    #[test]
    fn test_render_weights_and_rejections() {
        let weights = render_weights(&[share(1, 0.25)]);
        assert!(weights.contains(
            "Site ID: 1 (Bandwidth: 50, Processing Power: 50, Total Weight: 100) -> 0.2500"
        ));

        let rejections = render_rejections(&sample_report().rejected);
        assert!(rejections.starts_with("Error: Request 9 targets unknown site 99"));
        assert_eq!(rejections.lines().count(), 2);
    }

    #[test]
    fn test_render_summary_mentions_totals() {
        let text = render_summary(&RunSummary::from_report(&sample_report()));
        assert!(text.contains("Requests: 4 submitted, 3 completed, 1 rejected"));
        assert!(text.contains("Sites rejected: 1"));
        assert!(text.contains("Makespan: 150"));
        assert!(text.ends_with("Mean completion time: 100.00\n"));
    }

    #[test]
    fn test_render_weights_header_and_large_weight() {
        let mut large = share(7, 0.5);
        large.capacity_weight = 2 * u128::from(u64::MAX);

        let text = render_weights(&[large]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Site Weights (Normalized):");
        assert!(lines[1].contains("Total Weight: 36893488147419103230"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_render_empty_inputs() {
        assert_eq!(render_completions(&[]), "");
        assert_eq!(render_rejections(&[]), "");
        assert_eq!(render_weights(&[]), "Site Weights (Normalized):\n");
    }
}
