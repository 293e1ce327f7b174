//! Terminal rendering of a metrics snapshot

use assetdesk_types::{HostMetrics, HostStatus, MetricsSnapshot, Problem};
use colored::{ColoredString, Colorize};
use std::fmt::Write;

pub fn render(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{}  {} hosts, {} up, {} problems  (updated {})",
        "Server Monitoring".blue().bold(),
        snapshot.hosts.len(),
        snapshot.hosts_up(),
        snapshot.problems.len(),
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);

    if snapshot.hosts.is_empty() {
        let _ = writeln!(out, "   {}", "No hosts reported".dimmed());
    } else {
        let _ = writeln!(
            out,
            "   {:<24} {:<8} {:>7} {:>7} {:>12}",
            "HOST", "STATUS", "CPU", "MEM", "UPTIME"
        );
        for host in &snapshot.hosts {
            let _ = writeln!(out, "   {}", host_row(host));
        }
    }

    if !snapshot.problems.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Problems".yellow().bold());
        for problem in &snapshot.problems {
            let _ = writeln!(out, "   {}", problem_row(problem));
        }
    }

    out
}

fn host_row(host: &HostMetrics) -> String {
    let status = match host.status {
        HostStatus::Up => "up".green(),
        HostStatus::Down => "down".red().bold(),
        HostStatus::Unknown => "unknown".dimmed(),
    };
    let name = if host.enabled {
        host.name.normal()
    } else {
        format!("{} (disabled)", host.name).dimmed()
    };
    format!(
        "{:<24} {:<8} {:>7} {:>7} {:>12}",
        name,
        status,
        percent(host.cpu_utilization),
        percent(host.memory_utilization),
        host.uptime_seconds.map(uptime).unwrap_or_else(|| "-".to_string())
    )
}

fn problem_row(problem: &Problem) -> String {
    format!(
        "[{}] {} {}{}",
        severity(problem),
        problem.clock.format("%m-%d %H:%M"),
        problem.name,
        problem
            .host
            .as_deref()
            .map(|h| format!(" ({})", h))
            .unwrap_or_default()
    )
}

fn severity(problem: &Problem) -> ColoredString {
    let label = problem.severity_label();
    match problem.severity {
        5 | 4 => label.red().bold(),
        3 => label.red(),
        2 => label.yellow(),
        _ => label.normal(),
    }
}

fn percent(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.1}%", v))
        .unwrap_or_else(|| "-".to_string())
}

fn uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{}d {}h", days, hours)
    } else {
        format!("{}h {}m", hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_uptime_format() {
        assert_eq!(uptime(90_061), "1d 1h");
        assert_eq!(uptime(3_720), "1h 2m");
        assert_eq!(uptime(0), "0h 0m");
    }

    #[test]
    fn test_render_lists_hosts_and_problems() {
        let snapshot = MetricsSnapshot {
            hosts: vec![HostMetrics {
                hostid: "1".to_string(),
                name: "web-01".to_string(),
                status: HostStatus::Up,
                enabled: true,
                cpu_utilization: Some(12.5),
                memory_utilization: None,
                uptime_seconds: Some(90_061),
            }],
            problems: vec![Problem {
                eventid: "9".to_string(),
                name: "Disk almost full".to_string(),
                severity: 3,
                host: Some("db-01".to_string()),
                clock: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
                acknowledged: false,
            }],
            fetched_at: Utc::now(),
        };

        let text = render(&snapshot);
        assert!(text.contains("1 hosts, 1 up, 1 problems"));
        assert!(text.contains("web-01"));
        assert!(text.contains("12.5%"));
        assert!(text.contains("1d 1h"));
        assert!(text.contains("Disk almost full (db-01)"));
        assert!(text.contains("average"));
    }

    #[test]
    fn test_render_empty_snapshot() {
        let snapshot = MetricsSnapshot {
            hosts: vec![],
            problems: vec![],
            fetched_at: Utc::now(),
        };
        assert!(render(&snapshot).contains("No hosts reported"));
    }
}
