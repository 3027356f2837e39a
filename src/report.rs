//! Plain-text rendering of a player's statistics and history.

use std::fmt::Write;

use crate::{PlayerStats, SessionRecord};

/// Formats a signed point count with thousands separators, e.g. `-25,000`.
pub fn format_points(points: i64) -> String {
    let digits = points.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if points < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Renders a player's report. The average is rounded to one decimal here and
/// nowhere else.
pub fn render_report(
    player_name: &str,
    stats: Option<&PlayerStats>,
    records: &[SessionRecord],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Statistics for {}", player_name);

    match stats {
        Some(stats) => {
            let _ = writeln!(out, "  Games:   {}", stats.total_games());
            let _ = writeln!(out, "  Total:   {}", format_points(*stats.total_balance()));
            let _ = writeln!(out, "  Average: {:.1}", stats.average_balance());
            let _ = writeln!(out, "  Best:    {}", format_points(*stats.best_balance()));
            let _ = writeln!(out, "  Worst:   {}", format_points(*stats.worst_balance()));
        }
        None => {
            let _ = writeln!(out, "  No games recorded");
        }
    }

    if !records.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<12} {:>10} {:>10} {:>7} {:>10}",
            "Date", "Initial", "Final", "Add-ons", "Balance"
        );
        for r in records {
            let balance = if *r.point_balance() >= 0 {
                format!("+{}", format_points(*r.point_balance()))
            } else {
                format_points(*r.point_balance())
            };
            let _ = writeln!(
                out,
                "{:<12} {:>10} {:>10} {:>7} {:>10}",
                r.date().to_string(),
                format_points(*r.initial_points()),
                format_points(*r.final_points()),
                r.add_ons(),
                balance
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::aggregate;

    #[test]
    fn test_format_points_groups_thousands() {
        assert_eq!(format_points(0), "0");
        assert_eq!(format_points(999), "999");
        assert_eq!(format_points(20_000), "20,000");
        assert_eq!(format_points(-25_000), "-25,000");
        assert_eq!(format_points(1_234_567), "1,234,567");
    }

    #[test]
    fn test_report_rounds_average_once() {
        let stats = aggregate("Alice", [1, 1, 2]).expect("non-empty");
        let report = render_report("Alice", Some(&stats), &[]);
        assert!(report.contains("Average: 1.3"));
        assert!(report.contains("Games:   3"));
    }

    #[test]
    fn test_report_without_games() {
        let report = render_report("Nobody", None, &[]);
        assert!(report.contains("No games recorded"));
    }
}
