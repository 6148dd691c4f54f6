//! Click aggregation and chart rendering.
//!
//! This module reduces click records to per-device totals and derives
//! the figures shown in the "Total Clicks by Device" chart.

use crate::models::{ClickRecord, DeviceTotals};

/// Sum clicks per device. Devices are grouped by exact string match.
pub fn aggregate(records: &[ClickRecord]) -> DeviceTotals {
    let mut totals = DeviceTotals::new();

    for record in records {
        totals.add(&record.device, record.clicks);
    }

    totals
}

/// Total clicks across all devices.
pub fn total_clicks(totals: &DeviceTotals) -> u64 {
    totals
        .iter()
        .fold(0u64, |acc, (_, clicks)| acc.saturating_add(clicks))
}

/// Share of total clicks per device, in percent.
///
/// Returns an empty list when there are no clicks at all.
pub fn click_share(totals: &DeviceTotals) -> Vec<(String, f64)> {
    let total = total_clicks(totals);
    if total == 0 {
        return Vec::new();
    }

    totals
        .iter()
        .map(|(device, clicks)| {
            let share = (clicks as f64 / total as f64) * 100.0;
            (device.to_string(), share)
        })
        .collect()
}

/// Device with the most clicks. Ties go to the first device by name.
pub fn top_device(totals: &DeviceTotals) -> Option<(&str, u64)> {
    let mut best: Option<(&str, u64)> = None;

    for (device, clicks) in totals.iter() {
        if best.map_or(true, |(_, top)| clicks > top) {
            best = Some((device, clicks));
        }
    }

    best
}

/// Render a horizontal text bar chart, bars scaled to `width` characters.
pub fn render_bar_chart(totals: &DeviceTotals, width: usize) -> String {
    let mut lines = Vec::new();
    lines.push("Total Clicks by Device".to_string());

    if totals.is_empty() {
        lines.push("(no click data)".to_string());
        return lines.join("\n");
    }

    let label_width = totals
        .iter()
        .map(|(device, _)| device.chars().count())
        .max()
        .unwrap_or(0);
    let max = totals.iter().map(|(_, clicks)| clicks).max().unwrap_or(0);

    for (device, clicks) in totals.iter() {
        let bar_len = bar_length(clicks, max, width);
        lines.push(format!(
            "{:<label_width$} | {} {}",
            device,
            "█".repeat(bar_len),
            clicks,
            label_width = label_width
        ));
    }

    lines.join("\n")
}

fn bar_length(value: u64, max: u64, width: usize) -> usize {
    if max == 0 || value == 0 {
        return 0;
    }
    let scaled = ((value as f64 / max as f64) * width as f64).round() as usize;
    // Non-zero values always get at least one block
    scaled.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(rows: &[(&str, u64)]) -> Vec<ClickRecord> {
        rows.iter()
            .map(|(device, clicks)| ClickRecord::new(*device, *clicks))
            .collect()
    }

    #[test]
    fn test_aggregate_empty() {
        let totals = aggregate(&[]);
        assert!(totals.is_empty());
        assert_eq!(total_clicks(&totals), 0);
    }

    #[test]
    fn test_aggregate_groups_by_device() {
        let totals = aggregate(&records(&[("Mobile", 3), ("Mobile", 2), ("Desktop", 5)]));

        assert_eq!(totals.len(), 2);
        assert_eq!(totals.get("Mobile"), Some(5));
        assert_eq!(totals.get("Desktop"), Some(5));
    }

    #[test]
    fn test_aggregate_exact_match() {
        let totals = aggregate(&records(&[("Mobile", 1), ("mobile", 1), ("Mobile ", 1)]));
        assert_eq!(totals.len(), 3);
    }

    #[test]
    fn test_aggregate_order_independent() {
        let forward = aggregate(&records(&[("Tablet", 1), ("Desktop", 2), ("Mobile", 3)]));
        let backward = aggregate(&records(&[("Mobile", 3), ("Desktop", 2), ("Tablet", 1)]));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_click_share() {
        let totals = aggregate(&records(&[("Desktop", 25), ("Mobile", 75)]));
        let shares = click_share(&totals);

        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].0, "Desktop");
        assert!((shares[0].1 - 25.0).abs() < 1e-9);
        assert!((shares[1].1 - 75.0).abs() < 1e-9);

        let zero = aggregate(&records(&[("Desktop", 0)]));
        assert!(click_share(&zero).is_empty());
    }

    #[test]
    fn test_top_device() {
        let totals = aggregate(&records(&[("Desktop", 5), ("Mobile", 9), ("Tablet", 9)]));
        assert_eq!(top_device(&totals), Some(("Mobile", 9)));
        assert_eq!(top_device(&DeviceTotals::new()), None);
    }

    #[test]
    fn test_render_bar_chart() {
        let totals = aggregate(&records(&[("Desktop", 10), ("Mobile", 5), ("Tablet", 0)]));
        let chart = render_bar_chart(&totals, 20);
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines[0], "Total Clicks by Device");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].matches('█').count(), 20);
        assert_eq!(lines[2].matches('█').count(), 10);
        assert_eq!(lines[3].matches('█').count(), 0);
        assert!(lines[1].starts_with("Desktop | "));
        assert!(lines[2].starts_with("Mobile  | "));
        assert!(lines[3].ends_with(" 0"));
    }

    #[test]
    fn test_render_bar_chart_small_values_visible() {
        let totals = aggregate(&records(&[("Desktop", 1000), ("Mobile", 1)]));
        let chart = render_bar_chart(&totals, 10);
        let mobile = chart.lines().find(|l| l.starts_with("Mobile")).unwrap();
        assert_eq!(mobile.matches('█').count(), 1);
    }

    #[test]
    fn test_render_empty_chart() {
        let chart = render_bar_chart(&DeviceTotals::new(), 20);
        assert!(chart.contains("no click data"));
    }
}
