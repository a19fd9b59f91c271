//! README generated from the stats document.

use chrono::NaiveDate;

use crate::stats::StatsDocument;

pub const README_PATH: &str = "README.md";

pub fn render_readme(stats: &StatsDocument, updated: NaiveDate) -> String {
    format!(
        "# 📊 LeetCode Tracker

Automatically updated on every accepted submission.

## Stats

| Difficulty | Solved |
|----------|--------|
| Easy | {easy} |
| Medium | {medium} |
| Hard | {hard} |
| **Total** | **{total}** |

_Last updated: {updated}_",
        easy = stats.easy,
        medium = stats.medium,
        hard = stats.hard,
        total = stats.total,
        updated = updated.format("%Y-%m-%d"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_counts_and_date() {
        let stats = StatsDocument {
            easy: 4,
            medium: 2,
            hard: 1,
            total: 7,
        };
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let readme = render_readme(&stats, date);
        assert!(readme.starts_with("# 📊 LeetCode Tracker"));
        assert!(readme.contains("| Easy | 4 |"));
        assert!(readme.contains("| Medium | 2 |"));
        assert!(readme.contains("| Hard | 1 |"));
        assert!(readme.contains("| **Total** | **7** |"));
        assert!(readme.ends_with("_Last updated: 2024-03-09_"));
    }
}
