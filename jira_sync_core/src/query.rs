//! JQL construction for the trailing change window.

use chrono::{Days, NaiveDate};

/// Records created or updated on or after `since`, scoped to one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeWindow {
    pub project_key: String,
    pub since: NaiveDate,
}

impl ChangeWindow {
    /// Window covering `lookback_days` before `today` (day granularity).
    #[tracing::instrument(level = "debug")]
    pub fn trailing(project_key: &str, today: NaiveDate, lookback_days: u32) -> Self {
        let since = today
            .checked_sub_days(Days::new(u64::from(lookback_days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            project_key: project_key.to_string(),
            since,
        }
    }

    pub fn to_jql(&self) -> String {
        let date = self.since.format("%Y-%m-%d");
        format!(
            "project = '{}' AND (created >= '{date}' OR updated >= '{date}')",
            escape_jql_literal(&self.project_key)
        )
    }
}

fn escape_jql_literal(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yesterday_window_renders_date_predicates() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let window = ChangeWindow::trailing("CSI", today, 1);
        assert_eq!(window.since, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(
            window.to_jql(),
            "project = 'CSI' AND (created >= '2024-02-29' OR updated >= '2024-02-29')"
        );
    }

    #[test]
    fn zero_lookback_starts_today() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let window = ChangeWindow::trailing("CSI", today, 0);
        assert_eq!(window.since, today);
    }

    #[test]
    fn project_key_quotes_are_escaped() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let jql = ChangeWindow::trailing("O'Neil", today, 1).to_jql();
        assert!(jql.starts_with("project = 'O\\'Neil' AND"));
    }
}
