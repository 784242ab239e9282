//! `qotd quota` commands - View generation quota usage
//!
//! Counters live in the server process, so this asks the running server.

use anyhow::{Context, Result};
use qotd_core::{Config, QuotaStatus};

/// Show quota status
pub async fn status(config: Config, json_output: bool) -> Result<()> {
    let url = format!("{}/quota", config.server_url());
    let quota_status: QuotaStatus = reqwest::get(&url)
        .await
        .with_context(|| format!("qotd server is not reachable at {}", config.server_url()))?
        .error_for_status()?
        .json()
        .await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&quota_status)?);
        return Ok(());
    }

    println!("╭─────────────────────────────────────────╮");
    println!("│           qotd Quota Status             │");
    println!("├─────────────────────────────────────────┤");
    println!(
        "│  Requests today:    {:>6} / {:<6}     │",
        quota_status.requests_today, quota_status.requests_per_day_limit
    );
    println!(
        "│  Requests/minute:   {:>6} / {:<6}     │",
        quota_status.requests_last_minute, quota_status.requests_per_minute_limit
    );
    if let Some(error) = &quota_status.last_error {
        println!("├─────────────────────────────────────────┤");
        println!("│  Last error: {:<26} │", truncate(error, 26));
    }
    println!("╰─────────────────────────────────────────╯");

    let day_pct = percentage(quota_status.requests_today, quota_status.requests_per_day_limit);
    let min_pct = percentage(
        quota_status.requests_last_minute,
        quota_status.requests_per_minute_limit,
    );

    println!("\nDaily:  {}", progress_bar(day_pct, 30));
    println!("Minute: {}", progress_bar(min_pct, 30));

    Ok(())
}

fn percentage(used: u32, limit: u32) -> f64 {
    if limit == 0 {
        return 100.0;
    }
    (used as f64 / limit as f64 * 100.0).min(100.0)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{}…", head)
    }
}

fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = ((percentage / 100.0) * width as f64) as usize;
    let empty = width.saturating_sub(filled);

    let marker = if percentage >= 90.0 {
        "🔴"
    } else if percentage >= 70.0 {
        "🟡"
    } else {
        "🟢"
    };

    format!(
        "[{}{}] {:>5.1}% {}",
        "█".repeat(filled),
        "░".repeat(empty),
        percentage,
        marker
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(50, 200), 25.0);
        assert_eq!(percentage(300, 200), 100.0);
        assert_eq!(percentage(0, 0), 100.0);
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("überlastet und so weiter", 6), "überl…");
    }

    #[test]
    fn test_progress_bar_width() {
        let bar = progress_bar(50.0, 10);
        assert!(bar.starts_with("[█████░░░░░]"));
    }
}
