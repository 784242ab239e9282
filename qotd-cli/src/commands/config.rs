//! `qotd config` commands - View and manage configuration

use anyhow::Result;
use qotd_core::Config;

/// Show current configuration
pub fn show(config: Config) -> Result<()> {
    println!("╭─────────────────────────────────────────╮");
    println!("│          qotd Configuration             │");
    println!("├─────────────────────────────────────────┤");
    println!("│ Gemini                                  │");
    println!("│   Model:        {:<23} │", truncate(&config.gemini.model, 23));
    println!(
        "│   API key:      {:<23} │",
        if config.gemini.api_key.is_some() { "set" } else { "missing" }
    );
    println!("│   Timeout:      {:<23} │", format!("{}s", config.gemini.timeout_secs));
    println!("├─────────────────────────────────────────┤");
    println!("│ Server                                  │");
    println!("│   Host:         {:<23} │", config.server.host);
    println!("│   Port:         {:<23} │", config.server.port);
    println!("│   URL:          {:<23} │", truncate(&config.server_url(), 23));
    println!("├─────────────────────────────────────────┤");
    println!("│ Quota                                   │");
    println!("│   Per minute:   {:<23} │", config.quota.per_minute);
    println!("│   Per day:      {:<23} │", config.quota.per_day);
    println!("│   Spacing:      {:<23} │", format!("{}ms", config.quota.min_interval_ms));
    println!("├─────────────────────────────────────────┤");
    println!("│ Retry                                   │");
    println!("│   Max retries:  {:<23} │", config.retry.max_retries);
    println!("│   Base delay:   {:<23} │", format!("{}ms", config.retry.base_delay_ms));
    println!("│   Max delay:    {:<23} │", format!("{}ms", config.retry.max_delay_ms));
    println!("├─────────────────────────────────────────┤");
    println!("│ Seeding                                 │");
    println!("│   Enabled:      {:<23} │", config.seeding.enabled);
    println!("│   On start:     {:<23} │", config.seeding.run_on_start);
    println!("│   Per category: {:<23} │", config.seeding.per_category);
    println!("│   Max attempts: {:<23} │", config.seeding.max_attempts_per_category);
    println!("├─────────────────────────────────────────┤");
    println!("│ Logging                                 │");
    println!("│   Level:        {:<23} │", config.logging.level);
    println!("╰─────────────────────────────────────────╯");

    let names: Vec<&str> = config.categories.iter().map(|c| c.name.as_str()).collect();
    println!("\n🏷️  Categories: {}", names.join(", "));

    println!("\n📁 Paths:");
    if let Some(path) = Config::default_config_path() {
        let exists = path.exists();
        println!(
            "   Config:   {} {}",
            path.display(),
            if exists { "✓" } else { "(not created)" }
        );
    }
    if let Some(path) = config.db_path() {
        let exists = path.exists();
        println!(
            "   Database: {} {}",
            path.display(),
            if exists { "✓" } else { "(not created)" }
        );
    }

    Ok(())
}

/// Initialize default configuration
pub fn init(force: bool) -> Result<()> {
    let path = Config::default_config_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

    if path.exists() && !force {
        println!(
            "⚠️  Configuration file already exists at: {}",
            path.display()
        );
        println!("   Use --force to overwrite.");
        return Ok(());
    }

    Config::ensure_dirs()?;

    let config = Config::default();
    config.save_to_file(&path)?;

    println!("✅ Created configuration file at: {}", path.display());
    println!("\n📝 Default configuration:");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{}…", head)
    }
}
