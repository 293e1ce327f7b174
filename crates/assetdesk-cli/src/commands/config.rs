//! Configuration commands

use crate::config::SettingsManager;
use anyhow::Result;
use colored::Colorize;

pub async fn set_server(manager: &SettingsManager, url: &str) -> Result<()> {
    let url = url.trim().trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("Server URL must start with http:// or https://");
    }

    manager.update(|s| {
        if s.server_url != url {
            // Tokens are only valid for the server that issued them
            s.access_token = None;
        }
        s.server_url = url.to_string();
    })?;
    println!("{} {}", "Server set to".green(), url.cyan());
    Ok(())
}

pub async fn show(manager: &SettingsManager) -> Result<()> {
    let settings = manager.load()?;

    println!("{}", "AssetDesk configuration".blue().bold());
    println!("   Settings file: {}", manager.settings_path().display());
    println!("   Server:        {}", settings.server_url);
    println!(
        "   Logged in as:  {}",
        settings.username.as_deref().unwrap_or("-")
    );
    match &settings.monitoring {
        Some(m) => {
            println!("   Zabbix:        {} (API {}) as {}", m.url, m.api_version, m.username);
            println!(
                "   Auto refresh:  {}",
                if m.auto_refresh {
                    format!("every {}s", m.refresh_interval)
                } else {
                    "off".to_string()
                }
            );
        }
        None => println!("   Zabbix:        {}", "not configured".dimmed()),
    }
    Ok(())
}
