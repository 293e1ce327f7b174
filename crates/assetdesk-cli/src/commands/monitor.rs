//! Server monitoring commands

use crate::api::Client;
use crate::config::SettingsManager;
use crate::monitor::{render, RetryExecutor};
use anyhow::{Context, Result};
use assetdesk_types::{ConnectionTestResult, MetricsSnapshot, MonitoringConfig, RetryPolicy};
use colored::Colorize;
use tracing::info;

/// Values given on the command line; anything missing is prompted for
#[derive(Debug, Default)]
pub struct ConfigureArgs {
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_version: Option<String>,
    pub auto_refresh: Option<bool>,
    pub interval: Option<u64>,
}

pub async fn configure(manager: &SettingsManager, args: ConfigureArgs) -> Result<()> {
    let settings = manager.load()?;
    let previous = settings.monitoring.clone();

    let url = match args.url {
        Some(url) => url,
        None => {
            let mut input = dialoguer::Input::<String>::new().with_prompt("Zabbix URL");
            if let Some(p) = &previous {
                input = input.default(p.url.clone());
            }
            input.interact_text()?
        }
    };
    let username = match args.username {
        Some(username) => username,
        None => {
            let mut input = dialoguer::Input::<String>::new().with_prompt("Zabbix username");
            if let Some(p) = &previous {
                input = input.default(p.username.clone());
            }
            input.interact_text()?
        }
    };
    let password = match args.password {
        Some(password) => password,
        None => dialoguer::Password::new()
            .with_prompt("Zabbix password")
            .interact()?,
    };

    let config = MonitoringConfig {
        url: url.trim().to_string(),
        username: username.trim().to_string(),
        password,
        api_version: args
            .api_version
            .or_else(|| previous.as_ref().map(|p| p.api_version.clone()))
            .unwrap_or_else(|| "6.0".to_string()),
        auto_refresh: args
            .auto_refresh
            .or_else(|| previous.as_ref().map(|p| p.auto_refresh))
            .unwrap_or(true),
        refresh_interval: args
            .interval
            .or_else(|| previous.as_ref().map(|p| p.refresh_interval))
            .unwrap_or(60),
    };

    println!("{}", "🔌 Testing connection...".dimmed());
    let client = Client::from_settings(&settings)?;
    let result = save_after_test(manager, &client, config).await?;

    println!("{}", "✅ Monitoring configured".green().bold());
    println!("   {}", result.message);
    Ok(())
}

/// Validates locally, runs the connection test, and only then persists
pub async fn save_after_test(
    manager: &SettingsManager,
    client: &Client,
    config: MonitoringConfig,
) -> Result<ConnectionTestResult> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid monitoring configuration: {}", e))?;

    let result = client.test_connection(&config).await?;
    if !result.success {
        anyhow::bail!("Connection test failed: {}", result.message);
    }

    info!("Saving monitoring configuration for {}", config.url);
    manager.update(|s| s.monitoring = Some(config))?;
    Ok(result)
}

pub async fn show(manager: &SettingsManager) -> Result<()> {
    let settings = manager.load()?;
    let config = configured(settings.monitoring)?;

    println!("{}", "Zabbix monitoring".blue().bold());
    println!("   URL:          {}", config.url);
    println!("   Username:     {}", config.username);
    println!("   Password:     {}", "********".dimmed());
    println!("   API version:  {}", config.api_version);
    println!(
        "   Auto refresh: {}",
        if config.auto_refresh { "on" } else { "off" }
    );
    println!("   Interval:     {}s", config.refresh_interval);
    Ok(())
}

/// One fetch, no polling
pub async fn refresh(manager: &SettingsManager) -> Result<()> {
    let settings = manager.load()?;
    let client = Client::from_settings(&settings)?;
    let config = configured(settings.monitoring)?;

    let snapshot = fetch(&client, &config, &RetryExecutor::default()).await?;
    print!("{}", render(&snapshot));
    Ok(())
}

/// Polls at the configured interval while auto-refresh is on, otherwise
/// fetches once
pub async fn watch(manager: &SettingsManager) -> Result<()> {
    let settings = manager.load()?;
    let client = Client::from_settings(&settings)?;
    let config = configured(settings.monitoring)?;
    let retry = RetryExecutor::default();

    loop {
        match fetch(&client, &config, &retry).await {
            Ok(snapshot) => {
                // Clear the screen between frames
                print!("\x1B[2J\x1B[H");
                print!("{}", render(&snapshot));
            }
            Err(e) => {
                let message = format!("{:#}", e);
                eprintln!("{} {}", "Refresh failed:".red().bold(), message);
                if RetryPolicy::is_auth_failure(&message) {
                    return Err(e);
                }
            }
        }

        if !config.auto_refresh {
            return Ok(());
        }

        println!();
        println!(
            "{}",
            format!(
                "Next refresh in {}s, Ctrl+C to stop",
                config.refresh_interval
            )
            .dimmed()
        );
        tokio::select! {
            _ = tokio::time::sleep(config.refresh_period()) => {}
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
        }
    }
}

async fn fetch(
    client: &Client,
    config: &MonitoringConfig,
    retry: &RetryExecutor,
) -> Result<MetricsSnapshot> {
    retry.execute(|| client.fetch_metrics(config)).await
}

fn configured(monitoring: Option<MonitoringConfig>) -> Result<MonitoringConfig> {
    monitoring.context("Monitoring is not configured. Run `assetdesk monitor configure` first")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::fake_server;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn zabbix(password: &str, interval: u64) -> MonitoringConfig {
        MonitoringConfig {
            url: "https://zabbix.example.com".to_string(),
            username: "Admin".to_string(),
            password: password.to_string(),
            api_version: "6.0".to_string(),
            auto_refresh: true,
            refresh_interval: interval,
        }
    }

    async fn setup() -> (tempfile::TempDir, SettingsManager, Client, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let addr = fake_server(calls.clone()).await;
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::at(dir.path());
        let client = Client::new(&format!("http://{}", addr), Some("tok".to_string())).unwrap();
        (dir, manager, client, calls)
    }

    #[tokio::test]
    async fn test_successful_test_persists_config() {
        let (_dir, manager, client, _) = setup().await;

        let result = save_after_test(&manager, &client, zabbix("zabbix", 60))
            .await
            .unwrap();
        assert_eq!(result.version.as_deref(), Some("6.0.21"));

        let saved = manager.load().unwrap().monitoring.unwrap();
        assert_eq!(saved, zabbix("zabbix", 60));
    }

    #[tokio::test]
    async fn test_failed_test_does_not_persist() {
        let (_dir, manager, client, _) = setup().await;

        let err = save_after_test(&manager, &client, zabbix("wrong", 60))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Authentication"));
        assert!(manager.load().unwrap().monitoring.is_none());
    }

    #[tokio::test]
    async fn test_interval_rejected_before_network() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SettingsManager::at(dir.path());
        // Nothing listens here; validation must fail first
        let client = Client::new("http://127.0.0.1:1", Some("tok".to_string())).unwrap();

        for interval in [10, 29, 601] {
            let err = save_after_test(&manager, &client, zabbix("zabbix", interval))
                .await
                .unwrap_err();
            assert!(err.to_string().contains("Invalid monitoring configuration"));
        }
        assert!(manager.load().unwrap().monitoring.is_none());
    }

    #[tokio::test]
    async fn test_fetch_retries_gateway_errors() {
        let (_dir, _manager, client, calls) = setup().await;
        let retry = RetryExecutor::new(RetryPolicy {
            base_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        });

        let snapshot = fetch(&client, &zabbix("zabbix", 60), &retry).await.unwrap();
        assert_eq!(snapshot.hosts.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unconfigured_monitoring_is_an_error() {
        let err = configured(None).unwrap_err();
        assert!(err.to_string().contains("monitor configure"));
    }
}
