//! Authentication commands

use crate::api::Client;
use crate::config::SettingsManager;
use anyhow::Result;
use colored::Colorize;

pub async fn login(
    manager: &SettingsManager,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    println!("{}", "🔹 Login to AssetDesk".blue().bold());
    println!();

    let username = match username {
        Some(username) => username,
        None => dialoguer::Input::new()
            .with_prompt("Username")
            .interact_text()?,
    };
    let password = match password {
        Some(password) => password,
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()?,
    };

    println!("{}", "🔐 Authenticating...".dimmed());
    let settings = manager.load()?;
    let client = Client::new(&settings.server_url, None)?;
    let response = client.login(&username, &password).await?;

    manager.update(|s| {
        s.access_token = Some(response.access_token.clone());
        s.username = Some(response.user.username.clone());
    })?;

    println!();
    println!("{}", "✅ Login successful!".green().bold());
    println!("   Welcome, {}!", display_name(&response.user).cyan());
    if response.user.is_admin {
        println!("   {}", "Administrator".yellow());
    }
    println!(
        "   {}",
        format!("Session valid for {}", session_length(response.expires_in)).dimmed()
    );
    Ok(())
}

pub async fn logout(manager: &SettingsManager) -> Result<()> {
    manager.update(|s| {
        s.access_token = None;
        s.username = None;
    })?;
    println!("{}", "Logged out".green());
    Ok(())
}

pub async fn whoami(manager: &SettingsManager) -> Result<()> {
    let settings = manager.load()?;
    let user = Client::from_settings(&settings)?.me().await?;

    println!("{} {}", "User:".bold(), display_name(&user).cyan());
    println!("{} {}", "Username:".bold(), user.username);
    if let Some(email) = &user.email {
        println!("{} {}", "Email:".bold(), email);
    }
    if let Some(department) = &user.department {
        println!("{} {}", "Department:".bold(), department);
    }
    println!("{} {}", "Admin:".bold(), if user.is_admin { "yes" } else { "no" });
    Ok(())
}

fn session_length(seconds: i64) -> String {
    let minutes = seconds.max(0) / 60;
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

fn display_name(user: &assetdesk_types::User) -> String {
    match (&user.first_name, &user.last_name) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.clone(),
        _ => user.username.clone(),
    }
}
