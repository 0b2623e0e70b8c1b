use crate::config::loader::upsert_env_vars;
use crate::config::schema::SetupConfig;
use crate::twitch::HelixApi;
use anyhow::{Context, Result, bail};
use inquire::{Confirm, InquireError, Text};
use std::path::Path;

pub const AUTH_CODE_KEY: &str = "AUTH_CODE";
pub const REFRESH_TOKEN_KEY: &str = "TWITCH_REFRESH_TOKEN";

/// Runs the one-time authorization setup
///
/// Shows the authorize URL, takes the code from `code` or a prompt,
/// exchanges it and writes the refresh token to the env file.
pub async fn run_auth_setup(
    api: &dyn HelixApi,
    setup: &SetupConfig,
    authorize_url: &str,
    code: Option<String>,
    env_path: &Path,
) -> Result<()> {
    println!("Open this URL in your browser and authorize the application:");
    println!();
    println!("  {}", authorize_url);
    println!();
    println!(
        "After approving you are redirected to {}/?code=...; copy the code value.",
        setup.redirect_uri.trim_end_matches('/')
    );
    println!();

    let code = match code {
        Some(code) => code,
        None => tokio::task::spawn_blocking(prompt_auth_code)
            .await
            .context("Prompt task failed")??,
    };

    let refresh_token = exchange_and_store(api, setup, &code, env_path).await?;

    println!();
    println!("Refresh token saved to {}", env_path.display());
    println!("  {}: {}", REFRESH_TOKEN_KEY, mask_secret(&refresh_token));
    println!();
    println!("Next step: run 'dropwatch run' to start mining.");
    Ok(())
}

/// Exchanges `code` and persists both the code and the resulting refresh token
///
/// Returns the new refresh token.
pub async fn exchange_and_store(
    api: &dyn HelixApi,
    setup: &SetupConfig,
    code: &str,
    env_path: &Path,
) -> Result<String> {
    let code = code.trim();
    if code.is_empty() {
        bail!("No authorization code entered");
    }

    upsert_env_vars(env_path, &[(AUTH_CODE_KEY, code)])
        .context("Failed to save authorization code")?;
    tracing::info!("Exchanging authorization code for a refresh token");

    let response = api
        .exchange_code(&setup.credentials, code, &setup.redirect_uri)
        .await
        .context("Failed to exchange authorization code")?;

    let refresh_token = match response.refresh_token {
        Some(token) if !token.is_empty() => token,
        _ => bail!("Token response did not contain a refresh token"),
    };

    upsert_env_vars(env_path, &[(REFRESH_TOKEN_KEY, refresh_token.as_str())])
        .context("Failed to save refresh token")?;
    tracing::debug!(path = %env_path.display(), "Refresh token stored");

    Ok(refresh_token)
}

fn prompt_auth_code() -> Result<String> {
    let code = Text::new("Authorization code:")
        .with_help_message("The value of the 'code' parameter in the redirect URL")
        .prompt()
        .context("Failed to read authorization code")?;
    Ok(code.trim().to_string())
}

/// Asks whether to mine a different category this run
///
/// Returns the entered name, or `None` to keep the configured game. A
/// non-interactive terminal keeps the configured game.
pub fn prompt_game_override() -> Result<Option<String>> {
    let change = match Confirm::new("Change game?")
        .with_default(false)
        .with_help_message("Answer 'y' to mine a different category for this run only")
        .prompt()
    {
        Ok(change) => change,
        Err(InquireError::NotTTY) => {
            tracing::debug!("No terminal attached, keeping configured game");
            return Ok(None);
        }
        Err(InquireError::OperationCanceled) => return Ok(None),
        Err(e) => return Err(e).context("Failed to read answer"),
    };

    if !change {
        return Ok(None);
    }

    let name = Text::new("Game name:")
        .prompt()
        .context("Failed to read game name")?;
    let name = name.trim();
    Ok((!name.is_empty()).then(|| name.to_string()))
}

/// Masks a secret for display, keeping a short prefix and suffix
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 10 {
        "***".to_string()
    } else {
        let start: String = chars[..6].iter().collect();
        let end: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", start, end)
    }
}
