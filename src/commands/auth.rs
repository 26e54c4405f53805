use anyhow::Result;
use calsync_core::config::SyncConfig;

pub async fn run(config: &SyncConfig) -> Result<()> {
    let remote = config.remote();
    let provider = remote.provider.name();

    println!("Authenticating with {}...", provider);

    // Provider handles the full OAuth flow and stores credentials/tokens
    let account = remote.authenticate().await?;
    tracing::info!(provider, account = %account, "Authenticated");

    println!("\nAuthenticated as: {}", account);

    if remote.account_identifier() != Some(account.as_str()) {
        println!("\nNow add the account to your config.toml:");
        println!();
        println!("[remote]");
        println!("{}_account = {}", provider, toml::Value::String(account.clone()));
        println!();
    }
    println!("Then run `calsync sync` to upload your schedule.");

    Ok(())
}
