// steward/src/commands/notify.rs
//
// USE CASE: Post a message to the curation Slack channel.

use steward_core::infrastructure::adapters::{SlackConfig, SlackNotifier};
use steward_core::ports::Notifier;

pub async fn execute(message: &str, check_channel: bool) -> anyhow::Result<()> {
    let config = SlackConfig::from_env()?;
    let channel = config.channel().to_string();
    let notifier = SlackNotifier::new(config);

    if check_channel {
        if notifier.is_channel_available().await {
            println!("✅ Channel '{}' is available", channel);
            return Ok(());
        }
        anyhow::bail!("❌ Channel '{}' is not visible to the bot", channel);
    }

    let receipt = notifier.post_message(message).await?;
    println!("📣 Posted to {} at {}", receipt.channel, receipt.timestamp);
    Ok(())
}
