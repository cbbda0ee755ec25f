//! Line-driven bot loop.
//!
//! Each input line is `<user> <command> [args]`. Two directives are handled
//! by the loop itself: `wait <secs>` pauses so timers can fire, and `quit`
//! stops reading. Blank lines and `#` comments are ignored.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{SystemClock, TokioScheduler};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use super::{Bot, Command, Matches};
use crate::config::Config;
use crate::error::CommandError;

/// Outcome of a single input line.
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Reply(String),
    Refused(String),
    Waited(Duration),
    /// Nothing to print: blank, comment, or a repeat inside a cooldown.
    Skipped,
    Quit,
}

pub async fn execute(
    script: Option<&Path>,
    session_ttl: Option<u64>,
    invite_ttl: Option<u64>,
    config: &Config,
) -> Result<()> {
    let mut manager_config = config.manager.clone();
    if let Some(secs) = session_ttl {
        manager_config = manager_config.with_session_ttl(Duration::from_secs(secs));
    }
    if let Some(secs) = invite_ttl {
        manager_config = manager_config.with_invite_ttl(Duration::from_secs(secs));
    }

    let scheduler = TokioScheduler::current().context("tandem run needs a Tokio runtime")?;
    let clock = Arc::new(SystemClock);
    let matches = Matches::new(manager_config, clock.clone(), Arc::new(scheduler))
        .context("Invalid manager configuration")?;
    let bot = Bot::new(matches, clock, config.bot.clone());

    bot.register_notifications(Arc::new(|message: String| {
        println!("{}", message.yellow());
    }));

    info!(
        "tandem ready in #{} (sessions {}s, invites {}s)",
        config.bot.channel,
        bot.matches().config().session_ttl_secs,
        bot.matches().config().invite_ttl_secs
    );

    let handled = match script {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?;
            drive(&bot, BufReader::new(file)).await?
        }
        None => drive(&bot, BufReader::new(tokio::io::stdin())).await?,
    };

    info!(
        "handled {} line(s); {} match(es), {} challenge(s) and {} cooldown(s) still open",
        handled,
        bot.matches().session_count(),
        bot.matches().invites().pending_count(),
        bot.cooldowns.active()
    );
    Ok(())
}

/// Feed every line of `reader` to the bot, printing replies.
async fn drive<R: AsyncBufRead + Unpin>(bot: &Bot, reader: R) -> Result<usize> {
    let mut lines = reader.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        match step(bot, &line).await {
            Step::Reply(text) => println!("{}", text.green()),
            Step::Refused(text) => println!("{} {}", "✗".red(), text),
            Step::Waited(delay) => debug!("waited {:?}", delay),
            Step::Skipped => continue,
            Step::Quit => break,
        }
        handled += 1;
    }

    Ok(handled)
}

async fn step(bot: &Bot, line: &str) -> Step {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Step::Skipped;
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["quit"] | ["exit"] => Step::Quit,
        ["wait", secs] if secs.parse::<u64>().is_ok() => {
            let delay = Duration::from_secs(secs.parse().unwrap_or_default());
            tokio::time::sleep(delay).await;
            Step::Waited(delay)
        }
        [user, name, args @ ..] => {
            match Command::parse(name, args).and_then(|command| bot.execute(user, command)) {
                Ok(reply) => Step::Reply(reply),
                Err(CommandError::CooldownSilenced) => Step::Skipped,
                Err(e) => Step::Refused(e.to_string()),
            }
        }
        _ => Step::Refused("Usage: <user> <command> [args]".to_string()),
    }
}
