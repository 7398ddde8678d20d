use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use affiliate_relay::channels::ChatKind;
use affiliate_relay::links::ComposeContext;
use affiliate_relay::{Config, Daemon, LinkRewriter};

/// Affiliate Relay - rewrites Amazon links in Telegram chats with your affiliate tag
#[derive(Parser)]
#[command(name = "affiliate-relay", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite the links in a piece of text and print the result
    Rewrite {
        /// Message text
        text: String,
        /// Compose as a group replacement instead of a private reply
        #[arg(long)]
        group: bool,
        /// Author mention used for `{USER}`
        #[arg(long, default_value = "@you")]
        user: String,
        /// Print the rewritten links as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Optional .env in the working directory or a parent
    let dotenv = dotenvy::dotenv();

    // Set up logging based on verbosity, RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,affiliate_relay=info",
        1 => "info,affiliate_relay=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(Command::Rewrite {
        text,
        group,
        user,
        json,
    }) = cli.command
    {
        return rewrite(&text, group, &user, json).await;
    }

    let config = Config::from_env()?;
    tracing::info!(config = ?config, "starting affiliate relay");

    Daemon::new(config)?.run().await?;
    Ok(())
}

async fn rewrite(text: &str, group: bool, user: &str, json: bool) -> anyhow::Result<()> {
    let (links, template) = affiliate_relay::config::links_from_env()?;
    let rewriter = LinkRewriter::new(links)?;

    let ctx = ComposeContext {
        kind: if group { ChatKind::Group } else { ChatKind::Private },
        mention: user,
        template: &template,
    };

    let Some(rewrite) = rewriter.rewrite(text, ctx).await else {
        anyhow::bail!("no Amazon links found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&rewrite.links)?);
    } else {
        println!("{}", rewrite.text);
    }
    Ok(())
}
