use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use forgot_to_reply::auth::{self, ClientSecrets};
use forgot_to_reply::config::Settings;
use forgot_to_reply::providers::email::{GmailCredentials, GmailSource, ProviderError};
use forgot_to_reply::report;
use forgot_to_reply::services::ScanService;
use forgot_to_reply::storage::TokenStore;

#[derive(Parser)]
#[command(name = "forgot-to-reply", version)]
#[command(about = "Find Gmail threads that are still waiting on your reply")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to settings.json in the config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the inbox and report threads that probably need a reply
    Scan(ScanArgs),
    /// Run the Google consent flow and store the refresh token
    Authorize,
    /// Print the effective settings and where they are read from
    Config,
}

#[derive(Args, Default)]
struct ScanArgs {
    /// How many days back to look
    #[arg(long)]
    days_back: Option<u32>,

    /// Maximum number of threads to analyze
    #[arg(long)]
    max_results: Option<u32>,

    /// Minimum score to report
    #[arg(long)]
    min_score: Option<u8>,

    /// Entries shown in the console report
    #[arg(long)]
    top: Option<usize>,

    /// Where to write the JSON export
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the JSON export
    #[arg(long)]
    no_export: bool,

    /// Threads fetched concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Stop fetching after this many seconds and report what was analyzed
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl ScanArgs {
    fn apply(self, settings: &mut Settings) {
        if let Some(days_back) = self.days_back {
            settings.scan.days_back = days_back;
        }
        if let Some(max_results) = self.max_results {
            settings.scan.max_results = max_results;
        }
        if let Some(min_score) = self.min_score {
            settings.scan.min_score = min_score;
        }
        if let Some(concurrency) = self.concurrency {
            settings.scan.concurrency = concurrency;
        }
        if let Some(timeout) = self.timeout {
            settings.scan.timeout_secs = Some(timeout);
        }
        if let Some(top) = self.top {
            settings.report.display_count = top;
        }
        if let Some(output) = self.output {
            settings.report.output_path = output;
        }
        if self.no_export {
            settings.report.export = false;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        tracing::debug!("Command failed: {:?}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings_path = match cli.config {
        Some(path) => path,
        None => Settings::default_path()?,
    };
    let mut settings = Settings::load(&settings_path)?;

    match cli.command {
        Commands::Scan(args) => {
            args.apply(&mut settings);
            scan(&settings).await
        }
        Commands::Authorize => {
            let secrets = load_secrets(&settings)?;
            authorize(&secrets, &TokenStore::new()).await?;
            Ok(())
        }
        Commands::Config => {
            println!("# {}", settings_path.display());
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}

async fn scan(settings: &Settings) -> Result<()> {
    let secrets = load_secrets(settings)?;

    println!("Connecting to Gmail...");
    let source = connect(&secrets, &TokenStore::new()).await?;

    let service = ScanService::new(source);
    let outcome = service
        .find_forgotten_replies(&settings.scan.to_params())
        .await
        .context("scan failed")?;

    if outcome.timed_out {
        println!(
            "Time budget ran out after {} threads; showing partial results.",
            outcome.scanned
        );
    }
    if outcome.skipped_errors > 0 {
        println!(
            "Skipped {} threads that could not be read.",
            outcome.skipped_errors
        );
    }

    print!("{}", report::render_report(&outcome.analyses, &settings.report));

    if settings.report.export {
        let path = &settings.report.output_path;
        let count = report::export_json(&outcome.analyses, path)?;
        println!("\nExported {} results to {}", count, path.display());
    }

    Ok(())
}

fn load_secrets(settings: &Settings) -> Result<ClientSecrets> {
    let dir = settings.credentials_dir()?;
    let (secrets, path) = ClientSecrets::discover(&dir)?;
    println!("Using credentials from: {}", path.display());
    Ok(secrets)
}

/// Returns an authenticated Gmail source, running the consent flow when no
/// usable refresh token is stored.
async fn connect(secrets: &ClientSecrets, store: &TokenStore) -> Result<GmailSource> {
    let refresh_token = match store.refresh_token().await? {
        Some(token) => token,
        None => {
            println!("No stored authorization found.");
            authorize(secrets, store).await?
        }
    };

    let mut source = GmailSource::new(credentials(secrets, refresh_token));
    match source.authenticate().await {
        Ok(()) => Ok(source),
        Err(ProviderError::Authentication(reason)) => {
            tracing::warn!(%reason, "Stored authorization was rejected");
            store.clear_refresh_token().await?;

            let refresh_token = authorize(secrets, store).await?;
            let mut source = GmailSource::new(credentials(secrets, refresh_token));
            source
                .authenticate()
                .await
                .context("authenticating with Gmail")?;
            Ok(source)
        }
        Err(e) => Err(e).context("authenticating with Gmail"),
    }
}

async fn authorize(secrets: &ClientSecrets, store: &TokenStore) -> Result<String> {
    let http = reqwest::Client::new();
    let refresh_token = auth::authorize(secrets, &http, |url| {
        println!("\nOpen this URL in your browser to grant read-only Gmail access:\n\n{url}\n");
    })
    .await
    .context("Google authorization failed")?;

    store
        .save_refresh_token(&refresh_token)
        .await
        .context("saving the refresh token to the keychain")?;
    println!("Authorization saved.");
    Ok(refresh_token)
}

fn credentials(secrets: &ClientSecrets, refresh_token: String) -> GmailCredentials {
    GmailCredentials {
        refresh_token,
        client_id: secrets.client_id.clone(),
        client_secret: secrets.client_secret.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "forgot-to-reply",
            "-v",
            "scan",
            "--days-back",
            "14",
            "--min-score",
            "40",
            "--top",
            "5",
            "--no-export",
            "--timeout",
            "30",
        ])
        .unwrap();
        assert!(cli.verbose);

        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.scan.days_back, 14);
        assert_eq!(settings.scan.min_score, 40);
        assert_eq!(settings.scan.max_results, 150);
        assert_eq!(settings.scan.timeout_secs, Some(30));
        assert_eq!(settings.report.display_count, 5);
        assert!(!settings.report.export);
    }

    #[test]
    fn no_flags_keep_file_settings() {
        let mut settings = Settings::default();
        settings.scan.days_back = 7;
        ScanArgs::default().apply(&mut settings);
        assert_eq!(settings.scan.days_back, 7);
        assert!(settings.report.export);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["forgot-to-reply"]).is_err());
    }
}
