//! Prospector - streaming company search and campaign creation client
//!
//! CLI entry point.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use prospector::api::{CampaignApi, HttpApiClient};
use prospector::cli::{Cli, Command, OutputFormat};
use prospector::config::Config;
use prospector::session::{SearchOptions, SearchSession, SessionEvent};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate()?;

    info!(base_url = %config.api.base_url, "prospector starting");

    match cli.command {
        Command::Search {
            query,
            limit,
            product,
            no_suggestions,
            format,
        } => cmd_search(&config, &query, limit, product, no_suggestions, format).await,
        Command::Partners { format } => cmd_partners(&config, format).await,
        Command::Products { format } => cmd_products(&config, format).await,
    }
}

/// Run one streaming search, printing progress as it arrives
async fn cmd_search(
    config: &Config,
    query: &str,
    limit: Option<u32>,
    product: Option<i64>,
    no_suggestions: bool,
    format: OutputFormat,
) -> Result<()> {
    let session = Arc::new(SearchSession::new(config.search_settings()));
    let mut events = session.subscribe();

    let options = SearchOptions {
        limit,
        product_id: product,
        include_partner_suggestions: if no_suggestions { Some(false) } else { None },
        ..Default::default()
    };
    session.search(query, options).await?;

    loop {
        match events.recv().await {
            Ok(event) => {
                print_event(&event);
                if event.is_terminal() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                eprintln!("{}", format!("(skipped {skipped} events)").yellow());
            }
            Err(RecvError::Closed) => break,
        }
    }

    let state = session.snapshot().await;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&state)?),
        OutputFormat::Text => print_summary(&state),
    }

    if state.error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::PhaseChanged { to, .. } => {
            println!("{}", format!("-> {}", to.label()).cyan());
        }
        SessionEvent::InterpretationReceived(interp) => {
            println!("   {} {}", "intent:".dimmed(), interp.intent);
        }
        SessionEvent::CompanyAdded(company) => {
            println!(
                "   {} {} ({}) {:.2}",
                "+".green(),
                company.name.bold(),
                company.domain,
                company.match_score
            );
        }
        SessionEvent::PartnerAdded(partner) => {
            println!("   {} {} [partner] {:.2}", "+".magenta(), partner.name.bold(), partner.match_score);
        }
        SessionEvent::SuggestionAdded(suggestion) => {
            println!("   {} {} (suggested)", "*".magenta(), suggestion.name);
        }
        SessionEvent::InsightsReceived(insights) => {
            println!("   {} {}", "insight:".dimmed(), insights.observation);
        }
        SessionEvent::Completed {
            total_results,
            partner_results,
        } => {
            println!(
                "{}",
                format!("✓ complete: {total_results} results, {partner_results} partners").green()
            );
        }
        SessionEvent::Failed { message } => {
            println!("{}", format!("✗ {message}").red());
        }
        SessionEvent::FrameQuarantined { reason } => {
            eprintln!("{}", format!("! dropped frame: {reason}").yellow());
        }
    }
}

fn print_summary(state: &prospector::session::SessionState) {
    println!();
    println!("Companies: {}", state.companies.len());
    println!("Partners: {}", state.partners.len());
    println!("Suggestions: {}", state.partner_suggestions.len());
    if state.search_time_ms > 0 {
        println!("Search time: {}ms", state.search_time_ms);
    }
    if !state.suggested_queries.is_empty() {
        println!("Try next:");
        for query in &state.suggested_queries {
            println!("  - {query}");
        }
    }
}

async fn cmd_partners(config: &Config, format: OutputFormat) -> Result<()> {
    let api = api_client(config)?;
    let partners = api.list_partners().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&partners)?),
        OutputFormat::Text => {
            if partners.is_empty() {
                println!("No partners found.");
                return Ok(());
            }
            for partner in &partners {
                println!("{} ({})", partner.name.bold(), partner.slug);
                if let Some(description) = &partner.description {
                    println!("  {description}");
                }
            }
        }
    }
    Ok(())
}

async fn cmd_products(config: &Config, format: OutputFormat) -> Result<()> {
    let api = api_client(config)?;
    let products = api.list_products().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&products)?),
        OutputFormat::Text => {
            if products.is_empty() {
                println!("No products found.");
                return Ok(());
            }
            for product in &products {
                println!("{} (id: {})", product.name.bold(), product.id);
                if let Some(description) = &product.description {
                    println!("  {description}");
                }
            }
        }
    }
    Ok(())
}

fn api_client(config: &Config) -> Result<HttpApiClient> {
    HttpApiClient::new(&config.api.base_url, Duration::from_millis(config.api.timeout_ms))
        .context("Failed to create API client")
}
