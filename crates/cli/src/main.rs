//! Segment enrichment CLI.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the segment's profiles into output/profiles.json
//! segment-enrich fetch --limit 500
//!
//! # Look up each profile's most recent order (resumable)
//! segment-enrich enrich
//!
//! # Write enriched.csv and purchases.png from the enriched log
//! segment-enrich export
//!
//! # All three stages in sequence
//! segment-enrich run --out-dir output
//! ```
//!
//! # Commands
//!
//! - `fetch` - Page through the segment and snapshot its profiles
//! - `enrich` - Append one enriched record per profile to the log
//! - `export` - Render the CSV export and purchase chart
//! - `run` - Fetch, enrich and export

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use segment_enrich::{EnrichConfig, PipelineError};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

#[derive(Parser)]
#[command(name = "segment-enrich")]
#[command(author, version, about = "Enrich a Klaviyo segment with Shopify purchases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch segment profiles into the snapshot
    Fetch {
        #[command(flatten)]
        fetch: FetchArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Enrich snapshot profiles with their most recent order
    Enrich {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Export the enriched log as CSV and a pie chart
    Export {
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Run fetch, enrich and export in sequence
    Run {
        #[command(flatten)]
        fetch: FetchArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Args)]
struct FetchArgs {
    /// Stop after this many unique profiles
    #[arg(long)]
    limit: Option<usize>,

    /// Attempts per segment page before the fetch stops
    #[arg(long, default_value_t = 3)]
    max_retries: u32,
}

#[derive(Args)]
struct OutputArgs {
    /// Directory for the snapshot, log, CSV and chart
    #[arg(long, default_value = "output")]
    out_dir: PathBuf,
}

fn init_sentry(config: &EnrichConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = EnrichConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "segment_enrich=info,segment_enrich_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(PipelineError::from(e)),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &EnrichConfig) -> Result<(), PipelineError> {
    match cli.command {
        Commands::Fetch { fetch, output } => {
            let report =
                commands::fetch::run(config, &output.out_dir, fetch.limit, fetch.max_retries)
                    .await?;
            if report.aborted {
                return Err(PipelineError::FetchAborted {
                    pages: report.pages,
                });
            }
        }
        Commands::Enrich { output } => {
            commands::enrich::run(config, &output.out_dir).await?;
        }
        Commands::Export { output } => {
            commands::export::run(config, &output.out_dir, None).await?;
        }
        Commands::Run { fetch, output } => {
            let report =
                commands::fetch::run(config, &output.out_dir, fetch.limit, fetch.max_retries)
                    .await?;
            if report.aborted {
                tracing::warn!(
                    profiles = report.profiles.len(),
                    "Segment fetch stopped early, continuing with fetched profiles"
                );
            }
            commands::enrich::enrich_profiles(config, &output.out_dir, &report.profiles).await?;
            commands::export::run(config, &output.out_dir, Some(report.profiles.len())).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::Path;

    use secrecy::SecretString;
    use segment_enrich::config::{KlaviyoConfig, ShopifyConfig};
    use segment_enrich::pipeline::{OutputLayout, load_snapshot, read_log};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const STALE_SNAPSHOT: &str = r#"[{"email":"stale@example.com","profileId":"OLD"}]"#;

    fn config(klaviyo: &MockServer, shopify: &MockServer) -> EnrichConfig {
        EnrichConfig {
            klaviyo: KlaviyoConfig {
                api_key: SecretString::from("pk_9f8e7d6c5b4a"),
                segment_id: "SEG1".to_string(),
                revision: "2024-10-15".to_string(),
                base_url: klaviyo.uri(),
            },
            shopify: ShopifyConfig {
                store: "test.myshopify.com".to_string(),
                api_version: "2024-10".to_string(),
                access_token: SecretString::from("shpat_0a1b2c3d4e5f"),
                base_url: Some(shopify.uri()),
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    fn cli(command: &str, out_dir: &Path) -> Cli {
        Cli::parse_from([
            "segment-enrich",
            command,
            "--max-retries",
            "1",
            "--out-dir",
            out_dir.to_str().unwrap(),
        ])
    }

    async fn mount_failing_klaviyo(server: &MockServer) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(server)
            .await;
    }

    async fn mount_no_shopify_calls(server: &MockServer) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_run_exports_after_first_page_fails() {
        let klaviyo = MockServer::start().await;
        let shopify = MockServer::start().await;
        mount_failing_klaviyo(&klaviyo).await;
        mount_no_shopify_calls(&shopify).await;
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        tokio::fs::write(layout.snapshot(), STALE_SNAPSHOT).await.unwrap();

        run(cli("run", dir.path()), &config(&klaviyo, &shopify))
            .await
            .unwrap();

        assert!(load_snapshot(&layout.snapshot()).await.unwrap().is_empty());
        assert!(read_log(&layout.log()).await.unwrap().is_empty());
        let csv = tokio::fs::read_to_string(layout.csv()).await.unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(layout.chart().exists());
    }

    #[tokio::test]
    async fn test_fetch_fails_when_first_page_fails() {
        let klaviyo = MockServer::start().await;
        let shopify = MockServer::start().await;
        mount_failing_klaviyo(&klaviyo).await;
        mount_no_shopify_calls(&shopify).await;
        let dir = tempfile::tempdir().unwrap();

        let result = run(cli("fetch", dir.path()), &config(&klaviyo, &shopify)).await;

        assert!(matches!(result, Err(PipelineError::FetchAborted { pages: 0 })));
    }

    #[tokio::test]
    async fn test_run_enriches_fetched_profiles_only() {
        let klaviyo = MockServer::start().await;
        let shopify = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/segments/SEG1/profiles/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"type": "profile", "id": "P1", "attributes": {"email": "ada@example.com"}}],
                "links": {"next": null}
            })))
            .mount(&klaviyo)
            .await;
        Mock::given(method("GET"))
            .and(path("/segments/SEG1/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"type": "segment", "id": "SEG1", "attributes": {"name": "VIP"}}
            })))
            .mount(&klaviyo)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/api/2024-10/customers/search.json"))
            .and(query_param("query", "email:ada@example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "customers": [{"id": 7, "email": "ada@example.com", "first_name": "Ada"}]
            })))
            .expect(1)
            .mount(&shopify)
            .await;
        Mock::given(method("GET"))
            .and(path("/admin/api/2024-10/orders.json"))
            .and(query_param("customer_id", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "orders": [{
                    "id": 70,
                    "created_at": "2024-05-02T09:30:00Z",
                    "line_items": [{"title": "Tee", "sku": "TEE-1"}]
                }]
            })))
            .expect(1)
            .mount(&shopify)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        tokio::fs::write(layout.snapshot(), STALE_SNAPSHOT).await.unwrap();

        run(cli("run", dir.path()), &config(&klaviyo, &shopify))
            .await
            .unwrap();

        let records = read_log(&layout.log()).await.unwrap();
        let emails: Vec<_> = records.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, ["ada@example.com"]);
        let csv = tokio::fs::read_to_string(layout.csv()).await.unwrap();
        assert!(csv.contains("ada@example.com,Ada,,VIP,Tee,TEE-1,2024-05-02T09:30:00Z"));
        assert!(!csv.contains("stale@example.com"));
    }
}
