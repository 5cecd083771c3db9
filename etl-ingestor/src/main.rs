//! Ingestor service binary.
//!
//! Loads configuration, builds the GraphQL source client and the BigQuery
//! destination, and runs the extraction pipeline over the requested date range.

use std::error::Error;

use clap::Parser;
use etl::pipeline::Pipeline;
use etl::source::HttpSubgraphClient;
use etl::types::TimeRange;
use etl_config::load_config;
use etl_config::shared::IngestorConfig;
use etl_destinations::bigquery::BigQueryDestination;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "etl-ingestor", version, about, arg_required_else_help = true)]
struct AppArgs {
    /// Range start date (inclusive), `YYYY-MM-DD`, midnight UTC
    start_date: String,

    /// Range end date (exclusive), `YYYY-MM-DD`, midnight UTC
    end_date: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    if let Err(e) = main_impl().await {
        error!("{e}");
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "etl_ingestor=info,etl=info,etl_destinations=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn set_log_level() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
}

async fn main_impl() -> Result<(), Box<dyn Error>> {
    set_log_level();
    init_tracing();

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("failed to install default crypto provider");

    let args = AppArgs::parse();
    let range = TimeRange::from_dates(&args.start_date, &args.end_date)?;

    let config: IngestorConfig = load_config()?;
    config.validate()?;

    let client = HttpSubgraphClient::new(&config.source)?;

    let destination = match &config.bigquery.sa_key_file {
        Some(sa_key_file) => {
            BigQueryDestination::new_with_key_path(
                config.bigquery.project_id.clone(),
                config.bigquery.dataset_id.clone(),
                sa_key_file,
            )
            .await?
        }
        None => {
            BigQueryDestination::new_with_adc(
                config.bigquery.project_id.clone(),
                config.bigquery.dataset_id.clone(),
            )
            .await?
        }
    };

    let pipeline = Pipeline::new(config, client, destination);
    let report = pipeline.run(range).await?;

    for dataset in &report.datasets {
        info!(
            dataset = %dataset.dataset,
            windows = dataset.windows,
            requests = dataset.requests,
            saturated_windows = dataset.saturated_windows,
            table_created = dataset.table_created,
            rows_loaded = dataset.rows_loaded,
            "dataset complete"
        );
    }

    Ok(())
}
