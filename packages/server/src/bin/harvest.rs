//! Collection and graph-building CLI
//!
//! Each subcommand is one stage of the offline pipeline: collect text
//! records, extract entities from them, load both into the graph database,
//! export the graph's documents for the knowledge base, and start a
//! knowledge-base sync.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use harvest::aws::{
    load_config, BedrockGenerator, BedrockIndexSync, S3ObjectStore, SdkConfig,
    TextractAsyncDetector, TextractSyncDetector,
};
use harvest::graph::corpus::extract_graphs;
use harvest::graph::{read_documents, read_graphs, write_graphs};
use harvest::{
    ChroniclingSource, CongressCredentials,
    CongressSource, EntityExtractor, ExtractionConfig, ExtractionCoordinator, FetchConfig,
    GraphExporter, GraphLoader, HttpFetcher, HttpGremlinConnector, IndexSync, ObjectStore, Pipeline,
    PipelineConfig,
};
use harvest::stores::FsObjectStore;
use server_core::{telemetry::init_tracing, Config};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Collect historical documents and build the knowledge graph")]
struct Cli {
    /// Data bucket (overrides BUCKET_NAME)
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Store records under this directory instead of S3
    #[arg(long, global = true)]
    local_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect bills and newspaper pages and store their text
    Collect(CollectArgs),

    /// Extract entities and relationships from stored records
    Entities {
        #[arg(long, default_value = "extracted/")]
        prefix: String,
    },

    /// Load stored records and entity graphs into the graph database
    LoadGraph {
        #[arg(long, default_value = "extracted/")]
        prefix: String,

        #[arg(long)]
        skip_documents: bool,

        #[arg(long)]
        skip_entities: bool,
    },

    /// Export graph documents as knowledge-base source files
    ExportIndex {
        /// Start a knowledge-base sync once the export is written
        #[arg(long)]
        sync: bool,
    },

    /// Start a knowledge-base ingestion job
    SyncIndex,
}

#[derive(Args)]
struct CollectArgs {
    #[arg(long)]
    start_congress: Option<u32>,

    #[arg(long)]
    end_congress: Option<u32>,

    /// Comma-separated bill types, e.g. hr,s
    #[arg(long, value_delimiter = ',')]
    bill_types: Vec<String>,

    #[arg(long)]
    start_year: Option<u32>,

    #[arg(long)]
    end_year: Option<u32>,

    #[arg(long)]
    max_pages: Option<usize>,

    #[arg(long)]
    skip_congress: bool,

    #[arg(long)]
    skip_newspapers: bool,

    /// Bucket for staged OCR input and output (defaults to the data bucket)
    #[arg(long)]
    temp_bucket: Option<String>,

    /// Do not start a knowledge-base sync after the run
    #[arg(long)]
    no_sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Failed to load configuration")?;
    if cli.bucket.is_some() {
        config.bucket_name = cli.bucket.clone();
    }
    let bucket = Config::require(&config.bucket_name, "BUCKET_NAME")?.to_string();
    let aws = load_config().await;

    let store: Arc<dyn ObjectStore> = match &cli.local_dir {
        Some(dir) => {
            tracing::info!(root = %dir.display(), "Using local record store");
            Arc::new(FsObjectStore::new(dir))
        }
        None => Arc::new(S3ObjectStore::new(&aws)),
    };

    match cli.command {
        Commands::Collect(args) => collect(args, config, &aws, store, bucket).await,
        Commands::Entities { prefix } => {
            let documents = read_documents(store.as_ref(), &bucket, &prefix).await?;
            let generator = BedrockGenerator::new(&aws, config.model_id.clone());
            let extractor = EntityExtractor::new(Arc::new(generator));
            let (graphs, failed) = extract_graphs(&extractor, &documents).await;
            let key = write_graphs(store.as_ref(), &bucket, &graphs).await?;
            tracing::info!(
                documents = documents.len(),
                graphs = graphs.len(),
                failed,
                key = %key,
                "Entity extraction complete"
            );
            Ok(())
        }
        Commands::LoadGraph {
            prefix,
            skip_documents,
            skip_entities,
        } => {
            let loader = GraphLoader::new(graph_connector(&config)?);

            if !skip_documents {
                let documents = read_documents(store.as_ref(), &bucket, &prefix).await?;
                let report = loader.load(&documents).await?;
                tracing::info!(?report, "Loaded documents");
            }
            if !skip_entities {
                let graphs = read_graphs(store.as_ref(), &bucket).await?;
                let report = loader.load_entities(&graphs).await?;
                tracing::info!(?report, "Loaded entity graphs");
            }
            Ok(())
        }
        Commands::ExportIndex { sync } => {
            let exporter = GraphExporter::new(graph_connector(&config)?);
            let report = exporter.export(store.as_ref(), &bucket).await?;
            tracing::info!(?report, "Exported graph documents");
            if sync {
                let job = index_sync(&config, &aws)?.start_sync().await?;
                tracing::info!(job_id = %job.job_id, status = %job.status, "Index sync started");
            }
            Ok(())
        }
        Commands::SyncIndex => {
            let job = index_sync(&config, &aws)?.start_sync().await?;
            tracing::info!(job_id = %job.job_id, status = %job.status, "Index sync started");
            Ok(())
        }
    }
}

async fn collect(
    args: CollectArgs,
    mut config: Config,
    aws: &SdkConfig,
    store: Arc<dyn ObjectStore>,
    bucket: String,
) -> Result<()> {
    if args.skip_congress && args.skip_newspapers {
        bail!("nothing to collect: both sources skipped");
    }

    let congress = &mut config.congress;
    congress.start = args.start_congress.unwrap_or(congress.start);
    congress.end = args.end_congress.unwrap_or(congress.end);
    if !args.bill_types.is_empty() {
        *congress = congress.clone().with_bill_types(&args.bill_types);
    }
    let newspapers = &mut config.newspapers;
    newspapers.start_year = args.start_year.unwrap_or(newspapers.start_year);
    newspapers.end_year = args.end_year.unwrap_or(newspapers.end_year);
    newspapers.max_pages = args.max_pages.unwrap_or(newspapers.max_pages);

    let client = CongressCredentials::new(config.congress_api_key.clone())
        .client()
        .context("Failed to build source API client")?;

    // Textract reads staged documents from S3, so staging never goes local
    let temp_bucket = args.temp_bucket.unwrap_or_else(|| bucket.clone());
    let cancel = CancellationToken::new();
    let coordinator = ExtractionCoordinator::new(
        Arc::new(HttpFetcher::new(FetchConfig::default())?),
        Arc::new(TextractSyncDetector::new(aws)),
        Arc::new(TextractAsyncDetector::new(aws)),
        Arc::new(S3ObjectStore::new(aws)),
        ExtractionConfig::new(temp_bucket),
    )
    .with_cancellation(cancel.clone());

    let mut pipeline = Pipeline::new(Arc::new(coordinator), store, PipelineConfig::new(bucket))
        .with_cancellation(cancel.clone());
    if !args.skip_congress {
        pipeline = pipeline.with_source(Arc::new(CongressSource::new(
            client.clone(),
            config.congress.clone(),
        )));
    }
    if !args.skip_newspapers {
        pipeline = pipeline.with_source(Arc::new(ChroniclingSource::new(client, config.newspapers)));
    }
    if !args.no_sync {
        match index_sync(&config, aws) {
            Ok(sync) => pipeline = pipeline.with_index_sync(sync),
            Err(e) => tracing::warn!(error = %e, "Index sync disabled"),
        }
    }

    // First interrupt stops the run gracefully; a second one exits at once
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing the current document and writing the summary");
            cancel.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted again, exiting");
            std::process::exit(130);
        }
    });

    let summary = pipeline.run().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn graph_connector(config: &Config) -> Result<Arc<HttpGremlinConnector>> {
    let endpoint = Config::require(&config.neptune_endpoint, "NEPTUNE_ENDPOINT")?;
    Ok(Arc::new(HttpGremlinConnector::new(endpoint, config.neptune_port)?))
}

fn index_sync(config: &Config, aws: &SdkConfig) -> Result<Arc<dyn IndexSync>> {
    let knowledge_base_id = Config::require(&config.knowledge_base_id, "KNOWLEDGE_BASE_ID")?;
    let data_source_id = Config::require(&config.data_source_id, "DATA_SOURCE_ID")?;
    Ok(Arc::new(BedrockIndexSync::new(
        aws,
        knowledge_base_id,
        data_source_id,
    )))
}
