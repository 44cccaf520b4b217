use clap::Parser;
use kobo_notion::config::{Cli, Config, default_config_path};
use kobo_notion::cover::{CoverResolver, GoogleBooks, NoCovers};
use kobo_notion::kobo::{KoboReader, SourceReader, prepare_working_copy};
use kobo_notion::notion::NotionClient;
use kobo_notion::summary::Gemini;
use kobo_notion::sync::{SummaryOptions, SyncOptions, Syncer};
use kobo_notion::unpack_error;
use tracing_subscriber::EnvFilter;

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    init_logging(args.json_logs);

    let config_path = args
        .config_path
        .clone()
        .map(std::path::PathBuf::from)
        .unwrap_or_else(default_config_path);

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });

    let working_copy = prepare_working_copy(&cfg.kobo.sqlite_source, &cfg.kobo.working_copy)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("kobo database unreachable: {:#}", e);
            std::process::exit(1);
        });
    let reader = KoboReader::open(&working_copy).await.unwrap_or_else(|e| {
        tracing::error!("kobo database unreachable: {:#}", e);
        std::process::exit(1);
    });
    let books = reader.books_matching_filter().await.unwrap_or_else(|e| {
        tracing::error!("failed to read books: {:#}", e);
        std::process::exit(1);
    });

    let store = NotionClient::new(&cfg.notion).unwrap_or_else(|e| {
        tracing::error!(error = %unpack_error(&e), "failed to setup notion client");
        std::process::exit(1);
    });

    let covers: Box<dyn CoverResolver> = if cfg.covers.enabled {
        Box::new(GoogleBooks::new().unwrap_or_else(|e| {
            tracing::error!("failed to setup cover lookup: {:#}", e);
            std::process::exit(1);
        }))
    } else {
        Box::new(NoCovers)
    };

    let summarize = cfg.summary.enabled && !args.no_summary;
    let summarizer = if summarize {
        tracing::info!("using {} to summarize bookmarks", cfg.summary.model);
        Some(Gemini::new(&cfg.summary).unwrap_or_else(|e| {
            tracing::error!("failed to setup summarizer: {:#}", e);
            std::process::exit(1);
        }))
    } else {
        None
    };

    let options = SyncOptions {
        batch_size: cfg.notion.batch_size,
        category: cfg.notion.category.clone(),
        highlights_title: cfg.notion.highlights_title.clone(),
        summary: summarize.then(|| SummaryOptions {
            language: cfg.summary.language,
            replace_existing: cfg.summary.replace_existing,
        }),
        only_title: args.title.clone(),
    };

    let mut syncer = Syncer::new(&store, &reader, covers.as_ref(), options);
    if let Some(summarizer) = &summarizer {
        syncer = syncer.with_summarizer(summarizer);
    }

    let stats = syncer.sync(&books).await;

    tracing::info!(
        created = stats.created,
        updated = stats.updated,
        failed = stats.failed,
        blocks = stats.blocks_written,
        failed_batches = stats.failed_batches,
        summaries = stats.summaries,
        summary_failures = stats.summary_failures,
        "kobo-notion sync completed"
    );

    if let Some(only) = &args.title {
        if stats.synced() + stats.failed == 0 {
            tracing::warn!("no book titled '{}' found on the device", only);
        }
    }
}
