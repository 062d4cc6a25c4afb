//! Operator CLI for the meeting-notes report pipeline.

use std::process::exit;

use tracing::error;

use pipeline_module::aggregator::{AggregateOutcome, BatchAggregator};
use pipeline_module::collector::MailCollector;
use pipeline_module::config::PipelineConfig;
use pipeline_module::launcher::BridgeLauncher;
use pipeline_module::mail::JsonFileMailSource;
use pipeline_module::row_store::RowStore;
use pipeline_module::{server, BoxError};

fn print_usage() {
    eprintln!(
        r#"Usage: meeting-report <command>

Commands:
  report       Ingest labeled mail threads, fold New notes into one report
               job, and open the chat page with the job in the URL fragment
  serve        Run the webhook receiver that stores scraped report rows
  clear        Delete all data rows from the raw and processed tables
  reset-mail   Move ingested mail threads back under the source label

Environment Variables:
  SECRET_KEY              Shared secret for the webhook (required)
  PIPELINE_HOST           Bind host for `serve` (default 0.0.0.0)
  PIPELINE_PORT           Bind port for `serve` (default 9207)
  PIPELINE_DB_PATH        SQLite database path (default meeting_report.db)
  MAIL_FILE_PATH          JSON mail-threads file (default mail_threads.json)
  SOURCE_LABEL            Label marking ingestable threads (default "zoom notes")
  DONE_LABEL              Label marking ingested threads (default "zoom notes processed")
  CHAT_PAGE_URL           Chat page base URL (default https://gemini.google.com/app)
  WEBHOOK_URL             Endpoint the browser agent posts scraped rows to
  INBOUND_BODY_MAX_BYTES  Maximum accepted webhook body size
"#
    );
}

fn main() {
    tracing_subscriber::fmt().init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        exit(2);
    };

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {err}");
            exit(1);
        }
    };

    let result = match command.as_str() {
        "report" => run_report(&config),
        "serve" => run_serve(&config),
        "clear" => run_clear(&config),
        "reset-mail" => run_reset(&config),
        _ => {
            print_usage();
            exit(2);
        }
    };

    if let Err(err) = result {
        error!("{err}");
        exit(1);
    }
}

fn run_report(config: &PipelineConfig) -> Result<(), BoxError> {
    let store = RowStore::new(&config.db_path)?;
    let mut mail = JsonFileMailSource::load(&config.mail_file)?;
    let collector = MailCollector::new(&store, &config.source_label, &config.done_label);

    let collected = collector.collect(&mut mail)?;
    println!("collected {collected} notes from {}", config.mail_file.display());

    match BatchAggregator::new(&store).aggregate()? {
        AggregateOutcome::EmptySource => {
            println!("raw table is empty; nothing to report");
        }
        AggregateOutcome::AlreadyProcessed => {
            println!("no notes with status New; nothing to report");
        }
        AggregateOutcome::Job {
            description,
            row_ids,
        } => {
            BridgeLauncher::new(&config.chat_page_url).launch(&description)?;
            println!("launched report job covering {} notes", row_ids.len());
        }
    }
    Ok(())
}

fn run_serve(config: &PipelineConfig) -> Result<(), BoxError> {
    let store = RowStore::new(&config.db_path)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server::run_server(config, store))
}

fn run_clear(config: &PipelineConfig) -> Result<(), BoxError> {
    let store = RowStore::new(&config.db_path)?;
    store.clear_raw()?;
    store.clear_processed()?;
    println!("cleared raw and processed tables");
    Ok(())
}

fn run_reset(config: &PipelineConfig) -> Result<(), BoxError> {
    let store = RowStore::new(&config.db_path)?;
    let mut mail = JsonFileMailSource::load(&config.mail_file)?;
    let collector = MailCollector::new(&store, &config.source_label, &config.done_label);
    let moved = collector.reset_labels(&mut mail)?;
    println!("moved {moved} threads back to label {:?}", config.source_label);
    Ok(())
}
