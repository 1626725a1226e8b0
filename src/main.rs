//! insights-export CLI
//!
//! Entry point for the `insights-export` command-line tool.

use clap::Parser;
use insights_export::{
    Credentials, Error, ExportParams, Exporter, Profile, RetryConfig, Transport,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "insights-export")]
#[command(about = "Export a digital assistant's insights data", version)]
struct Cli {
    /// Identifier of the bot/skill whose insights are exported
    #[arg(long)]
    id: String,

    /// Name for the export task (default: generated from the current time)
    #[arg(long)]
    taskname: Option<String>,

    /// Inclusive start of the export window (YYYY-MM-DD)
    #[arg(long)]
    begindate: Option<String>,

    /// Inclusive end of the export window (YYYY-MM-DD)
    #[arg(long)]
    enddate: Option<String>,

    /// Existing directory the export files are written to
    #[arg(long)]
    outpath: PathBuf,

    /// Path to the JSON credential config file
    #[arg(long)]
    configpath: PathBuf,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let default_filter = if debug {
        "insights_export=debug"
    } else {
        "insights_export=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), Error> {
    let profile = Profile::load(&cli.configpath)?;
    let credentials = Credentials::from_profile(&profile)?;
    let transport = Transport::new(&profile.base_url(), credentials)?;
    let exporter = Exporter::new(transport, RetryConfig::default());

    let params = ExportParams {
        bot_id: cli.id,
        task_name: cli.taskname,
        begin_date: cli.begindate,
        end_date: cli.enddate,
        output_dir: cli.outpath,
    };

    let outcome = exporter.run(&params).await?;
    println!("{}", outcome.summary());
    Ok(())
}
