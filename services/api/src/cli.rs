use crate::demo::{run_demo, run_pipeline_report, DemoArgs, PipelineReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hiring_pipeline::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Hiring Pipeline",
    about = "Run and inspect the recruiting pipeline engine from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect pipeline metrics and stage views
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommand,
    },
    /// Walk through transitions, metrics, and bulk actions on a synthetic pipeline
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum PipelineCommand {
    /// Print pipeline metrics, the stage breakdown, and an optional stage view
    Report(PipelineReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Seed the pipeline from an ATS CSV export before accepting requests
    #[arg(long)]
    pub(crate) feed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Pipeline {
            command: PipelineCommand::Report(args),
        } => run_pipeline_report(args),
        Command::Demo(args) => run_demo(args),
    }
}
