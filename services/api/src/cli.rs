use crate::demo::{run_check, run_demo, run_summary, CheckArgs, DemoArgs, SummaryArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use hostel_core::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Hostel Operations Service",
    about = "Run and demonstrate the hostel request workflow from the command line",
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
    /// Print the morning operations summary staff read at the desk
    Summary(SummaryArgs),
    /// Run the overnight pass: expire finished leave, then scan for conflicts
    Check(CheckArgs),
    /// Run an end-to-end CLI demo covering the request workflows
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Summary(args) => run_summary(args),
        Command::Check(args) => run_check(args),
        Command::Demo(args) => run_demo(args),
    }
}
