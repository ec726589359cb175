use crate::demo::{print_steps, run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use enrollment_wizard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Enrollment Wizard",
    about = "Run the childcare enrollment wizard service or walk through it from the command line",
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
    /// Print the wizard step registry
    Steps,
    /// Fill in and submit a sample enrollment end to end
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
        Command::Steps => print_steps(),
        Command::Demo(args) => run_demo(args).await,
    }
}
