use crate::demo::{run_demo, DemoArgs};
use crate::infra::parse_uuid;
use crate::server;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use leasekeeper::config::AppConfig;
use leasekeeper::domain::{AccountId, Actor, LandlordId};
use leasekeeper::error::AppError;
use leasekeeper::session::SessionKeys;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "Leasekeeper",
    about = "Run the Leasekeeper occupancy, dispatch, and onboarding service",
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
    /// Walk through occupancy, dispatch, and onboarding against an in-memory store
    Demo(DemoArgs),
    /// Mint an operator session token for a landlord
    Session(SessionArgs),
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

#[derive(Args, Debug)]
pub(crate) struct SessionArgs {
    /// Landlord the token acts for
    #[arg(long, value_parser = parse_uuid)]
    pub(crate) landlord: Uuid,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Session(args) => print_session(args),
    }
}

fn print_session(args: SessionArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let keys = SessionKeys::new(config.tokens.signing_secret, config.tokens.session_ttl);
    let token = keys.issue(
        AccountId::new(),
        Actor::Landlord(LandlordId(args.landlord)),
        Utc::now(),
    )?;
    println!("{token}");
    Ok(())
}
