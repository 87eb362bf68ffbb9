mod article;
mod composer;
mod config;
mod dates;
mod directory;
mod dispatch;
mod error;
mod evaluator;
mod logging;
mod order;
mod pipeline;
mod reader;
mod runner;
mod server;
mod status;
mod table;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use config::{Config, DispatchMode, UnknownSupplierPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chaselist")]
#[command(version, about = "Prepare supplier reminder mails from the weekly chase workbook")]
pub struct Args {
    /// Config file (TOML); defaults apply when omitted
    #[arg(short, long, env = "CHASELIST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Print detailed progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prepare one reminder mail per supplier
    Run(RunArgs),

    /// Serve the upload page
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8501")]
        addr: SocketAddr,
    },
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Chase workbook (default: newest Chase* file in the base folder)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Address every mail to the test address
    #[arg(long)]
    pub test_mode: bool,

    /// Where mails go
    #[arg(short, long, value_enum)]
    pub mode: Option<DispatchMode>,

    /// What to do with suppliers missing from the supplier directory
    #[arg(long, value_enum)]
    pub unknown_supplier: Option<UnknownSupplierPolicy>,

    /// Reference date for overdue marking (YYYY-MM-DD)
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if self.test_mode {
            config.test_mode = true;
        }
        if let Some(mode) = self.mode {
            config.dispatch.mode = mode;
        }
        if let Some(policy) = self.unknown_supplier {
            config.unknown_supplier = policy;
        }
        if self.today.is_some() {
            config.today = self.today;
        }
    }
}

fn main() {
    let args = Args::parse();
    logging::init(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(args: Args) -> error::Result<()> {
    let Args { config: config_path, command, .. } = args;

    let mut config = match &config_path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match command {
        Command::Run(run_args) => {
            run_args.apply(&mut config);
            if config.test_mode {
                tracing::info!(to = %config.test_address, "test mode: all mails go to the test address");
            }

            let mut dispatcher = dispatch::from_config(&config)?;
            runner::ChaseRun::new(&config)?.run(run_args.input.as_deref(), dispatcher.as_mut())?;
            Ok(())
        }
        Command::Serve { addr } => {
            let state = server::ServerState {
                base_folder: config.base_folder.clone(),
                chase_prefix: config.chase_prefix.clone(),
                config_path,
                executable: std::env::current_exe()?,
            };

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(addr, state))
        }
    }
}
