mod cli;
mod logging;

use std::{
  io,
  path::PathBuf,
  process::ExitCode,
};

use clap::{
  ArgAction,
  Parser,
  Subcommand,
};
use eyre::{
  Result,
  WrapErr,
};
use the_lsp::{
  Connection,
  Exit,
  Server,
  ServerOptions,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "the-scribe")]
#[command(version)]
#[command(about = "Annotation and refactor assistant for JavaScript-like sources")]
struct Cli {
  /// Raise log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = ArgAction::Count, global = true)]
  verbose: u8,

  /// Write logs to FILE instead of stderr
  #[arg(long, value_name = "FILE", global = true)]
  log: Option<PathBuf>,

  /// Read FILE instead of the user config file
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
  /// Run the language server over stdio (default)
  Serve,
  /// Insert missing annotations into FILE
  Annotate {
    file:  PathBuf,
    /// Rewrite FILE in place instead of printing the result
    #[arg(long)]
    write: bool,
  },
  /// List the refactors offered for one line of FILE
  Actions {
    file: PathBuf,
    /// 1-based line number
    #[arg(short, long)]
    line: usize,
  },
}

fn main() -> Result<ExitCode> {
  let cli = Cli::parse();
  logging::init(cli.verbose, cli.log.as_deref())?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cli.config),
    Command::Annotate { file, write } => {
      let config = cli::config_for(&file, cli.config.as_deref())?;
      cli::annotate(&file, write, &config, &mut io::stdout().lock())?;
      Ok(ExitCode::SUCCESS)
    },
    Command::Actions { file, line } => {
      cli::actions(&file, line, &mut io::stdout().lock())?;
      Ok(ExitCode::SUCCESS)
    },
  }
}

fn serve(config_file: Option<PathBuf>) -> Result<ExitCode> {
  info!(version = env!("CARGO_PKG_VERSION"), "starting language server");
  let connection = Connection::stdio().wrap_err("failed to open stdio transport")?;
  let exit = Server::new(connection, ServerOptions { config_file })
    .run()
    .wrap_err("language server failed")?;

  Ok(match exit {
    Exit::Clean => ExitCode::SUCCESS,
    Exit::Unclean => ExitCode::from(1),
  })
}
