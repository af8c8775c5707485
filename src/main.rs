// Entrypoint for the `appstax` CLI.
// - Keeps `main` small: parse arguments, set up logging, build the
//   context and hand off to the matching `ui` flow.
// - Returns `anyhow::Result` so every flow can use `?` and `.context`.

use appstax_cli::logging::Logging;
use appstax_cli::select::DeployScope;
use appstax_cli::session::SessionStore;
use appstax_cli::ui::{self, Context, ServerOp};
use clap::{Parser, Subcommand, ValueEnum};

/// appstax - deploy and manage Appstax apps
#[derive(Debug, Parser)]
#[command(name = "appstax")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Echo log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in to your Appstax account
    Login,
    /// Create a new Appstax account
    Signup,
    /// Forget the stored session
    Logout,
    /// Show the current user and app
    Info,
    /// Configure an app for the current directory
    Init,
    /// Package and upload the public and server directories
    Deploy {
        #[arg(value_enum, default_value_t = Scope::All)]
        scope: Scope,
    },
    /// Manage the hosted server
    Server {
        #[command(subcommand)]
        op: ServerCommand,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Scope {
    Static,
    Server,
    All,
}

#[derive(Debug, Subcommand)]
enum ServerCommand {
    Create,
    Delete,
    Status,
    Start,
    Stop,
    /// Show the last lines of the server log
    #[command(alias = "logs")]
    Log { lines: Option<String> },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The log path is fixed here and passed down from now on.
    let logging = Logging::for_user(cli.verbose);
    logging.init()?;

    let project_dir = std::env::current_dir()?;
    let mut ctx = Context::new(project_dir, SessionStore::default_location(), logging)?;

    match cli.command {
        Command::Login => ui::login(&mut ctx).map(|_| ()),
        Command::Signup => ui::signup(&mut ctx).map(|_| ()),
        Command::Logout => ui::logout(&ctx),
        Command::Info => ui::info(&mut ctx),
        Command::Init => ui::init(&mut ctx),
        Command::Deploy { scope } => {
            let scope = match scope {
                Scope::Static => DeployScope::Static,
                Scope::Server => DeployScope::Server,
                Scope::All => DeployScope::All,
            };
            ui::deploy(&mut ctx, scope)
        }
        Command::Server { op } => {
            let op = match op {
                ServerCommand::Create => ServerOp::Create,
                ServerCommand::Delete => ServerOp::Delete,
                ServerCommand::Status => ServerOp::Status,
                ServerCommand::Start => ServerOp::Start,
                ServerCommand::Stop => ServerOp::Stop,
                ServerCommand::Log { lines } => ServerOp::Log(lines),
            };
            ui::server(&mut ctx, op)
        }
    }
}
