use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use keyfill_browser::DEFAULT_DEBUGGING_PORT;
use keyfill_cli::OutputFormat;
use keyfill_cli::commands;
use keyfill_cli::config::StoreConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keyfill")]
#[command(author, version, long_about = None)]
#[command(
    about = "Save login credentials locally and fill them into web page forms",
    long_about = "keyfill keeps email/password pairs in a local store and fills them into \
                  the login form of a tab in a running Chrome, reached over the DevTools Protocol."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    /// Credential store file [default: ~/.keyfill/credentials.json]
    #[arg(long, global = true, env = "KEYFILL_STORE", value_name = "PATH")]
    store: Option<PathBuf>,

    /// Encrypt the store with this passphrase
    #[arg(long, global = true, env = "KEYFILL_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// Accept and re-encrypt a store saved before a passphrase was set
    #[arg(long, global = true)]
    migrate_plaintext: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved credentials
    List,

    /// Save a new credential
    Add {
        /// Email address
        #[arg(long)]
        email: String,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Delete a saved credential
    Remove {
        /// Credential id, as shown by `list`
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// List the tabs of the connected Chrome
    Tabs {
        /// Chrome remote debugging port
        #[arg(long, env = "KEYFILL_CDP_PORT", default_value_t = DEFAULT_DEBUGGING_PORT)]
        port: u16,
    },

    /// Fill a saved credential into the login form of a tab
    Fill {
        /// Credential id, as shown by `list`
        #[arg(value_name = "ID")]
        id: String,

        /// Target tab id, as shown by `tabs` [default: the active tab]
        #[arg(long)]
        tab: Option<String>,

        /// Chrome remote debugging port
        #[arg(long, env = "KEYFILL_CDP_PORT", default_value_t = DEFAULT_DEBUGGING_PORT)]
        port: u16,
    },

    /// Generate shell completion scripts
    #[command(after_help = "SUPPORTED SHELLS:\n  \
        bash, zsh, fish, powershell, elvish\n\n\
        INSTALLATION:\n  \
        bash:  keyfill completion --shell bash >> ~/.bashrc\n  \
        zsh:   keyfill completion --shell zsh > \"${fpath[1]}/_keyfill\"\n  \
        fish:  keyfill completion --shell fish > ~/.config/fish/completions/keyfill.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);
    tracing::debug!("Output format: {}", cli.format.as_str());

    let config = || {
        StoreConfig::resolve(cli.store.clone(), cli.passphrase.clone())
            .map(|config| config.with_plaintext_migration(cli.migrate_plaintext))
    };

    // Execute the command
    match cli.command {
        Commands::List => commands::list::execute(&config()?, cli.format),
        Commands::Add { email, password } => {
            commands::add::execute(&config()?, &email, password, cli.format)
        }
        Commands::Remove { id, force } => commands::remove::execute(&config()?, &id, force),
        Commands::Tabs { port } => commands::tabs::execute(port, cli.format),
        Commands::Fill { id, tab, port } => {
            commands::fill::execute(&config()?, &id, tab, port, cli.format)
        }
        Commands::Completion { shell } => {
            commands::completion::execute(shell, &mut Cli::command(), &mut std::io::stdout())
        }
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "keyfill=debug,keyfill_cli=debug,keyfill_core=debug,keyfill_autofill=debug,keyfill_browser=debug",
        )
    } else {
        EnvFilter::new("keyfill=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
