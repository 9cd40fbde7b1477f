use std::path::PathBuf;

use clap::{Parser, Subcommand};
use waxtaan_cli::cli::{init_tracing, output, CliConfig, Session};
use waxtaan_core::CoreConfig;

#[derive(Parser)]
#[command(name = "waxtaan")]
#[command(about = "Command-line client for the waxtaan messaging service")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Path to JSON config file (apiUrl, dataDir, pollIntervalSecs)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Base URL of the API (overrides config and WAXTAAN_API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Where the token is stored (overrides config and WAXTAAN_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the token
    Login { username: String, password: String },

    /// Create an account
    Register {
        username: String,
        password: String,
        /// Password again
        confirm: String,
        /// Avatar image to upload
        #[arg(long)]
        avatar: Option<PathBuf>,
    },

    /// Forget the stored token
    Logout,

    /// Show the logged-in user
    Me,

    /// Update the logged-in user's profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        status: Option<String>,
        /// New password (left unchanged when omitted)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
    },

    /// List conversations with unread counts, most recent first
    Conversations,

    /// Print the messages of a conversation (user:<id> or group:<id>)
    Show { key: String },

    /// Send a message to a conversation
    Send {
        key: String,
        #[arg(default_value = "")]
        text: String,
        /// File to attach
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List your contacts
    Contacts,

    /// Add a contact by username and open a conversation with them
    AddContact { username: String },

    /// Create a group
    CreateGroup {
        name: String,
        /// Member user ids
        #[arg(required = true)]
        members: Vec<String>,
    },

    /// Poll continuously, printing conversations after every pass (Ctrl-C to stop)
    Watch,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let session = Session::new(load_config(&cli)?)?;

    let value = match cli.command {
        Commands::Login { username, password } => session.login(&username, &password).await?,
        Commands::Register {
            username,
            password,
            confirm,
            avatar,
        } => {
            session
                .register(&username, &password, &confirm, avatar.as_deref())
                .await?
        }
        Commands::Logout => session.logout()?,
        Commands::Me => session.me().await?,
        Commands::Profile {
            name,
            status,
            password,
            avatar,
        } => {
            session
                .update_profile(name, status, password, avatar.as_deref())
                .await?
        }
        Commands::Conversations => session.conversations().await?,
        Commands::Show { key } => session.show(&key).await?,
        Commands::Send { key, text, file } => session.send(&key, &text, file.as_deref()).await?,
        Commands::Contacts => session.contacts().await?,
        Commands::AddContact { username } => session.add_contact(&username).await?,
        Commands::CreateGroup { name, members } => session.create_group(&name, members).await?,
        Commands::Watch => return session.watch(cli.pretty).await,
    };

    output::print_json(&value, cli.pretty)
}

/// Environment, then config file, then flags
fn load_config(cli: &Cli) -> anyhow::Result<CoreConfig> {
    let mut config = CoreConfig::from_env();
    if let Some(path) = &cli.config {
        config = CliConfig::load(path)?.apply(config);
    }
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}
