mod commands;
mod output;
mod plane;

use clap::{Parser, Subcommand};
use cloudmux_config::Settings;
use cloudmux_driver::{KeyValue, ResourceKind};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cmux")]
#[command(about = "One control plane for many clouds", long_about = None)]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage cloud driver registrations
    #[command(subcommand)]
    Driver(DriverCommands),
    /// Manage credentials
    #[command(subcommand)]
    Credential(CredentialCommands),
    /// Manage region descriptors
    #[command(subcommand)]
    Region(RegionCommands),
    /// Manage connection configs
    #[command(subcommand)]
    Connection(ConnectionCommands),
    /// Compare mapped resources with what the provider reports
    Resources {
        /// Connection config name
        connection: String,
        /// Resource kind (vpc, sg, key, vm, nlb, disk, myimage, cluster)
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
    },
    /// List mapped resource names
    Names {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
    },
    /// Delete a mapped resource by name
    Delete {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
        /// Drop the mapping even if the provider delete fails
        #[arg(short, long)]
        force: bool,
    },
    /// Show the provider record of a resource by its provider id
    GetCsp {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        system_id: String,
    },
    /// Delete an unmapped provider resource by its provider id
    DeleteCsp {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        system_id: String,
    },
    /// Map an existing provider resource under a name
    Register {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
        system_id: String,
    },
    /// Drop a mapping without touching the provider resource
    Unregister {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
    },
    /// Manage tags on mapped resources
    #[command(subcommand)]
    Tag(TagCommands),
    /// Delete every mapped resource of a connection
    Destroy {
        connection: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show version
    Version,
}

#[derive(Subcommand)]
pub(crate) enum DriverCommands {
    /// Register a driver library
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        provider: String,
        /// Library file name (built-in name or file in the driver directory)
        #[arg(long)]
        lib: String,
    },
    List,
    Delete { name: String },
}

#[derive(Subcommand)]
pub(crate) enum CredentialCommands {
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        provider: String,
        /// Credential entry as KEY=VALUE; repeatable
        #[arg(short = 'k', long = "key-value", value_parser = parse_key_value)]
        key_values: Vec<KeyValue>,
    },
    List,
    Delete { name: String },
}

#[derive(Subcommand)]
pub(crate) enum RegionCommands {
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        provider: String,
        /// Region entry as KEY=VALUE (Region, Zone, ...); repeatable
        #[arg(short = 'k', long = "key-value", value_parser = parse_key_value)]
        key_values: Vec<KeyValue>,
        /// Zones available in the region
        #[arg(long = "zone", value_delimiter = ',')]
        zones: Vec<String>,
    },
    List,
    Delete { name: String },
}

#[derive(Subcommand)]
pub(crate) enum TagCommands {
    /// Set a tag, replacing one with the same key
    Add {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
        /// Tag as KEY=VALUE
        #[arg(value_parser = parse_key_value)]
        tag: KeyValue,
    },
    List {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
    },
    Get {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
        key: String,
    },
    Remove {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        name: String,
        key: String,
    },
    /// Find resources with a tag key or value equal to KEYWORD (`*` for all)
    Find {
        connection: String,
        #[arg(value_parser = parse_kind)]
        kind: ResourceKind,
        keyword: String,
    },
}

#[derive(Subcommand)]
pub(crate) enum ConnectionCommands {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        provider: String,
        #[arg(long)]
        driver: String,
        #[arg(long)]
        credential: String,
        #[arg(long)]
        region: String,
    },
    List,
    Get { name: String },
    Delete { name: String },
}

fn parse_kind(s: &str) -> Result<ResourceKind, String> {
    s.parse()
}

fn parse_key_value(s: &str) -> Result<KeyValue, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok(KeyValue::new(key, value.trim()))
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Version) {
        println!("cloudmux {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = Settings::load()?;
    init_tracing(&settings);
    let plane = plane::open(&settings).await?;
    let json = cli.json;

    match cli.command {
        Commands::Driver(cmd) => commands::driver::handle(&plane, cmd, json).await?,
        Commands::Credential(cmd) => commands::credential::handle(&plane, cmd, json).await?,
        Commands::Region(cmd) => commands::region::handle(&plane, cmd, json).await?,
        Commands::Connection(cmd) => commands::connection::handle(&plane, cmd, json).await?,
        Commands::Resources { connection, kind } => {
            commands::resource::handle_resources(&plane, &connection, kind, json).await?;
        }
        Commands::Names { connection, kind } => {
            commands::resource::handle_names(&plane, &connection, kind, json).await?;
        }
        Commands::Delete {
            connection,
            kind,
            name,
            force,
        } => {
            commands::resource::handle_delete(&plane, &connection, kind, &name, force, json).await?;
        }
        Commands::GetCsp {
            connection,
            kind,
            system_id,
        } => {
            commands::resource::handle_get_csp(&plane, &connection, kind, &system_id).await?;
        }
        Commands::Tag(cmd) => commands::tag::handle(&plane, cmd, json).await?,
        Commands::DeleteCsp {
            connection,
            kind,
            system_id,
        } => {
            commands::resource::handle_delete_csp(&plane, &connection, kind, &system_id, json)
                .await?;
        }
        Commands::Register {
            connection,
            kind,
            name,
            system_id,
        } => {
            commands::resource::handle_register(&plane, &connection, kind, &name, &system_id, json)
                .await?;
        }
        Commands::Unregister {
            connection,
            kind,
            name,
        } => {
            commands::resource::handle_unregister(&plane, &connection, kind, &name, json).await?;
        }
        Commands::Destroy { connection, yes } => {
            commands::destroy::handle(&plane, &connection, yes, json).await?;
        }
        Commands::Version => {
            unreachable!("Version is handled before settings are loaded");
        }
    }

    Ok(())
}
