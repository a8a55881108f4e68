//! Binary entrypoint for the petkeep CLI.
//!
//! Commands:
//! - `init` - create a starter `config.toml` and an empty data store with the
//!   seed catalog
//! - `seed` - insert the starter catalog into an existing store if empty
//! - `status` - print store counts, optionally as JSON
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use petkeep::config::Config;
use petkeep::storage::PetKeepStoreBuilder;

#[derive(Parser)]
#[command(name = "petkeep")]
#[command(about = "Virtual pet care and rewards engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter configuration and seeded data store
    Init,
    /// Seed the starter catalog into an empty store
    Seed,
    /// Show store status and record counts
    Status {
        /// Emit the status as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            let config = Config::create_default(&cli.config)?;
            let store = PetKeepStoreBuilder::new(&config.storage.data_dir).open()?;
            let items = store.list_items()?.len();
            println!(
                "Initialized {} with config {} and {} catalog items in {}",
                config.app.name, cli.config, items, config.storage.data_dir
            );
        }
        Commands::Seed => {
            let config = Config::load(&cli.config)?;
            let store = PetKeepStoreBuilder::new(&config.storage.data_dir)
                .without_catalog_seed()
                .open()?;
            let inserted = store.seed_catalog_if_empty()?;
            if inserted > 0 {
                info!("seeded {inserted} catalog items");
                println!("Seeded {inserted} catalog items");
            } else {
                println!("Catalog already seeded");
            }
        }
        Commands::Status { json } => {
            let config = Config::load(&cli.config)?;
            let store = PetKeepStoreBuilder::new(&config.storage.data_dir)
                .without_catalog_seed()
                .open()?;
            let user_ids = store.list_user_ids()?;
            let mut pets = 0usize;
            let mut purchases = 0usize;
            let mut check_ins = 0usize;
            for user_id in &user_ids {
                pets += store.count_pets_by_owner(user_id)?;
                purchases += store.list_purchases(user_id)?.len();
                check_ins += store.list_check_ins(user_id)?.len();
            }
            let items = store.list_items()?.len();

            if json {
                let summary = serde_json::json!({
                    "name": config.app.name,
                    "data_dir": config.storage.data_dir,
                    "users": user_ids.len(),
                    "pets": pets,
                    "catalog_items": items,
                    "check_ins": check_ins,
                    "purchases": purchases,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("=== {} ===", config.app.name);
                println!("data dir:      {}", config.storage.data_dir);
                println!("users:         {}", user_ids.len());
                println!("pets:          {pets}");
                println!("catalog items: {items}");
                println!("check-ins:     {check_ins}");
                println!("purchases:     {purchases}");
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level.
    let level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(level);
    if let Some(file) = config.as_ref().and_then(|c| c.logging.file.clone()) {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
        {
            builder.target(env_logger::Target::Pipe(Box::new(f)));
        }
    }
    let _ = builder.try_init();
}
