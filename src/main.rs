//! Recordstore CLI - declare tables and read/write records from the shell

use clap::{Parser, Subcommand, ValueEnum};
use recordstore::config::{self, RecordStoreConfig};
use recordstore::value::record_from_json;
use recordstore::{ui, Key, Record, RecordStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "recordstore")]
#[command(version)]
#[command(about = "Schema-on-write record store over SQLite")]
#[command(long_about = r#"
Recordstore keeps keyed records in SQLite tables declared in recordstore.toml.
Tables are re-declared from the config on every run.

Example usage:
  recordstore init
  recordstore insert --table users --id 1 --record '{"name": "Ada", "score": 10}'
  recordstore update --table users --id 1 --record '{"score": 15}'
  recordstore dump --table users
"#)]
struct Cli {
    /// Enable verbose logging (prints every statement)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter config
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Declare the configured tables and show their columns
    Tables,

    /// Insert one record
    Insert {
        #[arg(short, long)]
        table: String,

        /// Primary key as a JSON scalar (`1`, `1.5`, `"007"`); bare words are text
        #[arg(short, long)]
        id: String,

        /// JSON object holding every non-key column
        #[arg(short, long)]
        record: String,
    },

    /// Update some columns of one record
    Update {
        #[arg(short, long)]
        table: String,

        #[arg(short, long)]
        id: String,

        /// JSON object holding the columns to change
        #[arg(short, long)]
        record: String,
    },

    /// Insert many records from a JSON file `{id: record, ...}` in one transaction
    Load {
        #[arg(short, long)]
        table: String,

        #[arg(short, long)]
        file: PathBuf,
    },

    /// Update many records from a JSON file `{id: partial, ...}` in one transaction
    Patch {
        #[arg(short, long)]
        table: String,

        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show one record
    Get {
        #[arg(short, long)]
        table: String,

        #[arg(short, long)]
        id: String,
    },

    /// Print a whole table
    Dump {
        #[arg(short, long)]
        table: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: DumpFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DumpFormat {
    Table,
    Json,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Err(err) = run(cli) {
        ui::error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);

    if let Commands::Init { force } = cli.command {
        config::write_config(&config_path, &config::starter_config(), force)?;
        ui::success(&format!("Wrote {}", config_path.display()));
        return Ok(());
    }

    let Some(cfg) = config::load_config(Some(&config_path))? else {
        anyhow::bail!(
            "no config at {} (run `recordstore init` first)",
            config_path.display()
        );
    };
    let mut store = open_store(&cfg, cli.database.as_deref())?;

    match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),

        Commands::Tables => {
            ui::info("Database", &store.path().display().to_string());
            for name in store.registered_tables() {
                let schema = store.schema(name)?;
                ui::section(name);
                println!("{}", ui::schema_table(schema));
            }
        }

        Commands::Insert { table, id, record } => {
            let key = parse_key(&id);
            store.insert(&table, key.clone(), &parse_record(&record)?)?;
            ui::success(&format!("Inserted {} into {}", key, table));
        }

        Commands::Update { table, id, record } => {
            let key = parse_key(&id);
            store.update(&table, key.clone(), &parse_record(&record)?)?;
            ui::success(&format!("Updated {} in {}", key, table));
        }

        Commands::Load { table, file } => {
            let records = read_records(&file)?;
            store.batch_insert(&table, &records)?;
            ui::success(&format!("Loaded {} records into {}", records.len(), table));
        }

        Commands::Patch { table, file } => {
            let records = read_records(&file)?;
            store.batch_update(&table, &records)?;
            ui::success(&format!("Applied {} updates to {}", records.len(), table));
        }

        Commands::Get { table, id } => {
            let key = parse_key(&id);
            match store.get(&table, key.clone())? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => ui::warn(&format!("No record {} in {}", key, table)),
            }
        }

        Commands::Dump { table, format } => {
            let snapshot = store.to_dict(&table)?;
            match format {
                DumpFormat::Json => {
                    let object: serde_json::Map<String, serde_json::Value> = snapshot
                        .iter()
                        .map(|(key, record)| -> serde_json::Result<(String, serde_json::Value)> {
                            Ok((key.to_string(), serde_json::to_value(record)?))
                        })
                        .collect::<serde_json::Result<_>>()?;
                    println!("{}", serde_json::to_string_pretty(&object)?);
                }
                DumpFormat::Table => {
                    if snapshot.is_empty() {
                        ui::warn(&format!("{} is empty", table));
                    } else {
                        let key_label = store
                            .schema(&table)
                            .map(|schema| schema.key().name.clone())
                            .unwrap_or_else(|_| "key".to_string());
                        println!("{}", ui::snapshot_table(&key_label, &snapshot));
                    }
                }
            }
        }
    }

    Ok(())
}

/// Open the store and declare every configured table.
fn open_store(cfg: &RecordStoreConfig, database: Option<&Path>) -> anyhow::Result<RecordStore> {
    let db_path = database
        .map(Path::to_path_buf)
        .or_else(|| cfg.database.as_ref().map(PathBuf::from))
        .unwrap_or_else(config::default_database_path);
    config::ensure_db_dir(&db_path)?;

    let mut store = RecordStore::open(&db_path);
    for table in &cfg.tables {
        store.declare(table.to_schema()?)?;
    }
    tracing::debug!("Declared {} tables in {:?}", cfg.tables.len(), db_path);
    Ok(store)
}

fn parse_key(raw: &str) -> Key {
    match raw.parse::<Key>() {
        Ok(key) => key,
        Err(never) => match never {},
    }
}

fn parse_record(raw: &str) -> anyhow::Result<Record> {
    let json: serde_json::Value = serde_json::from_str(raw)?;
    Ok(record_from_json(&json)?)
}

fn read_records(path: &Path) -> anyhow::Result<BTreeMap<Key, Record>> {
    let contents = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let Some(object) = json.as_object() else {
        anyhow::bail!("{} must hold a JSON object of id -> record", path.display());
    };

    object
        .iter()
        .map(|(id, record)| -> anyhow::Result<(Key, Record)> {
            Ok((parse_key(id), record_from_json(record)?))
        })
        .collect()
}
