//! envsecrets CLI - per-environment encrypted secret vaults.
//!
//! Every command that touches entries opens the vault first, which resolves
//! and verifies the passphrase, then mutates in memory and saves.

mod interchange;
mod prompt;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;
use zeroize::Zeroizing;

use envsecrets_common::EnvName;
use envsecrets_crypto::KdfParams;
use envsecrets_vault::{DestroyOutcome, StoreConfig, VaultStore};

use interchange::Format;
use prompt::TerminalPrompter;

#[derive(Parser)]
#[command(name = "envsecrets")]
#[command(about = "envsecrets - Encrypted per-environment secret vaults")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(long, global = true)]
    verbose: bool,

    /// Directory holding vault files [default: .envsecrets]
    #[arg(long, global = true)]
    vault_dir: Option<PathBuf>,

    /// Environment variable holding a passphrase override [default: ENVSECRET_PASSPHRASE]
    #[arg(long, global = true)]
    passphrase_env: Option<String>,

    /// KDF strength for new and rotated vaults: "interactive", "moderate", or "sensitive".
    #[arg(long, global = true)]
    kdf: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vault for an environment.
    Init {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,
    },

    /// Add or update an entry.
    Add {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,

        /// Entry key (prompted if omitted).
        #[arg(short, long)]
        key: Option<String>,

        /// Entry value (prompted if omitted).
        #[arg(short, long)]
        value: Option<String>,

        /// Hide value input when prompting.
        #[arg(short, long)]
        secret: bool,
    },

    /// Print the decrypted value of an entry.
    Get {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,

        /// Entry key.
        #[arg(short, long)]
        key: String,
    },

    /// Remove an entry.
    Delete {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,

        /// Entry key (prompted if omitted).
        #[arg(short, long)]
        key: Option<String>,
    },

    /// List entry keys with their timestamps.
    List {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,
    },

    /// Change the vault passphrase and re-encrypt every entry.
    Rotate {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,
    },

    /// Write decrypted entries to stdout.
    Export {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,

        /// Output format.
        #[arg(long, value_enum, default_value = "dotenv")]
        format: Format,
    },

    /// Import plaintext entries from a file or stdin.
    Import {
        /// Input file (stdin if omitted).
        file: Option<PathBuf>,

        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,

        /// Input format.
        #[arg(long, value_enum)]
        format: Format,

        /// Overwrite existing keys.
        #[arg(long)]
        overwrite: bool,
    },

    /// Permanently delete a vault.
    Destroy {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,
    },

    /// Remove the cached passphrase for an environment.
    Clear {
        /// Environment name.
        #[arg(short, long, value_parser = parse_env)]
        env: EnvName,
    },
}

fn parse_env(s: &str) -> std::result::Result<EnvName, String> {
    EnvName::new(s).map_err(|e| e.to_string())
}

/// Settings shared by every command, built once from the global flags.
struct CliConfig {
    store: StoreConfig,
}

impl CliConfig {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut store = StoreConfig::default();
        if let Some(dir) = &cli.vault_dir {
            store.root = dir.clone();
        }
        if let Some(var) = &cli.passphrase_env {
            store.passphrase_env = var.clone();
        }
        if let Some(preset) = &cli.kdf {
            store.kdf = KdfParams::from_preset(preset).context("Invalid --kdf value")?;
        }
        Ok(Self { store })
    }

    fn vault_store(&self) -> VaultStore {
        VaultStore::local(&self.store, Arc::new(TerminalPrompter))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so exported secrets on stdout stay clean
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = CliConfig::from_cli(&cli)?;
    debug!("Using vault directory {}", config.store.root.display());

    match cli.command {
        Commands::Init { env } => cmd_init(&config, &env),

        Commands::Add {
            env,
            key,
            value,
            secret,
        } => cmd_add(&config, &env, key, value, secret),

        Commands::Get { env, key } => cmd_get(&config, &env, &key),

        Commands::Delete { env, key } => cmd_delete(&config, &env, key),

        Commands::List { env } => cmd_list(&config, &env),

        Commands::Rotate { env } => cmd_rotate(&config, &env),

        Commands::Export { env, format } => cmd_export(&config, &env, format),

        Commands::Import {
            file,
            env,
            format,
            overwrite,
        } => cmd_import(&config, &env, file, format, overwrite),

        Commands::Destroy { env } => cmd_destroy(&config, &env),

        Commands::Clear { env } => cmd_clear(&config, &env),
    }
}

/// Create a new vault.
fn cmd_init(config: &CliConfig, env: &EnvName) -> Result<()> {
    let store = config.vault_store();
    let vault = store.create(env).context("Failed to create vault")?;

    println!("Vault created successfully for environment '{}'", env);
    println!("  Location: {}", vault.location());

    Ok(())
}

/// Add or update an entry.
fn cmd_add(
    config: &CliConfig,
    env: &EnvName,
    key: Option<String>,
    value: Option<String>,
    secret: bool,
) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => prompt::read_line("Enter key:")?,
    };
    if key.is_empty() {
        bail!("Key cannot be empty");
    }

    let value = Zeroizing::new(match value {
        Some(value) => value,
        None if secret => prompt::read_secret("Enter secret:")?,
        None => prompt::read_line("Enter value:")?,
    });
    if value.is_empty() {
        bail!("Value cannot be empty");
    }

    let store = config.vault_store();
    let mut vault = store.open(env).context("Failed to open vault")?;

    let ciphertext = vault
        .encrypt_value(value.as_bytes())
        .context("Failed to encrypt value")?;
    vault
        .set_entry(&key, ciphertext)
        .context("Failed to set entry")?;
    store.save(&vault).context("Failed to save vault")?;

    println!("Entry '{}' saved to {} vault", key, env);

    Ok(())
}

/// Print one decrypted value.
fn cmd_get(config: &CliConfig, env: &EnvName, key: &str) -> Result<()> {
    let store = config.vault_store();
    let vault = store.open(env).context("Failed to open vault")?;

    let plaintext = vault
        .decrypt_entry(key)
        .with_context(|| format!("Failed to read entry '{}'", key))?;
    println!("{}", plaintext.as_str()?);

    Ok(())
}

/// Remove an entry and save.
fn cmd_delete(config: &CliConfig, env: &EnvName, key: Option<String>) -> Result<()> {
    let key = match key {
        Some(key) => key,
        None => prompt::read_line("Enter key:")?,
    };
    if key.is_empty() {
        bail!("Key cannot be empty");
    }

    let store = config.vault_store();
    let mut vault = store.open(env).context("Failed to open vault")?;

    vault
        .delete_entry(&key)
        .with_context(|| format!("Failed to delete entry '{}'", key))?;
    store.save(&vault).context("Failed to save vault")?;

    println!("Entry '{}' deleted from {} vault", key, env);

    Ok(())
}

/// List keys and timestamps without decrypting anything.
fn cmd_list(config: &CliConfig, env: &EnvName) -> Result<()> {
    let store = config.vault_store();
    let vault = store.open(env).context("Failed to open vault")?;

    if vault.is_empty() {
        println!("Vault is empty.");
        return Ok(());
    }

    println!("Entries in {} vault:", env);
    for (key, entry) in vault.entries() {
        println!(
            "  {}  (created {}, updated {})",
            key,
            entry.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    Ok(())
}

/// Change the vault passphrase.
fn cmd_rotate(config: &CliConfig, env: &EnvName) -> Result<()> {
    let store = config.vault_store();
    let mut vault = store.open(env).context("Failed to open vault")?;

    let new_passphrase = store
        .resolver()
        .prompt_new(env)
        .context("Failed to read new passphrase")?;
    let report = store
        .rotate(&mut vault, new_passphrase)
        .context("Failed to rotate passphrase")?;

    println!("Passphrase rotated successfully for {} vault", env);
    println!("  {} entries re-encrypted", report.rotated);

    Ok(())
}

/// Print every entry decrypted.
fn cmd_export(config: &CliConfig, env: &EnvName, format: Format) -> Result<()> {
    let store = config.vault_store();
    let vault = store.open(env).context("Failed to open vault")?;

    let decrypted = vault.decrypt_all().context("Failed to decrypt entries")?;
    let mut entries = BTreeMap::new();
    for (key, plaintext) in &decrypted {
        let value = plaintext
            .as_str()
            .with_context(|| format!("Entry '{}' is not text", key))?;
        entries.insert(key.clone(), value.to_string());
    }

    let output = Zeroizing::new(interchange::render(format, &entries)?);
    print!("{}", output.as_str());

    Ok(())
}

/// Import plaintext entries.
fn cmd_import(
    config: &CliConfig,
    env: &EnvName,
    file: Option<PathBuf>,
    format: Format,
    overwrite: bool,
) -> Result<()> {
    let mut input = Zeroizing::new(String::new());
    match &file {
        Some(path) => {
            *input = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        None => {
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
        }
    }

    let entries = interchange::parse(format, &input).context("Failed to parse input")?;
    if entries.is_empty() {
        bail!("No entries found in input");
    }

    let store = config.vault_store();
    let mut vault = store.open(env).context("Failed to open vault")?;
    let cipher = vault.cipher().context("Failed to derive vault key")?;

    let mut imported = 0;
    let mut skipped = 0;
    for (key, value) in &entries {
        if vault.contains(key) && !overwrite {
            skipped += 1;
            continue;
        }
        let ciphertext = cipher
            .encrypt(value.as_bytes())
            .with_context(|| format!("Failed to encrypt entry '{}'", key))?;
        vault
            .set_entry(key, ciphertext)
            .with_context(|| format!("Failed to set entry '{}'", key))?;
        imported += 1;
    }

    if imported > 0 {
        store.save(&vault).context("Failed to save vault")?;
    }

    println!("Imported {} entries, skipped {}", imported, skipped);

    Ok(())
}

/// Permanently delete a vault.
fn cmd_destroy(config: &CliConfig, env: &EnvName) -> Result<()> {
    let store = config.vault_store();

    match store.destroy(env).context("Failed to destroy vault")? {
        DestroyOutcome::Destroyed => println!("Vault for {} destroyed", env),
        DestroyOutcome::Cancelled => println!("Aborted, vault for {} kept", env),
    }

    Ok(())
}

/// Remove the cached passphrase.
fn cmd_clear(config: &CliConfig, env: &EnvName) -> Result<()> {
    let store = config.vault_store();
    store
        .clear_cache(env)
        .context("Failed to clear cached passphrase")?;

    println!("Cleared cached passphrase for {} environment", env);

    Ok(())
}
