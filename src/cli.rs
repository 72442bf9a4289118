use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use s3_bucket_manager::config::DEFAULT_CONFIG_FILE;
use s3_bucket_manager::registry::bucket_service_name;
use s3_bucket_manager::{
    BucketManager, LocalStore, OperationResult, ServiceRegistry, Settings,
};

#[derive(Parser)]
#[command(name = "s3bm")]
#[command(about = "Manage the objects of a configured S3 bucket")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Config file path")]
    config: Option<String>,

    #[arg(long, global = true, help = "Bucket entry from the config file (defaults to default_bucket)")]
    bucket: Option<String>,

    #[arg(long, global = true, help = "Serve the bucket from a local directory instead of S3")]
    local: Option<PathBuf>,

    #[arg(long, global = true, help = "Output as JSON")]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List object keys, optionally under a prefix
    List { prefix: Option<String> },
    /// Print an object, or write it to a file
    Get {
        name: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Upload a local file
    Put { name: String, file: PathBuf },
    /// Replace an object with a local file
    Update { name: String, file: PathBuf },
    /// Delete an object
    Delete { name: String },
    /// Show the configured buckets
    Buckets,
    /// Write a default config file
    GenerateConfig {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE, help = "Config file path")]
        output: String,
    },
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    let Cli {
        command,
        config,
        bucket,
        local,
        json,
    } = cli;

    match command {
        Commands::GenerateConfig { output } => {
            Settings::default().publish(&output)?;
            if json {
                println!("{}", serde_json::json!({ "generated": output }));
            } else {
                println!("✅ Wrote default configuration to {}", output);
            }
        }
        Commands::Buckets => {
            show_buckets(&load_settings(config.as_deref())?, json)?;
        }
        Commands::List { prefix } => {
            let manager = open_manager(config.as_deref(), bucket.as_deref(), local.as_deref())?;
            let keys = manager
                .try_list_files(prefix.as_deref())
                .await
                .map_err(anyhow::Error::new)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&keys)?);
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
        Commands::Get { name, output } => {
            let manager = open_manager(config.as_deref(), bucket.as_deref(), local.as_deref())?;
            let Some(body) = manager.try_get_file(&name).await.map_err(anyhow::Error::new)? else {
                bail!("{} not found in bucket {}", name, manager.bucket());
            };
            match output {
                Some(path) => {
                    tokio::fs::write(&path, &body)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    tracing::info!(path = %path.display(), bytes = body.len(), "saved object");
                }
                None => std::io::stdout().write_all(&body)?,
            }
        }
        Commands::Put { name, file } => {
            let manager = open_manager(config.as_deref(), bucket.as_deref(), local.as_deref())?;
            let body = read_input(&file).await?;
            return exit_code(report(manager.create_file(&name, body).await, json)?);
        }
        Commands::Update { name, file } => {
            let manager = open_manager(config.as_deref(), bucket.as_deref(), local.as_deref())?;
            let body = read_input(&file).await?;
            return exit_code(report(manager.update_file(&name, body).await, json)?);
        }
        Commands::Delete { name } => {
            let manager = open_manager(config.as_deref(), bucket.as_deref(), local.as_deref())?;
            return exit_code(report(manager.delete_file(&name).await, json)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn exit_code(succeeded: bool) -> Result<ExitCode> {
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_settings(config: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load_or_create(config)?;
    settings.apply_env(|name| std::env::var(name).ok());
    Ok(settings)
}

fn open_manager(
    config: Option<&str>,
    bucket: Option<&str>,
    local: Option<&Path>,
) -> Result<Arc<BucketManager>> {
    let settings = load_settings(config)?;
    let entry = bucket.unwrap_or(&settings.default_bucket);

    if let Some(root) = local {
        let bucket = settings.bucket(entry)?;
        let mut manager =
            BucketManager::with_store(bucket.name.clone(), Arc::new(LocalStore::new(root)));
        if let Some(visibility) = bucket.visibility {
            manager = manager.with_visibility(visibility);
        }
        return Ok(Arc::new(manager));
    }

    let registry = ServiceRegistry::from_settings(&settings)?;
    Ok(registry.require(&bucket_service_name(entry))?)
}

async fn read_input(file: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(file)
        .await
        .with_context(|| format!("reading {}", file.display()))
}

/// Prints the outcome once and reports whether the operation succeeded.
fn report(result: OperationResult, json: bool) -> Result<bool> {
    match result {
        Ok(confirmation) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&confirmation)?);
            } else {
                println!("✅ {}", confirmation);
            }
            Ok(true)
        }
        Err(err) => {
            if json {
                println!("{}", serde_json::json!({ "error": err }));
            } else {
                eprintln!("❌ {}", err);
            }
            Ok(false)
        }
    }
}

fn show_buckets(settings: &Settings, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&settings.buckets)?);
        return Ok(());
    }

    println!("Region: {}", settings.aws.region);
    if let Some(endpoint) = &settings.aws.endpoint {
        println!("Endpoint: {}", endpoint);
    }
    for (entry, bucket) in &settings.buckets {
        let marker = if *entry == settings.default_bucket { "*" } else { " " };
        let visibility = bucket.visibility.map(|v| v.as_str()).unwrap_or("bucket default");
        println!("{} {:<10} {} ({})", marker, entry, bucket.name, visibility);
    }
    Ok(())
}
