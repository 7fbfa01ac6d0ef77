//! Command handlers for the asset cache CLI
//!
//! This module implements the command handlers that turn CLI arguments and
//! the configuration file into a wired [`Bootstrapper`] and report its
//! results.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::app::{
    AssetLayout, AssetVersion, Bootstrapper, CatalogClient, DataDragonSource, FsHost,
    HttpHandler, SignalHandler, Stage,
};
use crate::cli::{
    ClearArgs, ConfigArgs, GlobalArgs, ProgressConfig, ProgressDisplay, StatusArgs, SyncArgs,
    VerifyArgs,
};
use crate::config::{AppConfig, RuntimeConfig};
use crate::errors::{AppError, HostError, Result};

/// Handle the sync command
///
/// Runs one full synchronization with live progress. Ctrl-C cancels the run;
/// everything downloaded so far stays recorded.
pub async fn handle_sync(global: &GlobalArgs, args: SyncArgs) -> Result<()> {
    args.validate().map_err(AppError::generic)?;

    let mut runtime = load_runtime_config(global).await?;
    if !args.categories.is_empty() {
        runtime.bootstrap.categories = args.categories.clone();
    }
    if let Some(version) = &args.version {
        runtime.client.pinned_version = Some(version.clone());
    }
    if let Some(max_concurrency) = args.max_concurrency {
        runtime.bootstrap.scheduler.max_concurrency = max_concurrency;
    }

    let bootstrapper = build_bootstrapper(global, runtime).await?;
    let signals = SignalHandler::new(bootstrapper.control().clone()).setup();

    let display = Arc::new(ProgressDisplay::new(
        ProgressConfig {
            enable_progress_bars: !args.no_progress && !global.quiet,
            ..Default::default()
        },
        &bootstrapper.config().ordered_categories(),
    ));
    let subscription = display.attach(&bootstrapper);

    let result = bootstrapper.start().await;
    bootstrapper.unsubscribe(subscription);
    signals.abort();
    let summary = result?;

    if !global.quiet {
        display.finish(&summary);
    }
    for error in summary.errors.iter().take(20) {
        warn!("{}", error);
    }

    if summary.stage == Stage::Error {
        return Err(AppError::generic(summary.summary()));
    }
    info!("{}", summary.summary());
    Ok(())
}

/// Handle the verify command
///
/// Read-only: reports missing and corrupted files without repairing them.
pub async fn handle_verify(global: &GlobalArgs, args: VerifyArgs) -> Result<()> {
    let mut runtime = load_runtime_config(global).await?;
    runtime.bootstrap.integrity.deep |= args.deep;
    if !args.categories.is_empty() {
        runtime.bootstrap.categories = args.categories.clone();
    }

    let bootstrapper = build_bootstrapper(global, runtime).await?;
    let (version, report) = bootstrapper.verify().await;

    println!("Cache verification for version {}", version);
    for (category, result) in &report.categories {
        println!(
            "   {:<9} {:>5} valid, {:>4} missing, {:>4} corrupted ({:.1}%)",
            category.as_str(),
            result.valid_assets,
            result.missing_assets.len(),
            result.corrupted_assets.len(),
            result.success_rate()
        );
        if args.detailed {
            for issue in &result.missing_assets {
                println!("      missing   {}", issue.target_key());
            }
            for issue in &result.corrupted_assets {
                let reason = issue
                    .reason
                    .as_ref()
                    .map(|r| r.to_string())
                    .unwrap_or_default();
                println!("      corrupted {} ({})", issue.target_key(), reason);
            }
        }
    }
    for (category, error) in &report.failed_categories {
        println!("   {:<9} error: {}", category.as_str(), error);
    }

    if report.is_valid() {
        println!("All {} files are valid", report.totals.total_assets);
        Ok(())
    } else {
        let problems = report.totals.missing_assets.len() + report.totals.corrupted_assets.len();
        Err(AppError::generic(format!(
            "Verification found {} problem files in {} items; run 'ddragon-cache sync' to repair",
            problems,
            report.totals.affected_items().len()
        )))
    }
}

/// Handle the status command
pub async fn handle_status(global: &GlobalArgs, args: StatusArgs) -> Result<()> {
    let runtime = load_runtime_config(global).await?;
    let bootstrapper = build_bootstrapper(global, runtime).await?;
    let version = bootstrapper.version().await;
    let statuses = bootstrapper.completeness().await;

    if args.json {
        let categories: Vec<serde_json::Value> = statuses
            .iter()
            .map(|(category, result)| match result {
                Ok(completeness) => serde_json::json!(completeness),
                Err(e) => serde_json::json!({ "category": category, "error": e.to_string() }),
            })
            .collect();
        let output = serde_json::json!({ "version": version, "categories": categories });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).map_err(|e| AppError::generic(e.to_string()))?
        );
        return Ok(());
    }

    println!("Cache status for version {}", version);
    for (category, result) in &statuses {
        match result {
            Ok(completeness) => println!(
                "   {:<9} {:>5}/{:<5} items {}",
                category.as_str(),
                completeness.completed(),
                completeness.total_expected,
                if completeness.is_complete() {
                    "complete"
                } else {
                    "incomplete"
                }
            ),
            Err(e) => println!("   {:<9} error: {}", category.as_str(), e),
        }
    }
    Ok(())
}

/// Handle the clear command
pub async fn handle_clear(global: &GlobalArgs, args: ClearArgs) -> Result<()> {
    let target = args
        .category
        .map_or("the whole cache".to_string(), |c| format!("the {} cache", c));

    if !args.yes && !confirm(&format!("Remove {}?", target))? {
        println!("Aborted");
        return Ok(());
    }

    let runtime = load_runtime_config(global).await?;
    let bootstrapper = build_bootstrapper(global, runtime).await?;
    let report = bootstrapper.clear_cache(args.category).await?;

    println!(
        "Removed {}: {} manifests, {} cached entries",
        target, report.manifests_removed, report.assets_removed
    );
    Ok(())
}

/// Handle the config command
pub async fn handle_config(global: &GlobalArgs, args: ConfigArgs) -> Result<()> {
    if args.init {
        let path = AppConfig::initialize(global.config.clone()).await?;
        println!("Configuration file: {}", path.display());
    }

    if args.show || !args.init {
        let config = AppConfig::load(global.config.clone()).await?;
        match global.config.clone().or_else(AppConfig::find_config_file) {
            Some(path) => println!("# Loaded from {}", path.display()),
            None => println!("# No configuration file found, showing defaults"),
        }
        let content = toml::to_string_pretty(&config)
            .map_err(|e| AppError::generic(format!("Failed to render configuration: {}", e)))?;
        println!("{}", content);
    }
    Ok(())
}

async fn load_runtime_config(global: &GlobalArgs) -> Result<RuntimeConfig> {
    let config = AppConfig::load(global.config.clone()).await?;
    Ok(config.to_runtime_config())
}

fn resolve_cache_root(global: &GlobalArgs, runtime: &RuntimeConfig) -> PathBuf {
    global
        .cache_dir
        .clone()
        .or_else(|| runtime.cache_root.clone())
        .or_else(FsHost::default_cache_dir)
        .unwrap_or_else(|| PathBuf::from("./cache"))
}

/// Wire the HTTP handler, catalog, filesystem host and bootstrapper
async fn build_bootstrapper(global: &GlobalArgs, runtime: RuntimeConfig) -> Result<Bootstrapper> {
    let client_config = runtime.client.clone();
    client_config.validate().map_err(AppError::generic)?;

    let http_client = client_config
        .build_http_client()
        .map_err(HostError::from)?;
    let http = Arc::new(
        HttpHandler::new(http_client, client_config.rate_limit_rps).map_err(HostError::from)?,
    );

    let source = DataDragonSource::new(http.clone(), client_config.clone());
    let catalog = Arc::new(
        CatalogClient::new(Arc::new(source))
            .with_pinned_version(client_config.pinned_version.as_deref().map(AssetVersion::new)),
    );

    let root = resolve_cache_root(global, &runtime);
    let host = Arc::new(FsHost::new(root, http).await?);

    let bootstrapper = Bootstrapper::new(
        runtime.bootstrap,
        catalog,
        host.clone(),
        host,
        AssetLayout::from_client_config(&client_config),
    )?;
    Ok(bootstrapper)
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Category;

    fn global(cache_dir: Option<PathBuf>) -> GlobalArgs {
        GlobalArgs {
            verbose: false,
            very_verbose: false,
            quiet: true,
            config: None,
            cache_dir,
        }
    }

    /// Test cache root precedence
    ///
    /// Verifies the command line beats the config file.
    #[test]
    fn test_resolve_cache_root() {
        let mut runtime = AppConfig::default().to_runtime_config();
        runtime.cache_root = Some(PathBuf::from("/from/config"));

        assert_eq!(
            resolve_cache_root(&global(Some(PathBuf::from("/from/cli"))), &runtime),
            PathBuf::from("/from/cli")
        );
        assert_eq!(
            resolve_cache_root(&global(None), &runtime),
            PathBuf::from("/from/config")
        );
    }

    #[tokio::test]
    async fn test_build_bootstrapper_creates_cache_root() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let root = temp_dir.path().join("cache");
        let mut runtime = AppConfig::default().to_runtime_config();
        runtime.bootstrap.categories = vec![Category::Overlay];

        let bootstrapper = build_bootstrapper(&global(Some(root.clone())), runtime)
            .await
            .unwrap();
        assert!(root.is_dir());
        assert_eq!(bootstrapper.config().ordered_categories(), vec![Category::Overlay]);
        assert!(!bootstrapper.is_running());
    }

    #[tokio::test]
    async fn test_clear_on_empty_cache() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let args = ClearArgs {
            category: Some(Category::Rune),
            yes: true,
        };
        assert!(handle_clear(&global(Some(temp_dir.path().to_path_buf())), args)
            .await
            .is_ok());
    }
}
