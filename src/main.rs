mod cli;

use vista::core::config::Config;
use vista::{catalog, query, Catalog, QueryResult};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands, FilterArgs};
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vista=debug,vista_pipeline=debug,vista_core=debug".to_string()
        } else {
            "vista=warn,vista_pipeline=warn,vista_core=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Filter(args) => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_filter(&args, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vista {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_filter(args: &FilterArgs, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path);
    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    let path = catalog::resolve_path(args.catalog.as_deref(), &config)?;
    if !path.exists() {
        anyhow::bail!("Catalog file does not exist: {:?}", path);
    }
    let catalog = Catalog::load(&path)?;

    let result = query::run(&catalog, &args.to_query(), config.pipeline).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_rows(&result);
    }
    Ok(())
}

fn print_rows(result: &QueryResult) {
    let mut current: Option<&str> = None;
    for row in &result.rows {
        if result.categorized && current != Some(row.category.as_str()) {
            println!("\n[{}]", row.category);
            current = Some(row.category.as_str());
        }
        let rating = row
            .rating
            .map(|r| "*".repeat(usize::from(r)))
            .unwrap_or_else(|| "-".to_string());
        println!("{:>6}  {:<5}  {}  {}", row.id.get(), rating, row.name, row.path);
    }

    println!(
        "\n{} of {} records shown (filter version {})",
        result.rows.len(),
        result.total,
        result.version
    );
    if !result.has_match {
        println!("No records match the current filter.");
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)?;
            let config = Config::from_json(&contents)?;
            println!("✓ Configuration is valid");
            config
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("  Chunk size: {}", config.pipeline.chunk_size);
    println!("  Prepare chunk size: {}", config.pipeline.prepare_chunk_size);
    println!("  Event capacity: {}", config.pipeline.event_capacity);
    match &config.catalog.path {
        Some(catalog) => println!("  Catalog: {}", catalog.display()),
        None => println!("  Catalog: (not set)"),
    }

    let warnings = config.validate();
    for warning in &warnings {
        println!("  warning: {warning}");
    }
    Ok(())
}
