//! # Finding Correlations - CLI Entry Point
//!
//! Command-line front end over the correlation store.
//!
//! Commands:
//! - `graph`       - Print the graph for a level as JSON
//! - `drill`       - Print the drill-down and go-back sequence for a finding
//! - `rules`       - Validate rules from a JSON file and list them
//! - `stats`       - Print summary statistics for the AllFindings graph
//! - `init-config` - Generate a default configuration file

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use finding_correlations::api::{self, ApiResponse, FiltersRequest, FindingRequest, GraphRequest, RulesQuery};
use finding_correlations::filters::FilterItem;
use finding_correlations::fixtures;
use finding_correlations::graph::CorrelationLevel;
use finding_correlations::index::FindingCorrelationIndex;
use finding_correlations::rules::CorrelationRule;
use finding_correlations::source::JsonFileSource;
use finding_correlations::store::CorrelationStore;
use finding_correlations::{CorrelationError, CorrelationResult, CorrelationsConfig};

/// Finding Correlations - explore correlated security findings.
///
/// Loads findings and their correlations from a JSON document, or from the
/// seeded fixture generator when no document is given, and prints the
/// renderer-ready graph for each drill-down level.
#[derive(Parser, Debug)]
#[command(name = "finding-correlations")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "finding-correlations.toml")]
    config: PathBuf,

    /// JSON document with `findings` and `correlations`. Fixtures are used when absent.
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Only load findings at or after this RFC 3339 instant.
    #[arg(long)]
    start: Option<DateTime<Utc>>,

    /// Only load findings at or before this instant. Defaults to now.
    #[arg(long)]
    end: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the graph for the AllFindings level, or for one finding.
    Graph {
        /// Show the Finding level for this id instead.
        #[arg(long)]
        finding: Option<String>,

        /// Comma-separated log types to keep at the AllFindings level.
        #[arg(long, value_delimiter = ',')]
        log_types: Option<Vec<String>>,
    },

    /// Drill into a finding, then go back.
    Drill {
        #[arg(long)]
        finding: String,
    },

    /// Validate correlation rules from a JSON array and list them.
    Rules {
        #[arg(long)]
        file: PathBuf,

        /// Only list rules touching these log types.
        #[arg(long, value_delimiter = ',')]
        log_types: Option<Vec<String>>,
    },

    /// Print node, edge and degree statistics.
    Stats,

    /// Generate a default configuration file.
    InitConfig,
}

#[tokio::main]
async fn main() -> CorrelationResult<()> {
    env_logger::init();
    let cli = Cli::parse();

    if let Commands::InitConfig = cli.command {
        return cmd_init_config(&cli.config);
    }

    let mut config = load_config(&cli.config)?;
    if cli.start.is_some() || cli.end.is_some() {
        config.window.start = cli.start.or(config.window.start);
        config.window.end = cli.end.or(config.window.end);
        config.validate()?;
    }
    let mut store = build_store(&config, cli.data.as_deref()).await?;

    match cli.command {
        Commands::Graph { finding, log_types } => cmd_graph(&mut store, finding, log_types),
        Commands::Drill { finding } => cmd_drill(&mut store, finding),
        Commands::Rules { file, log_types } => cmd_rules(&mut store, &file, log_types),
        Commands::Stats => cmd_stats(&mut store),
        Commands::InitConfig => Ok(()),
    }
}

fn load_config(path: &Path) -> CorrelationResult<CorrelationsConfig> {
    if path.exists() {
        info!("Loading configuration from: {}", path.display());
        CorrelationsConfig::from_file(path)
    } else {
        info!("No config file found, using defaults. Run 'init-config' to generate one.");
        Ok(CorrelationsConfig::default())
    }
}

async fn build_store(config: &CorrelationsConfig, data: Option<&Path>) -> CorrelationResult<CorrelationStore> {
    match data {
        Some(path) => {
            let mut store = CorrelationStore::from_config(FindingCorrelationIndex::new(), config)?;
            store.refresh(&JsonFileSource::new(path)).await?;
            Ok(store)
        }
        None => {
            info!("No data file given, generating fixtures (seed {})", config.fixtures.seed);
            let index = fixtures::generate(&config.fixtures)?;
            CorrelationStore::from_config(index, config)
        }
    }
}

fn print_response(resp: &ApiResponse) -> CorrelationResult<()> {
    println!("{}", serde_json::to_string_pretty(resp)?);
    if resp.ok {
        Ok(())
    } else {
        Err(CorrelationError::Validation(resp.message.clone()))
    }
}

fn cmd_graph(
    store: &mut CorrelationStore,
    finding: Option<String>,
    log_types: Option<Vec<String>>,
) -> CorrelationResult<()> {
    let resp = match (finding, log_types) {
        (Some(id), _) => api::handle_graph(
            store,
            GraphRequest {
                level: Some(CorrelationLevel::finding(id)),
            },
        ),
        (None, Some(types)) => {
            let items = types.iter().map(|t| FilterItem::new(t.as_str(), t.as_str(), true)).collect();
            api::handle_set_filters(
                store,
                FiltersRequest {
                    log_type_filter: Some(items),
                    severity_filter: None,
                },
            )
        }
        (None, None) => api::handle_graph(store, GraphRequest::default()),
    };
    print_response(&resp)
}

fn cmd_drill(store: &mut CorrelationStore, finding: String) -> CorrelationResult<()> {
    let steps = vec![
        api::handle_graph(store, GraphRequest::default()),
        api::handle_drill_down(store, FindingRequest { finding_id: finding }),
        api::handle_go_back(store),
    ];
    println!("{}", serde_json::to_string_pretty(&steps)?);
    match steps.iter().find(|s| !s.ok) {
        Some(failed) => Err(CorrelationError::Validation(failed.message.clone())),
        None => Ok(()),
    }
}

fn cmd_rules(store: &mut CorrelationStore, file: &Path, log_types: Option<Vec<String>>) -> CorrelationResult<()> {
    let content = std::fs::read_to_string(file)?;
    let rules: Vec<CorrelationRule> = serde_json::from_str(&content)?;
    let mut rejected = 0usize;
    for rule in rules {
        let name = rule.name.clone();
        if let Err(e) = store.create_correlation_rule(rule) {
            rejected += 1;
            println!("Rejected '{}': {}", name, e);
        }
    }
    print_response(&api::handle_list_rules(store, RulesQuery { log_types }))?;
    if rejected > 0 {
        return Err(CorrelationError::Validation(format!("{} rules rejected", rejected)));
    }
    Ok(())
}

fn cmd_stats(store: &mut CorrelationStore) -> CorrelationResult<()> {
    let graph = store.get_correlations_graph_data(None)?;
    let stats = graph.graph.stats();
    println!("Findings:       {}", store.index().finding_count());
    println!("Correlations:   {}", store.index().correlation_count());
    println!("Nodes drawn:    {}", stats.node_count);
    println!("Edges drawn:    {}", stats.edge_count);
    println!("Degree range:   {}..{}", stats.min_degree, stats.max_degree);
    for (log_type, count) in &stats.nodes_per_log_type {
        println!("  {:<14} {}", log_type, count);
    }
    Ok(())
}

/// Generate a default configuration file.
fn cmd_init_config(config_path: &Path) -> CorrelationResult<()> {
    if config_path.exists() {
        return Err(CorrelationError::Config(format!(
            "Configuration file already exists: {}. Remove it first or use a different path.",
            config_path.display()
        )));
    }

    CorrelationsConfig::write_default(config_path)?;
    println!("Default configuration written to: {}", config_path.display());
    println!();
    println!("Key settings to configure:");
    println!("  [graph]    - Node and label size ranges, label draw thresholds");
    println!("  [fixtures] - Seed and volume of generated demo data");
    println!("  [palette]  - Override the log type color palette");
    println!("  [window]   - Time range of findings loaded from a data file");

    Ok(())
}
