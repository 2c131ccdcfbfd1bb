use anyhow::{Error, Result};
use brickgraph::config::Config;
use brickgraph::consts::UUID;
use brickgraph::namespaces::is_valid_local_name;
use brickgraph::timeseries::{
    episodes, parse_interval, simultaneous_heating_cooling, stuck_damper, FaultEpisode,
    PairedSample, TimeSeries, TimeseriesStore,
};
use brickgraph::{BrickGraph, NamespaceRegistry, ResultTable, UriRendering};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "brickgraph")]
#[command(about = "Query Brick building models and check their time series")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
    /// JSON configuration file; command line flags override its values
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
    /// Graph file to load, defaults to 'building.ttl'
    #[clap(long, short, global = true)]
    graph: Option<PathBuf>,
    /// Directory holding one <identifier>.csv file per time series
    #[clap(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Namespace bound to the ex: prefix
    #[clap(long, global = true)]
    building_namespace: Option<String>,
    /// Fail on unregistered prefixes instead of passing them to the SPARQL parser
    #[clap(long, action, default_value = "false", global = true)]
    strict: bool,
}

#[derive(Debug, Subcommand)]
enum TimeseriesCommands {
    /// Resample one series to fixed buckets and print it
    Resample {
        /// Time series identifier, or a prefixed point name carrying a bf:uuid
        series: String,
        /// Bucket width, e.g. 30s, 15min, 1h
        #[clap(long, short, default_value = "15min")]
        interval: String,
    },
    /// Flag buckets where heating and cooling commands are both above a threshold
    HeatingCooling {
        /// Heating command series (identifier or prefixed point name)
        #[clap(long)]
        heating: String,
        /// Cooling command series (identifier or prefixed point name)
        #[clap(long)]
        cooling: String,
        /// Bucket width, e.g. 30s, 15min, 1h
        #[clap(long, short, default_value = "15min")]
        interval: String,
        /// Both commands must exceed this value for a bucket to be flagged
        #[clap(long, default_value = "0")]
        threshold: f64,
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
    /// Flag buckets where a damper position strays from its command
    StuckDamper {
        /// Damper position series (identifier or prefixed point name)
        #[clap(long)]
        position: String,
        /// Damper command series (identifier or prefixed point name)
        #[clap(long)]
        command: String,
        /// Bucket width, e.g. 30s, 15min, 1h
        #[clap(long, short, default_value = "15min")]
        interval: String,
        /// Largest allowed difference between position and command
        #[clap(long, default_value = "10")]
        tolerance: f64,
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a SELECT, CONSTRUCT or DESCRIBE query written with prefixed names
    Query {
        /// Query text; use --query-file to read it from a file instead
        query: Option<String>,
        /// Read the query text from this file
        #[clap(long, short = 'f')]
        query_file: Option<PathBuf>,
        /// Print full URIs instead of prefixed names
        #[clap(long, action, default_value = "false")]
        full_uri: bool,
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
        /// Print the query after prefix expansion before running it
        #[clap(long, action, default_value = "false")]
        show_expanded: bool,
    },
    /// Run an ASK query and print true or false
    Ask {
        /// Query text
        query: String,
    },
    /// List the registered prefixes
    Prefixes {
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
    /// Print the number of triples in the graph
    Stats,
    /// Print the effective configuration
    Config {
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
        /// Write the effective configuration to this file
        #[clap(long)]
        save: Option<PathBuf>,
    },
    /// Time series analysis for points in the graph
    #[command(subcommand)]
    Timeseries(TimeseriesCommands),
    /// Prints the version of the brickgraph binary
    Version,
}

impl fmt::Display for Commands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Commands::Query { .. } => "Query",
            Commands::Ask { .. } => "Ask",
            Commands::Prefixes { .. } => "Prefixes",
            Commands::Stats => "Stats",
            Commands::Config { .. } => "Config",
            Commands::Timeseries(_) => "Timeseries",
            Commands::Version => "Version",
        };
        write!(f, "{}", name)
    }
}

pub fn run() -> Result<()> {
    brickgraph::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    brickgraph::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn build_config(cmd: &Cli) -> Result<Config> {
    let base = match &cmd.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut builder = Config::builder();
    builder
        .graph_file(cmd.graph.clone().unwrap_or(base.graph_file))
        .building_namespace(
            cmd.building_namespace
                .clone()
                .unwrap_or(base.building_namespace),
        )
        .prefixes(base.prefixes)
        .strict_prefixes(cmd.strict || base.strict_prefixes);
    if let Some(dir) = cmd.data_dir.clone().or(base.timeseries_dir) {
        builder.timeseries_dir(dir);
    }
    Ok(builder.build()?)
}

fn execute(cmd: Cli) -> Result<()> {
    // The RUST_LOG env var is set by `init_logging` if BRICKGRAPH_LOG is present.
    // CLI flags for verbosity take precedence. If nothing is set, we default to "warn".
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let config = build_config(&cmd)?;
    if cmd.verbose || cmd.debug {
        config.print();
    }
    info!("Running {}", cmd.command);

    match cmd.command {
        Commands::Query {
            query,
            query_file,
            full_uri,
            json,
            show_expanded,
        } => {
            let text = match (query, query_file) {
                (Some(text), None) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (Some(_), Some(_)) => {
                    return Err(anyhow::anyhow!(
                        "Give the query either inline or with --query-file, not both"
                    ))
                }
                (None, None) => {
                    return Err(anyhow::anyhow!(
                        "No query given. Pass the query text or --query-file <FILE>."
                    ))
                }
            };
            let graph = BrickGraph::from_config(&config)?;
            if show_expanded {
                println!("{}", graph.expand_query(&text)?);
            }
            let table = graph.query(&text, UriRendering::from(full_uri))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
        }
        Commands::Ask { query } => {
            let graph = BrickGraph::from_config(&config)?;
            println!("{}", graph.ask(&query)?);
        }
        Commands::Prefixes { json } => {
            let registry = config.registry()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&registry)?);
            } else {
                for (prefix, namespace) in registry.iter() {
                    println!("{}: {}", prefix, namespace);
                }
            }
        }
        Commands::Stats => {
            let graph = BrickGraph::from_config(&config)?;
            println!("Graph: {}", config.graph_file.display());
            println!("Triples: {}", graph.len());
            println!("Prefixes: {}", graph.registry().len());
        }
        Commands::Config { json, save } => {
            if let Some(path) = save {
                config.save_to_file(&path)?;
                println!("Wrote configuration to {}", path.display());
            } else if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                config.print();
            }
        }
        Commands::Timeseries(ts_cmd) => handle_timeseries_command(ts_cmd, &config)?,
        Commands::Version => {
            println!("brickgraph {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn handle_timeseries_command(ts_cmd: TimeseriesCommands, config: &Config) -> Result<()> {
    let dir = config.timeseries_dir.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "No time series directory. Pass --data-dir or set timeseries_dir in the config."
        )
    })?;
    let mut series = SeriesLoader {
        store: TimeseriesStore::new(dir),
        registry: config.registry()?,
        graph: None,
        config,
    };

    match ts_cmd {
        TimeseriesCommands::Resample {
            series: name,
            interval,
        } => {
            let resampled = series.load(&name)?.resample(parse_interval(&interval)?)?;
            for (timestamp, value) in resampled.points() {
                println!("{}\t{}", timestamp.to_rfc3339(), value);
            }
        }
        TimeseriesCommands::HeatingCooling {
            heating,
            cooling,
            interval,
            threshold,
            json,
        } => {
            let interval = parse_interval(&interval)?;
            let heating = series.load(&heating)?;
            let cooling = series.load(&cooling)?;
            let flagged = simultaneous_heating_cooling(&heating, &cooling, interval, threshold)?;
            print_faults(
                "Simultaneous heating and cooling",
                &flagged,
                &episodes(&flagged, interval),
                json,
            )?;
        }
        TimeseriesCommands::StuckDamper {
            position,
            command,
            interval,
            tolerance,
            json,
        } => {
            let interval = parse_interval(&interval)?;
            let position = series.load(&position)?;
            let command = series.load(&command)?;
            let flagged = stuck_damper(&position, &command, interval, tolerance)?;
            print_faults(
                "Damper not following its command",
                &flagged,
                &episodes(&flagged, interval),
                json,
            )?;
        }
    }
    Ok(())
}

/// Loads series named either by identifier or by a `prefix:local` point carrying a bf:uuid.
/// The graph is only loaded the first time a point name is seen.
struct SeriesLoader<'a> {
    store: TimeseriesStore,
    registry: NamespaceRegistry,
    graph: Option<BrickGraph>,
    config: &'a Config,
}

impl SeriesLoader<'_> {
    fn load(&mut self, series: &str) -> Result<TimeSeries> {
        let id = self.resolve(series)?;
        Ok(self.store.load(&id)?)
    }

    fn resolve(&mut self, series: &str) -> Result<String> {
        let local = match series.split_once(':') {
            Some((prefix, local)) if self.registry.contains(prefix) => local,
            _ => return Ok(series.to_string()),
        };
        if !is_valid_local_name(local) {
            return Err(anyhow::anyhow!("'{}' is not a valid point name", series));
        }
        let point = self.registry.expand(series)?;
        let graph = match self.graph.take() {
            Some(graph) => graph,
            None => BrickGraph::from_config(self.config)?,
        };
        let graph = self.graph.insert(graph);
        let table = graph.query(
            &format!("SELECT ?uuid WHERE {{ <{}> <{}> ?uuid }}", point, UUID.as_str()),
            UriRendering::Full,
        )?;
        let id = table
            .iter()
            .find_map(|row| row.get("uuid").map(|v| v.local_name().to_string()))
            .ok_or_else(|| anyhow::anyhow!("Point {} has no bf:uuid", series))?;
        debug!("Resolved {} to time series {}", series, id);
        Ok(id)
    }
}

fn print_table(table: &ResultTable) {
    println!("{}", table.variables().join("\t"));
    for row in table.iter() {
        println!("{}", row.to_strings().join("\t"));
    }
    println!("({} rows)", table.len());
}

fn print_faults(
    title: &str,
    flagged: &[PairedSample],
    found: &[FaultEpisode],
    json: bool,
) -> Result<()> {
    if json {
        let obj = serde_json::json!({
            "flagged": flagged,
            "episodes": found,
        });
        println!("{}", serde_json::to_string_pretty(&obj)?);
        return Ok(());
    }
    if found.is_empty() {
        println!("{}: none found", title);
        return Ok(());
    }
    println!("{}: {} episode(s)", title, found.len());
    for episode in found {
        println!(
            "  {} -> {} ({} bucket(s))",
            episode.start.to_rfc3339(),
            episode.end.to_rfc3339(),
            episode.buckets
        );
    }
    Ok(())
}
