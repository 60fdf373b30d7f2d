use anyhow::{anyhow, Error, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use log::info;
use rdfgraph::{Config, Dataset, Format, Graph, GraphView, LoadOptions, WebCache};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "rdfgraph")]
#[command(about = "Load, navigate and query RDF graphs")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// JSON configuration file to start from; defaults are used otherwise
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
    /// Offline mode - only local files and web cache hits are loaded
    #[clap(long, short, action, default_value = "false", global = true)]
    offline: bool,
    /// Do not read or write the on-disk web cache
    #[clap(long, action, default_value = "false", global = true)]
    no_cache: bool,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
}

#[derive(Debug, Subcommand)]
enum CacheCommands {
    /// List every cached document with its timestamp and size
    List,
    /// Print the cached (Turtle) copy of a document
    Show {
        /// The URI the document was loaded from
        uri: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Output JSON instead of text
        #[clap(long, action, default_value = "false")]
        json: bool,
    },
    /// Write the effective configuration to a file
    Init {
        /// Where to write the configuration
        path: PathBuf,
        /// Replace the file if it already exists
        #[clap(long, default_value = "false")]
        overwrite: bool,
    },
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load documents (URIs or local paths) and print the resulting graph
    Load {
        /// Documents to load
        #[clap(required = true)]
        uris: Vec<String>,
        /// Input format, sniffed from the payload when omitted
        #[clap(long, short)]
        format: Option<String>,
        /// Output format: one of [turtle, ntriples, rdfxml, n3] (default: turtle)
        #[clap(long)]
        output: Option<String>,
    },
    /// Print every value of a property of a resource
    Get {
        /// The resource, as a URI or prefix:local name
        uri: String,
        /// The property; a leading '-' follows it backwards
        #[clap(allow_hyphen_values = true)]
        prop: String,
        /// Also follow owl:sameAs links and include the aliases' values
        #[clap(long, action, default_value = "false")]
        same_as: bool,
        /// Documents to load before looking the resource up
        #[clap(long = "load")]
        load: Vec<String>,
    },
    /// Run a SPARQL SELECT over loaded documents and endpoints
    Sparql {
        /// The query text
        query: String,
        /// Documents to load before querying
        #[clap(long = "load")]
        load: Vec<String>,
        /// SPARQL endpoints to send the query to, on top of the configured ones
        #[clap(long = "endpoint")]
        endpoints: Vec<String>,
    },
    /// Inspect the web cache
    #[command(subcommand)]
    Cache(CacheCommands),
    /// Manage rdfgraph configuration
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Prints the version of the rdfgraph binary
    Version,
}

pub fn run() -> Result<()> {
    rdfgraph::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    rdfgraph::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // RDFGRAPH_LOG has already been copied into RUST_LOG; CLI flags win.
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let mut config = match &cmd.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if cmd.offline {
        config.offline = true;
    }
    if cmd.no_cache {
        config.cache_dir = None;
    }
    if cmd.verbose || cmd.debug {
        config.print();
    }

    match cmd.command {
        Commands::Load {
            uris,
            format,
            output,
        } => {
            let graph = Graph::from_config(&config)?;
            let mut options = LoadOptions::default();
            if let Some(format) = format {
                options = options.format(Format::parse(&format)?);
            }
            for uri in &uris {
                graph.load(document_uri(uri)?, options)?;
            }
            info!("Loaded {} triples", graph.len()?);
            let output = match output {
                Some(f) => Format::parse(&f)?,
                None => Format::Turtle,
            };
            std::io::stdout().write_all(&graph.serialize(output)?)?;
        }
        Commands::Get {
            uri,
            prop,
            same_as,
            load,
        } => {
            let graph = Graph::from_config(&config)?;
            for doc in &load {
                graph.load(document_uri(doc)?, LoadOptions::default())?;
            }
            let resource = graph.resource(uri.as_str())?;
            resource.load()?;
            if same_as {
                resource.load_same_as()?;
            }
            for value in resource.all(&prop)?.iter() {
                println!("{value}");
            }
        }
        Commands::Sparql {
            query,
            load,
            endpoints,
        } => {
            config.endpoints.extend(endpoints);
            let dataset = Dataset::from_config(&config)?;
            for doc in &load {
                dataset.load(document_uri(doc)?, LoadOptions::default())?;
            }
            for row in dataset.sparql(&query)?.iter() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|(var, value)| format!("?{var}={value}"))
                    .collect();
                println!("{}", cells.join("\t"));
            }
        }
        Commands::Cache(cache_cmd) => {
            let cache = open_cache(&config)?;
            match cache_cmd {
                CacheCommands::List => {
                    for (uri, entry) in cache.entries() {
                        let size = std::fs::metadata(cache.dir().join(&entry.file))
                            .map(|m| m.len())
                            .unwrap_or(0);
                        let stored = entry.stored.with_timezone(&Local);
                        println!(
                            "{uri}\t{}\t{size} bytes",
                            stored.format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                }
                CacheCommands::Show { uri } => {
                    print!("{}", cache.get(&document_uri(&uri)?)?);
                }
            }
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::Show { json } => {
                if json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    config.print();
                }
            }
            ConfigCommands::Init { path, overwrite } => {
                if path.exists() && !overwrite {
                    return Err(anyhow!(
                        "{} already exists. Use --overwrite to replace it.",
                        path.display()
                    ));
                }
                config.save_to_file(&path)?;
                println!("Wrote configuration to {}", path.display());
            }
        },
        Commands::Version => {
            println!("rdfgraph {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Existing local paths become `file:` URIs; anything else is taken as a URI.
fn document_uri(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    if path.exists() {
        Graph::file_uri(path)
    } else {
        Ok(arg.to_string())
    }
}

fn open_cache(config: &Config) -> Result<WebCache> {
    let dir = config
        .cache_dir
        .as_ref()
        .ok_or_else(|| anyhow!("The web cache is disabled."))?;
    WebCache::open(dir.join("web"))
}
