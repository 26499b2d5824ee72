use anyhow::{bail, Context, Result};
use arxiv_digest::acquire::{DocumentAcquirer, HttpPdfFetcher, PdfTextExtractor, ScratchDir};
use arxiv_digest::config::{self, Config, ENV_PREFIX};
use arxiv_digest::feed;
use arxiv_digest::gateway::{ClassificationGateway, SummarizationGateway};
use arxiv_digest::llm::{ModelSpec, Provider, ProviderSettings};
use arxiv_digest::models::TopicSet;
use arxiv_digest::pipeline::{Enrichment, Pipeline, PipelineOptions};
use arxiv_digest::report::Destination;
use arxiv_digest::state::DedupStore;
use arxiv_digest::ui::{self, Status};
use arxiv_digest::utils::{HttpClient, ProgressAwareStderr, RetryConfig};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Default topic selection when `-T` is not given
const DEFAULT_TOPIC: &str = "AI";

/// arXiv Digest - Filter the daily arXiv feed by topic with a language model
#[derive(Parser, Debug)]
#[command(name = "arxiv-digest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(about = "Filter the daily arXiv feed by topic with a language model and write a Markdown digest", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify today's feed and write the digest
    #[command(alias = "r")]
    Report(ReportArgs),

    /// List topic groups and what they expand to
    Topics,

    /// Inspect or reset the record of processed papers
    State {
        #[command(subcommand)]
        action: StateCommands,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct ReportArgs {
    /// Output file; `--` writes to stdout. Default: derived from topics and dates
    #[arg(long, short, allow_hyphen_values = true)]
    out: Option<String>,

    /// Show all papers, ignoring and not updating the processed-paper record
    #[arg(long, short)]
    all: bool,

    /// Also write a JSON export next to the report
    #[arg(long, short)]
    json: bool,

    /// API token for the hosted provider (falls back to OPENAI_API_KEY / OPENAI_TOKEN)
    #[arg(long, short)]
    token: Option<String>,

    /// Classification model as provider/model, e.g. ollama/phi4 or openai/gpt-4o-mini
    #[arg(long, short)]
    classify: Option<String>,

    /// Summarization model as provider/model; enables full-text summaries
    #[arg(long, short)]
    summarize: Option<String>,

    /// Comma-separated topics; group names (AI, ML, CV, ...) expand into several
    #[arg(long = "topic", short = 'T', default_value = DEFAULT_TOPIC)]
    topic: String,

    /// Stop after this many included papers
    #[arg(long, short = 'n')]
    max_entries: Option<usize>,

    /// Do not record processed papers
    #[arg(long)]
    no_persist: bool,

    /// Feed URL or path to a saved RSS file
    #[arg(long)]
    feed: Option<String>,

    /// arXiv category to read (e.g. cs, cs.LG)
    #[arg(long)]
    category: Option<String>,
}

#[derive(Subcommand, Debug)]
enum StateCommands {
    /// Print the state file location for a topic selection
    Path {
        #[arg(long = "topic", short = 'T', default_value = DEFAULT_TOPIC)]
        topic: String,
    },

    /// List processed paper identifiers
    Show {
        #[arg(long = "topic", short = 'T', default_value = DEFAULT_TOPIC)]
        topic: String,
    },

    /// Forget processed papers so they are classified again
    Clear {
        #[arg(long = "topic", short = 'T', default_value = DEFAULT_TOPIC)]
        topic: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Destination (default: the user config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// Print all available environment variables
fn print_env_vars() {
    println!("arXiv Digest - Environment Variables");
    println!();
    println!("API Keys:");
    println!("  OPENAI_API_KEY              Token for the hosted (openai/...) provider");
    println!("  OPENAI_TOKEN                Alternative name for the hosted token");
    println!();
    println!("Configuration overrides ({}_<SECTION>__<KEY>):", ENV_PREFIX);
    println!("  {}_FEED__CATEGORY               arXiv category (default: cs)", ENV_PREFIX);
    println!("  {}_FEED__URL                    Full feed URL, overrides the category", ENV_PREFIX);
    println!("  {}_MODELS__CLASSIFY             Classification model (default: ollama/phi4)", ENV_PREFIX);
    println!("  {}_MODELS__SUMMARIZE            Summarization model (default: none)", ENV_PREFIX);
    println!("  {}_MODELS__LOCAL_BASE_URL       Local endpoint (default: http://localhost:11434/v1)", ENV_PREFIX);
    println!("  {}_MODELS__HOSTED_BASE_URL      Hosted endpoint (default: https://api.openai.com/v1)", ENV_PREFIX);
    println!("  {}_MODELS__REQUEST_TIMEOUT_SECS Request timeout (default: 300)", ENV_PREFIX);
    println!("  {}_RETRY__INITIAL_DELAY_MS      First backoff delay, 0 disables (default: 500)", ENV_PREFIX);
    println!("  {}_STORAGE__STATE_DIR           Processed-paper records (default: ~/.arxiv-digest)", ENV_PREFIX);
    println!("  {}_STORAGE__SCRATCH_DIR         PDF scratch space (default: ~/.arxiv-digest/tmp)", ENV_PREFIX);
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export OPENAI_API_KEY=\"your-key-here\"");
    println!("  export {}_MODELS__CLASSIFY=\"openai/gpt-4o-mini\"", ENV_PREFIX);
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Show environment variables and exit if requested
    if cli.env {
        print_env_vars();
        return Ok(());
    }

    // Logs go to stderr so `--out --` keeps stdout clean
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("arxiv_digest={}", log_level(cli.verbose, cli.quiet))),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(ProgressAwareStderr))
        .init();

    match &cli.command {
        Some(Commands::Report(args)) => {
            let config = load_config(&cli)?;
            run_report(&cli, args, config).await
        }
        Some(Commands::Topics) => {
            let config = load_config(&cli)?;
            println!("{}", ui::topic_groups_table(&config.topic_groups()));
            Ok(())
        }
        Some(Commands::State { action }) => {
            let config = load_config(&cli)?;
            run_state(action, &config)
        }
        Some(Commands::Config { action }) => run_config(&cli, action),
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    config::load_config(cli.config.as_deref()).context("Failed to load configuration")
}

fn build_provider(spec: &str, settings: &ProviderSettings, http: &HttpClient) -> Result<Provider> {
    let spec = ModelSpec::parse(spec)?;
    let provider = Provider::from_spec(&spec, settings, http.clone())?;
    tracing::info!("Using {} ({:?} provider)", spec, provider.kind());
    Ok(provider)
}

async fn run_report(cli: &Cli, args: &ReportArgs, mut config: Config) -> Result<()> {
    // Command-line flags override file and environment settings
    if let Some(classify) = &args.classify {
        config.models.classify = classify.clone();
    }
    if let Some(summarize) = &args.summarize {
        config.models.summarize = summarize.clone();
    }
    if let Some(category) = &args.category {
        config.feed.category = category.clone();
        config.feed.url = None;
    }

    let topics = TopicSet::expand(&args.topic, &config.topic_groups());
    if topics.is_empty() {
        bail!("No topics given; pass at least one with -T/--topic");
    }

    let http = HttpClient::with_timeout(config.models.request_timeout())
        .context("Failed to create HTTP client")?;
    let settings = config.models.provider_settings(args.token.as_deref());
    let retry: RetryConfig = config.retry.to_retry_config();

    let classifier = ClassificationGateway::new(
        Arc::new(build_provider(&config.models.classify, &settings, &http)?),
        retry,
    )
    .log_failures(cli.verbose > 0);

    let options = PipelineOptions {
        show_all: args.all,
        persistent: !args.no_persist,
        max_entries: args.max_entries,
        show_progress: cli.verbose == 0 && !cli.quiet && std::io::stderr().is_terminal(),
    };
    // Cleared after every run, with or without summaries
    let scratch = ScratchDir::at(config.storage.scratch_path());
    let mut pipeline = Pipeline::new(classifier, DedupStore::new(config.storage.state_path()))
        .with_options(options)
        .with_scratch(scratch.clone());

    if let Some(model) = config.models.summarize_model() {
        let summarizer =
            SummarizationGateway::new(Arc::new(build_provider(model, &settings, &http)?), retry);
        let dir = ScratchDir::create(scratch.path()).with_context(|| {
            format!("Failed to create scratch directory {}", scratch.path().display())
        })?;
        let acquirer = DocumentAcquirer::new(
            Arc::new(HttpPdfFetcher::new(http.clone())),
            Arc::new(PdfTextExtractor::new()),
            dir,
        );
        pipeline = pipeline.with_enrichment(Enrichment {
            acquirer,
            summarizer,
        });
    }

    let location = args.feed.clone().unwrap_or_else(|| config.feed.url());
    let source = feed::source_for(&location, http);
    let destination = Destination::parse(args.out.as_deref());

    let summary = tokio::select! {
        result = pipeline.run(source.as_ref(), &topics, &destination, args.json) => result?,
        _ = tokio::signal::ctrl_c() => {
            if let Err(e) = scratch.clear() {
                tracing::warn!("Failed to remove scratch directory: {}", e);
            }
            bail!("Interrupted");
        }
    };

    if !cli.quiet {
        ui::print_run_summary(&summary);
    }
    Ok(())
}

fn run_state(action: &StateCommands, config: &Config) -> Result<()> {
    let store = DedupStore::new(config.storage.state_path());
    let groups = config.topic_groups();

    match action {
        StateCommands::Path { topic } => {
            let topics = TopicSet::expand(topic, &groups);
            println!("{}", store.path_for(&topics).display());
        }
        StateCommands::Show { topic } => {
            let topics = TopicSet::expand(topic, &groups);
            let ids = store.load(&topics)?;
            ui::print_section(&format!("Processed papers for [{}]", topics));
            if ids.is_empty() {
                ui::print_status(Status::Info, "No papers recorded");
            } else {
                println!("{}", ui::processed_ids_table(&ids, 4));
                ui::print_status(Status::Info, &format!("{} papers recorded", ids.len()));
            }
        }
        StateCommands::Clear { topic } => {
            let topics = TopicSet::expand(topic, &groups);
            let path = store.path_for(&topics);
            if store.clear(&topics)? {
                ui::print_status(Status::Success, &format!("Removed {}", path.display()));
            } else {
                ui::print_status(Status::Info, &format!("Nothing to remove at {}", path.display()));
            }
        }
    }
    Ok(())
}

fn run_config(cli: &Cli, action: &ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Init { path, force } => {
            let written = config::init_config(path.as_deref(), *force)?;
            ui::print_status(
                Status::Success,
                &format!("Wrote default configuration to {}", written.display()),
            );
        }
        ConfigCommands::Show => {
            let config = load_config(cli)?;
            match cli.config.clone().or_else(config::find_config_file) {
                Some(path) => ui::print_status(Status::Info, &format!("Config file: {}", path.display())),
                None => ui::print_status(Status::Info, "No config file, using defaults"),
            }
            print!("{}", config.to_toml()?);
        }
    }
    Ok(())
}
