//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use quizcards_article::list_categories;
use quizcards_core::{
    CategoryOutcome, CategoryStatus, ChatCompletionsClient, GenerateConfig, ProgressReporter,
    PromptStyle, PromptTemplate, RunManifest, TermCache, TermSanitizer, run_generation,
};
use quizcards_corpus::{Corpus, CorpusRow};
use quizcards_markdown::format_table;
use quizcards_shared::{AppConfig, DataPaths, init_config, load_config, term_cache_path};

const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// quizcards: quiz bowl flashcards from "You Gotta Know" articles.
#[derive(Parser)]
#[command(
    name = "quizcards",
    version,
    about = "Generate quiz bowl flashcards from You Gotta Know articles and past questions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Data directory holding qbreader/ and ygk/ (overrides the config file).
    #[arg(long, env = "QUIZCARDS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Built-in prompt choice.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum PromptArg {
    Short,
    Detailed,
    Frequency,
}

impl From<PromptArg> for PromptStyle {
    fn from(arg: PromptArg) -> Self {
        match arg {
            PromptArg::Short => PromptStyle::Short,
            PromptArg::Detailed => PromptStyle::Detailed,
            PromptArg::Frequency => PromptStyle::Frequency,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate flashcards for one category or all of them.
    Generate(GenerateArgs),

    /// List the categories available in the data directory.
    Categories,

    /// Show corpus questions mentioning a term.
    Search {
        /// Term to look up (case-insensitive, literal).
        term: String,

        /// Maximum rows shown per table.
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `generate`.
#[derive(Args)]
#[command(group(ArgGroup::new("target").required(true).args(["category", "all"])))]
pub(crate) struct GenerateArgs {
    /// Category name (e.g. "short story authors") or article file name.
    #[arg(short, long)]
    pub category: Option<String>,

    /// Process every category found in the data directory.
    #[arg(long)]
    pub all: bool,

    /// Output directory for CSV files (overrides the config file).
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model ID (overrides the config default).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Built-in prompt style.
    #[arg(long, value_enum, default_value = "frequency")]
    pub prompt: PromptArg,

    /// Custom prompt template file (replaces the built-in prompt).
    #[arg(long, conflicts_with = "prompt")]
    pub prompt_file: Option<PathBuf>,

    /// Do not read or update the persistent search-term cache.
    #[arg(long)]
    pub no_term_cache: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "quizcards=info",
        1 => "quizcards=debug",
        _ => "quizcards=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir;
    match cli.command {
        Command::Generate(args) => cmd_generate(data_dir, args).await,
        Command::Categories => cmd_categories(data_dir).await,
        Command::Search { term, limit } => cmd_search(data_dir, &term, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(data_dir).await,
        },
    }
}

/// Load the config file and apply the `--data-dir` override.
fn resolve_config(data_dir: Option<PathBuf>) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(dir) = data_dir {
        config.data.data_dir = dir.to_string_lossy().to_string();
    }
    Ok(config)
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

async fn cmd_generate(data_dir: Option<PathBuf>, args: GenerateArgs) -> Result<()> {
    let config = resolve_config(data_dir)?;
    let paths = DataPaths::from(&config);
    paths.validate()?;

    // Fail on a missing API key before any work is done
    let client = ChatCompletionsClient::new(&config.generation)?;

    let template = match &args.prompt_file {
        Some(path) => PromptTemplate::from_file(path)?,
        None => PromptTemplate::builtin(args.prompt.into()),
    };

    let articles_dir = paths.articles_dir();
    let categories = if args.all {
        let found = list_categories(&articles_dir)?;
        if found.is_empty() {
            return Err(eyre!("no categories found in {}", articles_dir.display()));
        }
        info!(count = found.len(), "processing all categories");
        found
    } else {
        args.category.into_iter().collect()
    };

    let corpus = Corpus::load(&paths)?;

    let model = args
        .model
        .unwrap_or_else(|| config.generation.default_model.clone());
    let output_dir = args
        .output
        .unwrap_or_else(|| PathBuf::from(&config.output.output_dir));

    let cache_path = if config.cache.persist_terms && !args.no_term_cache {
        Some(term_cache_path()?)
    } else {
        None
    };
    let mut sanitizer = match &cache_path {
        Some(path) => TermSanitizer::with_cache(Some(model.clone()), TermCache::load(path)?),
        None => TermSanitizer::new(Some(model.clone())),
    };

    let generate_config = GenerateConfig {
        categories,
        articles_dir,
        template,
        model: Some(model.clone()),
        output_dir: Some(output_dir.clone()),
    };

    info!(
        model = %model,
        prompt = generate_config.template.name(),
        categories = generate_config.categories.len(),
        output = %output_dir.display(),
        "starting generation"
    );

    let mut manifest = RunManifest::new(TOOL_VERSION, &model, generate_config.template.name());
    let reporter = CliProgress::new();

    let outcomes = run_generation(
        &generate_config,
        &corpus,
        &client,
        &mut sanitizer,
        &reporter,
    )
    .await?;
    reporter.finish();

    if let (Some(path), Some(cache)) = (&cache_path, sanitizer.cache()) {
        if let Err(e) = cache.save(path) {
            warn!(error = %e, "failed to save term cache");
        }
    }

    manifest.finish(&outcomes);
    let manifest_path = manifest.write(&output_dir)?;

    print_summary(&outcomes, &manifest_path);

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    if failed > 0 {
        return Err(eyre!("{failed} category file(s) could not be written"));
    }
    Ok(())
}

fn print_summary(outcomes: &[CategoryOutcome], manifest_path: &Path) {
    println!();
    for outcome in outcomes {
        match &outcome.status {
            CategoryStatus::Generated => {
                let target = outcome
                    .artifact
                    .as_ref()
                    .map(|a| a.filename.as_str())
                    .unwrap_or("no file written");
                println!(
                    "  ✓ {:<32} {:>4} cards  {}/{} topics  → {target}",
                    outcome.category,
                    outcome.cards.len(),
                    outcome.topics_total - outcome.topics_failed,
                    outcome.topics_total,
                );
            }
            CategoryStatus::Skipped { reason } => {
                println!("  ⚠ {:<32} skipped: {reason}", outcome.category);
            }
            CategoryStatus::Failed { reason } => {
                println!("  ✗ {:<32} write failed: {reason}", outcome.category);
            }
        }
    }
    let total: usize = outcomes.iter().map(|o| o.cards.len()).sum();
    println!();
    println!("  Total:    {total} flashcards");
    println!("  Manifest: {}", manifest_path.display());
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar per category.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} [{bar:30.green}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
                .progress_chars("=> "),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn category_started(&self, category: &str, topics: usize) {
        self.bar.reset();
        self.bar.set_length(topics as u64);
        self.bar.set_prefix(category.to_string());
    }

    fn topic_finished(&self, _category: &str, topic: &str, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
        self.bar.set_message(topic.to_string());
    }

    fn category_finished(&self, outcome: &CategoryOutcome) {
        let line = match &outcome.status {
            CategoryStatus::Generated => format!(
                "{}: {} flashcards ({} topics failed)",
                outcome.category,
                outcome.cards.len(),
                outcome.topics_failed
            ),
            CategoryStatus::Skipped { reason } => {
                format!("{}: skipped ({reason})", outcome.category)
            }
            CategoryStatus::Failed { reason } => {
                format!("{}: write failed ({reason})", outcome.category)
            }
        };
        self.bar.println(line);
    }
}

// ---------------------------------------------------------------------------
// categories / search
// ---------------------------------------------------------------------------

async fn cmd_categories(data_dir: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(data_dir)?;
    let articles_dir = DataPaths::from(&config).articles_dir();

    let categories = list_categories(&articles_dir)?;
    if categories.is_empty() {
        return Err(eyre!("no categories found in {}", articles_dir.display()));
    }

    for (i, category) in categories.iter().enumerate() {
        println!("{:>4}  {category}", i + 1);
    }
    println!();
    println!("Total: {} categories", categories.len());
    Ok(())
}

async fn cmd_search(data_dir: Option<PathBuf>, term: &str, limit: usize) -> Result<()> {
    let config = resolve_config(data_dir)?;
    let paths = DataPaths::from(&config);
    paths.validate()?;

    let corpus = Corpus::load(&paths)?;
    let tossups = corpus.search_tossups(term)?;
    let bonuses = corpus.search_bonuses(term)?;

    println!("Tossups mentioning '{term}': {}", tossups.len());
    println!();
    println!("{}", format_table(&["#", "Set", "Question", "Answer"], &search_rows(&tossups, limit)));
    println!("Bonuses mentioning '{term}': {}", bonuses.len());
    println!();
    println!("{}", format_table(&["#", "Set", "Leadin", "Answers"], &search_rows(&bonuses, limit)));
    Ok(())
}

fn search_rows(rows: &[&CorpusRow], limit: usize) -> Vec<Vec<String>> {
    rows.iter()
        .take(limit)
        .enumerate()
        .map(|(i, row)| {
            let set = row.set_name().unwrap_or("").to_string();
            let (text, answer) = match row {
                CorpusRow::SingleQuestion(r) => (r.question.clone(), r.answer.clone()),
                CorpusRow::MultiPart(r) => (r.leadin.clone(), r.answers.join("; ")),
            };
            vec![(i + 1).to_string(), set, text, answer]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(data_dir: Option<PathBuf>) -> Result<()> {
    let config = resolve_config(data_dir)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_requires_category_or_all() {
        assert!(Cli::try_parse_from(["quizcards", "generate"]).is_err());
        assert!(
            Cli::try_parse_from(["quizcards", "generate", "--category", "operas", "--all"])
                .is_err()
        );
    }

    #[test]
    fn generate_parses_flags() {
        let cli = Cli::try_parse_from([
            "quizcards",
            "--data-dir",
            "/tmp/data",
            "generate",
            "--category",
            "short story authors",
            "--prompt",
            "detailed",
            "--no-term-cache",
        ])
        .unwrap();

        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/data")));
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(args.category.as_deref(), Some("short story authors"));
                assert!(!args.all);
                assert!(args.no_term_cache);
                assert_eq!(PromptStyle::from(args.prompt), PromptStyle::Detailed);
            }
            _ => panic!("expected generate command"),
        }
    }

    #[test]
    fn prompt_defaults_to_frequency() {
        let cli = Cli::try_parse_from(["quizcards", "generate", "--all"]).unwrap();
        match cli.command {
            Command::Generate(args) => {
                assert_eq!(PromptStyle::from(args.prompt), PromptStyle::Frequency);
            }
            _ => panic!("expected generate command"),
        }
    }

    #[test]
    fn prompt_file_conflicts_with_explicit_prompt() {
        let result = Cli::try_parse_from([
            "quizcards",
            "generate",
            "--all",
            "--prompt",
            "short",
            "--prompt-file",
            "custom.md",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn search_rows_respect_limit() {
        let row = CorpusRow::SingleQuestion(quizcards_corpus::SingleQuestionRow {
            question: "Name this lake.".into(),
            answer: "Dead Sea".into(),
            set_name: Some("2019 ACF Regionals".into()),
            difficulty: None,
        });
        let rows = search_rows(&[&row, &row, &row], 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["2", "2019 ACF Regionals", "Name this lake.", "Dead Sea"]);
    }
}
