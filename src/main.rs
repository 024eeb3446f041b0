// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error};
use std::io::Write;
use std::path::PathBuf;

use doctrans::app_config::{self, Config};
use doctrans::app_controller::{Controller, RunOptions};
use doctrans::errors::AppError;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a documentation tree (default command)
    Translate(TranslateArgs),

    /// Generate shell completions for doctrans
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Root directory of the documentation sources
    #[arg(value_name = "INPUT_DIR")]
    input_dir: Option<PathBuf>,

    /// File or folder below INPUT_DIR to translate (repeatable, default: everything)
    #[arg(long = "path", value_name = "PATH")]
    paths: Vec<String>,

    /// Revision to fetch for sources that know revisions
    #[arg(long)]
    reference: Option<String>,

    /// Output directory; the tree is mirrored below <OUTPUT>/<target language>
    #[arg(short, long, default_value = "translations")]
    output: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Delete input files once they are fully translated
    #[arg(long)]
    remove_translated: bool,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Backend endpoint URL
    #[arg(long, env = "DOCTRANS_ENDPOINT")]
    endpoint: Option<String>,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'ar', 'es', 'fr')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Glossary file (JSON or YAML)
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Token budget per chunk
    #[arg(long)]
    max_chunk_tokens: Option<usize>,

    /// Concurrent backend calls per file
    #[arg(short, long)]
    workers: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// doctrans - structure-preserving documentation translation
///
/// Translates Markdown, MDX, reStructuredText, HTML and source comments with
/// an LLM while code, links and markup survive byte for byte.
#[derive(Parser, Debug)]
#[command(name = "doctrans")]
#[command(version)]
#[command(about = "Structure-preserving documentation translation")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "doctrans splits documentation into token-bounded chunks, translates the prose with an LLM backend and reassembles every file with its code, links and markup untouched.

EXAMPLES:
    doctrans docs/                               # Translate a whole tree with the default config
    doctrans -t fr -o out docs/                  # Translate to French into out/fr/
    doctrans --path guide --path index.md docs/  # Translate part of a tree
    doctrans -g glossary.yaml docs/              # Pin terms with a glossary
    doctrans completions bash > doctrans.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The filter lives in `log::max_level`, so the level can change after init
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = try_main().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn try_main() -> Result<()> {
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "doctrans", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        None => run_translate(cli.translate).await,
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let input_dir = options
        .input_dir
        .clone()
        .ok_or_else(|| anyhow!("INPUT_DIR is required"))?;

    let mut config = Config::load_or_create(&options.config_path)?;
    apply_overrides(&mut config, &options);
    config
        .validate()
        .map_err(|e| AppError::Config(format!("{:#}", e)))
        .context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let output_dir = options.output.join(&config.target_language);
    let run_options = RunOptions {
        input_root: input_dir,
        targets: options.paths.clone(),
        reference: options.reference.clone(),
        output_dir,
        force_overwrite: options.force_overwrite,
        remove_translated: options.remove_translated,
    };

    let controller = Controller::with_config(config)?;
    let report = controller.run(&run_options).await?;

    if report.is_success() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} of {} files were not fully translated",
            report.issues().count(),
            report.files.len()
        ))
    }
}

// Command line values win over the configuration file
fn apply_overrides(config: &mut Config, options: &TranslateArgs) {
    if let Some(model) = &options.model {
        config.backend.model = model.clone();
    }
    if let Some(endpoint) = &options.endpoint {
        config.backend.endpoint = endpoint.clone();
    }
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(glossary) = &options.glossary {
        config.glossary_path = Some(glossary.clone());
    }
    if let Some(max_chunk_tokens) = options.max_chunk_tokens {
        config.engine.max_chunk_tokens = max_chunk_tokens;
    }
    if let Some(workers) = options.workers {
        config.engine.worker_count = workers;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }
}
