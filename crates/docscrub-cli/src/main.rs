#![allow(
    clippy::too_many_lines,            // CLI handlers print long summaries
    clippy::needless_pass_by_value,    // clap requires owned strings
    clippy::fn_params_excessive_bools, // CLI commands have many boolean flags
    clippy::must_use_candidate,        // CLI functions don't need must_use
)]

//! docscrub CLI - batch metadata rewriting and find-and-replace for Word and
//! PDF documents

mod config;
mod prompt;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use config::{apply_fields, Config, MetadataConfig, RuleConfig, CONFIG_FILE_NAME, DEFAULT_CONFIG};
use docscrub_core::convert::verify_cfb_signature;
use docscrub_core::{
    DocumentFormat, FileReport, FileStatus, Journal, JournalPaths, MetadataEdit, MetadataJob,
    OfficeConverter, Operation, Outcome, PdfDocument, Processor, ReplacePlan, Replacement,
    RunObserver, RunSummary, WordDocument, DEFAULT_ERROR_LOG, DEFAULT_MODIFIED_LOG,
};
use indicatif::{ProgressBar, ProgressStyle};
use prompt::Prompter;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Verbosity level for output control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Verbosity {
    /// Suppress all output except errors
    Quiet,
    /// Normal output (default)
    Normal,
    /// Verbose output with extra details
    Verbose,
}

impl Verbosity {
    /// Create from CLI flags
    const fn from_flags(quiet: bool, verbose: bool) -> Self {
        if quiet {
            Self::Quiet
        } else if verbose {
            Self::Verbose
        } else {
            Self::Normal
        }
    }

    /// Check if output should be shown (not quiet)
    const fn should_show_output(self) -> bool {
        !matches!(self, Self::Quiet)
    }

    /// Check if verbose output is requested
    const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose)
    }

    /// Default `RUST_LOG` filter
    const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "debug",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "docscrub",
    about = "Rewrite metadata and replace text in Word and PDF documents, in place",
    long_about = "Walk a directory tree and edit every Word (.docx, .doc) and PDF document in place.\n\
                  \n\
                  Every processed file is listed in modified_files_log.txt and every failure\n\
                  in error_files_log.txt. A failing file never stops the run.",
    version
)]
struct Args {
    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Show detailed processing information
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Use this configuration file instead of ./.docscrub.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rewrite author, last-modified-by, producer and creator fields
    #[command(long_about = "Rewrite document metadata.\n\
                      \n\
                      DOCX: author and last-modified-by.\n\
                      PDF: author, producer and creator (information dictionary and XMP).\n\
                      DOC: converted to DOCX with LibreOffice, then updated like DOCX.\n\
                      \n\
                      Examples:\n  \
                        docscrub metadata ./contracts --value \"Legal Department\"\n  \
                        docscrub metadata ./contracts --author Legal --producer \"Scan Station\"\n  \
                        docscrub metadata ./contracts --value Legal --no-convert")]
    Metadata {
        /// Directory to process (asked for when omitted)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Value written into every field
        #[arg(long)]
        value: Option<String>,

        /// Author (overrides --value)
        #[arg(long)]
        author: Option<String>,

        /// Last-modified-by, DOCX only (overrides --value)
        #[arg(long)]
        last_modified_by: Option<String>,

        /// Producer, PDF only (overrides --value)
        #[arg(long)]
        producer: Option<String>,

        /// Creator tool, PDF only (overrides --value)
        #[arg(long)]
        creator: Option<String>,

        /// Skip .doc files instead of converting them
        #[arg(long)]
        no_convert: bool,

        /// Office suite executable used for .doc conversion
        #[arg(long, value_name = "PATH")]
        office_binary: Option<PathBuf>,

        /// Directory for the two log files
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Exit with an error status if any file failed
        #[arg(long)]
        strict: bool,
    },

    /// Replace text in paragraphs and titles of Word documents
    #[command(long_about = "Literal find-and-replace in .docx files.\n\
                      \n\
                      Rules apply in order to the text of every paragraph (body, tables,\n\
                      headers and footers). Without rules from flags or configuration, the\n\
                      rules are asked for interactively.\n\
                      \n\
                      Examples:\n  \
                        docscrub replace ./contracts --rule \"Acme Corp\" Initech\n  \
                        docscrub replace ./contracts --rule 2023 2024 --title Draft Final\n  \
                        docscrub replace ./contracts   # interactive")]
    Replace {
        /// Directory to process (asked for when omitted)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Replace FIND with REPLACE (repeatable, applied in order)
        #[arg(long = "rule", num_args = 2, value_names = ["FIND", "REPLACE"])]
        rules: Vec<String>,

        /// Replace FIND with REPLACE in the document title
        #[arg(long, num_args = 2, value_names = ["FIND", "REPLACE"])]
        title: Option<Vec<String>>,

        /// Also set the author
        #[arg(long)]
        author: Option<String>,

        /// Also set last-modified-by
        #[arg(long)]
        last_modified_by: Option<String>,

        /// Directory for the two log files
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,

        /// Exit with an error status if any file failed
        #[arg(long)]
        strict: bool,
    },

    /// Show the metadata of a single document
    Inspect {
        /// Document to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration files
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    #[command(long_about = "Generate shell completion scripts.\n\
                      \n\
                      Examples:\n  \
                        docscrub completion bash > /etc/bash_completion.d/docscrub\n  \
                        docscrub completion zsh > ~/.zfunc/_docscrub")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Create a new .docscrub.toml configuration file
    Init {
        /// Create in user home directory (~/.docscrub.toml) instead of current directory
        #[arg(long)]
        global: bool,

        /// Overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Display the current effective configuration
    Show {
        /// Output as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Show the path of the configuration file in effect
    Path,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.quiet, args.verbose);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(verbosity.log_filter()))
        .target(env_logger::Target::Stderr)
        .init();

    match args.command {
        Commands::Metadata {
            dir,
            value,
            author,
            last_modified_by,
            producer,
            creator,
            no_convert,
            office_binary,
            log_dir,
            strict,
        } => {
            let config = Config::load(args.config.as_deref())?;
            log::debug!("Effective configuration: {config:?}");
            let mut edit = config
                .metadata
                .as_ref()
                .map(MetadataConfig::to_edit)
                .unwrap_or_default();
            if let Some(value) = value {
                edit = MetadataEdit::uniform(value);
            }
            apply_fields(&mut edit, author, last_modified_by, producer, creator);

            let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
            let dir = match dir {
                Some(dir) => dir,
                None => prompter.directory()?,
            };
            ensure_directory(&dir)?;
            if edit.is_empty() {
                edit = prompter.metadata_edit()?;
            }

            let convert = config.convert.clone().unwrap_or_default();
            let converter = office_binary
                .or_else(|| convert.office_binary.map(PathBuf::from))
                .map(OfficeConverter::new)
                .unwrap_or_default();
            let convert_legacy = !no_convert && convert.enabled.unwrap_or(true);

            let processor = Processor::new(Operation::Metadata(MetadataJob {
                edit,
                convert_legacy,
            }))
            .with_converter(converter);
            run_command(&processor, &dir, &journal_paths(&config, log_dir), strict, verbosity)
        }

        Commands::Replace {
            dir,
            rules,
            title,
            author,
            last_modified_by,
            log_dir,
            strict,
        } => {
            let config = Config::load(args.config.as_deref())?;
            let replace = config.replace.clone().unwrap_or_default();

            let rules = if rules.is_empty() {
                replace
                    .rules
                    .iter()
                    .flatten()
                    .map(RuleConfig::to_replacement)
                    .collect::<Result<Vec<_>>>()?
            } else {
                pairs_to_rules(&rules)?
            };
            let title = match title {
                Some(pair) => pairs_to_rules(&pair)?.into_iter().next(),
                None => replace
                    .title
                    .as_ref()
                    .map(RuleConfig::to_replacement)
                    .transpose()?,
            };
            let authorship = MetadataEdit {
                author: author.or(replace.author),
                last_modified_by: last_modified_by.or(replace.last_modified_by),
                ..MetadataEdit::default()
            };
            let mut plan = ReplacePlan {
                rules,
                title,
                authorship,
            };

            let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
            let dir = match dir {
                Some(dir) => dir,
                None => prompter.directory()?,
            };
            ensure_directory(&dir)?;
            if plan.is_empty() {
                plan = prompter.replace_plan()?;
            }

            let processor = Processor::new(Operation::Replace(plan));
            run_command(&processor, &dir, &journal_paths(&config, log_dir), strict, verbosity)
        }

        Commands::Inspect { file, json } => inspect_command(&file, json),
        Commands::Config { action } => config_command(action, args.config.as_deref(), verbosity),
        Commands::Completion { shell } => completion_command(shell),
    }
}

/// Turn a flat `FIND REPLACE FIND REPLACE ...` list into rules
fn pairs_to_rules(values: &[String]) -> Result<Vec<Replacement>> {
    values
        .chunks(2)
        .map(|pair| match pair {
            [find, replace] => Replacement::new(find.as_str(), replace.as_str())
                .with_context(|| format!("Invalid rule: {find:?} -> {replace:?}")),
            _ => bail!("Rule is missing its replacement text"),
        })
        .collect()
}

fn ensure_directory(dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        eprintln!(
            "{} Not a valid directory: {}",
            "Error:".red().bold(),
            dir.display()
        );
        bail!("Not a valid directory: {}", dir.display());
    }
    Ok(())
}

/// Log file locations: CLI over config over the current directory
fn journal_paths(config: &Config, log_dir: Option<PathBuf>) -> JournalPaths {
    let journal = config.journal.clone().unwrap_or_default();
    let dir = log_dir
        .or(journal.directory)
        .unwrap_or_else(|| PathBuf::from("."));
    JournalPaths::named(
        &dir,
        journal.modified_log.as_deref().unwrap_or(DEFAULT_MODIFIED_LOG),
        journal.error_log.as_deref().unwrap_or(DEFAULT_ERROR_LOG),
    )
}

/// Progress bar and per-file output for a run
struct ProgressObserver {
    bar: ProgressBar,
    verbosity: Verbosity,
}

impl ProgressObserver {
    fn new(verbosity: Verbosity) -> Self {
        let bar = if verbosity.should_show_output() {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                    .expect("template is compile-time constant")
                    .progress_chars("█▓▒░  "),
            );
            pb
        } else {
            ProgressBar::hidden()
        };
        Self { bar, verbosity }
    }

    /// Print above the bar, or straight to stderr when the bar is not drawn
    fn line(&self, message: String) {
        if self.bar.is_hidden() {
            eprintln!("{message}");
        } else {
            self.bar.println(message);
        }
    }
}

impl RunObserver for ProgressObserver {
    fn started(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        if self.verbosity.should_show_output() {
            self.line(format!(
                "{} Processing {} files...",
                "Info:".blue().bold(),
                total.to_string().cyan()
            ));
        }
    }

    fn file_done(&mut self, report: &FileReport) {
        self.bar.inc(1);
        let name = report.path.display().to_string();
        self.bar.set_message(
            report
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );

        match &report.status {
            FileStatus::Failed(message) => {
                if self.verbosity.should_show_output() {
                    self.line(format!(
                        "{} {} - {}",
                        "✗".red().bold(),
                        name.bright_white(),
                        message.red()
                    ));
                } else {
                    eprintln!("{} {name} - {message}", "Error:".red().bold());
                }
            }
            FileStatus::Done(outcome) if self.verbosity.is_verbose() => {
                let label = match outcome {
                    Outcome::Modified => "modified".green(),
                    Outcome::MetadataUpdated => "metadata updated".green(),
                    Outcome::Unchanged => "not modified".normal(),
                    Outcome::Converted { .. } => "converted".cyan(),
                };
                self.line(format!("{} {} ({label})", "✓".green().bold(), name));
            }
            FileStatus::Done(_) => {}
        }
    }
}

fn run_command(
    processor: &Processor,
    dir: &Path,
    paths: &JournalPaths,
    strict: bool,
    verbosity: Verbosity,
) -> Result<()> {
    for log in [&paths.modified, &paths.errors] {
        if let Some(parent) = log.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
    }
    let mut journal = Journal::create(paths).context("Failed to create log files")?;
    log::debug!(
        "Logging to {} and {}",
        paths.modified.display(),
        paths.errors.display()
    );

    let start_time = std::time::Instant::now();
    let mut observer = ProgressObserver::new(verbosity);
    let summary = processor.run(dir, &mut journal, &mut observer)?;
    observer.bar.finish_and_clear();
    journal.finish().context("Failed to write log files")?;

    if verbosity.should_show_output() {
        print_summary(&summary, paths, start_time.elapsed());
    }

    if strict && summary.has_failures() {
        bail!("{} file(s) failed", summary.failed);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, paths: &JournalPaths, elapsed: std::time::Duration) {
    eprintln!("\n{}", "=== Run Summary ===".bold());
    eprintln!("{:<16} {}", "Total files:", summary.total.to_string().cyan());
    eprintln!("{:<16} {}", "Modified:", summary.modified.to_string().green());
    if summary.converted > 0 {
        eprintln!("{:<16} {}", "Converted:", summary.converted.to_string().cyan());
    }
    eprintln!(
        "{:<16} {}",
        "Not modified:",
        summary.unchanged.to_string().normal()
    );
    eprintln!(
        "{:<16} {}",
        "Failed:",
        if summary.failed > 0 {
            summary.failed.to_string().red()
        } else {
            summary.failed.to_string().normal()
        }
    );
    eprintln!("{:<16} {:.2}s", "Total time:", elapsed.as_secs_f64());
    eprintln!();
    eprintln!("{:<16} {}", "Modified log:", paths.modified.display());
    eprintln!("{:<16} {}", "Error log:", paths.errors.display());
}

/// Metadata of one document, for `inspect`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
struct DocumentReport {
    path: String,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    producer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    has_xmp: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    valid_signature: Option<bool>,
}

fn inspect_document(file: &Path) -> Result<DocumentReport> {
    if !file.is_file() {
        bail!("File not found: {}", file.display());
    }
    let format = DocumentFormat::from_path(file).with_context(|| {
        format!(
            "Unsupported file type: {} (expected .docx, .doc or .pdf)",
            file.display()
        )
    })?;

    let mut report = DocumentReport {
        path: file.display().to_string(),
        format: format.extension().to_string(),
        ..DocumentReport::default()
    };

    match format {
        DocumentFormat::Docx => {
            let props = WordDocument::open(file)?.core_properties()?;
            report.title = props.title;
            report.author = props.author;
            report.last_modified_by = props.last_modified_by;
            report.created = props.created.map(|d| d.to_rfc3339());
            report.modified = props.modified.map(|d| d.to_rfc3339());
        }
        DocumentFormat::Pdf => {
            let pdf = PdfDocument::open(file)?;
            let info = pdf.info();
            report.title = info.title;
            report.author = info.author;
            report.creator = info.creator;
            report.producer = info.producer;
            report.page_count = Some(info.page_count);
            report.has_xmp = Some(pdf.xmp().map(|x| x.is_some()).unwrap_or(false));
        }
        DocumentFormat::Doc => {
            report.valid_signature = Some(verify_cfb_signature(file).is_ok());
        }
    }
    Ok(report)
}

fn inspect_command(file: &Path, json_output: bool) -> Result<()> {
    let report = inspect_document(file)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!();
    println!("{}  {}", "Document:".cyan().bold(), file_name.bright_white());
    println!("{}", "─".repeat(50).bright_black());
    println!("  {:<18} {}", "Path:".bright_black(), report.path);
    println!("  {:<18} {}", "Format:".bright_black(), report.format.cyan());

    let fields = [
        ("Title:", &report.title),
        ("Author:", &report.author),
        ("Last modified by:", &report.last_modified_by),
        ("Creator:", &report.creator),
        ("Producer:", &report.producer),
        ("Created:", &report.created),
        ("Modified:", &report.modified),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("  {:<18} {}", label.bright_black(), value);
        }
    }
    if let Some(pages) = report.page_count {
        println!("  {:<18} {}", "Pages:".bright_black(), pages);
    }
    if let Some(has_xmp) = report.has_xmp {
        println!(
            "  {:<18} {}",
            "XMP metadata:".bright_black(),
            if has_xmp { "Yes".green() } else { "No".yellow() }
        );
    }
    if let Some(valid) = report.valid_signature {
        println!(
            "  {:<18} {}",
            "Legacy Word:".bright_black(),
            if valid {
                "Yes (convert with `docscrub metadata`)".green()
            } else {
                "No (invalid .doc signature)".red()
            }
        );
    }
    println!();
    Ok(())
}

fn config_command(action: ConfigAction, explicit: Option<&Path>, verbosity: Verbosity) -> Result<()> {
    match action {
        ConfigAction::Init { global, force } => config_init(global, force, verbosity),
        ConfigAction::Show { json } => config_show(explicit, json),
        ConfigAction::Path => config_path(explicit),
    }
}

/// Create a new configuration file with commented defaults
fn config_init(global: bool, force: bool, verbosity: Verbosity) -> Result<()> {
    let config_path = if global {
        Config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
    } else {
        Config::project_config_path()
    };

    if config_path.exists() && !force {
        eprintln!(
            "{} Configuration file already exists: {}",
            "Error:".red().bold(),
            config_path.display()
        );
        eprintln!("{} Use --force to overwrite", "Hint:".cyan().bold());
        bail!("Configuration file already exists: {}", config_path.display());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

    if verbosity.should_show_output() {
        println!(
            "{} Created configuration file: {}",
            "Success:".green().bold(),
            config_path.display()
        );
    }
    Ok(())
}

/// Display the current effective configuration
fn config_show(explicit: Option<&Path>, json_output: bool) -> Result<()> {
    let merged = Config::load(explicit)?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&merged)?);
    } else {
        println!("{}", toml::to_string_pretty(&merged)?);
    }
    Ok(())
}

/// The explicit file, else the project file if present, else the user file
/// if present, else where a project file would be created
fn config_path(explicit: Option<&Path>) -> Result<()> {
    if let Some(path) = explicit {
        println!("{}", path.display());
        return Ok(());
    }

    let project = Config::project_config_path();
    let effective = if project.exists() {
        project
    } else {
        Config::user_config_path()
            .filter(|home| home.exists())
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    };
    println!("{}", effective.display());
    Ok(())
}

fn completion_command(shell: Shell) -> Result<()> {
    let mut cmd = Args::command();
    let bin_name = cmd.get_name().to_string();

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
