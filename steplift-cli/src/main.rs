//! Steplift CLI - find and reuse step blocks across Python scenario files

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Destination files are written only after a successful edit batch

mod logging;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use steplift_core::config::{self, ResolvedConfig};
use steplift_core::corpus::relative_uri;
use steplift_core::report::{exclude_span, render_headers, render_record, search_text};
use steplift_core::{
    append_to_end, find_step_headers, header_at, header_on_line, list_steps, render_json,
    render_text, replace_step, Category, Document, FsCorpus, ScanCache, ScanResult, ScannedBlock,
    SourcePosition, StepRecord, TextDocument,
};

#[derive(Parser)]
#[command(name = "steplift")]
#[command(about = "Find, rank and transplant reusable steps in Python scenario files")]
#[command(version = env!("STEPLIFT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List distinct step blocks of a category, most used first
    List {
        /// Corpus root directory
        #[arg(default_value = ".")]
        root: PathBuf,

        #[command(flatten)]
        category: CategoryArgs,

        /// Only list steps whose name contains this text
        #[arg(long)]
        filter: Option<String>,

        /// Only list steps whose name or body contains this text, ignoring case
        #[arg(long)]
        search: Option<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the canonical text of one step
    Show {
        /// Corpus root directory
        #[arg(default_value = ".")]
        root: PathBuf,

        #[command(flatten)]
        category: CategoryArgs,

        /// Step id as printed by `list`
        #[arg(long)]
        id: usize,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List step headers in one file
    Headers {
        /// Scenario file to scan
        file: PathBuf,

        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List replacement candidates for the step header at a position
    Candidates {
        /// Corpus root directory
        #[arg(default_value = ".")]
        root: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        /// Only offer steps whose name contains the header's own suffix
        #[arg(long)]
        similar: bool,

        /// Only offer steps whose name or body contains this text, ignoring case
        #[arg(long)]
        search: Option<String>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Replace the step block headed at a position with a corpus step
    Replace {
        /// Corpus root directory
        #[arg(default_value = ".")]
        root: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        /// Id of the replacement step, as printed by `candidates`
        #[arg(long = "with")]
        with_id: usize,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Append a corpus step to the end of a file
    Append {
        /// Corpus root directory
        #[arg(default_value = ".")]
        root: PathBuf,

        #[command(flatten)]
        category: CategoryArgs,

        /// Id of the step to append, as printed by `list`
        #[arg(long)]
        id: usize,

        /// Destination scenario file
        #[arg(long)]
        file: PathBuf,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Discard cached scan results so the next command rescans the corpus
    ResetCache {
        /// Corpus root directory
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Validate or show configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without scanning
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CategoryArgs {
    /// Step kind, e.g. given, when or then
    #[arg(long, conflicts_with = "all", required_unless_present = "all")]
    kind: Option<String>,

    /// Every configured step kind at once
    #[arg(long)]
    all: bool,
}

impl CategoryArgs {
    fn category(&self) -> Category {
        match (&self.kind, self.all) {
            (Some(kind), false) => Category::kind(kind.as_str()),
            _ => Category::All,
        }
    }
}

/// A step header addressed by file and 1-based line/column
#[derive(Args)]
struct TargetArgs {
    /// Scenario file containing the header
    #[arg(long)]
    file: PathBuf,

    /// Line of the header (1-based)
    #[arg(long)]
    line: u32,

    /// Column inside the header's name (1-based); without it the first
    /// header on the line is used
    #[arg(long)]
    column: Option<u32>,
}

impl TargetArgs {
    /// Zero-based line and optional column
    fn position(&self) -> anyhow::Result<(u32, Option<u32>)> {
        if self.line == 0 || self.column == Some(0) {
            anyhow::bail!("--line and --column are 1-based");
        }
        Ok((self.line - 1, self.column.map(|column| column - 1)))
    }

    fn describe(&self) -> String {
        match self.column {
            Some(column) => format!("{}:{}:{}", self.file.display(), self.line, column),
            None => format!("{}:{}", self.file.display(), self.line),
        }
    }
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Corpus root, its configuration and the scan cache for one command
struct Session {
    root: PathBuf,
    config: ResolvedConfig,
    cache: ScanCache,
}

impl Session {
    fn open(root: &Path, config_path: Option<&Path>) -> anyhow::Result<Self> {
        let root = absolute(root)?;
        if !root.exists() {
            anyhow::bail!("Path does not exist: {}", root.display());
        }

        let config = config::load_and_resolve(&root, config_path)
            .context("failed to load configuration")?;
        if let Some(config_path) = &config.config_path {
            eprintln!("Using config: {}", config_path.display());
        }

        let cache = if config.cache_enabled {
            ScanCache::load(&root)
        } else {
            ScanCache::new()
        };

        Ok(Session {
            root,
            config,
            cache,
        })
    }

    fn records(
        &mut self,
        category: &Category,
        name_filter: &str,
    ) -> anyhow::Result<Vec<&StepRecord>> {
        let corpus = FsCorpus::new(&self.root, &self.config);
        Ok(list_steps(
            &mut self.cache,
            category,
            &self.config.step_kinds,
            &corpus,
            name_filter,
        )?)
    }

    fn scan(&mut self, category: &Category) -> anyhow::Result<&ScanResult> {
        let corpus = FsCorpus::new(&self.root, &self.config);
        Ok(self
            .cache
            .get_or_scan(category, &self.config.step_kinds, &corpus)?)
    }

    /// Open a destination file, identified the same way corpus records are
    fn open_document(&self, file: &Path) -> anyhow::Result<TextDocument> {
        let path = absolute(file)?;
        let uri = relative_uri(&self.root, &path);
        Ok(TextDocument::open(&path)?.with_uri(uri))
    }

    fn locate_header(
        &self,
        document: &TextDocument,
        target: &TargetArgs,
    ) -> anyhow::Result<ScannedBlock> {
        let kinds = &self.config.step_kinds;
        let header = match target.position()? {
            (line, Some(column)) => {
                header_at(document, kinds, SourcePosition::new(line, column))?
            }
            (line, None) => header_on_line(document, kinds, line)?,
        };
        header.with_context(|| format!("no step header at {}", target.describe()))
    }

    /// Write the cache back; a failure here never fails the command
    fn persist(&self) {
        if !self.config.cache_enabled {
            return;
        }
        if let Err(e) = self.cache.save(&self.root) {
            tracing::warn!("failed to save scan cache: {e:#}");
        }
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List {
            root,
            category,
            filter,
            search,
            format,
            config: config_path,
        } => {
            let mut session = Session::open(&root, config_path.as_deref())?;
            let output = {
                let name_filter = filter.as_deref().unwrap_or("");
                let records = session.records(&category.category(), name_filter)?;
                let records = search_text(records, search.as_deref().unwrap_or(""));
                render(&records, format)
            };
            session.persist();
            print!("{}", output);
        }
        Commands::Show {
            root,
            category,
            id,
            config: config_path,
        } => {
            let mut session = Session::open(&root, config_path.as_deref())?;
            let output = render_record(session.scan(&category.category())?.find(id)?);
            session.persist();
            print!("{}", output);
        }
        Commands::Headers {
            file,
            config: config_path,
        } => {
            let project_root = std::env::current_dir()?;
            let resolved = config::load_and_resolve(&project_root, config_path.as_deref())
                .context("failed to load configuration")?;
            let path = absolute(&file)?;
            let document = TextDocument::open(&path)?;
            let headers = find_step_headers(&document, &resolved.step_kinds)?;
            print!("{}", render_headers(&headers));
        }
        Commands::Candidates {
            root,
            target,
            similar,
            search,
            format,
            config: config_path,
        } => {
            let mut session = Session::open(&root, config_path.as_deref())?;
            let document = session.open_document(&target.file)?;
            let header = session.locate_header(&document, &target)?;
            let category = Category::kind(header.kind.as_str());
            let name_filter = if similar { header.suffix.as_str() } else { "" };

            let output = {
                let records = session.records(&category, name_filter)?;
                let records = exclude_span(records, document.uri(), &header.name_span);
                let records = search_text(records, search.as_deref().unwrap_or(""));
                render(&records, format)
            };
            session.persist();
            print!("{}", output);
        }
        Commands::Replace {
            root,
            target,
            with_id,
            config: config_path,
        } => {
            let mut session = Session::open(&root, config_path.as_deref())?;
            let mut document = session.open_document(&target.file)?;
            let header = session.locate_header(&document, &target)?;
            let category = Category::kind(header.kind.as_str());
            let kinds = session.config.step_kinds.clone();

            let (known_id, applied) = {
                let result = session.scan(&category)?;
                let known_id = result.find(with_id).is_ok();
                let applied = replace_step(
                    &mut document,
                    result,
                    with_id,
                    &category,
                    &kinds,
                    header.name_span,
                )?;
                (known_id, applied)
            };
            session.persist();

            if !known_id {
                anyhow::bail!("no {} step with id {}; nothing replaced", header.kind, with_id);
            }
            if !applied {
                anyhow::bail!(
                    "{} no longer heads a {} step in {}; nothing replaced",
                    header.name,
                    header.kind,
                    document.uri()
                );
            }
            document.save()?;
            println!(
                "Replaced {} in {}:{}",
                header.name,
                document.uri(),
                header.name_span.start.line + 1
            );
        }
        Commands::Append {
            root,
            category,
            id,
            file,
            config: config_path,
        } => {
            let mut session = Session::open(&root, config_path.as_deref())?;
            let mut document = session.open_document(&file)?;

            let name = {
                let record = session.scan(&category.category())?.find(id)?;
                append_to_end(&mut document, &record.canonical_text)?;
                record.name.clone()
            };
            session.persist();

            document.save()?;
            println!("Appended {} to {}", name, document.uri());
        }
        Commands::ResetCache { root } => {
            let root = absolute(&root)?;
            if ScanCache::remove_persisted(&root)? {
                let path = steplift_core::cache::cache_path(&root);
                println!("Removed scan cache: {}", path.display());
            } else {
                println!("No scan cache under {}", root.display());
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref());

                match resolved {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;

                println!("Configuration:");
                if let Some(ref p) = resolved.config_path {
                    println!("  Source: {}", p.display());
                } else {
                    println!("  Source: defaults (no config file found)");
                }
                println!();
                println!("Steps:");
                println!("  kinds: {}", resolved.step_kinds.join(", "));
                println!(
                    "  cache: {}",
                    if resolved.cache_enabled {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
                println!();
                println!("Filters:");
                println!(
                    "  include: {}",
                    if resolved.custom_include {
                        "custom patterns"
                    } else {
                        "default (**/scenarios/**/*.py)"
                    }
                );
                println!(
                    "  exclude: {}",
                    if resolved.custom_exclude {
                        "custom patterns"
                    } else {
                        "default (virtualenvs and caches)"
                    }
                );
            }
        },
    }

    Ok(())
}

fn render(records: &[&StepRecord], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(records),
        OutputFormat::Json => format!("{}\n", render_json(records)),
    }
}

/// Normalize a path to absolute
fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_relative() {
        Ok(std::env::current_dir()?.join(path))
    } else {
        Ok(path.to_path_buf())
    }
}
