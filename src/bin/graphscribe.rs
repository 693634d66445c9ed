//! Graphscribe CLI: identifiers, upsert scripts, and keyword restoration.
//!
//! Usage:
//!   graphscribe id new --title <title> --source <path> [--random] [--seed n]
//!   graphscribe id child <parent> --level <level> --index <n>
//!   graphscribe id parse <id>
//!   graphscribe serialize <record.json> [--out path] [--edition e]
//!   graphscribe restore <work-base> [--data-dir dir] [--out path]
//!   graphscribe run <record.json> --dest <path> [--data-dir dir] [--output-dir dir]

use clap::{Parser, Subcommand};
use graphscribe::id::{self, BaseMode, IdGenerator, IdLevel, Identifier};
use graphscribe::{AnalyzedRecord, PipelineConfig, Restore, StoreEdition};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "graphscribe",
    version,
    about = "Graph upsert scripts and keyword restoration for analyzed documents"
)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mint and inspect identifiers
    Id {
        #[command(subcommand)]
        action: IdAction,
    },
    /// Write the upsert script for an analyzed record
    Serialize {
        /// Analyzed record JSON file
        record: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Target store edition (community or enterprise)
        #[arg(long)]
        edition: Option<StoreEdition>,
    },
    /// Restore the keyword digest of a work
    Restore {
        /// Work base token
        work_base: String,
        /// Directory holding work artifacts
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Ingest a record, then restore its digest to a file
    Run {
        /// Analyzed record JSON file
        record: PathBuf,
        /// Where the restored text is written
        #[arg(long)]
        dest: PathBuf,
        /// Directory for work artifacts
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory for upsert scripts
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum IdAction {
    /// Mint a Work identifier
    New {
        #[arg(long)]
        title: String,
        #[arg(long)]
        source: String,
        /// Random base token instead of one derived from title and source
        #[arg(long)]
        random: bool,
        /// Seed for the random base token
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Mint a child identifier under an existing one
    Child {
        parent: String,
        /// segment, sentence, entity or tag
        #[arg(long)]
        level: IdLevel,
        /// Ordinal under the parent. Each invocation starts from fresh
        /// counters, so the ordinal is always given explicitly.
        #[arg(long)]
        index: u32,
    },
    /// Show the components of an identifier
    Parse { id: String },
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, String> {
    PipelineConfig::load_or_default(path).map_err(|e| format!("Failed to load configuration: {}", e))
}

fn emit(text: &str, out: Option<&Path>) -> Result<(), String> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("cannot create '{}': {}", parent.display(), e))?;
            }
            std::fs::write(path, text).map_err(|e| format!("cannot write '{}': {}", path.display(), e))
        }
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn cmd_id_new(config: &PipelineConfig, title: &str, source: &str, random: bool, seed: Option<u64>) -> i32 {
    let mut settings = config.ids.clone();
    if random {
        settings.mode = BaseMode::Random;
    }
    if seed.is_some() {
        settings.seed = seed;
    }
    let mut ids: IdGenerator = settings.generator();
    match ids.new_work_id(title, source) {
        Ok(id) => {
            println!("{}", id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_id_child(parent: &str, level: IdLevel, index: u32) -> i32 {
    let parent: Identifier = match parent.parse() {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let mut ids = IdGenerator::new(BaseMode::default());
    match ids.new_child_id(&parent, level, Some(index)) {
        Ok(id) => {
            println!("{}", id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_id_parse(raw: &str) -> i32 {
    let parsed = match id::parse(raw) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    println!("{:<10} {}", "base", parsed.base);
    println!("{:<10} {}", "date", parsed.date);
    println!("{:<10} {}", "timestamp", parsed.timestamp_ms);
    println!("{:<10} {}", "kind", parsed.kind());
    println!("{:<10} {}", "level", parsed.level());
    if let Some(ordinal) = parsed.ordinal() {
        println!("{:<10} {}", "ordinal", ordinal);
    }
    0
}

fn cmd_serialize(config: &PipelineConfig, record: &Path, out: Option<&Path>, edition: Option<StoreEdition>) -> i32 {
    let mut config = config.clone();
    if let Some(edition) = edition {
        config.edition = edition;
    }
    let serializer = match config.serializer() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let record = match AnalyzedRecord::load(record) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: cannot read '{}': {}", record.display(), e);
            return 1;
        }
    };
    let result = match out {
        Some(path) => serializer.write_script(&record, path).map(|path| {
            println!("Wrote {}", path.display());
        }),
        None => serializer.serialize(&record).map(|script| print!("{}", script)),
    };
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_restore(config: &PipelineConfig, work_base: &str, data_dir: Option<PathBuf>, out: Option<&Path>) -> i32 {
    let mut config = config.clone();
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    let text = match config.restorer().restore(work_base) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match emit(&text, out) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_run(
    config: &PipelineConfig,
    record: &Path,
    dest: &Path,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
) -> i32 {
    let mut config = config.clone();
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    let pipeline = match config.pipeline() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match pipeline.run(record, dest) {
        Ok(outcome) => {
            println!("Work      {}", outcome.work_id);
            println!("Script    {}", outcome.script_path.display());
            println!("Restored  {} ({} attempt(s))", outcome.destination.display(), outcome.attempts);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Id { action } => match action {
            IdAction::New {
                title,
                source,
                random,
                seed,
            } => cmd_id_new(&config, &title, &source, random, seed),
            IdAction::Child {
                parent,
                level,
                index,
            } => cmd_id_child(&parent, level, index),
            IdAction::Parse { id } => cmd_id_parse(&id),
        },
        Commands::Serialize {
            record,
            out,
            edition,
        } => cmd_serialize(&config, &record, out.as_deref(), edition),
        Commands::Restore {
            work_base,
            data_dir,
            out,
        } => cmd_restore(&config, &work_base, data_dir, out.as_deref()),
        Commands::Run {
            record,
            dest,
            data_dir,
            output_dir,
        } => cmd_run(&config, &record, &dest, data_dir, output_dir),
    };
    std::process::exit(code);
}
