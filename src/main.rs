//! frame-enhancer CLI - 解析、解码规则集并对堆栈试运行规则

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use frame_enhancer::{
    global_registry, init_enhancer, EnhancerConfig, EnhancerError, EnhancerResult, Enhancements,
    ExceptionData, Frame, FrameGroupingComponent, GroupingVariant,
};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "frame-enhancer")]
#[command(about = "Parse, inspect and dry-run stack trace enhancement rules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a rules file and print its compact form
    Parse {
        /// Rules file
        file: PathBuf,

        /// Base rule set ids (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        bases: Vec<String>,

        /// Format version (defaults to the latest)
        #[arg(long = "format-version")]
        format_version: Option<u32>,
    },

    /// Decode a compact form and print its rules as JSON
    Decode {
        /// Compact (base64) form
        compact: String,
    },

    /// Apply rules to a stack trace read from a JSON file
    Apply {
        /// Rules file
        #[arg(short, long, conflicts_with = "compact")]
        rules: Option<PathBuf>,

        /// Compact form of the rules
        #[arg(short, long)]
        compact: Option<String>,

        /// JSON file: {"frames": [...], "exception": {...}}
        #[arg(short, long)]
        frames: PathBuf,

        /// Grouping variant: app / system / default
        #[arg(long, default_value = "default")]
        variant: String,

        /// Event platform
        #[arg(short, long)]
        platform: Option<String>,
    },

    /// List built-in base rule sets
    Bases,
}

/// apply 子命令的输入
#[derive(Debug, Deserialize)]
struct StacktraceInput {
    frames: Vec<Frame>,
    #[serde(default)]
    exception: ExceptionData,
}

/// apply 子命令的输出
#[derive(Debug, Serialize)]
struct ApplyOutput<'a> {
    variant: GroupingVariant,
    frames: &'a [Frame],
    component: frame_enhancer::StacktraceGroupingComponent,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = init_enhancer(EnhancerConfig::default()).and_then(|_| match cli.command {
        Commands::Parse {
            file,
            bases,
            format_version,
        } => run_parse(&file, bases, format_version),
        Commands::Decode { compact } => run_decode(&compact),
        Commands::Apply {
            rules,
            compact,
            frames,
            variant,
            platform,
        } => run_apply(
            rules.as_deref(),
            compact.as_deref(),
            &frames,
            GroupingVariant::from_name(&variant),
            platform.as_deref(),
        ),
        Commands::Bases => run_bases(),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_parse(file: &Path, bases: Vec<String>, version: Option<u32>) -> EnhancerResult<()> {
    let text = fs::read_to_string(file)?;
    let enhancements = Enhancements::from_rules_text(&text, bases, None, version)?;
    let effective = enhancements.effective();
    eprintln!(
        "version: {} | classifier rules: {} | contributes rules: {}",
        enhancements.version(),
        effective.classifier_rules().len(),
        effective.contributes_rules().len()
    );
    println!("{}", enhancements.to_compact_form()?);
    Ok(())
}

fn run_decode(compact: &str) -> EnhancerResult<()> {
    let enhancements = Enhancements::from_compact_form(compact)?;
    println!("{}", serde_json::to_string_pretty(&enhancements.as_dict(true))?);
    Ok(())
}

fn run_apply(
    rules: Option<&Path>,
    compact: Option<&str>,
    frames_file: &Path,
    variant: GroupingVariant,
    platform: Option<&str>,
) -> EnhancerResult<()> {
    let enhancements = match (rules, compact) {
        (Some(path), _) => Enhancements::from_rules_text(&fs::read_to_string(path)?, Vec::new(), None, None)?,
        (None, Some(compact)) => Enhancements::from_compact_form(compact)?,
        (None, None) => {
            return Err(EnhancerError::InvalidInput(
                "either --rules or --compact is required".to_string(),
            ))
        }
    };

    let input: StacktraceInput = serde_json::from_str(&fs::read_to_string(frames_file)?)?;
    let mut frames = input.frames;
    enhancements.apply_category_and_updated_in_app_to_frames(&mut frames, platform, &input.exception);

    let components = frames
        .iter()
        .map(|frame| FrameGroupingComponent::new(frame.in_app.unwrap_or(false), true))
        .collect();
    let component = enhancements.assemble_stacktrace_component(
        variant,
        components,
        &frames,
        platform,
        &input.exception,
    );

    let output = ApplyOutput {
        variant,
        frames: &frames,
        component,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_bases() -> EnhancerResult<()> {
    let registry = global_registry()?;
    for id in registry.ids() {
        println!("{}", id);
    }
    Ok(())
}
