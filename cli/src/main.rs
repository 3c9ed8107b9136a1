//! unmark CLI - highlighted PDF passage extraction tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use unmark::batch::extract_files_with;
use unmark::summarize::{summarize, GeminiClient, GeminiConfig, SummaryRequest, DEFAULT_MODEL};
use unmark::{
    extract_with_options, list_annotations, CleanupOptions, CleanupPreset, ExtractOptions,
    Fragment, JsonFormat, PageSelection, TextOptions, DEFAULT_MARGIN,
};

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "unmark")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Extract highlighted and underlined passages from PDF documents")]
#[command(long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    #[command(flatten)]
    extract: ExtractArgs,

    /// Refuse input files larger than this many megabytes
    #[arg(long, global = true, default_value_t = 50)]
    max_size_mb: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone)]
struct ExtractArgs {
    /// Output file (stdout if not specified)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output JSON instead of `[Pg N] text` lines
    #[arg(long)]
    json: bool,

    /// Output compact JSON
    #[arg(long, requires = "json")]
    compact: bool,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Padding added around each annotation, in page units
    #[arg(long, default_value_t = DEFAULT_MARGIN)]
    margin: f32,

    /// Skip pages whose content cannot be read instead of failing
    #[arg(long)]
    lenient: bool,

    /// Text cleanup preset
    #[arg(long, value_enum)]
    cleanup: Option<CleanupLevel>,

    /// Page label in text output
    #[arg(long, default_value = unmark::render::DEFAULT_PAGE_LABEL)]
    label: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract highlighted and underlined text (default)
    Extract {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        args: ExtractArgs,
    },

    /// List every annotation in the document
    Annots {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract many files in parallel, one .txt per input
    Batch {
        /// Input PDF files
        #[arg(value_name = "FILES", required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Skip pages whose content cannot be read instead of failing
        #[arg(long)]
        lenient: bool,

        /// Text cleanup preset
        #[arg(long, value_enum)]
        cleanup: Option<CleanupLevel>,

        /// Page label in text output
        #[arg(long, default_value = unmark::render::DEFAULT_PAGE_LABEL)]
        label: String,
    },

    /// Summarize the highlighted passages with Gemini
    Summarize {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file, .md or .txt (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Gemini API key
        #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Gemini model
        #[arg(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// File with custom summary instructions
        #[arg(long, value_name = "FILE")]
        prompt_file: Option<PathBuf>,

        /// Skip pages whose content cannot be read instead of failing
        #[arg(long)]
        lenient: bool,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum CleanupLevel {
    /// Unicode normalization and whitespace only
    Minimal,
    /// Also ligatures, hyphenation and line joins
    Standard,
}

impl From<CleanupLevel> for CleanupPreset {
    fn from(level: CleanupLevel) -> Self {
        match level {
            CleanupLevel::Minimal => CleanupPreset::Minimal,
            CleanupLevel::Standard => CleanupPreset::Standard,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let max_size_mb = cli.max_size_mb;

    let result = match cli.command {
        Some(Commands::Extract { input, args }) => cmd_extract(&input, &args, max_size_mb),
        Some(Commands::Annots { input, json }) => cmd_annots(&input, json, max_size_mb),
        Some(Commands::Batch {
            inputs,
            output,
            lenient,
            cleanup,
            label,
        }) => cmd_batch(
            &inputs,
            output.as_deref(),
            lenient,
            cleanup,
            &label,
            max_size_mb,
        ),
        Some(Commands::Summarize {
            input,
            output,
            api_key,
            model,
            prompt_file,
            lenient,
        }) => cmd_summarize(
            &input,
            output.as_deref(),
            api_key,
            &model,
            prompt_file.as_deref(),
            lenient,
            max_size_mb,
        ),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: extract if input is provided
            if let Some(input) = cli.input {
                cmd_extract(&input, &cli.extract, max_size_mb)
            } else {
                println!("{}", "Usage: unmark <FILE>".yellow());
                println!("       unmark --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Read an input file, refusing it when larger than `max_size_mb`.
fn read_input(path: &Path, max_size_mb: u64) -> CliResult<Vec<u8>> {
    check_size(path, max_size_mb)?;
    Ok(fs::read(path)?)
}

fn check_size(path: &Path, max_size_mb: u64) -> CliResult {
    let size = fs::metadata(path)
        .map_err(|e| format!("{}: {}", path.display(), e))?
        .len();
    if size > max_size_mb.saturating_mul(1024 * 1024) {
        return Err(format!(
            "{} is {:.1} MB, over the {} MB limit (see --max-size-mb)",
            path.display(),
            size as f64 / (1024.0 * 1024.0),
            max_size_mb
        )
        .into());
    }
    Ok(())
}

fn parse_pages(pages: Option<&str>) -> CliResult<PageSelection> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p)?),
        None => Ok(PageSelection::All),
    }
}

fn build_options(
    lenient: bool,
    cleanup: Option<CleanupLevel>,
    pages: PageSelection,
) -> ExtractOptions {
    let mut options = ExtractOptions::new().with_pages(pages);
    if lenient {
        options = options.lenient();
    }
    if let Some(level) = cleanup {
        options = options.with_cleanup(CleanupOptions::from_preset(level.into()));
    }
    options
}

fn warn_empty(input: &Path) {
    eprintln!(
        "{} {}",
        "no highlights detected in".yellow(),
        input.display().to_string().yellow()
    );
}

fn write_or_print(output: Option<&Path>, content: &str) -> CliResult {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else if !content.is_empty() {
        println!("{}", content);
    }
    Ok(())
}

fn render(fragments: &[Fragment], args: &ExtractArgs) -> CliResult<String> {
    if args.json {
        let format = if args.compact {
            JsonFormat::Compact
        } else {
            JsonFormat::Pretty
        };
        Ok(unmark::render::to_json(fragments, format)?)
    } else {
        let options = TextOptions::new().with_label(args.label.as_str());
        Ok(unmark::render::to_text(fragments, &options))
    }
}

fn cmd_extract(input: &Path, args: &ExtractArgs, max_size_mb: u64) -> CliResult {
    let data = read_input(input, max_size_mb)?;
    let options = build_options(args.lenient, args.cleanup, parse_pages(args.pages.as_deref())?)
        .with_margin(args.margin);

    let fragments = extract_with_options(&data, options)?;
    if fragments.is_empty() {
        warn_empty(input);
    }

    write_or_print(args.output.as_deref(), &render(&fragments, args)?)
}

fn cmd_annots(input: &Path, json: bool, max_size_mb: u64) -> CliResult {
    let data = read_input(input, max_size_mb)?;
    let annotations = list_annotations(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&annotations)?);
        return Ok(());
    }

    println!("page\tkind\tx0\ty0\tx1\ty1\tauthor\tcontents");
    for annot in &annotations {
        println!(
            "{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}\t{}\t{}",
            annot.page,
            annot.kind,
            annot.rect.x0,
            annot.rect.y0,
            annot.rect.x1,
            annot.rect.y1,
            annot.author.as_deref().unwrap_or(""),
            annot.contents.as_deref().unwrap_or(""),
        );
    }

    if annotations.is_empty() {
        eprintln!("{}", "no annotations found".yellow());
    }
    Ok(())
}

fn cmd_batch(
    inputs: &[PathBuf],
    output: Option<&Path>,
    lenient: bool,
    cleanup: Option<CleanupLevel>,
    label: &str,
    max_size_mb: u64,
) -> CliResult {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&output_dir)?;

    let mut failed = 0;
    let mut accepted = Vec::new();
    for input in inputs {
        match check_size(input, max_size_mb) {
            Ok(()) => accepted.push(input.clone()),
            Err(e) => {
                eprintln!("{}: {}", "Error".red().bold(), e);
                failed += 1;
            }
        }
    }

    let pb = ProgressBar::new(accepted.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Extracting...");

    let options = build_options(lenient, cleanup, PageSelection::All);
    let items = extract_files_with(&accepted, &options, |_| pb.inc(1));
    pb.finish_and_clear();

    let text_options = TextOptions::new().with_label(label);
    for item in items {
        match item.result {
            Ok(fragments) => {
                let stem = item.path.file_stem().unwrap_or_default().to_string_lossy();
                let target = output_dir.join(format!("{}.txt", stem));
                fs::write(&target, unmark::render::to_text(&fragments, &text_options))?;
                if fragments.is_empty() {
                    warn_empty(&item.path);
                }
                println!(
                    "{} {} ({} passages)",
                    "Saved".green(),
                    target.display(),
                    fragments.len()
                );
            }
            Err(e) => {
                eprintln!("{}: {}: {}", "Error".red().bold(), item.path.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} files failed", failed, inputs.len()).into());
    }
    println!("\n{} {} files extracted", "Done!".green().bold(), inputs.len());
    Ok(())
}

fn cmd_summarize(
    input: &Path,
    output: Option<&Path>,
    api_key: Option<String>,
    model: &str,
    prompt_file: Option<&Path>,
    lenient: bool,
    max_size_mb: u64,
) -> CliResult {
    if let Some(path) = output {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(ext, "md" | "txt") {
            return Err(format!(
                "unsupported output format for {}: use .md or .txt",
                path.display()
            )
            .into());
        }
    }

    let data = read_input(input, max_size_mb)?;
    let fragments = extract_with_options(&data, build_options(lenient, None, PageSelection::All))?;
    if fragments.is_empty() {
        warn_empty(input);
        return Ok(());
    }

    let request = match prompt_file {
        Some(path) => SummaryRequest::from_file(path)?,
        None => SummaryRequest::default(),
    };

    let mut config = GeminiConfig::new().with_model(model);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    let client = GeminiClient::new(config)?;

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!("Summarizing {} passages...", fragments.len()));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    let summary = summarize(&client, &fragments, &request);
    pb.finish_and_clear();

    write_or_print(output, summary?.trim_end())
}

fn cmd_version() {
    println!("{} {}", "unmark".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Highlighted PDF passage extraction tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/unmark".dimmed());
    println!("License: MIT");
}
