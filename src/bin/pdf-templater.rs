//! PDF Templater CLI tool
//!
//! Assembles a report from a cover template, rendered body pages and an
//! end page, overlaying a template onto every body page.

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use pdf_templater::assembler::DocumentInfo;
use pdf_templater::config::load_options;
use pdf_templater::pdf::{extract_metadata, OverlayPlacement, PageSource};
use pdf_templater::report::{build_report, ReportOptions};

/// PDF Templater - cover, templated body and end page in one PDF
#[derive(Parser)]
#[command(name = "pdf-templater")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Build from a configuration file
    pdf-templater build --config report.toml -o GeneratedReport.pdf

    # Build from the default resources in the current directory
    pdf-templater build -o GeneratedReport.pdf --title \"My report\" --author \"Ada\" \\
        --field employeeName=Ada --field EmployeeLastName=Lovelace

    # Show page count, metadata and form fields of a PDF
    pdf-templater info Portada.pdf")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a report PDF
    Build {
        /// TOML report configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Cover template (form fields are filled and flattened)
        #[arg(long)]
        cover: Option<PathBuf>,

        /// End page document (appended verbatim)
        #[arg(long)]
        end: Option<PathBuf>,

        /// Overlay template drawn onto every body page
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Cover field value as NAME=VALUE (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Document author
        #[arg(long)]
        author: Option<String>,

        /// Draw the overlay beneath the page content instead of on top
        #[arg(long)]
        background: bool,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Build {
            config,
            output,
            cover,
            end,
            overlay,
            fields,
            title,
            author,
            background,
            open,
        } => {
            let overrides = Overrides {
                cover,
                end,
                overlay,
                fields,
                title,
                author,
                background,
            };
            cmd_build(config, overrides, output, open)
        }
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "pdf_templater=warn",
        1 => "pdf_templater=debug",
        _ => "pdf_templater=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Parse a NAME=VALUE cover field argument
fn parse_field(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}

/// Command-line values that take precedence over the configuration file
struct Overrides {
    cover: Option<PathBuf>,
    end: Option<PathBuf>,
    overlay: Option<PathBuf>,
    fields: Vec<(String, String)>,
    title: Option<String>,
    author: Option<String>,
    background: bool,
}

fn report_options(config: Option<PathBuf>, overrides: Overrides) -> anyhow::Result<ReportOptions> {
    let mut options = match config {
        Some(path) => load_options(&path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => {
            let (Some(title), Some(author)) = (overrides.title.clone(), overrides.author.clone()) else {
                bail!("--title and --author are required without --config");
            };
            ReportOptions::new(
                DocumentInfo::new(title, author),
                PathBuf::from("Portada.pdf").into(),
                PathBuf::from("EndPage.pdf").into(),
                PathBuf::from("TemplateInfo.pdf").into(),
            )
        }
    };

    if let Some(cover) = overrides.cover {
        options.cover = cover.into();
    }
    if let Some(end) = overrides.end {
        options.end = end.into();
    }
    if let Some(overlay) = overrides.overlay {
        options.overlay = overlay.into();
    }
    if let Some(title) = overrides.title {
        options.info.title = title;
    }
    if let Some(author) = overrides.author {
        options.info.author = author;
    }
    if overrides.background {
        options.placement = OverlayPlacement::Background;
    }
    options.cover_fields.extend(overrides.fields);

    Ok(options)
}

/// Open a file with the system default application
fn open_file(path: &Path) -> anyhow::Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()?;
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", &path.display().to_string()])
            .spawn()?;
    }
    Ok(())
}

/// Assemble the report and write it to disk
fn cmd_build(
    config: Option<PathBuf>,
    overrides: Overrides,
    output: PathBuf,
    open: bool,
) -> anyhow::Result<()> {
    let options = report_options(config, overrides)?;

    eprintln!("Assembling report '{}'...", options.info.title);
    let report = build_report(&options)?;

    std::fs::write(&output, &report.bytes)
        .with_context(|| format!("writing {}", output.display()))?;

    for failure in &report.overlay_failures {
        eprintln!("Warning: {}", failure);
    }
    eprintln!(
        "Output: {} ({} pages: {} cover, {} body, {} end)",
        output.display(),
        report.page_count,
        report.cover_pages,
        report.body_pages,
        report.end_pages
    );

    if open {
        open_file(&output)?;
    }

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> anyhow::Result<()> {
    let metadata = extract_metadata(input)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if let Some(author) = metadata.author {
        println!("Author: {}", author);
    }
    if let Some(creator) = metadata.creator {
        println!("Creator: {}", creator);
    }

    let fields = PageSource::open(input)?.fields();
    if !fields.is_empty() {
        println!("Form fields:");
        for field in fields {
            println!(
                "  {} ({}){}",
                field.name,
                field.field_type.as_deref().unwrap_or("?"),
                field.value.map(|v| format!(" = {}", v)).unwrap_or_default()
            );
        }
    }

    Ok(())
}
