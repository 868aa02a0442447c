//! ocrpdf CLI - add a hidden OCR text layer to scanned PDFs

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use image::ImageFormat;
use indicatif::{ProgressBar, ProgressStyle};

use ocrpdf::{
    process_batch, LopdfSource, PageObserver, PageOutcome, PageReport, Pipeline,
    ProcessOptions, ProcessReport, RasterImage, RebuildImage, SourceDocument, TesseractRecognizer,
    DEFAULT_LANGUAGE,
};

#[derive(Parser)]
#[command(name = "ocrpdf")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Add an invisible, selectable OCR text layer to scanned PDFs", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output PDF file
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    run: RunArgs,

    /// Write the page outcomes and diagnostics as JSON
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags shared by single-file and batch runs.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Also write a visible text-only <OUTPUT>-pure.pdf
    #[arg(short, long, global = true)]
    pure: bool,

    /// Dump every normalized page image as PNG
    #[arg(short = 'c', long, global = true)]
    preview: bool,

    /// Skip recognition; only rebuild the pages
    #[arg(short = 'n', long = "no-ocr", global = true)]
    no_ocr: bool,

    /// Recognition language
    #[arg(short, long, env = "OCRPDF_LANG", default_value = DEFAULT_LANGUAGE, global = true)]
    lang: String,

    /// Keep the original pages instead of rebuilding them
    #[arg(long, global = true)]
    in_place: bool,

    /// Re-encode JPEG page images instead of copying them
    #[arg(long, global = true)]
    reencode: bool,

    /// Keep image pages on which nothing was recognized
    #[arg(long = "keep-empty", global = true)]
    keep_empty: bool,

    /// Directory for preview images (implies --preview)
    #[arg(long, value_name = "DIR", global = true)]
    preview_dir: Option<PathBuf>,

    /// Tesseract executable
    #[arg(long, env = "OCRPDF_TESSERACT", default_value = "tesseract", global = true)]
    tesseract: PathBuf,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

impl RunArgs {
    fn options(&self) -> ProcessOptions {
        let mut options = ProcessOptions::new()
            .with_pure(self.pure)
            .with_preview(self.preview || self.preview_dir.is_some())
            .with_language(self.lang.clone())
            .with_keep_empty_pages(self.keep_empty);
        if self.no_ocr {
            options = options.skip_recognition();
        }
        if self.in_place {
            options = options.overlay();
        }
        if self.reencode {
            options = options.with_rebuild_image(RebuildImage::Normalized);
        }
        options
    }

    fn recognizer(&self) -> TesseractRecognizer {
        TesseractRecognizer::new(&self.tesseract)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Process several files in parallel
    Batch {
        /// Input PDF files
        #[arg(value_name = "INPUT", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        out_dir: PathBuf,
    },

    /// Show page sizes, rotations and images of a PDF
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.run.verbose);

    let result = match cli.command {
        Some(Commands::Batch { inputs, out_dir }) => cmd_batch(&inputs, &out_dir, &cli.run),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => match (cli.input, cli.output) {
            (Some(input), Some(output)) => {
                cmd_process(&input, &output, &cli.run, cli.report.as_deref())
            }
            _ => {
                println!("{}", "Usage: ocrpdf <INPUT> <OUTPUT>".yellow());
                println!("       ocrpdf --help for more information");
                Ok(())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Progress bar and preview writer.
struct CliObserver {
    bar: ProgressBar,
    preview_dir: Option<PathBuf>,
}

impl CliObserver {
    fn new(preview_dir: Option<PathBuf>) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar, preview_dir }
    }
}

impl PageObserver for CliObserver {
    fn page_started(&mut self, index: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message(format!("page {}", index + 1));
    }

    fn raster_ready(&mut self, index: usize, raster: &RasterImage) {
        let Some(dir) = &self.preview_dir else {
            return;
        };
        let path = dir.join(format!("page-{:04}.png", index + 1));
        if let Err(e) = raster.pixels.save_with_format(&path, ImageFormat::Png) {
            log::warn!("Failed to write preview {}: {}", path.display(), e);
        }
    }

    fn page_finished(&mut self, report: &PageReport) {
        if let PageOutcome::RecognitionFailed { message } = &report.outcome {
            self.bar
                .println(format!("{} page {}: {}", "warning".yellow(), report.index + 1, message));
        }
        self.bar.inc(1);
    }
}

fn preview_dir(output: &Path, run: &RunArgs) -> Option<PathBuf> {
    if let Some(dir) = &run.preview_dir {
        return Some(dir.clone());
    }
    run.preview.then(|| {
        let stem = output.file_stem().unwrap_or_default().to_string_lossy();
        output.with_file_name(format!("{}-preview", stem))
    })
}

fn cmd_process(
    input: &Path,
    output: &Path,
    run: &RunArgs,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    ocrpdf::read_header(input)?;
    let mut engine = run.recognizer();
    if !run.no_ocr && !engine.is_available() {
        return Err(format!(
            "cannot run {} (install tesseract or use --no-ocr)",
            run.tesseract.display()
        )
        .into());
    }

    let preview = preview_dir(output, run);
    if let Some(dir) = &preview {
        fs::create_dir_all(dir)?;
    }

    let source = LopdfSource::load_file(input)?;
    let mut observer = CliObserver::new(preview);
    let mut report = Pipeline::new(run.options(), &mut engine)
        .with_observer(&mut observer)
        .run(&source, output)?;
    report.input = Some(input.to_path_buf());
    observer.bar.finish_and_clear();

    print_summary(&report);
    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("{} {}", "Report saved to".green(), path.display());
    }
    Ok(())
}

fn cmd_batch(inputs: &[PathBuf], out_dir: &Path, run: &RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(out_dir)?;
    let jobs: Vec<(PathBuf, PathBuf)> = inputs
        .iter()
        .map(|input| {
            let name = input.file_name().unwrap_or_default();
            (input.clone(), out_dir.join(name))
        })
        .collect();

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Processing {} files...", jobs.len()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let options = run.options();
    let results = process_batch(&jobs, &options, || run.recognizer());
    spinner.finish_and_clear();

    let mut failed = 0;
    for ((input, output), result) in jobs.iter().zip(results) {
        match result {
            Ok(report) => println!(
                "{} {} -> {} ({} words)",
                "✓".green(),
                input.display(),
                output.display(),
                report.words_placed()
            ),
            Err(e) => {
                failed += 1;
                println!("{} {}: {}", "✗".red(), input.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} files failed", failed, jobs.len()).into());
    }
    Ok(())
}

fn print_summary(report: &ProcessReport) {
    println!(
        "{} {} words on {} of {} pages",
        "Done!".green().bold(),
        report.words_placed(),
        report.pages_with_text(),
        report.pages.len()
    );
    for output in &report.outputs {
        println!("  {} {} ({} pages)", "→".dimmed(), output.path.display(), output.pages);
    }
    for diagnostic in &report.diagnostics {
        println!("  {} {}", "decode:".yellow(), diagnostic);
    }
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let header = ocrpdf::read_header(input)?;
    let source = LopdfSource::load_file(input)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Format".bold(), header);
    println!("{}: {}", "Pages".bold(), source.page_count());

    match source.page_labels() {
        Ok(labels) => println!("{}: {}", "Label ranges".bold(), labels.len()),
        Err(e) => println!("{}: {}", "Label ranges".bold(), e.to_string().red()),
    }
    match source.outline() {
        Ok(outline) => println!("{}: {}", "Bookmarks".bold(), outline.total_items()),
        Err(e) => println!("{}: {}", "Bookmarks".bold(), e.to_string().red()),
    }

    println!();
    println!("{}", "Pages".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for index in 0..source.page_count() {
        let page = source.source_page(index)?;
        let image = match &page.image {
            Some(handle) => match source.image_stream(handle) {
                Ok(stream) => format!(
                    "{} {}x{} {}",
                    handle,
                    stream.width,
                    stream.height,
                    stream.color_space.label()
                ),
                Err(e) => format!("{} ({})", handle, e),
            },
            None => "no image".dimmed().to_string(),
        };
        println!(
            "{:>4}  {:.0}x{:.0} pt  rot {:>3}  {}",
            page.number(),
            page.width,
            page.height,
            page.rotation.degrees(),
            image
        );
    }
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "ocrpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("OCR text layer tool for scanned PDFs");
    println!();
    println!("License: MIT");
}
