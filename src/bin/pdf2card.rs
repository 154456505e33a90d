//! CLI binary for pdf2card.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` / `CardJob` and writes images.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf2card::pipeline::crop::native_rect;
use pdf2card::pipeline::encode::encode_jpeg;
use pdf2card::pipeline::overlay::{display_image, render_selection_overlay};
use pdf2card::pipeline::postprocess::fit_for_chat;
use pdf2card::{
    build_card, generate_thumbnails, inspect, rasterize_document, rasterize_stream, write_atomic,
    write_png, CardFont, CardJob, CardMetadata, Category, CropSpec, Difficulty, DisplayTransform,
    PageSelection, PipelineConfig, ProgressCallback, RenderProgressCallback, ThemeKey,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_render_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_render_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
    }

    fn on_page_rendered(&self, page: usize, total: usize, width: u32, height: u32) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page + 1,
            total,
            dim(&format!("{width}×{height}px")),
        ));
        self.bar.inc(1);
    }

    fn on_page_failed(&self, page: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page + 1,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_render_complete(&self, total_pages: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages rendered",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages rendered  ({} failed)",
                if success_count == 0 { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Page count and page sizes
  pdf2card inspect exam.pdf

  # Render pages 1-4 to PNG files
  pdf2card pages exam.pdf --pages 1-4 -o pages/

  # JPEG thumbnails of every page
  pdf2card thumbnails exam.pdf -o thumbs/

  # Check a selection before cutting it (display pixels)
  pdf2card preview exam.pdf --page 3 --rect 40,120,600,380 -o preview.png

  # Problem 22 spans two pages: crop both, stack them, compose the card
  pdf2card card exam.pdf --crop 7:60,900,1100,700 --crop 8:60,80,1100,500 \
      --number 22 --year 2025 --difficulty 4 --category 미분 --theme dark

Selections are in display pixels: each page is shown at its rendered size,
scaled down to fit --max-display (default 2000) if larger.

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     Path to libpdfium (file or directory)
  PDF2CARD_FONT       Font used for card text (TTF/OTF with Hangul glyphs)
  RUST_LOG            Override log filter (e.g. pdf2card=debug)
"#;

/// Crop exam problems out of PDFs and compose them into problem cards.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2card",
    version,
    about = "Crop exam problems out of PDFs and compose them into problem cards",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// PDF user password for encrypted documents.
    #[arg(long, global = true, env = "PDF2CARD_PASSWORD")]
    password: Option<String>,

    /// pdfium shared library (file or directory).
    #[arg(long, global = true, env = "PDF2CARD_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Font for card and label text.
    #[arg(long, global = true, env = "PDF2CARD_FONT")]
    font: Option<PathBuf>,

    /// Page render scale (0.5–8.0).
    #[arg(long, global = true, env = "PDF2CARD_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Largest display width/height that selections are measured in.
    #[arg(long, global = true, env = "PDF2CARD_MAX_DISPLAY", default_value_t = 2000)]
    max_display: u32,

    /// Disable progress bar.
    #[arg(long, global = true, env = "PDF2CARD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF2CARD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF2CARD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print page count and page sizes.
    Inspect {
        input: PathBuf,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Render pages to PNG files.
    Pages {
        input: PathBuf,
        /// Page selection: all, 5, 3-15, or 1,3,5,7.
        #[arg(long, env = "PDF2CARD_PAGES", default_value = "all")]
        pages: String,
        /// Output directory.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Write JPEG thumbnails; failed pages are reported, not fatal.
    Thumbnails {
        input: PathBuf,
        #[arg(long, env = "PDF2CARD_PAGES", default_value = "all")]
        pages: String,
        /// Thumbnail scale (0.05–1.0).
        #[arg(long, env = "PDF2CARD_THUMB_SCALE", default_value_t = 0.3)]
        thumb_scale: f32,
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Write a page with a selection highlighted.
    Preview {
        input: PathBuf,
        /// 1-indexed page.
        #[arg(long)]
        page: usize,
        /// Selection in display pixels: X,Y,W,H.
        #[arg(long)]
        rect: String,
        #[arg(short, long, default_value = "preview.png")]
        output: PathBuf,
    },

    /// Crop, merge and compose a problem card.
    Card(CardArgs),
}

#[derive(Args, Debug)]
struct CardArgs {
    input: PathBuf,

    /// Selection PAGE:X,Y,W,H in display pixels; repeat to stack several.
    #[arg(long = "crop", required = true, value_parser = CropSpec::from_str)]
    crops: Vec<CropSpec>,

    /// Problem number.
    #[arg(long, default_value_t = 1)]
    number: u32,

    #[arg(long, default_value_t = 2025)]
    year: u32,

    /// Exam name, e.g. 수능, 6월 모의평가.
    #[arg(long, default_value = "수능")]
    exam: String,

    /// Points: 2, 3 or 4.
    #[arg(long, default_value = "3", value_parser = Difficulty::from_str)]
    difficulty: Difficulty,

    /// Category, e.g. 미분, 적분, 수열.
    #[arg(long, default_value = "미분", value_parser = Category::from_str)]
    category: Category,

    /// Colour theme: blue, dark, warm, mint, grape, forest.
    #[arg(long, env = "PDF2CARD_THEME", default_value = "blue", value_parser = ThemeKey::from_str)]
    theme: ThemeKey,

    /// Trim white margins off the merged problem image.
    #[arg(long)]
    trim: bool,

    /// Card output file or directory. Defaults to the suggested file name.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the merged problem image here.
    #[arg(long)]
    merged: Option<PathBuf>,

    /// Also write a chat-sized copy of the merged image here.
    #[arg(long)]
    chat: Option<PathBuf>,

    /// Vertical gap between stacked crops.
    #[arg(long, env = "PDF2CARD_MERGE_GAP", default_value_t = 16)]
    gap: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let renders_pages = !matches!(cli.command, Command::Inspect { .. });
    let show_progress = !g.quiet && !g.no_progress && renders_pages;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RenderProgressCallback>)
    } else {
        None
    };

    match &cli.command {
        Command::Inspect { input, json } => {
            let config = build_config(g, None, |b| b)?;
            let info = inspect(input, &config).await.context("Failed to inspect document")?;
            if *json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialize document info")?
                );
            } else {
                println!("File:   {}", info.name);
                println!("Kind:   {:?}", info.kind);
                println!("Pages:  {}", info.page_count);
                for (i, (w, h)) in info.page_sizes.iter().enumerate() {
                    println!("  {:>3}  {:.1} × {:.1}", i + 1, w, h);
                }
            }
        }

        Command::Pages {
            input,
            pages,
            output,
        } => {
            let selection = parse_pages(pages)?;
            let config = build_config(g, progress_cb, |b| b.pages(selection))?;
            let mut stream = rasterize_stream(input, &config)
                .await
                .context("Failed to open document")?;
            let mut written = 0usize;
            while let Some(page) = stream.next().await {
                let page = page.context("Rendering failed")?;
                let path = output.join(format!("page_{:03}.png", page.index + 1));
                write_png(&path, &page.image)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                written += 1;
            }
            if !g.quiet {
                eprintln!("{}  {} pages  →  {}", green("✔"), written, bold(&output.display().to_string()));
            }
        }

        Command::Thumbnails {
            input,
            pages,
            thumb_scale,
            output,
        } => {
            let selection = parse_pages(pages)?;
            let config = build_config(g, progress_cb, |b| {
                b.pages(selection).thumbnail_scale(*thumb_scale)
            })?;
            let thumbs = generate_thumbnails(input, &config)
                .await
                .context("Failed to open document")?;
            let mut failed = 0usize;
            for t in &thumbs {
                match &t.result {
                    Ok(img) => {
                        let path = output.join(format!("thumb_{:03}.jpg", t.index + 1));
                        write_atomic(&path, &img.jpeg)
                            .await
                            .with_context(|| format!("Failed to write {}", path.display()))?;
                    }
                    Err(e) => {
                        failed += 1;
                        eprintln!("  {} {}  {}", red("✗"), t.label, red(&e.to_string()));
                    }
                }
            }
            if !g.quiet {
                eprintln!(
                    "{}  {}/{} thumbnails  →  {}",
                    if failed == 0 { green("✔") } else { cyan("⚠") },
                    thumbs.len() - failed,
                    thumbs.len(),
                    bold(&output.display().to_string()),
                );
            }
        }

        Command::Preview {
            input,
            page,
            rect,
            output,
        } => {
            let spec: CropSpec = format!("{page}:{rect}")
                .parse()
                .context("Invalid --rect")?;
            let config = build_config(g, progress_cb, |b| b.pages(PageSelection::Single(*page)))?;
            write_preview(input, &spec, output, &config).await?;
            if !g.quiet {
                eprintln!("{}  preview  →  {}", green("✔"), bold(&output.display().to_string()));
            }
        }

        Command::Card(args) => {
            let config = build_config(g, progress_cb, |b| b.merge_gap(args.gap))?;
            run_card(args, &config, g.quiet).await?;
        }
    }

    Ok(())
}

/// Render one page, highlight the selection and write it.
async fn write_preview(
    input: &Path,
    spec: &CropSpec,
    output: &Path,
    config: &PipelineConfig,
) -> Result<()> {
    let pages = rasterize_document(input, config)
        .await
        .context("Failed to render page")?;
    let page = pages
        .first()
        .with_context(|| format!("Page {} was not rendered", spec.page))?;
    let max = config.max_display_dim;
    let transform = DisplayTransform::fit(page.image.width(), page.image.height(), max, max);
    let display = display_image(&page.image, &transform)?;
    let native = native_rect(page.image.width(), page.image.height(), &transform, &spec.rect)
        .ok()
        .map(|r| (r.w, r.h));
    let font = CardFont::resolve(config.font_path.as_ref())?;
    let preview = render_selection_overlay(&display, &spec.rect, native, font);
    write_png(output, &preview).await.context("Failed to write preview")?;
    Ok(())
}

async fn run_card(args: &CardArgs, config: &PipelineConfig, quiet: bool) -> Result<()> {
    let job = CardJob {
        crops: args.crops.clone(),
        metadata: CardMetadata {
            problem_number: args.number,
            year: args.year,
            exam_name: args.exam.clone(),
            difficulty: args.difficulty,
            category: args.category,
            theme_key: args.theme,
        },
        trim: args.trim,
    };

    let out = build_card(&args.input, &job, config)
        .await
        .context("Card generation failed")?;

    let card_path = match &args.output {
        Some(p) if p.is_dir() => p.join(&out.file_name),
        Some(p) => p.clone(),
        None => PathBuf::from(&out.file_name),
    };
    write_png(&card_path, &out.card)
        .await
        .context("Failed to write card")?;

    if let Some(path) = &args.merged {
        write_png(path, &out.merged)
            .await
            .context("Failed to write merged image")?;
    }
    if let Some(path) = &args.chat {
        let chat = fit_for_chat(&out.merged);
        let bytes = if has_jpeg_ext(path) {
            encode_jpeg(&chat, 90)?
        } else {
            pdf2card::pipeline::encode::encode_png(&chat)?
        };
        write_atomic(path, &bytes)
            .await
            .context("Failed to write chat image")?;
    }

    if !quiet {
        eprintln!(
            "{}  {} crop(s)  {}×{}  {}ms  →  {}",
            green("✔"),
            out.crops.len(),
            out.card.width(),
            out.card.height(),
            out.duration_ms,
            bold(&card_path.display().to_string()),
        );
    }
    Ok(())
}

fn has_jpeg_ext(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

/// Map global CLI args to `PipelineConfig`; `extra` applies per-command settings.
fn build_config(
    g: &GlobalArgs,
    progress: Option<ProgressCallback>,
    extra: impl FnOnce(pdf2card::PipelineConfigBuilder) -> pdf2card::PipelineConfigBuilder,
) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .render_scale(g.scale)
        .max_display_dim(g.max_display);
    if let Some(pwd) = &g.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(font) = &g.font {
        builder = builder.font_path(font.clone());
    }
    if let Some(lib) = &g.pdfium_lib {
        builder = builder.pdfium_lib_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    extra(builder).build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
