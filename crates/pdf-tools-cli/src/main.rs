mod logger;
mod ops;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use ops::EditOp;
use pdf_pages::{
    FieldValue, PageManager, PageManagerOptions, get_page_dimensions, has_form_fields,
    load_form_fields, load_pdf, load_pdf_bytes, load_source, save_pdf_bytes,
    validate_form_fields,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "pdft", about = "PDF page management CLI", version)]
struct Cli {
    /// Page manager options (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show page count, page sizes and whether the document has a form
    Info {
        /// Input PDF file
        input: PathBuf,
    },

    /// Apply page edits and write the result
    Edit {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output PDF file (defaults to a timestamped name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Edit operations, applied in order: delete:N, blank:N|end, dup:N,
        /// move:FROM:TO, insert:PATH:N|end
        #[arg(long = "op", required = true, num_args = 1..)]
        ops: Vec<EditOp>,
    },

    /// Concatenate PDFs
    Merge {
        /// Input PDF files, in order
        #[arg(short, long, required = true, num_args = 2..)]
        input: Vec<PathBuf>,

        /// Output PDF file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the document's form fields as JSON
    FormFields {
        /// Input PDF file
        input: PathBuf,
    },

    /// Fill form fields from a JSON object of field name to value
    FillForm {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// JSON file, e.g. {"name": "Ada", "agree": true, "size": ["M"]}
        #[arg(long)]
        values: PathBuf,

        /// Output PDF file (defaults to the configured form file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render page thumbnails to PNG files
    #[cfg(feature = "pdfium")]
    Thumbnails {
        /// Input PDF file
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for page-N.png files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Render scale (overrides the configured thumbnail scale)
        #[arg(long)]
        scale: Option<f32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logger::StderrLogger::new(logger::level_from_flags(cli.verbose, cli.quiet))
        .init()
        .context("Failed to install logger")?;

    let options = match &cli.config {
        Some(path) => PageManagerOptions::load(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => PageManagerOptions::default(),
    };

    match cli.command {
        Commands::Info { input } => {
            let doc = load_pdf(&input).await?;
            let pages = doc.get_pages();
            println!("{}", input.display());
            println!("  Pages: {}", pages.len());
            for (number, page_id) in pages {
                let (width, height) = get_page_dimensions(&doc, page_id);
                println!("  Page {}: {:.1} x {:.1} pt", number, width, height);
            }
            println!(
                "  Form fields: {}",
                if has_form_fields(&doc) { "yes" } else { "no" }
            );
        }

        Commands::Edit { input, output, ops } => {
            let mut manager = open_manager(&input, options).await?;
            for op in &ops {
                op.apply(&mut manager).await?;
            }
            export(&manager, output).await?;
        }

        Commands::Merge { input, output } => {
            let (first, rest) = input
                .split_first()
                .context("At least one input is required")?;
            let mut manager = open_manager(first, options).await?;
            for path in rest {
                let bytes = load_pdf_bytes(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                manager.insert_from_upload(bytes, None).await?;
            }
            export(&manager, output).await?;
        }

        Commands::FormFields { input } => {
            let bytes = load_pdf_bytes(&input).await?;
            let fields = tokio::task::spawn_blocking(move || load_form_fields(&bytes)).await??;
            println!("{}", serde_json::to_string_pretty(&fields)?);
        }

        Commands::FillForm {
            input,
            values,
            output,
        } => fill(&input, &values, output, options).await?,

        #[cfg(feature = "pdfium")]
        Commands::Thumbnails {
            input,
            output_dir,
            scale,
        } => {
            let mut options = options;
            if let Some(scale) = scale {
                options.thumbnail_scale = scale;
                options.validate()?;
            }
            thumbnails::render_all(&input, &output_dir, options).await?;
        }
    }

    Ok(())
}

async fn open_manager(input: &Path, options: PageManagerOptions) -> Result<PageManager> {
    let source = load_source(input)
        .await
        .with_context(|| format!("Failed to open {}", input.display()))?;
    log::info!("Opened {} ({} pages)", input.display(), source.page_count());

    let mut manager = PageManager::new(options);
    manager.open(Some(source));
    Ok(manager)
}

async fn export(manager: &PageManager, output: Option<PathBuf>) -> Result<()> {
    let exported = manager.export().await?;
    let path = output.unwrap_or_else(|| PathBuf::from(&exported.file_name));
    save_pdf_bytes(&exported.bytes, &path).await?;
    println!(
        "{} pages → {}",
        manager.model().visible_count(),
        path.display()
    );
    Ok(())
}

async fn fill(
    input: &Path,
    values: &Path,
    output: Option<PathBuf>,
    options: PageManagerOptions,
) -> Result<()> {
    let json = tokio::fs::read_to_string(values)
        .await
        .with_context(|| format!("Failed to read {}", values.display()))?;
    let mut values: BTreeMap<String, FieldValue> =
        serde_json::from_str(&json).context("Values must be a JSON object")?;

    let manager = open_manager(input, options).await?;
    let bytes = load_pdf_bytes(input).await?;
    let mut fields = tokio::task::spawn_blocking(move || load_form_fields(&bytes)).await??;
    if fields.is_empty() {
        bail!("{} has no form fields", input.display());
    }

    // Radio groups yield one field per widget, all sharing the group's name
    for field in fields.iter_mut() {
        if let Some(value) = values.get(&field.name).cloned() {
            if !field.set_value(value) {
                log::warn!("Value for '{}' does not fit its field type", field.name);
            }
        }
    }
    values.retain(|name, _| !fields.iter().any(|field| &field.name == name));
    for name in values.keys() {
        log::warn!("No field named '{}'", name);
    }
    for warning in validate_form_fields(&fields) {
        log::warn!("{}", warning);
    }

    let (filled, set_count) = manager.fill_form(fields).await?;
    let path = output.unwrap_or_else(|| PathBuf::from(&filled.file_name));
    save_pdf_bytes(&filled.bytes, &path).await?;
    println!("Filled {} fields → {}", set_count, path.display());
    Ok(())
}

#[cfg(feature = "pdfium")]
mod thumbnails {
    use super::open_manager;
    use anyhow::{Context, Result};
    use pdf_pages::render::{PdfiumBackend, RenderBackend};
    use pdf_pages::{PageManagerOptions, ThumbnailController, ThumbnailState};
    use std::path::Path;
    use std::sync::Arc;

    pub async fn render_all(
        input: &Path,
        output_dir: &Path,
        options: PageManagerOptions,
    ) -> Result<()> {
        let manager = open_manager(input, options).await?;
        tokio::fs::create_dir_all(output_dir).await?;

        let backend: Arc<dyn RenderBackend> = Arc::new(PdfiumBackend::new());
        let mut controller = ThumbnailController::new(backend, manager.options());

        let mut written = 0;
        for request in controller.sync(manager.model()) {
            let page_id = request.page_id;
            let outcome = request.ticket.await;
            controller.complete(page_id, request.token, outcome);

            let number = manager
                .model()
                .get(page_id)
                .and_then(|page| page.display_number)
                .unwrap_or_default();

            match controller.state(page_id) {
                Some(ThumbnailState::Ready) => {
                    let Some(bitmap) = controller.surface(page_id).and_then(|s| s.bitmap()) else {
                        continue;
                    };
                    let image = image::RgbaImage::from_raw(
                        bitmap.width as u32,
                        bitmap.height as u32,
                        bitmap.rgba_data,
                    )
                    .context("Bitmap size does not match its pixel data")?;
                    let path = output_dir.join(format!("page-{}.png", number));
                    image
                        .save(&path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    written += 1;
                }
                Some(ThumbnailState::Failed(message)) => {
                    log::warn!("Page {} failed to render: {}", number, message);
                }
                _ => {}
            }
        }

        controller.close();
        println!("{} thumbnails → {}", written, output_dir.display());
        Ok(())
    }
}
