//! CLI mode for board detection.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use boardscan::core::BoardScanResult;
use boardscan::core::traits::PageSource;
use boardscan::domain::{Annotation, PageBox, PageId, Size};
use boardscan::models::{ContourRectangleDetector, OnnxBoardClassifier};
use boardscan::overlay::{AnnotationOverlay, OverlayStyle};
use boardscan::pdf::PdfiumPageSource;
use boardscan::pipeline::{DetectionSession, PageDetector, TimingTable};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ScanConfig, parse_pages};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

const BAR_WIDTH: usize = 40;

struct Scan {
    source: Arc<PdfiumPageSource>,
    results: Vec<(PageId, Arc<[Annotation]>)>,
    timings: TimingTable,
    bounds_box: PageBox,
    crop_size: Size,
}

#[derive(Serialize)]
struct PageReport<'a> {
    /// 1-based page number.
    page: usize,
    annotations: &'a [Annotation],
}

#[derive(Serialize)]
struct DetectReport<'a> {
    file: String,
    pages: Vec<PageReport<'a>>,
    timings_ms: &'a TimingTable,
}

async fn scan(config: &ScanConfig) -> CliResult<Scan> {
    let start = Instant::now();
    let pipeline = config.pipeline()?;

    if let Err(e) = config.parallel().install_global_thread_pool() {
        warn!("Keeping existing classification thread pool: {}", e);
    }

    let source = Arc::new(PdfiumPageSource::open(&config.file)?);
    let pages: Vec<PageId> = match &config.pages {
        Some(spec) => parse_pages(spec, source.page_count())?
            .into_iter()
            .filter_map(|index| source.page(index))
            .collect(),
        None => source.pages(),
    };
    info!(
        "Opened {} ({} pages, {} selected)",
        config.file.display(),
        source.page_count(),
        pages.len()
    );

    let mut builder = OnnxBoardClassifier::builder()
        .config(pipeline.classifier.clone())
        .sessions(config.sessions);
    if let Some(session) = config.session()? {
        builder = builder.session_config(session);
    }
    let classifier = builder.build(&config.model)?;
    info!(
        "Classifier ready in {:.2}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let bounds_box = pipeline.thumbnail.bounds_box;
    let crop_size = pipeline.thumbnail.crop_size();
    let detector = PageDetector::new(
        Arc::new(ContourRectangleDetector::default()),
        Arc::new(classifier),
        pipeline,
    );
    let session = DetectionSession::spawn(source.clone(), detector);

    let detect_start = Instant::now();
    let results = session.detect_pages(&pages).await?;
    info!(
        "Detected {} pages in {:.2}ms",
        results.len(),
        detect_start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(Scan {
        source,
        results,
        timings: session.timings(),
        bounds_box,
        crop_size,
    })
}

/// Runs detection and prints the annotations.
pub async fn run_detect(
    config: &ScanConfig,
    output_format: &str,
    overlay_dir: Option<&Path>,
) -> CliResult<()> {
    let scan = scan(config).await?;

    match output_format {
        "json" => {
            let report = DetectReport {
                file: config.file.display().to_string(),
                pages: scan
                    .results
                    .iter()
                    .map(|(page, annotations)| PageReport {
                        page: page.index() + 1,
                        annotations: &annotations[..],
                    })
                    .collect(),
                timings_ms: &scan.timings,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            println!("\n=== Board Detection ===");
            println!("File: {}", config.file.display());
            println!();
            for (page, annotations) in &scan.results {
                print_page(page.index(), annotations);
            }
            print_timings(&scan.timings);
        }
    }

    if let Some(dir) = overlay_dir {
        write_overlays(&scan, dir)?;
    }
    Ok(())
}

/// Runs detection and prints only the timing table.
pub async fn run_timings(config: &ScanConfig) -> CliResult<()> {
    let scan = scan(config).await?;
    print_timings(&scan.timings);
    Ok(())
}

fn print_page(index: usize, annotations: &[Annotation]) {
    if annotations.is_empty() {
        println!("Page {}: no boards", index + 1);
        return;
    }
    println!("Page {}: {} regions", index + 1, annotations.len());
    for (idx, annotation) in annotations.iter().enumerate() {
        let rect = &annotation.rect;
        println!(
            "    [{}] {:<10} [{:.1}, {:.1}] {:.1}x{:.1}",
            idx + 1,
            annotation.kind,
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
    }
}

fn print_timings(timings: &TimingTable) {
    println!("\n--- Detection Time ---");
    let Some(summary) = timings.summary() else {
        println!("No pages timed.");
        return;
    };
    for (index, ms) in timings.iter() {
        let filled = if summary.max_ms > 0.0 {
            ((ms / summary.max_ms) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        println!("page {:>4} {:>9.1} ms |{}", index + 1, ms, "#".repeat(filled));
    }
    println!(
        "min {:.1} ms / max {:.1} ms / mean {:.1} ms over {} pages",
        summary.min_ms, summary.max_ms, summary.mean_ms, summary.pages
    );
}

fn write_overlays(scan: &Scan, dir: &Path) -> CliResult<()> {
    std::fs::create_dir_all(dir)?;
    for (page, annotations) in &scan.results {
        let Some(bounds) = scan.source.page_bounds(*page, scan.bounds_box) else {
            warn!("Skipping overlay for {}: no page bounds", page);
            continue;
        };
        let Some(mut image) = scan
            .source
            .render_thumbnail(*page, scan.crop_size, scan.bounds_box)
        else {
            warn!("Skipping overlay for {}: render failed", page);
            continue;
        };

        let scale = image.width() as f32 / bounds.width;
        let overlay = AnnotationOverlay::new(annotations, OverlayStyle::default());
        overlay.render_onto(&mut image, scale);

        let path = dir.join(overlay_file_name(page.index()));
        save_image(&image, &path)?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn overlay_file_name(page_index: usize) -> String {
    format!("page-{:04}.png", page_index + 1)
}

fn save_image(image: &image::RgbImage, path: &Path) -> BoardScanResult<()> {
    image.save(path)?;
    Ok(())
}
