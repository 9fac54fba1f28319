//! Exports the rectangles found on PDF pages as square classifier inputs.
//!
//! Every document gets its own folder under the output directory, named after
//! the file stem in snake case. Each crop is aspect-fitted onto a white square
//! and written as `rect_<page>_<n>.png`, with 1-based, two-digit page numbers.

use std::path::{Path, PathBuf};

use boardscan::core::BoardScanResult;
use boardscan::core::config::{PipelineConfig, RectangleDetectionConfig};
use boardscan::core::traits::{PageSource, RectangleDetector};
use boardscan::domain::{RectangleObservation, Size};
use boardscan::models::ContourRectangleDetector;
use boardscan::pdf::PdfiumPageSource;
use boardscan::processors::{aspect_fit_and_pad, crop_rect};
use image::RgbImage;
use tracing::{debug, info, warn};

use crate::cli::CliResult;

const PAD_COLOR: [u8; 3] = [255, 255, 255];

#[derive(Clone, Debug)]
pub struct ExtractConfig {
    /// Documents to export.
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Edge length of the square crops.
    pub size: u32,
    pub pipeline: PipelineConfig,
}

/// Collects the PDF files below `dir`, sorted by path.
pub fn find_pdfs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
            {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Lowercases `name` and collapses every run of non-word characters into `_`.
pub fn snake_case_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' {
            out.extend(c.to_lowercase());
            in_separator = false;
        } else if !in_separator {
            out.push('_');
            in_separator = true;
        }
    }
    out
}

pub fn crop_file_name(page_index: usize, region: usize) -> String {
    format!("rect_{:02}_{}.png", page_index + 1, region)
}

/// Crops, pads and saves `observations` from one rendered page.
///
/// Candidates that fall outside the image are skipped. Returns the number of
/// files written.
pub fn export_regions(
    image: &RgbImage,
    observations: &[RectangleObservation],
    size: u32,
    dir: &Path,
    page_index: usize,
) -> BoardScanResult<usize> {
    let image_size = Size::from_pixels(image.width(), image.height());
    let mut written = 0;
    for observation in observations {
        let rect = observation.bbox.to_top_left(image_size);
        let region = match crop_rect(image, &rect) {
            Ok(region) => region,
            Err(e) => {
                debug!("Page {}: skipping {:?}: {}", page_index + 1, rect, e);
                continue;
            }
        };
        let padded = aspect_fit_and_pad(&region, size, PAD_COLOR)?;
        padded.save(dir.join(crop_file_name(page_index, written)))?;
        written += 1;
    }
    Ok(written)
}

fn extract_document(
    path: &Path,
    config: &ExtractConfig,
    detector: &ContourRectangleDetector,
) -> CliResult<usize> {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = config.output.join(snake_case_name(&stem));
    std::fs::create_dir_all(&dir)?;

    let source = PdfiumPageSource::open(path)?;
    let thumbnail = &config.pipeline.thumbnail;
    let detection: &RectangleDetectionConfig = &config.pipeline.detection;

    let mut total = 0;
    for page in source.pages() {
        let Some(image) =
            source.render_thumbnail(page, thumbnail.crop_size(), thumbnail.thumbnail_box)
        else {
            warn!("Skipping {}: render failed", page);
            continue;
        };
        let observations = match detector.detect(&image, detection) {
            Ok(observations) => detection.filter(
                observations,
                Size::from_pixels(image.width(), image.height()),
            ),
            Err(e) => {
                warn!("Skipping {}: rectangle detection failed: {}", page, e);
                continue;
            }
        };
        total += export_regions(&image, &observations, config.size, &dir, page.index())?;
    }
    info!(
        "{}: {} crops from {} pages into {}",
        path.display(),
        total,
        source.page_count(),
        dir.display()
    );
    Ok(total)
}

/// Writes the padded crops of every input document.
pub fn run_extract(config: &ExtractConfig) -> CliResult<()> {
    std::fs::create_dir_all(&config.output)?;
    let detector = ContourRectangleDetector::default();

    let mut total = 0;
    for (idx, path) in config.inputs.iter().enumerate() {
        info!(
            "[{}/{}] Extracting from {}",
            idx + 1,
            config.inputs.len(),
            path.display()
        );
        match extract_document(path, config, &detector) {
            Ok(count) => total += count,
            Err(e) => warn!("Failed to extract {}: {}", path.display(), e),
        }
    }
    println!(
        "Wrote {} crops from {} documents to {}",
        total,
        config.inputs.len(),
        config.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardscan::domain::NormalizedRect;
    use image::Rgb;

    #[test]
    fn test_snake_case_name() {
        assert_eq!(snake_case_name("Chess Puzzles (Vol. 2)"), "chess_puzzles_vol_2_");
        assert_eq!(snake_case_name("go_problems"), "go_problems");
    }

    #[test]
    fn test_crop_file_name() {
        assert_eq!(crop_file_name(0, 0), "rect_01_0.png");
        assert_eq!(crop_file_name(11, 3), "rect_12_3.png");
        assert_eq!(crop_file_name(119, 1), "rect_120_1.png");
    }

    #[test]
    fn test_export_regions_pads_onto_white_square() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(400, 300, Rgb([100, 100, 100]));
        let observations = vec![
            RectangleObservation::new(NormalizedRect::new(2.0, 2.0, 0.1, 0.1), 0.9),
            RectangleObservation::new(NormalizedRect::new(0.25, 0.25, 0.5, 0.5), 0.9),
        ];

        let written = export_regions(&image, &observations, 64, dir.path(), 2).unwrap();
        assert_eq!(written, 1);
        assert!(!dir.path().join("rect_03_1.png").exists());

        let crop = image::open(dir.path().join("rect_03_0.png")).unwrap().to_rgb8();
        assert_eq!(crop.dimensions(), (64, 64));
        // 200x150 fits as 64x48, centered with 8 rows of padding above and below.
        assert_eq!(crop.get_pixel(0, 0), &Rgb(PAD_COLOR));
        assert_eq!(crop.get_pixel(32, 63), &Rgb(PAD_COLOR));
        assert_eq!(crop.get_pixel(32, 32), &Rgb([100, 100, 100]));
    }

    #[test]
    fn test_export_regions_reports_unwritable_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let image = RgbImage::from_pixel(100, 100, Rgb([0, 0, 0]));
        let observations = vec![RectangleObservation::new(
            NormalizedRect::new(0.0, 0.0, 1.0, 1.0),
            1.0,
        )];

        let err = export_regions(&image, &observations, 32, &missing, 0).unwrap_err();
        assert!(matches!(err, boardscan::core::BoardScanError::ImageLoad(_)));
    }

    #[test]
    fn test_find_pdfs_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("nested").join("B.PDF"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let found = find_pdfs(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![dir.path().join("a.pdf"), dir.path().join("nested").join("B.PDF")]
        );
    }
}
