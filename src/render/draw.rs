use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use super::{Figure, Mark, Panel};
use crate::color::{self, Rgb};
use crate::error::{Error, Result};

/// Pixel size of one figure page.
pub const PAGE_SIZE: (u32, u32) = (800, 600);
/// Most pages stacked into one output file.
pub const PAGES_PER_FILE: usize = 10;
/// Fraction of a page given to the observed-vs-model panel.
const UPPER_SHARE: f64 = 0.72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Svg,
    Png,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "svg" => Ok(Format::Svg),
            "png" => Ok(Format::Png),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Write one figure to `path` (`.svg` or `.png`).
pub fn save_figure(figure: &Figure, path: &Path) -> Result<()> {
    let format = Format::of(path)?;
    write_pages(format, std::slice::from_ref(figure), path)
}

/// Write figures as pages stacked top to bottom, at most
/// [`PAGES_PER_FILE`] per file. Returns the files written, in page order.
/// The backend is chosen by extension.
pub fn save_pages(figures: &[Figure], path: &Path) -> Result<Vec<PathBuf>> {
    let format = Format::of(path)?;
    let mut written = Vec::new();
    for (file, pages) in page_files(path, figures.len()) {
        write_pages(format, &figures[pages], &file)?;
        written.push(file);
    }
    Ok(written)
}

/// Output files for `pages` pages and the page range each one holds.
///
/// A batch that fits one file is written to `path` itself; longer batches
/// go to `stem-01.ext`, `stem-02.ext`, ... next to it.
pub fn page_files(path: &Path, pages: usize) -> Vec<(PathBuf, Range<usize>)> {
    if pages <= PAGES_PER_FILE {
        return vec![(path.to_path_buf(), 0..pages)];
    }
    let count = pages.div_ceil(PAGES_PER_FILE);
    let width = count.to_string().len().max(2);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();

    (0..count)
        .map(|i| {
            let start = i * PAGES_PER_FILE;
            let end = (start + PAGES_PER_FILE).min(pages);
            let name = format!("{stem}-{:0width$}.{ext}", i + 1);
            (path.with_file_name(name), start..end)
        })
        .collect()
}

fn write_pages(format: Format, figures: &[Figure], path: &Path) -> Result<()> {
    // Bounded by PAGES_PER_FILE.
    let size = (PAGE_SIZE.0, PAGE_SIZE.1 * figures.len().max(1) as u32);
    match format {
        Format::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_pages(&root, figures)?;
            root.present().map_err(render_err)
        }
        Format::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_pages(&root, figures)?;
            root.present().map_err(render_err)
        }
    }
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn render_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Render(e.to_string())
}

fn rgb(c: Rgb) -> RGBColor {
    RGBColor(c.0, c.1, c.2)
}

fn draw_pages<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, figures: &[Figure]) -> Result<()> {
    root.fill(&WHITE).map_err(render_err)?;
    let pages = root.split_evenly((figures.len().max(1), 1));
    for (page, figure) in pages.iter().zip(figures) {
        draw_figure(page, figure)?;
    }
    Ok(())
}

fn draw_figure<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, figure: &Figure) -> Result<()> {
    let Some(lower_panel) = &figure.lower else {
        return draw_panel(area, &figure.upper, Some(&figure.title));
    };
    let (_, height) = area.dim_in_pixel();
    let (upper, lower) = area.split_vertically((height as f64 * UPPER_SHARE) as i32);
    draw_panel(&upper, &figure.upper, Some(&figure.title))?;
    draw_panel(&lower, lower_panel, None)
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    caption: Option<&str>,
) -> Result<()> {
    let scale = panel.y_scale;
    let (x0, x1) = panel.x_range;
    let (y0, y1) = (
        scale.forward(panel.y_range.0),
        scale.forward(panel.y_range.1),
    );
    let inside = |(x, y): (f64, f64)| x >= x0 && x <= x1 && y >= y0 && y <= y1;

    let mut builder = ChartBuilder::on(area);
    builder.margin(10).x_label_area_size(35).y_label_area_size(60);
    if let Some(text) = caption {
        builder.caption(text, ("sans-serif", 18));
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(render_err)?;

    let y_fmt = |v: &f64| format_tick(scale.inverse(*v));
    chart
        .configure_mesh()
        .x_desc(panel.x_label.as_str())
        .y_desc(panel.y_label.as_str())
        .y_label_formatter(&y_fmt)
        .label_style(("sans-serif", 13))
        .draw()
        .map_err(render_err)?;

    for &y in &panel.hlines {
        let y = scale.forward(y);
        chart
            .draw_series(DashedLineSeries::new(
                vec![(x0, y), (x1, y)],
                6,
                4,
                rgb(color::GUIDE).stroke_width(1),
            ))
            .map_err(render_err)?;
    }

    let guide = rgb(color::GUIDE);
    chart
        .draw_series(panel.error_bars.iter().filter_map(|bar| {
            let from = (bar.from.0, scale.forward(bar.from.1));
            let to = (bar.to.0, scale.forward(bar.to.1));
            (inside(from) || inside(to))
                .then(|| PathElement::new(vec![from, to], guide.stroke_width(1)))
        }))
        .map_err(render_err)?;

    let mut labelled = false;
    for series in &panel.series {
        let c = rgb(series.color);
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .map(|&(x, y)| (x, scale.forward(y)))
            .filter(|&p| inside(p))
            .collect();

        let drawn = match series.mark {
            Mark::Markers => {
                let anno = chart
                    .draw_series(points.iter().map(|&p| Circle::new(p, 3, c.filled())))
                    .map_err(render_err)?;
                if let Some(label) = &series.label {
                    anno.label(label.as_str())
                        .legend(move |(x, y)| Circle::new((x + 10, y), 4, c.filled()));
                    true
                } else {
                    false
                }
            }
            Mark::DashedLine => {
                let anno = chart
                    .draw_series(DashedLineSeries::new(points, 8, 5, c.stroke_width(2)))
                    .map_err(render_err)?;
                if let Some(label) = &series.label {
                    anno.label(label.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], c.stroke_width(2))
                    });
                    true
                } else {
                    false
                }
            }
        };
        labelled |= drawn;
    }

    if labelled {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.85))
            .border_style(&BLACK)
            .label_font(("sans-serif", 13))
            .draw()
            .map_err(render_err)?;
    }
    Ok(())
}

/// Tick label: compact for large magnitudes, two decimals otherwise.
pub fn format_tick(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{v:.1e}")
    } else if v.abs() >= 100.0 || v == v.trunc() {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::tests::FlatModel;
    use crate::data::model::tests::sample_record;
    use crate::render::build_figure;

    #[test]
    fn unknown_extension_is_rejected() {
        let fig = build_figure(&FlatModel, &sample_record(100.0, &[1.0])).unwrap();
        let err = save_figure(&fig, Path::new("figure.pdf")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref e) if e == "pdf"));

        let err = save_pages(&[fig], Path::new("out/batch")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref e) if e.is_empty()));
    }

    #[test]
    fn short_batches_keep_the_requested_file() {
        let files = page_files(Path::new("out/batch.svg"), 3);
        assert_eq!(files, vec![(PathBuf::from("out/batch.svg"), 0..3)]);
        assert_eq!(page_files(Path::new("b.png"), PAGES_PER_FILE).len(), 1);
    }

    #[test]
    fn long_batches_split_into_numbered_files() {
        let pages = 2 * PAGES_PER_FILE + 1;
        let files = page_files(Path::new("out/batch.png"), pages);
        let names: Vec<_> = files.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("out/batch-01.png"),
                PathBuf::from("out/batch-02.png"),
                PathBuf::from("out/batch-03.png"),
            ]
        );
        assert_eq!(files[0].1, 0..PAGES_PER_FILE);
        assert_eq!(files[2].1, 2 * PAGES_PER_FILE..pages);
        // Every page lands in exactly one file.
        let total: usize = files.iter().map(|(_, r)| r.len()).sum();
        assert_eq!(total, pages);
    }

    #[test]
    fn tick_labels_are_compact() {
        assert_eq!(format_tick(2.0), "2");
        assert_eq!(format_tick(-0.25), "-0.25");
        assert_eq!(format_tick(250.4), "250");
        assert_eq!(format_tick(12000.0), "1.2e4");
    }
}
