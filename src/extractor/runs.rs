//! Turns interpreter runs into trimmed, page-space text spans

use super::interpreter::{PlacedGlyph, TextRun};
use crate::types::{flip_y, BBox, TextSpan};

/// Baseline drift tolerated between merged runs, in ems
const BASELINE_TOLERANCE: f32 = 0.2;
/// Largest gap bridged when merging runs, in ems
const MAX_MERGE_GAP: f32 = 1.0;
/// Gaps wider than this, in ems, become a space
const WORD_GAP: f32 = 0.15;
/// Overlap tolerated before runs are considered out of order, in ems
const MAX_OVERLAP: f32 = 0.1;

/// Page box used to move user-space coordinates into top-left page space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub height: f32,
}

impl Default for PageBox {
    fn default() -> Self {
        Self { x0: 0.0, y0: 0.0, height: 792.0 }
    }
}

fn same_style(a: &TextRun, b: &TextRun) -> bool {
    a.font_name == b.font_name && (a.font_size - b.font_size).abs() < 0.01 && a.color == b.color
}

fn run_end(run: &TextRun) -> f32 {
    run.glyphs.last().map_or(0.0, |g| g.x1)
}

/// Merges consecutive runs that continue the same line in the same style
pub fn merge_runs(runs: Vec<TextRun>) -> Vec<TextRun> {
    let mut merged: Vec<TextRun> = Vec::with_capacity(runs.len());

    for run in runs {
        if let Some(prev) = merged.last_mut() {
            let em = prev.font_size.max(1.0);
            let gap = run.glyphs.first().map_or(0.0, |g| g.x0) - run_end(prev);
            let continues_line = same_style(prev, &run)
                && (prev.baseline - run.baseline).abs() <= BASELINE_TOLERANCE * em
                && gap >= -MAX_OVERLAP * em
                && gap <= MAX_MERGE_GAP * em;

            if continues_line {
                let prev_blank = prev.glyphs.last().map_or(true, PlacedGlyph::is_blank);
                let next_blank = run.glyphs.first().map_or(true, PlacedGlyph::is_blank);
                if gap > WORD_GAP * em && !prev_blank && !next_blank {
                    let x = run_end(prev);
                    prev.glyphs.push(PlacedGlyph { text: " ".into(), x0: x, x1: x });
                }
                prev.glyphs.extend(run.glyphs);
                continue;
            }
        }
        merged.push(run);
    }

    merged
}

/// Trims a run and places it in top-left page space; blank runs yield `None`
pub fn run_to_span(run: &TextRun, page_index: u32, page: &PageBox) -> Option<TextSpan> {
    let first = run.glyphs.iter().position(|g| !g.is_blank())?;
    let last = run.glyphs.iter().rposition(|g| !g.is_blank())?;
    let visible = &run.glyphs[first..=last];

    let text: String = visible.iter().map(|g| g.text.as_str()).collect();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let y0 = flip_y(page.height, run.baseline - page.y0);
    let bbox = BBox::new(
        visible[0].x0 - page.x0,
        y0,
        visible[visible.len() - 1].x1 - page.x0,
        y0 + run.font_size,
    );

    Some(
        TextSpan::new(page_index, text, bbox)
            .with_font(run.font_name.clone(), run.font_size)
            .with_color(run.color),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RgbColor;

    fn run(words: &[(&str, f32)], baseline: f32, font: &str, color: RgbColor) -> TextRun {
        let glyphs = words
            .iter()
            .flat_map(|(word, x)| {
                word.chars().enumerate().map(move |(i, c)| PlacedGlyph {
                    text: c.to_string(),
                    x0: x + i as f32 * 6.0,
                    x1: x + (i + 1) as f32 * 6.0,
                })
            })
            .collect();
        TextRun { glyphs, baseline, font_name: font.into(), font_size: 12.0, color }
    }

    fn text(run: &TextRun) -> String {
        run.glyphs.iter().map(|g| g.text.as_str()).collect()
    }

    #[test]
    fn test_word_runs_merge_with_space() {
        let runs = vec![
            run(&[("Name", 72.0)], 700.0, "Helvetica", RgbColor::BLACK),
            run(&[("-", 100.0)], 700.0, "Helvetica", RgbColor::BLACK),
            run(&[("John", 110.0)], 700.0, "Helvetica", RgbColor::BLACK),
        ];
        let merged = merge_runs(runs);
        assert_eq!(merged.len(), 1);
        assert_eq!(text(&merged[0]), "Name - John");
    }

    #[test]
    fn test_style_change_splits_runs() {
        let runs = vec![
            run(&[("Name", 72.0)], 700.0, "Helvetica-Bold", RgbColor::BLACK),
            run(&[("John", 100.0)], 700.0, "Helvetica", RgbColor::BLACK),
            run(&[("Smith", 130.0)], 700.0, "Helvetica", RgbColor::new(1.0, 0.0, 0.0)),
        ];
        assert_eq!(merge_runs(runs).len(), 3);
    }

    #[test]
    fn test_new_line_or_far_gap_splits_runs() {
        let runs = vec![
            run(&[("left", 72.0)], 700.0, "Helvetica", RgbColor::BLACK),
            run(&[("below", 72.0)], 686.0, "Helvetica", RgbColor::BLACK),
            run(&[("far", 400.0)], 686.0, "Helvetica", RgbColor::BLACK),
        ];
        assert_eq!(merge_runs(runs).len(), 3);
    }

    #[test]
    fn test_trim_moves_bbox_to_visible_glyphs() {
        let r = run(&[("  Hi ", 72.0)], 700.0, "Helvetica", RgbColor::BLACK);
        let span = run_to_span(&r, 0, &PageBox::default()).unwrap();
        assert_eq!(span.text, "Hi");
        assert_eq!(span.bbox.x0, 84.0);
        assert_eq!(span.bbox.x1, 96.0);
        assert_eq!(span.bbox.y0, 92.0);
        assert_eq!(span.bbox.y1, 104.0);
    }

    #[test]
    fn test_blank_run_is_skipped() {
        let r = run(&[("   ", 72.0)], 700.0, "Helvetica", RgbColor::BLACK);
        assert!(run_to_span(&r, 0, &PageBox::default()).is_none());
    }

    #[test]
    fn test_page_box_offset_applied() {
        let r = run(&[("x", 110.0)], 750.0, "Helvetica", RgbColor::BLACK);
        let page = PageBox { x0: 10.0, y0: 50.0, height: 800.0 };
        let span = run_to_span(&r, 1, &page).unwrap();
        assert_eq!(span.bbox.x0, 100.0);
        assert_eq!(span.bbox.y0, 100.0);
        assert_eq!(span.page_index, 1);
    }
}
