use chrono::NaiveTime;

use super::icon::{Color, IconImage, TextOp, TextRole};
use crate::pipeline::StageStatus;

pub const CANVAS_SIZE: u32 = 144;
pub const PRODUCT_LABEL: &str = "CodePipeline";
pub const NOT_CONFIGURED_LABEL: &str = "Not Configured";
pub const SETTLED_GLYPH: char = '✔';
pub const REFRESHING_GLYPH: char = '✽';

const CENTER_X: i32 = (CANVAS_SIZE / 2) as i32;
const TITLE_Y: i32 = 20;
const TITLE_SIZE: u32 = 20;
// Roughly what fits in 124 units at the title size.
const TITLE_MAX_CHARS: usize = 11;
const GLYPH_Y: i32 = 54;
const GLYPH_SIZE: u32 = 44;
pub const GLYPH_PITCH: i32 = 32;
const CAPTION_Y: i32 = 116;
const CAPTION_SIZE: u32 = 16;
const CORNER_X: i32 = 128;
const CORNER_Y: i32 = 114;
const CORNER_SIZE: u32 = 20;

/// What the icon should show.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderRequest<'a> {
    Unconfigured,
    Pipeline {
        display_name: &'a str,
        statuses: &'a [StageStatus],
        refreshing: bool,
        refreshed_at: NaiveTime,
    },
}

/// Glyph and colour for one stage.
pub fn stage_glyph(status: StageStatus) -> (char, Color) {
    match status {
        StageStatus::Succeeded => ('✔', Color::Success),
        StageStatus::Failed => ('✘', Color::Failure),
        StageStatus::InProgress => ('.', Color::Neutral),
    }
}

/// Centre x of each stage glyph: fixed pitch, centred as a group.
pub fn glyph_positions(count: usize) -> Vec<i32> {
    if count == 0 {
        return Vec::new();
    }
    let span = (count as i32 - 1) * GLYPH_PITCH;
    let start = CENTER_X - span / 2;
    (0..count as i32).map(|i| start + i * GLYPH_PITCH).collect()
}

pub fn render(request: &RenderRequest<'_>) -> IconImage {
    match request {
        RenderRequest::Unconfigured => render_unconfigured(),
        RenderRequest::Pipeline {
            display_name,
            statuses,
            refreshing,
            refreshed_at,
        } => render_pipeline(display_name, statuses, *refreshing, *refreshed_at),
    }
}

fn render_unconfigured() -> IconImage {
    let mut icon = IconImage::new(CANVAS_SIZE);
    icon.push(TextOp {
        role: TextRole::Label,
        text: PRODUCT_LABEL.to_string(),
        x: CENTER_X,
        y: 44,
        size: 20,
        bold: true,
        color: Color::Text,
    });
    icon.push(TextOp {
        role: TextRole::SubLabel,
        text: NOT_CONFIGURED_LABEL.to_string(),
        x: CENTER_X,
        y: 78,
        size: 16,
        bold: false,
        color: Color::Warning,
    });
    icon
}

fn render_pipeline(
    display_name: &str,
    statuses: &[StageStatus],
    refreshing: bool,
    refreshed_at: NaiveTime,
) -> IconImage {
    let mut icon = IconImage::new(CANVAS_SIZE);
    icon.push(TextOp {
        role: TextRole::Title,
        text: truncate_with_ellipsis(display_name.trim(), TITLE_MAX_CHARS),
        x: CENTER_X,
        y: TITLE_Y,
        size: TITLE_SIZE,
        bold: true,
        color: Color::Text,
    });

    for (status, x) in statuses.iter().zip(glyph_positions(statuses.len())) {
        let (glyph, color) = stage_glyph(*status);
        icon.push(TextOp {
            role: TextRole::Stage,
            text: glyph.to_string(),
            x,
            y: GLYPH_Y,
            size: GLYPH_SIZE,
            bold: false,
            color,
        });
    }

    icon.push(TextOp {
        role: TextRole::Caption,
        text: refreshed_at.format("%H:%M").to_string(),
        x: CENTER_X,
        y: CAPTION_Y,
        size: CAPTION_SIZE,
        bold: false,
        color: Color::Text,
    });

    let (corner, corner_color) = if refreshing {
        (REFRESHING_GLYPH, Color::Neutral)
    } else {
        (SETTLED_GLYPH, Color::Success)
    };
    icon.push(TextOp {
        role: TextRole::Corner,
        text: corner.to_string(),
        x: CORNER_X,
        y: CORNER_Y,
        size: CORNER_SIZE,
        bold: false,
        color: corner_color,
    });
    icon
}

fn truncate_with_ellipsis(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    if width <= 1 {
        return text.chars().take(width).collect();
    }
    let mut s: String = text.chars().take(width - 1).collect();
    s.push('…');
    s
}
