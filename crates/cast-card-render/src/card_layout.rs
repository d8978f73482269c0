use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::card_compose::CardError;
use crate::card_ir::FontSpec;

/// Marker appended to the last visible line of a truncated text box.
pub const ELLIPSIS: &str = "...";

/// Text measurement hook shared by layout and rasterization.
///
/// Implementations must be deterministic: the same text and font always
/// measure the same within one backend.
pub trait TextMeasurer: Send + Sync {
    /// Rendered width of `text` in pixels.
    fn measure_text_px(&self, text: &str, font: &FontSpec) -> f32;
}

/// Backend-free width estimate from per-glyph em widths.
///
/// Useful for planning without a raster backend; real renders should use the
/// backend's own measurer so wrapping matches the drawn glyphs.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeuristicMeasurer;

impl TextMeasurer for HeuristicMeasurer {
    fn measure_text_px(&self, text: &str, font: &FontSpec) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let family = font.family.to_ascii_lowercase();
        let proportional = !(family.contains("mono") || family.contains("fixed"));
        let mut em_sum = 0.0f32;
        for ch in text.chars() {
            em_sum += if proportional {
                proportional_glyph_em_width(ch)
            } else {
                0.6
            };
        }
        let mut scale = 1.0;
        if font.is_bold() {
            scale += 0.03;
        }
        em_sum * font.size_px as f32 * scale
    }
}

fn proportional_glyph_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.32,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' | '"' | '`' => 0.23,
        '-' | '\u{2013}' | '\u{2014}' => 0.34,
        '(' | ')' | '[' | ']' | '{' | '}' => 0.30,
        'f' | 't' | 'j' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' | '#' => 0.74,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_ascii_uppercase() => 0.64,
        c if c.is_ascii_lowercase() => 0.52,
        c if c.is_whitespace() => 0.32,
        c if c.is_ascii_punctuation() => 0.42,
        _ => 0.56,
    }
}

/// Fixed card geometry shared by layout and composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Outer horizontal margin.
    pub margin: i32,
    /// Text-box line pitch.
    pub line_height: i32,
    /// Inner padding of the text box on every side.
    pub text_box_padding: i32,
    /// Cap on the text-box height, padding included.
    pub max_text_box_height: i32,
    /// Text-box corner radius.
    pub corner_radius: u32,
}

impl LayoutConfig {
    /// Widest a text-box line may measure.
    pub fn content_max_width(&self) -> i32 {
        self.width as i32 - 2 * self.margin - 2 * self.text_box_padding
    }

    /// Width of the text box itself.
    pub fn text_box_width(&self) -> i32 {
        self.width as i32 - 2 * self.margin
    }

    /// Reject geometry that cannot produce a card.
    pub fn validate(&self) -> Result<(), CardError> {
        if self.width == 0 || self.height == 0 {
            return Err(CardError::InvalidLayout(format!(
                "canvas must be non-empty (got {}x{})",
                self.width, self.height
            )));
        }
        if self.line_height <= 0 {
            return Err(CardError::InvalidLayout(format!(
                "line height must be positive (got {})",
                self.line_height
            )));
        }
        if self.margin < 0 || self.text_box_padding < 0 || self.max_text_box_height < 0 {
            return Err(CardError::InvalidLayout(
                "margin, padding, and max text box height must not be negative".to_string(),
            ));
        }
        if self.content_max_width() <= 0 {
            return Err(CardError::InvalidLayout(format!(
                "margins and padding leave no room for text (content width {})",
                self.content_max_width()
            )));
        }
        Ok(())
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1200,
            margin: 120,
            line_height: 48,
            text_box_padding: 40,
            max_text_box_height: 460,
            corner_radius: 20,
        }
    }
}

/// One wrapped line of text-box content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WrappedLine {
    pub content: String,
}

impl WrappedLine {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }
}

/// Text-box geometry for a given line count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxPlan {
    pub box_height: i32,
    pub max_visible_lines: usize,
}

/// Lines that will be drawn in the text box, and the box they fit in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardPlan {
    pub visible_lines: Vec<WrappedLine>,
    pub truncated: bool,
    pub box_height: i32,
    /// Wrapped line count before truncation.
    pub total_lines: usize,
}

struct LineWrapper<'a> {
    font: &'a FontSpec,
    max_width: f32,
    measurer: &'a dyn TextMeasurer,
    current: String,
    lines: Vec<WrappedLine>,
}

impl LineWrapper<'_> {
    fn push_word(&mut self, word: &str) {
        if self.current.is_empty() {
            self.current.push_str(word);
            return;
        }
        let mut candidate = String::with_capacity(self.current.len() + 1 + word.len());
        candidate.push_str(&self.current);
        candidate.push(' ');
        candidate.push_str(word);
        if self.measurer.measure_text_px(&candidate, self.font) > self.max_width {
            self.flush();
            self.current.push_str(word);
        } else {
            self.current = candidate;
        }
    }

    fn push_broken_word(&mut self, word: &str) {
        let mut segments = word.split('\n');
        if let Some(first) = segments.next() {
            if !first.is_empty() {
                self.push_word(first);
            }
        }
        self.flush();

        let mut rest: Vec<&str> = segments.collect();
        let last = rest.pop().unwrap_or_default();
        for interior in rest {
            self.lines.push(WrappedLine::new(interior));
        }
        self.current.push_str(last);
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines
                .push(WrappedLine::new(core::mem::take(&mut self.current)));
        }
    }

    fn finish(mut self) -> Vec<WrappedLine> {
        self.flush();
        self.lines
    }
}

fn normalize_breaks(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Greedy word wrap honoring `\n` forced breaks.
///
/// Words are never split: a word wider than `max_width` gets a line of its
/// own. A forced break inside a token closes the current line, every interior
/// segment becomes a line verbatim (empty segments give empty lines), and the
/// trailing segment carries on into the next line.
pub fn wrap_text(
    text: &str,
    font: &FontSpec,
    max_width: f32,
    measurer: &dyn TextMeasurer,
) -> Vec<WrappedLine> {
    let normalized = normalize_breaks(text);
    let mut wrapper = LineWrapper {
        font,
        max_width,
        measurer,
        current: String::with_capacity(64),
        lines: Vec::new(),
    };
    for word in normalized
        .split(|ch: char| ch.is_whitespace() && ch != '\n')
        .filter(|word| !word.is_empty())
    {
        if word.contains('\n') {
            wrapper.push_broken_word(word);
        } else {
            wrapper.push_word(word);
        }
    }
    let lines = wrapper.finish();
    log::debug!(
        "wrapped {} char(s) into {} line(s) at max width {:.1}px",
        text.chars().count(),
        lines.len(),
        max_width
    );
    lines
}

/// Size the text box for `line_count` lines, capped at the configured maximum.
pub fn plan_box(line_count: usize, cfg: &LayoutConfig) -> BoxPlan {
    let line_height = i64::from(cfg.line_height.max(1));
    let padding = 2 * i64::from(cfg.text_box_padding.max(0));
    let text_height = (line_count as i64).saturating_mul(line_height);
    let box_height = text_height
        .saturating_add(padding)
        .min(i64::from(cfg.max_text_box_height.max(0)));
    let max_visible_lines = ((box_height - padding).max(0) / line_height) as usize;
    BoxPlan {
        box_height: box_height as i32,
        max_visible_lines,
    }
}

/// Keep the lines that fit and ellipsis-fit the last one when content overflows.
pub fn apply_truncation(
    mut lines: Vec<WrappedLine>,
    plan: BoxPlan,
    font: &FontSpec,
    max_width: f32,
    measurer: &dyn TextMeasurer,
) -> CardPlan {
    let total_lines = lines.len();
    if total_lines <= plan.max_visible_lines {
        return CardPlan {
            visible_lines: lines,
            truncated: false,
            box_height: plan.box_height,
            total_lines,
        };
    }

    lines.truncate(plan.max_visible_lines);
    if let Some(last) = lines.last_mut() {
        last.content = fit_with_ellipsis(&last.content, font, max_width, measurer);
    }
    log::debug!(
        "truncated text box to {} of {} line(s)",
        lines.len(),
        total_lines
    );
    CardPlan {
        visible_lines: lines,
        truncated: true,
        box_height: plan.box_height,
        total_lines,
    }
}

fn fit_with_ellipsis(
    line: &str,
    font: &FontSpec,
    max_width: f32,
    measurer: &dyn TextMeasurer,
) -> String {
    let mut content = line.to_string();
    if let Some(limit) = fit_char_limit(line, font, max_width, measurer) {
        if let Some((cut, _)) = content.char_indices().nth(limit) {
            content.truncate(cut);
        }
    }
    let mut candidate = String::with_capacity(content.len() + ELLIPSIS.len());
    loop {
        candidate.clear();
        candidate.push_str(&content);
        candidate.push_str(ELLIPSIS);
        if content.is_empty() || measurer.measure_text_px(&candidate, font) <= max_width {
            return candidate;
        }
        content.pop();
    }
}

/// Upper bound on how many chars of `line` can sit in `max_width`, from the
/// narrowest glyph it contains. `None` when a glyph measures zero.
fn fit_char_limit(
    line: &str,
    font: &FontSpec,
    max_width: f32,
    measurer: &dyn TextMeasurer,
) -> Option<usize> {
    let mut buf = [0u8; 4];
    let mut narrowest = f32::INFINITY;
    for ch in line.chars() {
        narrowest = narrowest.min(measurer.measure_text_px(ch.encode_utf8(&mut buf), font));
    }
    if narrowest.is_finite() && narrowest > 0.0 {
        Some((max_width / narrowest).floor() as usize + 1)
    } else {
        None
    }
}

/// Wrap, size, and truncate `text` for the text box described by `cfg`.
pub fn plan_text(
    text: &str,
    font: &FontSpec,
    cfg: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> CardPlan {
    let max_width = cfg.content_max_width().max(1) as f32;
    let lines = wrap_text(text, font, max_width, measurer);
    let box_plan = plan_box(lines.len(), cfg);
    apply_truncation(lines, box_plan, font, max_width, measurer)
}
