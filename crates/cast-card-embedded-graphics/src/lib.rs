//! embedded-graphics raster backend for `cast-card-render` scenes, with PNG
//! output.

#![cfg_attr(
    not(test),
    deny(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod canvas;

use cast_card_render::{
    compose_card, Cast, CardConfig, CardError, CardScene, Color, DrawCommand, EmblemCommand,
    FontSpec, RenderedImage, RoundedRectCommand, RuleCommand, TextCommand,
};
use chrono::{DateTime, Utc};
use embedded_graphics::{
    mono_font::{
        ascii::{
            FONT_10X20, FONT_6X10, FONT_6X12, FONT_6X13, FONT_6X13_BOLD, FONT_7X13_BOLD,
            FONT_7X14, FONT_7X14_BOLD, FONT_8X13, FONT_8X13_BOLD, FONT_9X15, FONT_9X15_BOLD,
            FONT_9X18, FONT_9X18_BOLD,
        },
        MonoFont, MonoTextStyle,
    },
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{
        Circle, PointsIter, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle,
        StrokeAlignment,
    },
    text::{Baseline, Text},
};
use std::borrow::Cow;

pub use canvas::{BlendTarget, Canvas};
use canvas::{Scaled, Translucent};

/// Backend-local font identifier used for metrics and rasterization dispatch.
pub type FontId = u8;

/// Why font resolution could not honor the request exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontFallbackReason {
    UnknownFamily,
    UnknownFontId,
    SizeClamped,
}

/// Resolved font selection for a [`FontSpec`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontSelection {
    pub font_id: FontId,
    pub fallback_reason: Option<FontFallbackReason>,
}

/// Backend-provided metrics for a specific font id, in output pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FontMetrics {
    /// Horizontal advance per glyph.
    pub char_width: i32,
    pub glyph_height: i32,
}

/// Font abstraction used by the measurer and the renderer's text paths.
///
/// Measurement and drawing go through the same backend so that wrapped lines
/// never exceed the width they were planned for.
pub trait FontBackend {
    fn resolve_font(&self, font: &FontSpec) -> FontSelection;
    fn metrics(&self, font_id: FontId) -> FontMetrics;
    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
        color: Rgb888,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Rgb888>;

    /// Advance width of `text` as [`FontBackend::draw_text_run`] would draw it.
    fn run_width(&self, font_id: FontId, text: &str) -> i32 {
        text.chars().count() as i32 * self.metrics(font_id).char_width
    }
}

/// Counters for text fallback reasons observed during draw execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextFallbackDiagnostics {
    pub unknown_family: u64,
    pub unknown_font_id: u64,
    pub size_clamped: u64,
}

impl TextFallbackDiagnostics {
    /// Total fallback count across all reasons.
    pub fn total(&self) -> u64 {
        self.unknown_family
            .saturating_add(self.unknown_font_id)
            .saturating_add(self.size_clamped)
    }

    fn note_reason(&mut self, reason: FontFallbackReason) {
        match reason {
            FontFallbackReason::UnknownFamily => {
                self.unknown_family = self.unknown_family.saturating_add(1)
            }
            FontFallbackReason::UnknownFontId => {
                self.unknown_font_id = self.unknown_font_id.saturating_add(1)
            }
            FontFallbackReason::SizeClamped => {
                self.size_clamped = self.size_clamped.saturating_add(1)
            }
        }
    }
}

/// Per-scene draw diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EgRenderDiagnostics {
    pub text_fallbacks: TextFallbackDiagnostics,
    /// Text runs drawn, emblem glyph included.
    pub text_runs: u64,
}

impl EgRenderDiagnostics {
    fn note_text_run(&mut self, selection: FontSelection) {
        self.text_runs = self.text_runs.saturating_add(1);
        if let Some(reason) = selection.fallback_reason {
            self.text_fallbacks.note_reason(reason);
        }
    }
}

/// What happened while rendering one card.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CardDiagnostics {
    pub text_fallbacks: TextFallbackDiagnostics,
    pub text_runs: u64,
    pub truncated: bool,
    pub visible_lines: usize,
    pub total_lines: usize,
    pub display_name_fallback: bool,
}

/// `TextMeasurer` adapter backed by this crate's `FontBackend` metrics.
#[derive(Clone, Debug)]
pub struct EgTextMeasurer<B = MonoFontBackend> {
    backend: B,
}

impl EgTextMeasurer<MonoFontBackend> {
    /// Create a default measurer using the mono backend.
    pub fn new() -> Self {
        Self {
            backend: MonoFontBackend,
        }
    }
}

impl Default for EgTextMeasurer<MonoFontBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> EgTextMeasurer<B>
where
    B: FontBackend,
{
    /// Create a measurer using an explicit backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }
}

impl<B> cast_card_render::TextMeasurer for EgTextMeasurer<B>
where
    B: FontBackend + Send + Sync,
{
    fn measure_text_px(&self, text: &str, font: &FontSpec) -> f32 {
        let selection = self.backend.resolve_font(font);
        self.backend.run_width(selection.font_id, text).max(0) as f32
    }
}

/// Built-in mono faces scaled up by whole pixels.
///
/// A request maps to the face and integer scale whose glyph height lands
/// closest to `size_px`; ties keep the smaller scale, then the taller face.
#[derive(Clone, Copy, Debug, Default)]
pub struct MonoFontBackend;

impl MonoFontBackend {
    const MAX_SCALE: u32 = 16;
    const REGULAR_FACES: u8 = 8;
    const BOLD_FACES: u8 = 6;
    const BOLD_BIT: u8 = 0b0000_1000;
    const FACE_MASK: u8 = 0b0000_0111;
    const SCALE_SHIFT: u8 = 4;

    fn encode_font_id(bold: bool, face: u8, scale: u32) -> FontId {
        let scale_bits = (scale.clamp(1, Self::MAX_SCALE) - 1) as u8;
        let bold_bit = if bold { Self::BOLD_BIT } else { 0 };
        (scale_bits << Self::SCALE_SHIFT) | bold_bit | (face & Self::FACE_MASK)
    }

    fn decode_font_id(font_id: FontId) -> (bool, u8, u32) {
        (
            font_id & Self::BOLD_BIT != 0,
            font_id & Self::FACE_MASK,
            u32::from(font_id >> Self::SCALE_SHIFT) + 1,
        )
    }

    fn face(bold: bool, face: u8) -> Option<&'static MonoFont<'static>> {
        match (bold, face) {
            (false, 0) => Some(&FONT_10X20),
            (false, 1) => Some(&FONT_9X18),
            (false, 2) => Some(&FONT_9X15),
            (false, 3) => Some(&FONT_7X14),
            (false, 4) => Some(&FONT_8X13),
            (false, 5) => Some(&FONT_6X13),
            (false, 6) => Some(&FONT_6X12),
            (false, 7) => Some(&FONT_6X10),
            (true, 0) => Some(&FONT_9X18_BOLD),
            (true, 1) => Some(&FONT_9X15_BOLD),
            (true, 2) => Some(&FONT_7X14_BOLD),
            (true, 3) => Some(&FONT_8X13_BOLD),
            (true, 4) => Some(&FONT_7X13_BOLD),
            (true, 5) => Some(&FONT_6X13_BOLD),
            _ => None,
        }
    }

    fn font_for(font_id: FontId) -> (&'static MonoFont<'static>, u32, Option<FontFallbackReason>) {
        let (bold, face, scale) = Self::decode_font_id(font_id);
        match Self::face(bold, face) {
            Some(font) => (font, scale, None),
            None => (&FONT_9X15, scale, Some(FontFallbackReason::UnknownFontId)),
        }
    }

    fn closest(bold: bool, size_px: u32) -> (u8, u32) {
        let faces = if bold {
            Self::BOLD_FACES
        } else {
            Self::REGULAR_FACES
        };
        let mut best = (0u8, 1u32, u32::MAX);
        for scale in 1..=Self::MAX_SCALE {
            for face in 0..faces {
                let Some(font) = Self::face(bold, face) else {
                    continue;
                };
                let error = (font.character_size.height * scale).abs_diff(size_px);
                if error < best.2 {
                    best = (face, scale, error);
                }
            }
        }
        (best.0, best.1)
    }

    fn family_supported(family: &str) -> bool {
        matches!(
            family.trim().to_ascii_lowercase().as_str(),
            "monospace" | "mono" | "fixed" | "serif" | "sans-serif" | "system-ui"
        )
    }

    fn advance(font: &MonoFont<'_>, scale: u32) -> i32 {
        ((font.character_size.width + font.character_spacing) * scale) as i32
    }
}

impl FontBackend for MonoFontBackend {
    fn resolve_font(&self, font: &FontSpec) -> FontSelection {
        let mut fallback_reason =
            (!Self::family_supported(&font.family)).then_some(FontFallbackReason::UnknownFamily);

        let bold = font.is_bold();
        let (face, scale) = Self::closest(bold, font.size_px);
        if scale == Self::MAX_SCALE {
            let tallest = Self::face(bold, 0).map_or(0, |f| f.character_size.height);
            if font.size_px > tallest * Self::MAX_SCALE {
                fallback_reason = fallback_reason.or(Some(FontFallbackReason::SizeClamped));
            }
        }

        FontSelection {
            font_id: Self::encode_font_id(bold, face, scale),
            fallback_reason,
        }
    }

    fn metrics(&self, font_id: FontId) -> FontMetrics {
        let (font, scale, _) = Self::font_for(font_id);
        FontMetrics {
            char_width: Self::advance(font, scale),
            glyph_height: (font.character_size.height * scale) as i32,
        }
    }

    fn draw_text_run<D>(
        &self,
        display: &mut D,
        font_id: FontId,
        text: &str,
        origin: Point,
        color: Rgb888,
    ) -> Result<i32, D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let (font, scale, _) = Self::font_for(font_id);
        let style = MonoTextStyle::new(font, color);
        let normalized = normalize_text_for_mono(text);
        let mut scaled = Scaled::new(display, origin, scale);
        Text::with_baseline(normalized.as_ref(), Point::zero(), style, Baseline::Top)
            .draw(&mut scaled)?;
        Ok(normalized.chars().count() as i32 * Self::advance(font, scale))
    }

    fn run_width(&self, font_id: FontId, text: &str) -> i32 {
        let (font, scale, _) = Self::font_for(font_id);
        normalize_text_for_mono(text).chars().count() as i32 * Self::advance(font, scale)
    }
}

fn normalize_text_for_mono(text: &str) -> Cow<'_, str> {
    if !text.chars().any(|ch| {
        matches!(
            ch,
            '\u{00A0}' // nbsp
                | '\u{2013}' // en dash
                | '\u{2014}' // em dash
                | '\u{2018}' // left single quote
                | '\u{2019}' // right single quote
                | '\u{201C}' // left double quote
                | '\u{201D}' // right double quote
                | '\u{2026}' // ellipsis
        )
    }) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{00A0}' => out.push(' '),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn to_rgb(color: Color) -> Rgb888 {
    Rgb888::new(color.r, color.g, color.b)
}

fn lerp_channel(from: u8, to: u8, t: f32) -> u8 {
    (f32::from(from) + (f32::from(to) - f32::from(from)) * t)
        .round()
        .clamp(0.0, 255.0) as u8
}

/// Color at normalized distance `t` from the center of a three-stop radial
/// gradient with stops at 0, 0.5, and 1.
fn gradient_at(stops: &[Color; 3], t: f32) -> Rgb888 {
    let t = t.clamp(0.0, 1.0);
    let (from, to, local) = if t <= 0.5 {
        (stops[0], stops[1], t * 2.0)
    } else {
        (stops[1], stops[2], (t - 0.5) * 2.0)
    };
    Rgb888::new(
        lerp_channel(from.r, to.r, local),
        lerp_channel(from.g, to.g, local),
        lerp_channel(from.b, to.b, local),
    )
}

/// Draw `drawable` opaquely, blended at `alpha`, or not at all when `alpha`
/// is zero.
fn draw_with_alpha<D, P>(display: &mut D, drawable: &P, alpha: u8) -> Result<(), D::Error>
where
    D: BlendTarget,
    P: Drawable<Color = Rgb888>,
{
    match alpha {
        0 => {}
        255 => {
            drawable.draw(display)?;
        }
        alpha => {
            drawable.draw(&mut Translucent::new(display, alpha))?;
        }
    }
    Ok(())
}

/// Draw-command executor for embedded-graphics targets.
#[derive(Clone, Debug)]
pub struct EgRenderer<B = MonoFontBackend> {
    backend: B,
}

impl Default for EgRenderer<MonoFontBackend> {
    fn default() -> Self {
        Self {
            backend: MonoFontBackend,
        }
    }
}

impl<B> EgRenderer<B>
where
    B: FontBackend,
{
    /// Create renderer with an explicit font backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Render a composed scene to a draw target.
    pub fn render_scene<D>(&self, scene: &CardScene, display: &mut D) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        for cmd in scene.draw_commands() {
            self.draw_command_impl(display, cmd, None)?;
        }
        Ok(())
    }

    /// Render a composed scene and return font fallback diagnostics.
    pub fn render_scene_with_diagnostics<D>(
        &self,
        scene: &CardScene,
        display: &mut D,
    ) -> Result<EgRenderDiagnostics, D::Error>
    where
        D: BlendTarget,
    {
        let mut diagnostics = EgRenderDiagnostics::default();
        for cmd in scene.draw_commands() {
            self.draw_command_impl(display, cmd, Some(&mut diagnostics))?;
        }
        Ok(diagnostics)
    }

    /// Execute one draw command.
    pub fn draw_command<D>(&self, display: &mut D, cmd: &DrawCommand) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        self.draw_command_impl(display, cmd, None)
    }

    fn draw_command_impl<D>(
        &self,
        display: &mut D,
        cmd: &DrawCommand,
        diagnostics: Option<&mut EgRenderDiagnostics>,
    ) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        match cmd {
            DrawCommand::Fill(fill) => {
                if fill.color.is_translucent() {
                    let area = display.bounding_box();
                    draw_with_alpha(
                        display,
                        &area.into_styled(PrimitiveStyle::with_fill(to_rgb(fill.color))),
                        fill.color.a,
                    )
                } else {
                    display.clear(to_rgb(fill.color))
                }
            }
            DrawCommand::Text(text) => self.draw_text(display, text, diagnostics),
            DrawCommand::Rule(rule) => self.draw_rule(display, rule),
            DrawCommand::RoundedRect(rect) => self.draw_rounded_rect(display, rect),
            DrawCommand::Emblem(emblem) => self.draw_emblem(display, emblem, diagnostics),
        }
    }

    fn draw_run<D>(
        &self,
        display: &mut D,
        selection: FontSelection,
        text: &str,
        origin: Point,
        color: Color,
    ) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        match color.a {
            0 => {}
            255 => {
                self.backend
                    .draw_text_run(display, selection.font_id, text, origin, to_rgb(color))?;
            }
            alpha => {
                self.backend.draw_text_run(
                    &mut Translucent::new(display, alpha),
                    selection.font_id,
                    text,
                    origin,
                    to_rgb(color),
                )?;
            }
        }
        Ok(())
    }

    fn draw_text<D>(
        &self,
        display: &mut D,
        cmd: &TextCommand,
        diagnostics: Option<&mut EgRenderDiagnostics>,
    ) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        if cmd.text.is_empty() {
            return Ok(());
        }
        let selection = self.backend.resolve_font(&cmd.font);
        if let Some(diagnostics) = diagnostics {
            diagnostics.note_text_run(selection);
        }
        self.draw_run(
            display,
            selection,
            &cmd.text,
            Point::new(cmd.x, cmd.y),
            cmd.color,
        )
    }

    fn draw_rule<D>(&self, display: &mut D, cmd: &RuleCommand) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        let rect = Rectangle::new(
            Point::new(cmd.x, cmd.y),
            Size::new(cmd.length, cmd.thickness.max(1)),
        );
        draw_with_alpha(
            display,
            &rect.into_styled(PrimitiveStyle::with_fill(to_rgb(cmd.color))),
            cmd.color.a,
        )
    }

    fn draw_rounded_rect<D>(&self, display: &mut D, cmd: &RoundedRectCommand) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        let rect = Rectangle::new(Point::new(cmd.x, cmd.y), Size::new(cmd.width, cmd.height));
        let radius = cmd
            .corner_radius
            .min(cmd.width / 2)
            .min(cmd.height / 2);
        let shape = RoundedRectangle::with_equal_corners(rect, Size::new_equal(radius));

        draw_with_alpha(
            display,
            &shape.into_styled(PrimitiveStyle::with_fill(to_rgb(cmd.fill))),
            cmd.fill.a,
        )?;
        if cmd.stroke_width > 0 {
            let stroke = PrimitiveStyleBuilder::new()
                .stroke_color(to_rgb(cmd.stroke))
                .stroke_width(cmd.stroke_width)
                .stroke_alignment(StrokeAlignment::Inside)
                .build();
            draw_with_alpha(display, &shape.into_styled(stroke), cmd.stroke.a)?;
        }
        Ok(())
    }

    fn draw_emblem<D>(
        &self,
        display: &mut D,
        cmd: &EmblemCommand,
        diagnostics: Option<&mut EgRenderDiagnostics>,
    ) -> Result<(), D::Error>
    where
        D: BlendTarget,
    {
        let center = Point::new(cmd.center_x, cmd.center_y);
        let circle = Circle::with_center(center, cmd.radius.saturating_mul(2).saturating_add(1));
        let radius = cmd.radius.max(1) as f32;
        display.draw_iter(circle.points().map(|point| {
            let d = point - center;
            let dist = ((d.x as f32).powi(2) + (d.y as f32).powi(2)).sqrt() / radius;
            Pixel(point, gradient_at(&cmd.gradient, dist))
        }))?;

        if cmd.stroke_width > 0 {
            let stroke = PrimitiveStyleBuilder::new()
                .stroke_color(to_rgb(cmd.stroke))
                .stroke_width(cmd.stroke_width)
                .stroke_alignment(StrokeAlignment::Inside)
                .build();
            draw_with_alpha(display, &circle.into_styled(stroke), cmd.stroke.a)?;
        }

        if cmd.glyph.is_empty() {
            return Ok(());
        }
        let selection = self.backend.resolve_font(&cmd.glyph_font);
        if let Some(diagnostics) = diagnostics {
            diagnostics.note_text_run(selection);
        }
        let width = self.backend.run_width(selection.font_id, &cmd.glyph);
        let height = self.backend.metrics(selection.font_id).glyph_height;
        let origin = center - Point::new(width / 2, height / 2);
        self.draw_run(display, selection, &cmd.glyph, origin, cmd.glyph_color)
    }
}

/// Composes, rasterizes, and encodes cards with one font backend.
///
/// Immutable after construction; every render owns a fresh [`Canvas`].
#[derive(Clone, Debug)]
pub struct CardRenderer<B = MonoFontBackend> {
    cfg: CardConfig,
    renderer: EgRenderer<B>,
    measurer: EgTextMeasurer<B>,
}

impl CardRenderer<MonoFontBackend> {
    /// Renderer on the built-in mono faces.
    pub fn new(cfg: CardConfig) -> Result<Self, CardError> {
        Self::with_backend(cfg, MonoFontBackend)
    }
}

impl<B> CardRenderer<B>
where
    B: FontBackend + Clone + Send + Sync,
{
    /// Validate `cfg` and build a renderer around `backend`.
    pub fn with_backend(cfg: CardConfig, backend: B) -> Result<Self, CardError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            renderer: EgRenderer::with_backend(backend.clone()),
            measurer: EgTextMeasurer::with_backend(backend),
        })
    }

    pub fn config(&self) -> &CardConfig {
        &self.cfg
    }

    /// Measurer matching this renderer's glyphs.
    pub fn measurer(&self) -> &EgTextMeasurer<B> {
        &self.measurer
    }

    /// Compose the scene without rasterizing it.
    pub fn compose(
        &self,
        cast: &Cast,
        token_name: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<CardScene, CardError> {
        compose_card(cast, token_name, generated_at, &self.cfg, &self.measurer)
    }

    /// Render a card to PNG bytes.
    pub fn render(
        &self,
        cast: &Cast,
        token_name: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<RenderedImage, CardError> {
        self.render_with_diagnostics(cast, token_name, generated_at)
            .map(|(image, _)| image)
    }

    /// Render a card to PNG bytes and report layout and font fallbacks.
    pub fn render_with_diagnostics(
        &self,
        cast: &Cast,
        token_name: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<(RenderedImage, CardDiagnostics), CardError> {
        let scene = self.compose(cast, token_name, generated_at)?;
        let (canvas, eg) = self.rasterize(&scene)?;
        let (width, height) = (canvas.width(), canvas.height());
        let png = canvas.into_png()?;

        if eg.text_fallbacks.total() > 0 {
            log::warn!(
                "{} of {} text run(s) used fallback fonts ({:?})",
                eg.text_fallbacks.total(),
                eg.text_runs,
                eg.text_fallbacks
            );
        }
        log::debug!(
            "rendered {}x{} card for @{} ({} PNG bytes)",
            width,
            height,
            cast.author.username(),
            png.len()
        );

        let diagnostics = CardDiagnostics {
            text_fallbacks: eg.text_fallbacks,
            text_runs: eg.text_runs,
            truncated: scene.plan.truncated,
            visible_lines: scene.plan.visible_lines.len(),
            total_lines: scene.plan.total_lines,
            display_name_fallback: scene.display_name_fallback,
        };
        Ok((RenderedImage { width, height, png }, diagnostics))
    }

    /// Render a card and return the raw canvas instead of PNG bytes.
    pub fn render_canvas(
        &self,
        cast: &Cast,
        token_name: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<Canvas, CardError> {
        let scene = self.compose(cast, token_name, generated_at)?;
        let mut canvas = Canvas::new(scene.width, scene.height)?;
        match self.renderer.render_scene(&scene, &mut canvas) {
            Ok(()) => Ok(canvas),
            Err(never) => match never {},
        }
    }

    fn rasterize(&self, scene: &CardScene) -> Result<(Canvas, EgRenderDiagnostics), CardError> {
        let mut canvas = Canvas::new(scene.width, scene.height)?;
        let diagnostics = match self
            .renderer
            .render_scene_with_diagnostics(scene, &mut canvas)
        {
            Ok(diagnostics) => diagnostics,
            Err(never) => match never {},
        };
        Ok((canvas, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cast_card_render::{CardElement, FillCommand, FontWeight, TextMeasurer};
    use core::convert::Infallible;
    use embedded_graphics::geometry::OriginDimensions;

    struct PixelCaptureDisplay {
        size: Size,
        pixels: Vec<(Point, Rgb888)>,
        blended: Vec<(Point, u8)>,
    }

    impl PixelCaptureDisplay {
        fn with_size(width: u32, height: u32) -> Self {
            Self {
                size: Size::new(width, height),
                pixels: Vec::new(),
                blended: Vec::new(),
            }
        }

        fn bounds(&self) -> Option<(Point, Point)> {
            let mut points = self.pixels.iter().map(|(p, _)| *p);
            let first = points.next()?;
            Some(points.fold((first, first), |(min, max), p| {
                (
                    Point::new(min.x.min(p.x), min.y.min(p.y)),
                    Point::new(max.x.max(p.x), max.y.max(p.y)),
                )
            }))
        }
    }

    impl OriginDimensions for PixelCaptureDisplay {
        fn size(&self) -> Size {
            self.size
        }
    }

    impl DrawTarget for PixelCaptureDisplay {
        type Color = Rgb888;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                self.pixels.push((point, color));
            }
            Ok(())
        }
    }

    impl BlendTarget for PixelCaptureDisplay {
        fn blend_pixel(&mut self, point: Point, _color: Rgb888, alpha: u8) {
            self.blended.push((point, alpha));
        }
    }

    fn text(x: i32, y: i32, s: &str, font: FontSpec) -> DrawCommand {
        DrawCommand::Text(TextCommand {
            x,
            y,
            text: s.to_string(),
            font,
            color: Color::WHITE,
        })
    }

    #[test]
    fn mono_backend_prefers_exact_height_matches() {
        let backend = MonoFontBackend;
        // 9x18 bold at 4x is exactly 72px tall.
        let title = backend.resolve_font(&FontSpec::bold("sans-serif", 72));
        assert_eq!(title.fallback_reason, None);
        let metrics = backend.metrics(title.font_id);
        assert_eq!(metrics.glyph_height, 72);
        assert_eq!(metrics.char_width, 36);

        let footer = backend.resolve_font(&FontSpec::normal("monospace", 20));
        let metrics = backend.metrics(footer.font_id);
        assert_eq!((metrics.char_width, metrics.glyph_height), (10, 20));
    }

    #[test]
    fn mono_backend_flags_unknown_family_and_oversize() {
        let backend = MonoFontBackend;
        let odd = backend.resolve_font(&FontSpec::normal("Comic Sans", 20));
        assert_eq!(odd.fallback_reason, Some(FontFallbackReason::UnknownFamily));

        let huge = backend.resolve_font(&FontSpec::new("serif", FontWeight::Normal, 2000));
        assert_eq!(huge.fallback_reason, Some(FontFallbackReason::SizeClamped));
        assert_eq!(backend.metrics(huge.font_id).glyph_height, 20 * 16);
    }

    #[test]
    fn unknown_font_id_falls_back_to_default_face() {
        let backend = MonoFontBackend;
        // Bold face slot 7 does not exist.
        let id = MonoFontBackend::encode_font_id(true, 7, 1);
        let (_, _, reason) = MonoFontBackend::font_for(id);
        assert_eq!(reason, Some(FontFallbackReason::UnknownFontId));
        assert_eq!(backend.metrics(id).char_width, 9);
    }

    #[test]
    fn measurer_counts_normalized_glyphs() {
        let measurer = EgTextMeasurer::new();
        let font = FontSpec::normal("monospace", 20);
        assert_eq!(measurer.measure_text_px("abc", &font), 30.0);
        // The ellipsis character draws as three dots.
        assert_eq!(measurer.measure_text_px("a\u{2026}", &font), 40.0);
        assert_eq!(measurer.measure_text_px("", &font), 0.0);
    }

    #[test]
    fn drawn_text_stays_within_measured_width() {
        let renderer = EgRenderer::default();
        let measurer = EgTextMeasurer::new();
        let font = FontSpec::normal("sans-serif", 32);
        let mut display = PixelCaptureDisplay::with_size(800, 200);
        renderer
            .draw_command(&mut display, &text(10, 20, "Hello, world", font.clone()))
            .unwrap();
        let (min, max) = display.bounds().unwrap();
        let width = measurer.measure_text_px("Hello, world", &font) as i32;
        assert!(min.x >= 10);
        assert!(max.x < 10 + width);
        assert!(min.y >= 20);
    }

    #[test]
    fn translucent_fill_blends_instead_of_overwriting() {
        let renderer = EgRenderer::default();
        let mut display = PixelCaptureDisplay::with_size(4, 4);
        renderer
            .draw_command(
                &mut display,
                &DrawCommand::RoundedRect(RoundedRectCommand {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 4,
                    corner_radius: 0,
                    fill: Color::rgba(255, 255, 255, 40),
                    stroke: Color::WHITE,
                    stroke_width: 0,
                }),
            )
            .unwrap();
        assert!(display.pixels.is_empty());
        assert_eq!(display.blended.len(), 16);
        assert!(display.blended.iter().all(|(_, alpha)| *alpha == 40));
    }

    #[test]
    fn emblem_gradient_runs_inner_to_outer() {
        let stops = [
            Color::rgb(255, 0, 0),
            Color::rgb(0, 255, 0),
            Color::rgb(0, 0, 255),
        ];
        assert_eq!(gradient_at(&stops, 0.0), Rgb888::new(255, 0, 0));
        assert_eq!(gradient_at(&stops, 0.5), Rgb888::new(0, 255, 0));
        assert_eq!(gradient_at(&stops, 1.0), Rgb888::new(0, 0, 255));
        assert_eq!(gradient_at(&stops, 3.0), Rgb888::new(0, 0, 255));
    }

    #[test]
    fn scene_diagnostics_count_text_runs_and_fallbacks() {
        let renderer = EgRenderer::default();
        let cfg = CardConfig::default();
        let mut display = Canvas::new(200, 100).unwrap();
        let scene = CardScene {
            width: 200,
            height: 100,
            commands: vec![
                (
                    CardElement::Background,
                    DrawCommand::Fill(FillCommand {
                        color: Color::rgb(1, 2, 3),
                    }),
                ),
                (
                    CardElement::Title,
                    text(0, 0, "ok", FontSpec::normal("serif", 10)),
                ),
                (
                    CardElement::Footer,
                    text(0, 50, "odd", FontSpec::normal("Papyrus", 10)),
                ),
            ],
            plan: cast_card_render::plan_text("", &cfg.fonts.body, &cfg.layout, &EgTextMeasurer::new()),
            display_name_font: None,
            display_name_fallback: false,
            emblem_glyph: String::new(),
        };
        let diagnostics = renderer
            .render_scene_with_diagnostics(&scene, &mut display)
            .unwrap();
        assert_eq!(diagnostics.text_runs, 2);
        assert_eq!(diagnostics.text_fallbacks.unknown_family, 1);
        assert_eq!(display.pixel(199, 99), Some([1, 2, 3, 255]));
    }
}
