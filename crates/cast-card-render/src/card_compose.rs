//! Card composition: turns a cast and a token name into paint-ordered draw
//! commands.

use cast_card::Cast;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card_ir::{
    CardElement, CardScene, Color, DrawCommand, EmblemCommand, FillCommand, FontSpec,
    RoundedRectCommand, RuleCommand, TextCommand,
};
use crate::card_layout::{plan_text, LayoutConfig, TextMeasurer};

/// Family requested by the default font set.
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Errors returned by card composition and rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CardError {
    /// A configured font cannot be used.
    InvalidFontSpec {
        role: &'static str,
        reason: &'static str,
    },
    /// Canvas or text-box geometry cannot produce a card.
    InvalidLayout(String),
    /// Serialized config could not be decoded.
    InvalidConfig(String),
    /// Drawing succeeded but the image could not be encoded.
    EncodingFailure(String),
}

impl core::fmt::Display for CardError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidFontSpec { role, reason } => {
                write!(f, "invalid {} font: {}", role, reason)
            }
            Self::InvalidLayout(msg) => write!(f, "invalid card layout: {}", msg),
            Self::InvalidConfig(msg) => write!(f, "invalid card config: {}", msg),
            Self::EncodingFailure(msg) => write!(f, "card encoding failed: {}", msg),
        }
    }
}

impl std::error::Error for CardError {}

/// Vertical placement of card elements. `*_y` values are the top edge of the
/// element's glyph box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardGeometry {
    pub title_y: i32,
    pub divider_y: i32,
    pub divider_thickness: u32,
    pub username_y: i32,
    pub display_name_y: i32,
    pub text_box_y: i32,
    pub text_box_stroke_width: u32,
    pub emblem_radius: u32,
    /// Gap between the bottom of the text box and the top of the emblem.
    pub emblem_gap: i32,
    pub emblem_stroke_width: u32,
    /// Distance from the bottom edge to the bottom of the footer text.
    pub footer_from_bottom: i32,
    /// Display names wider than `width - display_name_inset` use the fallback
    /// size.
    pub display_name_inset: i32,
    /// Pixels subtracted from the display-name size on fallback.
    pub display_name_fallback_step: u32,
}

impl Default for CardGeometry {
    fn default() -> Self {
        Self {
            title_y: 100,
            divider_y: 200,
            divider_thickness: 2,
            username_y: 240,
            display_name_y: 290,
            text_box_y: 370,
            text_box_stroke_width: 2,
            emblem_radius: 80,
            emblem_gap: 60,
            emblem_stroke_width: 4,
            footer_from_bottom: 60,
            display_name_inset: 240,
            display_name_fallback_step: 8,
        }
    }
}

/// Font for each card role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardFonts {
    pub title: FontSpec,
    pub username: FontSpec,
    pub display_name: FontSpec,
    pub body: FontSpec,
    pub emblem_glyph: FontSpec,
    pub footer: FontSpec,
}

impl Default for CardFonts {
    fn default() -> Self {
        Self {
            title: FontSpec::bold(DEFAULT_FONT_FAMILY, 72),
            username: FontSpec::normal(DEFAULT_FONT_FAMILY, 32),
            display_name: FontSpec::bold(DEFAULT_FONT_FAMILY, 48),
            body: FontSpec::normal(DEFAULT_FONT_FAMILY, 32),
            emblem_glyph: FontSpec::bold(DEFAULT_FONT_FAMILY, 80),
            footer: FontSpec::normal(DEFAULT_FONT_FAMILY, 20),
        }
    }
}

impl CardFonts {
    fn roles(&self) -> [(&'static str, &FontSpec); 6] {
        [
            ("title", &self.title),
            ("username", &self.username),
            ("display name", &self.display_name),
            ("body", &self.body),
            ("emblem glyph", &self.emblem_glyph),
            ("footer", &self.footer),
        ]
    }
}

/// Card palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardTheme {
    pub background: Color,
    pub title: Color,
    pub divider: Color,
    pub muted: Color,
    pub text: Color,
    /// Usually translucent so the background shows through.
    pub text_box_fill: Color,
    pub text_box_stroke: Color,
    /// Inner, middle, and outer stops.
    pub emblem_gradient: [Color; 3],
    pub emblem_stroke: Color,
    pub emblem_glyph: Color,
    pub footer: Color,
}

impl Default for CardTheme {
    fn default() -> Self {
        Self {
            background: Color::rgb(22, 18, 40),
            title: Color::WHITE,
            divider: Color::rgb(96, 82, 150),
            muted: Color::rgb(160, 156, 186),
            text: Color::rgb(238, 236, 246),
            text_box_fill: Color::rgba(255, 255, 255, 24),
            text_box_stroke: Color::rgb(124, 104, 206),
            emblem_gradient: [
                Color::rgb(255, 214, 102),
                Color::rgb(240, 128, 64),
                Color::rgb(176, 48, 96),
            ],
            emblem_stroke: Color::WHITE,
            emblem_glyph: Color::WHITE,
            footer: Color::rgb(128, 124, 150),
        }
    }
}

/// Everything a render needs besides the cast itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub layout: LayoutConfig,
    pub geometry: CardGeometry,
    pub fonts: CardFonts,
    pub theme: CardTheme,
    /// Text before the timestamp in the footer.
    pub footer_label: String,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            geometry: CardGeometry::default(),
            fonts: CardFonts::default(),
            theme: CardTheme::default(),
            footer_label: "Generated by cast-card".to_string(),
        }
    }
}

impl CardConfig {
    /// Decode a config from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CardError> {
        serde_json::from_str(json).map_err(|err| CardError::InvalidConfig(err.to_string()))
    }

    /// Check layout geometry and every font.
    pub fn validate(&self) -> Result<(), CardError> {
        self.layout.validate()?;
        for (role, font) in self.fonts.roles() {
            font.validate(role)?;
        }
        Ok(())
    }
}

/// Emblem glyph for `token_name`: its first character uppercased.
///
/// Uppercasing may expand (`ß` becomes `SS`). An empty name gives an empty
/// glyph.
pub fn emblem_glyph(token_name: &str) -> String {
    token_name
        .chars()
        .next()
        .map(|ch| ch.to_uppercase().collect())
        .unwrap_or_default()
}

/// Footer caption with a minute-resolution UTC timestamp.
pub fn format_footer(label: &str, generated_at: DateTime<Utc>) -> String {
    format!(
        "{} | {}",
        label,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    )
}

/// Font for the display name, and whether the fallback size was needed.
///
/// Only one fallback step is taken; the fallback font is used even if the
/// name is still too wide.
pub fn display_name_font(
    name: &str,
    cfg: &CardConfig,
    measurer: &dyn TextMeasurer,
) -> (FontSpec, bool) {
    let primary = &cfg.fonts.display_name;
    let limit = cfg.layout.width as i32 - cfg.geometry.display_name_inset;
    let width = measurer.measure_text_px(name, primary);
    if width > limit as f32 {
        let size = primary
            .size_px
            .saturating_sub(cfg.geometry.display_name_fallback_step)
            .max(1);
        log::debug!(
            "display name measures {:.1}px over {}px limit; using {}px",
            width,
            limit,
            size
        );
        (primary.with_size(size), true)
    } else {
        (primary.clone(), false)
    }
}

fn centered_x(canvas_width: u32, text: &str, font: &FontSpec, measurer: &dyn TextMeasurer) -> i32 {
    let text_width = measurer.measure_text_px(text, font);
    ((canvas_width as f32 - text_width) / 2.0).round() as i32
}

/// Compose a card into paint-ordered draw commands.
///
/// `generated_at` only feeds the footer; passing it in keeps output stable
/// for identical inputs.
pub fn compose_card(
    cast: &Cast,
    token_name: &str,
    generated_at: DateTime<Utc>,
    cfg: &CardConfig,
    measurer: &dyn TextMeasurer,
) -> Result<CardScene, CardError> {
    cfg.validate()?;

    let layout = &cfg.layout;
    let geometry = &cfg.geometry;
    let fonts = &cfg.fonts;
    let theme = &cfg.theme;
    let mut commands = Vec::with_capacity(16);

    commands.push((
        CardElement::Background,
        DrawCommand::Fill(FillCommand {
            color: theme.background,
        }),
    ));

    commands.push((
        CardElement::Title,
        DrawCommand::Text(TextCommand {
            x: centered_x(layout.width, token_name, &fonts.title, measurer),
            y: geometry.title_y,
            text: token_name.to_string(),
            font: fonts.title.clone(),
            color: theme.title,
        }),
    ));

    commands.push((
        CardElement::Divider,
        DrawCommand::Rule(RuleCommand {
            x: layout.margin,
            y: geometry.divider_y,
            length: layout.text_box_width().max(0) as u32,
            thickness: geometry.divider_thickness,
            color: theme.divider,
        }),
    ));

    commands.push((
        CardElement::Username,
        DrawCommand::Text(TextCommand {
            x: layout.margin,
            y: geometry.username_y,
            text: format!("@{}", cast.author.username()),
            font: fonts.username.clone(),
            color: theme.muted,
        }),
    ));

    let mut display_name_used = None;
    let mut display_name_fallback = false;
    if let Some(name) = cast.author.display_name() {
        let (font, fallback) = display_name_font(name, cfg, measurer);
        display_name_fallback = fallback;
        display_name_used = Some(font.clone());
        commands.push((
            CardElement::DisplayName,
            DrawCommand::Text(TextCommand {
                x: layout.margin,
                y: geometry.display_name_y,
                text: name.to_string(),
                font,
                color: theme.text,
            }),
        ));
    }

    let plan = plan_text(&cast.text, &fonts.body, layout, measurer);
    commands.push((
        CardElement::TextBox,
        DrawCommand::RoundedRect(RoundedRectCommand {
            x: layout.margin,
            y: geometry.text_box_y,
            width: layout.text_box_width().max(0) as u32,
            height: plan.box_height.max(0) as u32,
            corner_radius: layout.corner_radius,
            fill: theme.text_box_fill,
            stroke: theme.text_box_stroke,
            stroke_width: geometry.text_box_stroke_width,
        }),
    ));

    let line_x = layout.margin + layout.text_box_padding;
    let slot_offset = (layout.line_height - fonts.body.size_px as i32) / 2;
    let first_line_y = geometry.text_box_y + layout.text_box_padding + slot_offset;
    for (idx, line) in plan.visible_lines.iter().enumerate() {
        commands.push((
            CardElement::TextLine,
            DrawCommand::Text(TextCommand {
                x: line_x,
                y: first_line_y + idx as i32 * layout.line_height,
                text: line.content.clone(),
                font: fonts.body.clone(),
                color: theme.text,
            }),
        ));
    }

    let glyph = emblem_glyph(token_name);
    let radius = geometry.emblem_radius as i32;
    commands.push((
        CardElement::Emblem,
        DrawCommand::Emblem(EmblemCommand {
            center_x: layout.width as i32 / 2,
            center_y: geometry.text_box_y + plan.box_height + geometry.emblem_gap + radius,
            radius: geometry.emblem_radius,
            gradient: theme.emblem_gradient,
            stroke: theme.emblem_stroke,
            stroke_width: geometry.emblem_stroke_width,
            glyph: glyph.clone(),
            glyph_font: fonts.emblem_glyph.clone(),
            glyph_color: theme.emblem_glyph,
        }),
    ));

    let footer = format_footer(&cfg.footer_label, generated_at);
    commands.push((
        CardElement::Footer,
        DrawCommand::Text(TextCommand {
            x: centered_x(layout.width, &footer, &fonts.footer, measurer),
            y: layout.height as i32 - geometry.footer_from_bottom - fonts.footer.size_px as i32,
            text: footer,
            font: fonts.footer.clone(),
            color: theme.footer,
        }),
    ));

    log::debug!(
        "composed card for @{}: {} command(s), {}/{} line(s) visible",
        cast.author.username(),
        commands.len(),
        plan.visible_lines.len(),
        plan.total_lines
    );

    Ok(CardScene {
        width: layout.width,
        height: layout.height,
        commands,
        plan,
        display_name_font: display_name_used,
        display_name_fallback,
        emblem_glyph: glyph,
    })
}
