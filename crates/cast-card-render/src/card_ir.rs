use serde::{Deserialize, Serialize};

use crate::card_compose::CardError;
use crate::card_layout::CardPlan;

/// Straight (non-premultiplied) RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// Whether drawing this color needs blending.
    pub fn is_translucent(self) -> bool {
        self.a < 255
    }
}

/// Font weight.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Font request: family, weight, and pixel size.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    pub weight: FontWeight,
    /// Em size in pixels; must be positive.
    pub size_px: u32,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, weight: FontWeight, size_px: u32) -> Self {
        Self {
            family: family.into(),
            weight,
            size_px,
        }
    }

    pub fn normal(family: impl Into<String>, size_px: u32) -> Self {
        Self::new(family, FontWeight::Normal, size_px)
    }

    pub fn bold(family: impl Into<String>, size_px: u32) -> Self {
        Self::new(family, FontWeight::Bold, size_px)
    }

    /// Same family and weight at another size.
    pub fn with_size(&self, size_px: u32) -> Self {
        Self {
            size_px,
            ..self.clone()
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight == FontWeight::Bold
    }

    /// Reject an empty family or a zero size. `role` names the font's use in
    /// the error.
    pub fn validate(&self, role: &'static str) -> Result<(), CardError> {
        if self.family.trim().is_empty() {
            return Err(CardError::InvalidFontSpec {
                role,
                reason: "family is empty",
            });
        }
        if self.size_px == 0 {
            return Err(CardError::InvalidFontSpec {
                role,
                reason: "size must be positive",
            });
        }
        Ok(())
    }
}

/// Solid fill of the whole surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillCommand {
    pub color: Color,
}

/// Single text run; `(x, y)` is the top-left of the glyph box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextCommand {
    pub x: i32,
    pub y: i32,
    pub text: String,
    pub font: FontSpec,
    pub color: Color,
}

/// Horizontal rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleCommand {
    pub x: i32,
    pub y: i32,
    pub length: u32,
    pub thickness: u32,
    pub color: Color,
}

/// Rounded rectangle with fill and inside-aligned border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundedRectCommand {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub corner_radius: u32,
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: u32,
}

/// Circular token emblem with a radial gradient and a centered glyph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmblemCommand {
    pub center_x: i32,
    pub center_y: i32,
    pub radius: u32,
    /// Inner, middle, and outer gradient stops.
    pub gradient: [Color; 3],
    pub stroke: Color,
    pub stroke_width: u32,
    /// May be empty.
    pub glyph: String,
    pub glyph_font: FontSpec,
    pub glyph_color: Color,
}

/// Backend-agnostic draw command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DrawCommand {
    Fill(FillCommand),
    Text(TextCommand),
    Rule(RuleCommand),
    RoundedRect(RoundedRectCommand),
    Emblem(EmblemCommand),
}

/// Element a text command belongs to, kept alongside the command list for
/// inspection and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardElement {
    Background,
    Title,
    Divider,
    Username,
    DisplayName,
    TextBox,
    TextLine,
    Emblem,
    Footer,
}

/// Fully composed card, ready for a raster backend.
#[derive(Clone, Debug, PartialEq)]
pub struct CardScene {
    pub width: u32,
    pub height: u32,
    /// Commands in paint order, each tagged with its element.
    pub commands: Vec<(CardElement, DrawCommand)>,
    /// Text-box plan the scene was built from.
    pub plan: CardPlan,
    /// Font actually used for the display name, if one was drawn.
    pub display_name_font: Option<FontSpec>,
    /// Whether the display name needed the fallback size.
    pub display_name_fallback: bool,
    pub emblem_glyph: String,
}

impl CardScene {
    /// Commands without their element tags, in paint order.
    pub fn draw_commands(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().map(|(_, cmd)| cmd)
    }

    /// Commands tagged with `element`.
    pub fn element_commands(&self, element: CardElement) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(move |(tag, _)| *tag == element)
            .map(|(_, cmd)| cmd)
    }
}

/// Encoded card image. The caller owns the bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl RenderedImage {
    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }
}
