//! Card IR, text layout, and composition for `cast-card`.

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

mod card_compose;
mod card_ir;
mod card_layout;

pub use cast_card::{Author, Cast};
pub use card_compose::{
    compose_card, display_name_font, emblem_glyph, format_footer, CardConfig, CardError,
    CardFonts, CardGeometry, CardTheme, DEFAULT_FONT_FAMILY,
};
pub use card_ir::{
    CardElement, CardScene, Color, DrawCommand, EmblemCommand, FillCommand, FontSpec, FontWeight,
    RenderedImage, RoundedRectCommand, RuleCommand, TextCommand,
};
pub use card_layout::{
    apply_truncation, plan_box, plan_text, wrap_text, BoxPlan, CardPlan, HeuristicMeasurer,
    LayoutConfig, TextMeasurer, WrappedLine, ELLIPSIS,
};
