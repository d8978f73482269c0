//! Cast data model, feed decoding, and selection-response parsing for `cast-card`.
//!
//! This crate holds the inputs to card rendering. Layout and raster output
//! live in `cast-card-render` and `cast-card-embedded-graphics`.

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

mod cast;
mod feed;
mod selection;

pub use cast::{Author, Cast, CastError};
pub use feed::parse_casts_json;
pub use selection::{parse_selection, ResolvedSelection, SelectionFields, DEFAULT_TOKEN_NAME};
