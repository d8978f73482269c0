use serde::Deserialize;

use crate::cast::{Cast, CastError};

#[derive(Deserialize)]
struct WrappedFeed {
    casts: Vec<Cast>,
}

/// Decode a feed payload: either a bare JSON array of casts or an object with
/// a `casts` array. Extra fields are ignored.
///
/// The shape is picked from the first non-whitespace byte so decode errors
/// keep serde's message and position.
pub fn parse_casts_json(json: &str) -> Result<Vec<Cast>, CastError> {
    let casts = if json.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<Cast>>(json)?
    } else {
        serde_json::from_str::<WrappedFeed>(json)?.casts
    };
    log::debug!("decoded {} cast(s) from feed payload", casts.len());
    Ok(casts)
}
