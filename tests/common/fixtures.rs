use std::path::PathBuf;

use cast_card::{parse_casts_json, Cast};

pub const FEED_FIXTURE: &str = "tests/fixtures/casts.json";
pub const SELECTION_FIXTURE: &str = "tests/fixtures/selection.md";

pub fn fixture_path(relative: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push(relative);
    path
}

pub fn read_fixture(relative: &str) -> String {
    let path = fixture_path(relative);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

pub fn feed_casts() -> Vec<Cast> {
    parse_casts_json(&read_fixture(FEED_FIXTURE))
        .unwrap_or_else(|e| panic!("parse {}: {}", FEED_FIXTURE, e))
}
