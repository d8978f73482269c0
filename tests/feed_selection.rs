mod common;

use cast_card::{parse_casts_json, parse_selection, CastError, DEFAULT_TOKEN_NAME};
use common::fixtures::{feed_casts, read_fixture, SELECTION_FIXTURE};

#[test]
fn feed_fixture_decodes_all_casts() {
    let casts = feed_casts();
    assert_eq!(casts.len(), 3);

    assert_eq!(casts[0].author.username(), "dwr");
    assert_eq!(casts[0].author.display_name(), Some("Dan Romero"));
    assert!(casts[0].text.contains('\n'));

    // Blank display names read as absent; `timestamp` is accepted for the
    // creation time.
    assert_eq!(casts[1].author.display_name(), None);
    assert_eq!(casts[1].created_at.to_rfc3339(), "2024-03-02T08:00:00+00:00");

    assert_eq!(casts[2].text, "");
    assert_eq!(casts[2].author.display_name(), None);
}

#[test]
fn selection_fixture_resolves_against_feed() {
    let casts = feed_casts();
    let fields = parse_selection(&read_fixture(SELECTION_FIXTURE));
    assert_eq!(fields.cast_index, Some(1));
    assert_eq!(fields.token_name.as_deref(), Some("MoonCat"));

    let selection = fields.resolve(casts.len());
    assert_eq!(selection.cast_index, 1);
    assert_eq!(selection.token_name, "MoonCat");
    assert_eq!(
        selection.image_description,
        "a pixel-art cat sitting on a crescent moon, purple sky"
    );
}

#[test]
fn unhelpful_response_falls_back_to_defaults() {
    let selection = parse_selection("honestly they are all great").resolve(3);
    assert_eq!(selection.cast_index, 0);
    assert_eq!(selection.token_name, DEFAULT_TOKEN_NAME);
    assert!(selection.image_description.is_empty());

    let selection = parse_selection("Cast index: 12\nName: Frog").resolve(3);
    assert_eq!(selection.cast_index, 0);
    assert_eq!(selection.token_name, "Frog");
}

#[test]
fn feed_with_empty_username_is_rejected() {
    let json = r#"[{ "text": "x", "hash": "0x0", "author": { "username": " " }, "createdAt": "2024-01-01T00:00:00Z" }]"#;
    let err = parse_casts_json(json).unwrap_err();
    assert!(matches!(err, CastError::Json(ref msg) if msg.contains("username is empty")));
}
