//! Tests for the Telegram channel module.

use super::polling::{classify_update, UpdateAction};
use super::send::reply_markup_json;
use super::types::*;
use crate::utils::split_message;
use checkin_core::message::{Button, ReplyMarkup};

const OWNER: i64 = 100;

fn update(json: &str) -> TgUpdate {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_split_short_message() {
    let chunks = split_message("hello", 4096);
    assert_eq!(chunks, vec!["hello"]);
}

#[test]
fn test_split_long_message() {
    let text = "a\n".repeat(3000);
    let chunks = split_message(&text, 4096);
    assert!(chunks.len() >= 2);
    for chunk in &chunks {
        assert!(chunk.len() <= 4096);
    }
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_split_respects_char_boundaries() {
    let text = "\u{1f44d}".repeat(2000);
    let chunks = split_message(&text, 4095);
    assert_eq!(chunks.concat(), text);
}

#[test]
fn test_text_message_from_owner_is_forwarded() {
    let u = update(
        r#"{"update_id": 1, "message": {
            "message_id": 7,
            "from": {"id": 5, "first_name": "Sam"},
            "chat": {"id": 100, "type": "private"},
            "text": "4"
        }}"#,
    );
    let (cb, action) = classify_update(u, OWNER);
    assert!(cb.is_none());
    match action {
        UpdateAction::Forward(ev) => {
            assert_eq!(ev.text, "4");
            assert_eq!(ev.sender_id, "5");
            assert_eq!(ev.message_id, Some(7));
            assert_eq!(ev.reply_target.as_deref(), Some("100"));
            assert!(!ev.is_callback);
            assert!(ev.location.is_none());
        }
        other => panic!("expected Forward, got {other:?}"),
    }
}

#[test]
fn test_other_chat_is_denied() {
    let u = update(
        r#"{"update_id": 2, "message": {
            "message_id": 8,
            "chat": {"id": 555, "type": "private"},
            "text": "hi"
        }}"#,
    );
    let (_, action) = classify_update(u, OWNER);
    assert!(matches!(action, UpdateAction::Deny { chat_id: 555 }));
}

#[test]
fn test_callback_query_uses_data_as_text() {
    let u = update(
        r#"{"update_id": 3, "callback_query": {
            "id": "cb-1",
            "from": {"id": 5, "first_name": "Sam"},
            "message": {"message_id": 9, "chat": {"id": 100}, "text": "How did you sleep?"},
            "data": "true"
        }}"#,
    );
    let (cb, action) = classify_update(u, OWNER);
    assert_eq!(cb.as_deref(), Some("cb-1"));
    match action {
        UpdateAction::Forward(ev) => {
            assert_eq!(ev.text, "true");
            assert!(ev.is_callback);
        }
        other => panic!("expected Forward, got {other:?}"),
    }
}

#[test]
fn test_callback_from_other_chat_is_denied_but_acknowledged() {
    let u = update(
        r#"{"update_id": 4, "callback_query": {
            "id": "cb-2",
            "from": {"id": 9, "first_name": "Eve"},
            "message": {"message_id": 1, "chat": {"id": 777}},
            "data": "1"
        }}"#,
    );
    let (cb, action) = classify_update(u, OWNER);
    assert_eq!(cb.as_deref(), Some("cb-2"));
    assert!(matches!(action, UpdateAction::Deny { chat_id: 777 }));
}

#[test]
fn test_location_message() {
    let u = update(
        r#"{"update_id": 5, "message": {
            "message_id": 10,
            "chat": {"id": 100},
            "location": {"latitude": 52.52, "longitude": 13.405}
        }}"#,
    );
    let (_, action) = classify_update(u, OWNER);
    match action {
        UpdateAction::Forward(ev) => {
            let loc = ev.location.unwrap();
            assert_eq!(loc.latitude, 52.52);
            assert_eq!(loc.longitude, 13.405);
            assert!(ev.text.is_empty());
        }
        other => panic!("expected Forward, got {other:?}"),
    }
}

#[test]
fn test_empty_update_is_ignored() {
    let (_, action) = classify_update(update(r#"{"update_id": 6}"#), OWNER);
    assert!(matches!(action, UpdateAction::Ignore));

    let sticker = update(
        r#"{"update_id": 7, "message": {"message_id": 11, "chat": {"id": 100}}}"#,
    );
    let (_, action) = classify_update(sticker, OWNER);
    assert!(matches!(action, UpdateAction::Ignore));
}

#[test]
fn test_inline_keyboard_one_button_per_row() {
    let markup = ReplyMarkup::Inline(vec![Button::new("Yes", "true"), Button::new("No", "false")]);
    let json = reply_markup_json(&markup).unwrap();
    let rows = json["inline_keyboard"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0]["text"], "Yes");
    assert_eq!(rows[0][0]["callback_data"], "true");
    assert_eq!(rows[1][0]["callback_data"], "false");
}

#[test]
fn test_location_keyboard() {
    let markup = ReplyMarkup::RequestLocation {
        label: "Provide your location".into(),
    };
    let json = reply_markup_json(&markup).unwrap();
    assert_eq!(json["keyboard"][0][0]["request_location"], true);
    assert_eq!(json["one_time_keyboard"], true);
}

#[test]
fn test_remove_and_none_markup() {
    assert_eq!(
        reply_markup_json(&ReplyMarkup::Remove).unwrap()["remove_keyboard"],
        true
    );
    assert!(reply_markup_json(&ReplyMarkup::None).is_none());
}

#[test]
fn test_tg_response_error_shape() {
    let resp: TgResponse<Vec<TgUpdate>> =
        serde_json::from_str(r#"{"ok": false, "description": "Unauthorized"}"#).unwrap();
    assert!(!resp.ok);
    assert!(resp.result.is_none());
    assert_eq!(resp.description.as_deref(), Some("Unauthorized"));
}
