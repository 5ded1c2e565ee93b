//! Property-based tests for event encoding/decoding.
//!
//! These tests verify the envelope codec for ALL inputs, not just specific
//! examples: round-trips are identity, and the decoder never panics on
//! arbitrary text.

use banter_proto::{Event, Payload, ProtocolError, SendMsg};
use proptest::prelude::*;

/// Strategy for event names the server could plausibly use
fn arbitrary_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,23}"
}

/// Strategy for arbitrary sendMsg payloads
fn arbitrary_send_msg() -> impl Strategy<Value = SendMsg> {
    (
        "[^\\p{C}]{1,200}",  // text: printable, non-empty
        "[0-9]{2}:[0-9]{2} [0-9]{2}/[0-9]{2}",
        "[a-z0-9-]{1,16}",
        "[a-zA-Z0-9_]{1,24}",
        "[a-z0-9-]{1,32}",
    )
        .prop_map(|(text, client_timestamp, sender_user_id, sender_username, room_id)| SendMsg {
            text,
            client_timestamp,
            sender_user_id,
            sender_username,
            room_id,
        })
}

#[test]
fn prop_event_encode_decode_roundtrip() {
    proptest!(|(name in arbitrary_name(), text in "[^\\p{C}]{0,256}")| {
        let event = Event::new(name, serde_json::json!({ "text": text }));

        let encoded = event.encode().expect("encode should succeed");
        let decoded = Event::decode(&encoded).expect("decode should succeed");

        // PROPERTY: Round-trip must be identity
        prop_assert_eq!(decoded, event);
    });
}

#[test]
fn prop_send_msg_survives_the_wire() {
    proptest!(|(msg in arbitrary_send_msg())| {
        let event = Payload::SendMsg(msg.clone()).into_event().expect("into_event should succeed");

        let encoded = event.encode().expect("encode should succeed");
        let decoded = Payload::from_event(Event::decode(&encoded).expect("decode should succeed"))
            .expect("payload should decode");

        // PROPERTY: Every stamped field arrives unchanged
        prop_assert_eq!(decoded, Payload::SendMsg(msg));
    });
}

#[test]
fn prop_decode_never_panics() {
    proptest!(|(input in "\\PC{0,512}")| {
        // PROPERTY: Arbitrary input returns Ok or Err, never panics
        let _ = Event::decode(&input);
    });
}

#[test]
fn prop_oversized_input_is_rejected_before_parsing() {
    proptest!(|(filler in prop::collection::vec(any::<u8>(), 0..64))| {
        let mut text = String::from("{\"event\":\"x\",\"data\":\"");
        text.push_str(&"a".repeat(Event::MAX_ENCODED_SIZE));
        text.push_str(&filler.iter().map(|b| format!("{b:02x}")).collect::<String>());
        text.push_str("\"}");

        let result = Event::decode(&text);

        // PROPERTY: Size ceiling applies no matter what follows it
        let rejected = matches!(&result, Err(ProtocolError::EventTooLarge { .. }));
        prop_assert!(rejected, "expected the size ceiling to reject, got {:?}", result);
    });
}
