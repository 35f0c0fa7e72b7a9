//! Property tests for inbound frame parsing.
//!
//! Uses proptest to verify:
//! 1. Any envelope with a non-empty sender and ciphertext parses as a chat frame.
//! 2. Arbitrary text never causes a panic in `Frame::parse`.
//! 3. JSON objects missing one of the envelope fields are never chat frames.

use proptest::prelude::*;
use saltchat_proto::envelope::{Envelope, Frame, Metadata};

/// Strategy for generating envelopes that clients would actually send.
fn arb_envelope() -> impl Strategy<Value = Envelope> {
    (
        "[^\x00]{1,32}",
        "[A-Za-z0-9+/]{4,64}={0,2}",
        "[A-Za-z0-9]{8}",
        "[0-9a-f]{64}",
    )
        .prop_map(|(sender_name, ciphertext, salt, hash)| Envelope {
            sender_name,
            ciphertext,
            metadata: Metadata { salt, hash },
        })
}

proptest! {
    #[test]
    fn sent_envelopes_parse_as_chat(envelope in arb_envelope()) {
        let json = envelope.to_json().expect("serialization should succeed");
        prop_assert_eq!(Frame::parse(&json), Frame::Chat(envelope));
    }

    #[test]
    fn arbitrary_text_parse_no_panic(text in ".*") {
        let _ = Frame::parse(&text);
    }

    #[test]
    fn envelope_missing_a_field_is_unknown(
        envelope in arb_envelope(),
        field in prop_oneof![Just("nombre"), Just("cifrado"), Just("metadatos")],
    ) {
        let json = envelope.to_json().expect("serialization should succeed");
        let mut value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        value.as_object_mut().expect("object").remove(field);
        let frame = Frame::parse(&value.to_string());
        prop_assert!(matches!(frame, Frame::Unknown(_)));
    }
}
