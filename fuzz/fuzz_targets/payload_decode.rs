//! Fuzz target for Payload::from_event
//!
//! This fuzzer tests typed payload extraction with:
//! - Arbitrary event names, including the reserved ones
//! - Payload data of the wrong shape for the name
//! - Deeply nested or junk JSON values
//!
//! The extractor should NEVER panic. All invalid inputs should return an
//! error.

#![no_main]

use arbitrary::Arbitrary;
use banter_proto::{Event, Payload, names};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    name: String,
    raw: String,
}

fuzz_target!(|input: FuzzInput| {
    let data = serde_json::from_str(&input.raw).unwrap_or(serde_json::Value::Null);

    // Try the arbitrary name, then force each known name against the same
    // data to exercise every typed decode path
    let known = [names::SEND_MESSAGE, names::NEW_MESSAGE, names::DISCONNECTED];
    for candidate in std::iter::once(input.name.as_str()).chain(known) {
        let event = Event::new(candidate, data.clone());
        if let Ok(payload) = Payload::from_event(event) {
            // Anything that decodes must round-trip back into an event
            let _ = payload.into_event();
        }
    }
});
