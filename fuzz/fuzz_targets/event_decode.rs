//! Fuzz target for Event::decode
//!
//! This fuzzer tests envelope deserialization with:
//! - Malformed JSON
//! - Valid JSON with the wrong shape
//! - Oversized inputs around the size ceiling
//!
//! The decoder should NEVER panic. All invalid inputs should return an error.

#![no_main]

use banter_proto::Event;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else { return };

    // Attempt to decode the envelope
    // This should never panic, only return Err for invalid input
    if let Ok(event) = Event::decode(text) {
        // Anything that decodes must re-encode
        let _ = event.encode();
    }
});
