//! Workspace root. Exists so git hooks from cargo-husky are installed on
//! `cargo test`; all functionality lives in the member crates.
