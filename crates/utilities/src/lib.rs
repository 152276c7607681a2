#![deny(
    rust_2018_compatibility,
    rust_2018_idioms,
    nonstandard_style,
    unused,
    future_incompatible
)]
#![warn(clippy::doc_markdown)]

//! Fixtures shared by the tests and benches of the workspace.

pub mod consumers;
pub mod data_sets;
pub mod sources;
