//! Character and line primitives shared by the scribe crates.

pub mod chars;
pub mod line_ending;
