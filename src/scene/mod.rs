//! The two flows that make up the composition: a static starfield and the
//! spinning globe in front of it.

pub mod globe;
pub mod starfield;

pub use globe::Globe;
pub use starfield::Starfield;
