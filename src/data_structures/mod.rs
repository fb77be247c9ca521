//! Scene data generated on the CPU and uploaded once.
//!
//! - `geometry` builds the subdivided icosphere, the globe point cloud and
//!   the wireframe shell
//! - `star` scatters the background stars
//! - `texture` wraps GPU textures and their creation
pub mod geometry;
pub mod star;
pub mod texture;
