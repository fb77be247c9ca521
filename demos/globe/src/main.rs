//! Opens the globe window.
//!
//! `cargo run -- relief` picks a preset by name; without an argument the
//! `POINT_GLOBE_VARIANT` environment variable decides.

use point_globe::{GlobeConfig, Variant, flow};

fn main() -> anyhow::Result<()> {
    flow::init_logger();
    let config = match std::env::args().nth(1) {
        Some(name) => GlobeConfig::preset(name.parse::<Variant>()?),
        None => GlobeConfig::from_env(),
    };
    point_globe::launch(config)
}
