//! point-globe
//!
//! An interactive point-cloud globe rendered with wgpu on native targets and
//! in the browser. Points sampled from a geodesic sphere are lifted by an
//! elevation map, faded over the oceans and tinted by a rainbow highlight
//! under the cursor. A dark wireframe shell sits below them and a starfield
//! surrounds the scene; damped orbit controls move the camera.
//!
//! High-level modules
//! - `camera`: camera, projection, orbit controls and the camera uniform
//! - `config`: the tunable scene parameters and the three shipped presets
//! - `context`: GPU and window context that owns device, queue and pipelines
//! - `data_structures`: sphere geometry, stars and textures
//! - `flow`: the event loop and the [`GraphicsFlow`](flow::GraphicsFlow) trait
//! - `pipelines`: render pipelines and their bind group layouts
//! - `raycast`: cursor to globe uv picking
//! - `render`: render composition and per-pipeline batching
//! - `resources`: asset loading for native and web
//! - `scene`: the starfield and globe flows

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod raycast;
pub mod render;
pub mod resources;
pub mod scene;

pub use config::{GlobeConfig, Variant};
pub use scene::{Globe, Starfield};
pub use winit::event::{DeviceEvent, WindowEvent};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use flow::{FlowConstructor, GraphicsFlow};

/// The starfield and globe constructors for `config`, in draw order.
pub fn scene_constructors<S: 'static>(config: GlobeConfig) -> Vec<FlowConstructor<S>> {
    let star_config = config.clone();
    let starfield: FlowConstructor<S> = Box::new(move |ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<S>> = Box::new(Starfield::new(&ctx, &star_config).await);
            Ok(flow)
        })
    });
    let globe: FlowConstructor<S> = Box::new(move |ctx| {
        Box::pin(async move {
            let flow: Box<dyn GraphicsFlow<S>> = Box::new(Globe::new(&ctx, config).await);
            Ok(flow)
        })
    });
    vec![starfield, globe]
}

/// Opens a window showing the globe described by `config` and blocks until
/// it is closed.
pub fn launch(config: GlobeConfig) -> anyhow::Result<()> {
    flow::run::<()>(scene_constructors(config))
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    std::panic::set_hook(Box::new(|info| log::error!("{info}")));
    launch(GlobeConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
