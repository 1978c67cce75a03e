//! Headless scene viewer
//!
//! Loads an s72 scene with the parameters from a config file, adds the user orbit
//! camera and steps a fixed number of frames through animation and culling, logging
//! what a renderer would be handed.
//!
//! ```text
//! scene_viewer [config.toml|config.ron]
//! ```

use scene_runtime::config::ConfigError;
use scene_runtime::ecs::StoreError;
use scene_runtime::foundation::logging;
use scene_runtime::prelude::*;

const FRAME_COUNT: u32 = 120;
const FRAME_TIME: f32 = 1.0 / 60.0;

#[derive(thiserror::Error, Debug)]
enum ViewerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("frame error: {0}")]
    Frame(#[from] StoreError),
}

fn load_parameters() -> Result<ModeParameters, ConfigError> {
    let params = match std::env::args().nth(1) {
        Some(path) => ModeParameters::load_from_file(path)?,
        None => ModeParameters::default(),
    };
    params.validate()?;
    Ok(params)
}

fn run() -> Result<(), ViewerError> {
    let params = load_parameters()?;
    logging::init_with_filter(&params.log_filter);
    log::info!("Starting scene viewer with {params:?}");

    let mut world = World::new();
    let mut buffers = GeometryBuffers::new();
    let mut scene = Scene::load(&params, &mut world, &mut buffers)?;
    log::info!(
        "Geometry: {} vertices, {} indices",
        buffers.vertices.len(),
        buffers.indices.len()
    );
    log::info!("Scene graph:\n{scene}");

    let camera = scene.add_orbit_camera(&mut world);
    let input = OrbitInput {
        turn_h: 0.002,
        ..Default::default()
    };

    let mut elapsed = 0.0;
    let mut total_draws = 0;
    let mut total_culled = 0;
    for frame in 0..FRAME_COUNT {
        scene.update_drivers(elapsed);
        scene.update_orbit_camera(camera, &input)?;
        let draws = scene.draw_scene()?;
        log::trace!("Frame {frame}: {} draws, {} culled", draws.draws.len(), draws.culled);

        total_draws += draws.draws.len();
        total_culled += draws.culled;
        elapsed += FRAME_TIME;
    }

    log::info!(
        "Ran {FRAME_COUNT} frames: {total_draws} draws, {total_culled} culled ({:.1} draws/frame)",
        total_draws as f32 / FRAME_COUNT as f32
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("scene_viewer: {e}");
        std::process::exit(1);
    }
}
