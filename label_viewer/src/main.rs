//! Label viewer
//!
//! Builds a small labelled scene and drives it through the scene engine
//! against the recording backend, logging a report for every frame.
//!
//! Usage: `label_viewer [FILE] [--frames N]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Arg, Command};
use scene_engine::foundation::logging;
use scene_engine::foundation::math::constants::HALF_PI;
use scene_engine::prelude::*;
use scene_engine::render::text::{default_glyph_server, install_default_glyph_server, GlyphError};

/// Log filter used until a configuration names its own
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
enum ViewerError {
    #[error("Configuration error: {0}")]
    Config(#[from] scene_engine::config::ConfigError),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Glyph error: {0}")]
    Glyph(#[from] GlyphError),
}

fn cli() -> Command {
    Command::new("label_viewer")
        .about("Drives a labelled demo scene through the scene engine")
        .arg(
            Arg::new("config")
                .help("Configuration file (.toml or .ron)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("frames")
                .short('f')
                .long("frames")
                .help("Number of frames to render")
                .value_name("N")
                .value_parser(clap::value_parser!(u32))
                .default_value("4"),
        )
}

fn load_config(path: Option<&Path>) -> Result<ApplicationConfig, ViewerError> {
    let config = match path {
        Some(path) => ApplicationConfig::load_from_file(path)?,
        None => ApplicationConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Replace the builtin label face with the configured font file
fn install_configured_font(config: &RendererConfig) -> Result<(), ViewerError> {
    let Some(path) = &config.font_path else {
        return Ok(());
    };
    let server = GlyphServer::from_font_file(path, config.font_size)?;
    log::info!("Loaded label font {:?} at {}px", path, config.font_size);
    if install_default_glyph_server(Arc::new(server)).is_err() {
        log::warn!("Default glyph server already in use, keeping it");
    }
    Ok(())
}

/// Nodes the frame loop animates
struct DemoScene {
    graph: SceneGraph,
    spinner: NodeId,
    counter: NodeId,
}

fn build_scene() -> Result<DemoScene, ViewerError> {
    let mut graph = SceneGraph::default();
    let root = graph.root();

    // Ground plate with a translucent overlay drawn on top
    let ground = graph.add_child(
        root,
        MeshNode::new("ground", StaticModel::quad(10.0), Vec4::new(0.2, 0.4, 0.2, 1.0), None),
        Transform::identity().with_rotation_axis_angle(Vec3::x(), -HALF_PI),
    )?;
    graph.add_child(
        ground,
        MeshNode::new(
            "overlay",
            StaticModel::quad(4.0),
            Vec4::new(0.9, 0.9, 1.0, 0.4),
            Some(BlendState::source_over()),
        ),
        Transform::from_translation(Vec3::new(0.0, 0.0, 0.01)),
    )?;

    // Labels under a rotated, scaled parent stay upright and keep their pixel size
    let spinner = graph.add_child(
        root,
        GroupNode::new("spinner"),
        Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)).with_uniform_scale(2.5),
    )?;
    for (index, text) in ["north", "east", "south", "west"].into_iter().enumerate() {
        let angle = index as f32 * HALF_PI;
        let offset = Vec3::new(angle.cos(), 0.0, angle.sin());
        graph.add_child(
            spinner,
            TextBillboardNode::new(160, 40, None)
                .with_name(format!("label_{text}"))
                .with_text(text)
                .with_color(Vec4::new(1.0, 0.9, 0.3, 1.0)),
            Transform::from_translation(offset),
        )?;
    }

    let counter = graph.add_child(
        root,
        TextBillboardNode::new(240, 40, None).with_name("frame_counter"),
        Transform::from_translation(Vec3::new(0.0, 4.0, 0.0)),
    )?;

    // Top-down minimap in the corner
    let mut map_camera = Camera::orthographic(Vec3::new(0.0, 20.0, 0.0), 8.0, 1.0, 0.1, 100.0);
    map_camera.set_view_type(ViewType::Top);
    let minimap = graph.add_child(
        root,
        InsetViewNode::new("minimap", map_camera, Viewport::new(16, 16, 256, 256)),
        Transform::identity(),
    )?;
    graph.add_child(
        minimap,
        TextBillboardNode::new(96, 24, None).with_name("minimap_marker").with_text("you"),
        Transform::identity(),
    )?;

    log::info!("Demo scene built with {} nodes", graph.node_count());
    Ok(DemoScene { graph, spinner, counter })
}

fn run(config: &ApplicationConfig, frames: u32) -> Result<(), ViewerError> {
    log::info!("Starting label viewer for {} frame(s)", frames);
    install_configured_font(&config.renderer)?;

    if config.engine.debug_mode {
        let path = std::env::temp_dir().join("label_viewer_glyph_atlas.png");
        default_glyph_server().save_atlas_png(&path)?;
        log::info!("Glyph atlas written to {:?}", path);
    }

    let mut scene = build_scene()?;
    let camera = Camera::from_config(&config.camera);
    let mut backend = RecordingBackend::new(config.renderer.default_viewport);
    let mut driver = FrameDriver::new(&config.renderer);

    for frame in 0..frames {
        if let Some(counter) = scene.graph.behavior_mut::<TextBillboardNode>(scene.counter) {
            counter.set_text(format!("frame {frame}"));
        }
        scene
            .graph
            .transform_mut(scene.spinner)?
            .rotation = Quat::from_axis_angle(&Vec3::y_axis(), frame as f32 * 0.25);

        backend.clear_frame();
        let report = driver.render_frame(&mut scene.graph, &camera, &mut backend)?;
        log::info!(
            "Frame {}: {} node(s), {} draw(s), {} rejected uniform(s), {} skipped",
            frame,
            report.nodes_visited,
            report.draw_calls,
            report.uniform_errors,
            report.skipped.len()
        );
        log::debug!("Draw order: {:?}", backend.draw_labels());
    }

    log::info!(
        "Label viewer finished: {} frame(s), {:.1} fps average",
        driver.clock().frame_count(),
        driver.clock().average_fps()
    );
    Ok(())
}

fn report_failure(error: &ViewerError) {
    logging::init_with_level(DEFAULT_LOG_LEVEL);
    log::error!("Label viewer failed: {}", error);
    eprintln!("label_viewer: {error}");
}

fn main() {
    let matches = cli().get_matches();
    let frames = matches.get_one::<u32>("frames").copied().unwrap_or_default();

    let config = match load_config(matches.get_one::<PathBuf>("config").map(PathBuf::as_path)) {
        Ok(config) => config,
        Err(e) => {
            report_failure(&e);
            std::process::exit(1);
        }
    };
    logging::init_with_level(&config.engine.log_level);

    if let Err(e) = run(&config, frames) {
        report_failure(&e);
        std::process::exit(1);
    }
}
