//! Traversal integration tests
//!
//! Drives whole frames through the recording backend and checks transform
//! composition, hook order, camera stack balance and the failure policy.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use scene_engine::prelude::*;
use scene_engine::render::api::{uniform_names, UniformValue};
use scene_engine::render::backends::RecordedCommand;
use scene_engine::render::RenderUnit;
use scene_engine::scene::nodes::flat_program;
use scene_engine::scene::{InitState, NodePhase};

fn camera() -> Camera {
    Camera::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 1.0, 0.1, 100.0)
}

fn backend() -> RecordingBackend {
    RecordingBackend::new(Viewport::from_size(800, 600))
}

fn mesh(name: &str, color: Vec4, blend: Option<BlendState>) -> MeshNode {
    MeshNode::new(name, StaticModel::quad(1.0), color, blend)
}

fn red() -> Vec4 {
    Vec4::new(1.0, 0.0, 0.0, 1.0)
}

fn model_uniform(backend: &RecordingBackend, label: &str) -> Option<Mat4> {
    backend
        .draws()
        .iter()
        .find(|draw| draw.label == label)
        .and_then(|draw| draw.uniform(uniform_names::MODEL_MATRIX))
        .and_then(UniformValue::as_mat4)
        .copied()
}

/// Records hook calls and the camera stack depth seen by each
struct HookLogger {
    name: String,
    log: Rc<RefCell<Vec<String>>>,
}

impl HookLogger {
    fn new(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Self {
        Self { name: name.to_string(), log: Rc::clone(log) }
    }
}

impl NodeBehavior for HookLogger {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        Ok(())
    }

    fn render_before_children(&mut self, args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        let depth = args.camera_stack().depth();
        self.log.borrow_mut().push(format!("before {} @{}", self.name, depth));
        Ok(())
    }

    fn render_after_children(&mut self, args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        let depth = args.camera_stack().depth();
        self.log.borrow_mut().push(format!("after {} @{}", self.name, depth));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Claims to be initialized on the first call without acquiring anything
struct ForgetfulNode {
    unit: RenderUnit,
    model: StaticModel,
    initialize_calls: u32,
}

impl NodeBehavior for ForgetfulNode {
    fn name(&self) -> &str {
        "forgetful"
    }

    fn initialize(&mut self, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        self.initialize_calls += 1;
        if self.initialize_calls > 1 {
            self.unit.initialize(backend, &self.model)?;
        }
        Ok(())
    }

    fn render_before_children(&mut self, args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        args.draw(&mut self.unit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn model_matrix_is_product_of_ancestors() {
    let mut scene = SceneGraph::default();
    let root = scene.root();
    let a_local = Transform::from_translation(Vec3::new(2.0, 0.0, 0.0))
        .with_rotation_axis_angle(Vec3::z(), 0.7)
        .with_uniform_scale(1.5);
    let b_local = Transform::from_translation(Vec3::new(0.0, 1.0, -1.0))
        .with_rotation_axis_angle(Vec3::x(), -0.3);
    let c_local = Transform::from_translation(Vec3::new(0.5, 0.5, 0.5));

    let a = scene.add_child(root, GroupNode::new("a"), a_local).expect("a");
    let b = scene.add_child(a, GroupNode::new("b"), b_local).expect("b");
    let c = scene.add_child(b, mesh("c", red(), None), c_local).expect("c");

    let mut backend = backend();
    FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    let expected = a_local.to_matrix() * b_local.to_matrix() * c_local.to_matrix();
    let drawn = model_uniform(&backend, "c").expect("c drawn");
    assert_relative_eq!(drawn, expected, epsilon = 1e-5);
    assert_relative_eq!(scene.world_matrix(c).expect("c world"), expected, epsilon = 1e-5);
}

#[test]
fn sibling_order_does_not_change_own_matrix() {
    let leaf = Transform::from_translation(Vec3::new(0.0, 2.0, 0.0));
    let parent = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)).with_rotation_axis_angle(Vec3::y(), 1.0);
    let sibling = Transform::from_translation(Vec3::new(-4.0, 0.0, 0.0)).with_uniform_scale(3.0);

    let mut matrices = Vec::new();
    for sibling_first in [true, false] {
        let mut scene = SceneGraph::default();
        let root = scene.root();
        if sibling_first {
            scene.add_child(root, mesh("sibling", red(), None), sibling).expect("sibling");
        }
        let p = scene.add_child(root, GroupNode::new("parent"), parent).expect("parent");
        scene.add_child(p, mesh("leaf", red(), None), leaf).expect("leaf");
        if !sibling_first {
            scene.add_child(root, mesh("sibling", red(), None), sibling).expect("sibling");
        }

        let mut backend = backend();
        FrameDriver::default()
            .render_frame(&mut scene, &camera(), &mut backend)
            .expect("frame");
        matrices.push(model_uniform(&backend, "leaf").expect("leaf drawn"));
    }

    assert_relative_eq!(matrices[0], matrices[1], epsilon = 1e-6);
}

#[test]
fn hooks_run_depth_first_in_insertion_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut scene = SceneGraph::new(HookLogger::new("root", &log));
    let root = scene.root();
    let a = scene.add_child(root, HookLogger::new("a", &log), Transform::identity()).expect("a");
    scene.add_child(a, HookLogger::new("a1", &log), Transform::identity()).expect("a1");
    scene.add_child(root, HookLogger::new("b", &log), Transform::identity()).expect("b");

    let mut backend = backend();
    let report = FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    assert_eq!(report.nodes_visited, 4);
    assert_eq!(
        *log.borrow(),
        vec![
            "before root @1", "before a @1", "before a1 @1", "after a1 @1",
            "after a @1", "before b @1", "after b @1", "after root @1",
        ]
    );
    for id in scene.iter_depth_first() {
        assert_eq!(scene.get(id).map(|node| node.phase()), Some(NodePhase::Idle));
    }
}

#[test]
fn camera_stack_depth_is_restored_around_insets() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut scene = SceneGraph::default();
    let root = scene.root();

    let inset_viewport = Viewport::new(600, 450, 200, 150);
    let inset_camera = Camera::orthographic(Vec3::new(0.0, 10.0, 0.0), 5.0, 1.0, 0.1, 100.0);
    let inset = scene
        .add_child(root, InsetViewNode::new("inset", inset_camera.clone(), inset_viewport), Transform::identity())
        .expect("inset");
    scene.add_child(inset, HookLogger::new("inside", &log), Transform::identity()).expect("inside");
    scene.add_child(inset, mesh("inset_mesh", red(), None), Transform::identity()).expect("mesh");
    scene.add_child(root, HookLogger::new("outside", &log), Transform::identity()).expect("outside");
    scene.add_child(root, mesh("main_mesh", red(), None), Transform::identity()).expect("mesh");

    let mut backend = backend();
    let mut stack = CameraStack::new();
    stack.push(camera().context(backend.viewport()));
    let renderer = SceneRenderer::default();

    renderer.render(&mut scene, &mut stack, &mut backend).expect("frame");

    assert_eq!(stack.depth(), 1);
    assert_eq!(
        *log.borrow(),
        vec!["before inside @2", "after inside @2", "before outside @1", "after outside @1"]
    );

    // The inset subtree drew with the inset camera and viewport
    let inset_draw = backend.draws().iter().find(|d| d.label == "inset_mesh").expect("inset draw");
    assert_eq!(inset_draw.viewport, inset_viewport);
    let expected_projection = inset_camera.context(inset_viewport).projection;
    let projection = inset_draw.uniform(uniform_names::PROJECTION_MATRIX).and_then(UniformValue::as_mat4);
    assert_eq!(projection, Some(&expected_projection));

    // The viewport is restored for the rest of the frame
    let main_draw = backend.draws().iter().find(|d| d.label == "main_mesh").expect("main draw");
    assert_eq!(main_draw.viewport, Viewport::from_size(800, 600));
    assert_eq!(backend.viewport(), Viewport::from_size(800, 600));
}

fn minimap_scene(flags: RenderFlags) -> (SceneGraph, Viewport) {
    let inset_viewport = Viewport::new(16, 16, 256, 256);
    let map_camera = Camera::orthographic(Vec3::new(0.0, 20.0, 0.0), 8.0, 1.0, 0.1, 100.0);
    let mut scene = SceneGraph::default();
    let root = scene.root();
    let minimap = scene
        .add_child(root, InsetViewNode::new("minimap", map_camera, inset_viewport), Transform::identity())
        .expect("minimap");
    scene.set_flags(minimap, flags).expect("flags");
    scene
        .add_child(minimap, TextBillboardNode::new(96, 24, None).with_name("marker").with_text("you"), Transform::identity())
        .expect("marker");
    scene.add_child(root, mesh("main_mesh", red(), None), Transform::identity()).expect("mesh");
    (scene, inset_viewport)
}

fn viewport_switches(backend: &RecordingBackend) -> Vec<Viewport> {
    backend
        .commands()
        .iter()
        .filter_map(|command| match command {
            RecordedCommand::SetViewport(viewport) => Some(*viewport),
            _ => None,
        })
        .collect()
}

#[test]
fn inset_viewport_is_restored_without_after_hook() {
    let (mut scene, inset_viewport) = minimap_scene(RenderFlags::all() - RenderFlags::AFTER_CHILDREN);
    let mut backend = backend();
    FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    let marker = backend.draws().iter().find(|d| d.label == "text_billboard").expect("marker draw");
    assert_eq!(marker.viewport, inset_viewport);
    let main_draw = backend.draws().iter().find(|d| d.label == "main_mesh").expect("main draw");
    assert_eq!(main_draw.viewport, Viewport::from_size(800, 600));
    assert_eq!(backend.viewport(), Viewport::from_size(800, 600));
    assert_eq!(viewport_switches(&backend), vec![inset_viewport, Viewport::from_size(800, 600)]);
}

#[test]
fn inset_viewport_applies_without_before_hook() {
    let (mut scene, inset_viewport) = minimap_scene(RenderFlags::all() - RenderFlags::BEFORE_CHILDREN);
    let mut backend = backend();
    FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    let marker = backend.draws().iter().find(|d| d.label == "text_billboard").expect("marker draw");
    assert_eq!(marker.viewport, inset_viewport);
    assert_eq!(
        marker.uniform(uniform_names::SCREEN_SIZE),
        Some(&UniformValue::Vec2(Vec2::new(256.0, 256.0)))
    );
    assert_eq!(viewport_switches(&backend), vec![inset_viewport, Viewport::from_size(800, 600)]);
    assert_eq!(backend.viewport(), Viewport::from_size(800, 600));
}

#[test]
fn empty_camera_stack_aborts_without_drawing() {
    let mut scene = SceneGraph::default();
    scene.add_child(scene.root(), mesh("a", red(), None), Transform::identity()).expect("a");

    let mut backend = backend();
    let mut stack = CameraStack::new();
    let result = SceneRenderer::default().render(&mut scene, &mut stack, &mut backend);

    assert!(matches!(result, Err(RenderError::EmptyCameraStack)));
    assert_eq!(stack.depth(), 0);
    assert!(backend.draws().is_empty());
    assert_eq!(backend.program_count(), 0);
}

#[test]
fn initialization_happens_once_across_frames() {
    let mut scene = SceneGraph::default();
    let root = scene.root();
    scene.add_child(root, mesh("a", red(), None), Transform::identity()).expect("a");
    scene.add_child(root, TextBillboardNode::new(200, 50, None).with_text("label"), Transform::identity())
        .expect("label");

    let mut backend = backend();
    let mut driver = FrameDriver::default();
    driver.render_frame(&mut scene, &camera(), &mut backend).expect("frame 1");
    let programs = backend.program_count();
    let buffers = backend.buffer_count();

    for _ in 0..3 {
        backend.clear_frame();
        let report = driver.render_frame(&mut scene, &camera(), &mut backend).expect("frame");
        assert_eq!(report.draw_calls, 2);
    }

    assert_eq!(programs, 2);
    assert_eq!(backend.program_count(), programs);
    assert_eq!(backend.buffer_count(), buffers);
    assert_eq!(driver.clock().frame_count(), 4);
    assert!(driver.camera_stack().is_empty());
}

#[test]
fn later_sibling_draws_on_top() {
    let mut scene = SceneGraph::default();
    let root = scene.root();
    scene.add_child(root, mesh("A", red(), None), Transform::identity()).expect("A");
    scene
        .add_child(root, mesh("B", Vec4::new(0.0, 0.0, 1.0, 0.5), Some(BlendState::source_over())), Transform::identity())
        .expect("B");

    let mut backend = backend();
    FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    assert_eq!(backend.draw_labels(), vec!["A", "B"]);
    let pixel = backend.composite_pixel(Vec4::new(0.0, 0.0, 0.0, 1.0));
    assert_relative_eq!(pixel.x, 0.5, epsilon = 1e-6);
    assert_relative_eq!(pixel.z, 0.5, epsilon = 1e-6);
}

#[test]
fn opaque_later_sibling_covers_earlier() {
    let blue = Vec4::new(0.0, 0.0, 1.0, 1.0);
    let mut scene = SceneGraph::default();
    let root = scene.root();
    scene.add_child(root, mesh("A", red(), Some(BlendState::source_over())), Transform::identity()).expect("A");
    scene.add_child(root, mesh("B", blue, Some(BlendState::source_over())), Transform::identity()).expect("B");

    let mut backend = backend();
    FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    assert_relative_eq!(backend.composite_pixel(Vec4::zeros()), blue, epsilon = 1e-6);
}

#[test]
fn failed_node_is_skipped_but_children_and_siblings_draw() {
    let mut scene = SceneGraph::default();
    let root = scene.root();
    let broken = scene.add_child(root, mesh("broken", red(), None), Transform::identity()).expect("broken");
    scene.add_child(broken, mesh("child", red(), None), Transform::identity()).expect("child");
    scene.add_child(root, mesh("sibling", red(), None), Transform::identity()).expect("sibling");

    let mut backend = backend();
    backend.fail_program("broken");
    let mut driver = FrameDriver::default();

    let report = driver.render_frame(&mut scene, &camera(), &mut backend).expect("frame");
    assert_eq!(backend.draw_labels(), vec!["child", "sibling"]);
    assert!(report.was_skipped(broken));
    assert_eq!(report.skipped.len(), 1);
    assert!(matches!(
        scene.get(broken).map(|node| node.init_state().clone()),
        Some(InitState::Unrenderable { attempts: 1, .. })
    ));

    // A single attempt is the default: the node stays skipped
    backend.heal_program("broken");
    backend.clear_frame();
    let report = driver.render_frame(&mut scene, &camera(), &mut backend).expect("frame");
    assert!(report.was_skipped(broken));
    assert_eq!(backend.draw_labels(), vec!["child", "sibling"]);
}

#[test]
fn failed_node_is_retried_within_budget() {
    let mut scene = SceneGraph::default();
    let broken = scene.add_child(scene.root(), mesh("broken", red(), None), Transform::identity()).expect("broken");

    let mut backend = backend();
    backend.fail_program("broken");
    let mut driver = FrameDriver::new(&RendererConfig::default().with_max_init_attempts(3));

    let report = driver.render_frame(&mut scene, &camera(), &mut backend).expect("frame 1");
    assert!(report.was_skipped(broken));

    backend.heal_program("broken");
    let report = driver.render_frame(&mut scene, &camera(), &mut backend).expect("frame 2");
    assert!(report.is_clean());
    assert_eq!(backend.draw_labels(), vec!["broken"]);
    assert_eq!(scene.get(broken).map(|node| node.init_state().is_initialized()), Some(true));
}

#[test]
fn rejected_uniforms_do_not_stop_drawing() {
    let mut scene = SceneGraph::default();
    let root = scene.root();
    scene.add_child(root, mesh("a", red(), None), Transform::identity()).expect("a");
    scene.add_child(root, mesh("b", red(), None), Transform::identity()).expect("b");

    let mut backend = backend();
    backend.reject_uniform(uniform_names::COLOR);

    let report = FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    assert_eq!(report.draw_calls, 2);
    assert_eq!(report.uniform_errors, 2);
    assert!(report.skipped.is_empty());
    assert!(backend.draws().iter().all(|draw| draw.uniform(uniform_names::COLOR).is_none()));
}

#[test]
fn draw_before_initialization_is_retried_once() {
    let mut scene = SceneGraph::default();
    let node = ForgetfulNode {
        unit: RenderUnit::new(flat_program("forgetful"), None),
        model: StaticModel::quad(1.0),
        initialize_calls: 0,
    };
    let id = scene.add_child(scene.root(), node, Transform::identity()).expect("node");

    let mut backend = backend();
    let report = FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    assert!(report.is_clean());
    assert_eq!(backend.draw_labels(), vec!["forgetful"]);
    assert_eq!(scene.behavior::<ForgetfulNode>(id).map(|n| n.initialize_calls), Some(2));
}

#[test]
fn render_flags_gate_phases() {
    let mut scene = SceneGraph::default();
    let root = scene.root();
    let pruned = scene.add_child(root, mesh("pruned", red(), None), Transform::identity()).expect("pruned");
    scene.add_child(pruned, mesh("hidden", red(), None), Transform::identity()).expect("hidden");
    let silent = scene.add_child(root, mesh("silent", red(), None), Transform::identity()).expect("silent");
    scene.add_child(silent, mesh("visible", red(), None), Transform::identity()).expect("visible");

    scene.set_flags(pruned, RenderFlags::all() - RenderFlags::CHILDREN).expect("flags");
    scene.set_flags(silent, RenderFlags::all() - RenderFlags::BEFORE_CHILDREN).expect("flags");

    let mut backend = backend();
    let report = FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");

    assert_eq!(backend.draw_labels(), vec!["pruned", "visible"]);
    assert_eq!(report.nodes_visited, 4);
}

#[test]
fn removed_subtree_is_not_drawn() {
    let mut scene = SceneGraph::default();
    let root = scene.root();
    let a = scene.add_child(root, mesh("a", red(), None), Transform::identity()).expect("a");
    scene.add_child(a, mesh("a1", red(), None), Transform::identity()).expect("a1");
    scene.add_child(root, mesh("b", red(), None), Transform::identity()).expect("b");

    assert_eq!(scene.remove(a), Ok(2));

    let mut backend = backend();
    FrameDriver::default()
        .render_frame(&mut scene, &camera(), &mut backend)
        .expect("frame");
    assert_eq!(backend.draw_labels(), vec!["b"]);
}
