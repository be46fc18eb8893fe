use approx::assert_relative_eq;
use glam::DVec3;
use scene_tf::{
    update_poses, ErrorSink, FollowController, FollowMode, FrameIdString, FrameSelector, Nanos,
    Pose, PoseBinding, Renderable, SelectionState, Transform, TransformTree, MAX_DURATION,
    MISSING_TRANSFORM,
};

struct PointCloud {
    binding: PoseBinding,
    visible: bool,
    hidden: bool,
    world_pose: Option<Pose>,
    path: Vec<String>,
}

impl PointCloud {
    fn new(frame: &str, timestamp: Nanos) -> Self {
        PointCloud {
            binding: PoseBinding {
                frame_id: FrameIdString::from(frame).unwrap(),
                timestamp,
                local_pose: Pose::IDENTITY,
                frame_locked: false,
            },
            visible: true,
            hidden: false,
            world_pose: None,
            path: vec!["topics".to_string(), "/points".to_string()],
        }
    }
}

impl Renderable for PointCloud {
    fn binding(&self) -> Option<&PoseBinding> {
        Some(&self.binding)
    }

    fn settings_path(&self) -> &[String] {
        &self.path
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn set_world_pose(&mut self, pose: Pose) {
        self.world_pose = Some(pose);
        self.hidden = false;
    }

    fn set_hidden(&mut self) {
        self.hidden = true;
    }
}

fn translation(x: f64, y: f64, z: f64) -> Transform {
    Transform::from_translation(DVec3::new(x, y, z))
}

/// One render tick: ingestion already happened, so pick frames, update the
/// camera compensation, then resolve every entity.
fn tick(
    tree: &TransformTree,
    selector: &mut FrameSelector,
    follow: &mut FollowController,
    entities: &mut [&mut dyn Renderable],
    now: Nanos,
    sink: &mut ErrorSink,
) -> (Option<Pose>, usize) {
    selector.select(tree, sink);
    let (Some(render), Some(fixed)) = (
        selector.render_frame().map(str::to_owned),
        selector.fixed_frame().map(str::to_owned),
    ) else {
        return (None, 0);
    };
    let camera = follow.update(tree, &render, &fixed, now, MAX_DURATION);
    let placed = update_poses(
        entities.iter_mut().map(|e| &mut **e),
        tree,
        &render,
        &fixed,
        now,
        MAX_DURATION,
        sink,
    );
    (Some(camera), placed)
}

#[test]
fn full_tick_pipeline_places_moves_and_recovers() {
    let mut tree = TransformTree::new();
    let mut sink = ErrorSink::new();
    let mut selector = FrameSelector::new();
    let mut follow = FollowController::new();

    // map -> base_link moves +X over time; base_link -> lidar is static.
    tree.add_edge(
        "base_link",
        "map",
        Nanos(0),
        translation(0.0, 0.0, 0.0),
        &mut sink,
    )
    .unwrap();
    tree.add_edge(
        "base_link",
        "map",
        Nanos(100),
        translation(10.0, 0.0, 0.0),
        &mut sink,
    )
    .unwrap();
    tree.add_edge(
        "lidar",
        "base_link",
        Nanos(0),
        translation(0.0, 0.0, 1.0),
        &mut sink,
    )
    .unwrap();
    tree.add_edge(
        "lidar",
        "base_link",
        Nanos(100),
        translation(0.0, 0.0, 1.0),
        &mut sink,
    )
    .unwrap();

    let mut cloud = PointCloud::new("lidar", Nanos(0));
    let mut entities: Vec<&mut dyn Renderable> = vec![&mut cloud];

    // The heuristic settles on base_link and its root becomes the fixed
    // frame.
    let (camera, placed) = tick(
        &tree,
        &mut selector,
        &mut follow,
        &mut entities,
        Nanos(0),
        &mut sink,
    );
    assert!(matches!(selector.state(), SelectionState::Heuristic(id) if id.as_str() == "base_link"));
    assert_eq!(selector.fixed_frame(), Some("map"));
    assert_eq!(placed, 1);
    assert_eq!(camera, Some(Pose::IDENTITY));
    assert!(sink.is_empty());

    let pose = cloud.world_pose.unwrap();
    assert_relative_eq!(pose.position.z, 1.0, epsilon = 1e-9);
    assert_relative_eq!(pose.position.x, 0.0, epsilon = 1e-9);

    // Half way through the motion, the cloud (stamped at t=0, anchored in
    // map through the fixed frame) trails the advancing base_link.
    let mut entities: Vec<&mut dyn Renderable> = vec![&mut cloud];
    tick(
        &tree,
        &mut selector,
        &mut follow,
        &mut entities,
        Nanos(50),
        &mut sink,
    );
    let pose = cloud.world_pose.unwrap();
    assert_relative_eq!(pose.position.x, -5.0, epsilon = 1e-9);
}

#[test]
fn missing_transform_hides_then_recovers_without_duplicates() {
    let mut tree = TransformTree::new();
    let mut sink = ErrorSink::new();
    let mut selector = FrameSelector::new();
    let mut follow = FollowController::new();

    tree.add_edge(
        "base_link",
        "map",
        Nanos(0),
        translation(0.0, 0.0, 0.0),
        &mut sink,
    )
    .unwrap();
    tree.add_edge(
        "lidar",
        "base_link",
        Nanos(0),
        translation(0.0, 0.0, 1.0),
        &mut sink,
    )
    .unwrap();

    let mut cloud = PointCloud::new("lidar", Nanos(0));

    let mut entities: Vec<&mut dyn Renderable> = vec![&mut cloud];
    let (_, placed) = tick(
        &tree,
        &mut selector,
        &mut follow,
        &mut entities,
        Nanos(0),
        &mut sink,
    );
    assert_eq!(placed, 1);

    // The only sample on the lidar edge disappears; the entity hides and
    // exactly one diagnostic shows up at its settings path, stable across
    // repeated ticks.
    assert!(tree.remove_edge_sample("lidar", "base_link", Nanos(0)));
    for now in [10, 20, 30] {
        let mut entities: Vec<&mut dyn Renderable> = vec![&mut cloud];
        let (_, placed) = tick(
            &tree,
            &mut selector,
            &mut follow,
            &mut entities,
            Nanos(now),
            &mut sink,
        );
        assert_eq!(placed, 0);
    }
    assert!(cloud.hidden);
    let path = vec!["topics".to_string(), "/points".to_string()];
    assert_eq!(sink.errors_at(&path).count(), 1);
    assert!(sink.has_error(&path, MISSING_TRANSFORM));

    // A satisfying sample arrives; the entity reappears and the diagnostic
    // clears with no explicit retry logic.
    tree.add_edge(
        "lidar",
        "base_link",
        Nanos(0),
        translation(0.0, 0.0, 1.0),
        &mut sink,
    )
    .unwrap();
    let mut entities: Vec<&mut dyn Renderable> = vec![&mut cloud];
    let (_, placed) = tick(
        &tree,
        &mut selector,
        &mut follow,
        &mut entities,
        Nanos(0),
        &mut sink,
    );
    assert_eq!(placed, 1);
    assert!(!cloud.hidden);
    assert_eq!(sink.errors_at(&path).count(), 0);
}

#[test]
fn stationary_camera_backs_out_frame_motion_mid_pipeline() {
    let mut tree = TransformTree::new();
    let mut sink = ErrorSink::new();
    let mut selector = FrameSelector::new();
    let mut follow = FollowController::new();
    follow.set_mode(FollowMode::Stationary);

    tree.add_edge(
        "base_link",
        "map",
        Nanos(0),
        translation(0.0, 0.0, 0.0),
        &mut sink,
    )
    .unwrap();
    tree.add_edge(
        "base_link",
        "map",
        Nanos(100),
        translation(4.0, 0.0, 0.0),
        &mut sink,
    )
    .unwrap();

    let (camera, _) = tick(
        &tree,
        &mut selector,
        &mut follow,
        &mut [],
        Nanos(0),
        &mut sink,
    );
    assert_relative_eq!(camera.unwrap().position.x, 0.0, epsilon = 1e-9);

    let (camera, _) = tick(
        &tree,
        &mut selector,
        &mut follow,
        &mut [],
        Nanos(100),
        &mut sink,
    );
    assert_relative_eq!(camera.unwrap().position.x, -4.0, epsilon = 1e-9);
}
