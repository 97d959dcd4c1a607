use phys_shatter::{
    core::{BodyId, FractureConfig},
    destruction::{root_point_from_uv, split_for_impact},
    geometry::polygon_area,
    math::Aabb,
    BodyType, DestructibleProperties, Fragment, FragmentLayerSink, LayerId, Material, PhysicsWorld,
    SimulationConfig, UvRect, Vector2,
};
use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

fn zero_gravity_world() -> PhysicsWorld {
    PhysicsWorld::with_config(SimulationConfig {
        gravity: Vector2::zero(),
        ..SimulationConfig::default()
    })
}

fn destructible_box(world: &PhysicsWorld, body_type: BodyType, size: f32, strength: f32, brittleness: f32) -> BodyId {
    let body = world.create_body(body_type, 0.0, 0.0, 0.0);
    world.add_box_fixture(body, size, size, Material::glass());
    let props = DestructibleProperties::rectangle(strength, brittleness, size, size).unwrap();
    world.set_body_destructible(body, props);
    body
}

#[test]
fn test_break_speed_curve() {
    let world = PhysicsWorld::new();
    assert_relative_eq!(world.break_speed(4.0), 2.0);
    assert_relative_eq!(world.break_speed(5.0), 2.6, epsilon = 1e-5);
    assert_relative_eq!(world.break_speed(3.0), 2.0 / 1.3, epsilon = 1e-5);
}

#[test]
fn test_side_impact_splits_box_in_two() {
    let world = zero_gravity_world();
    let body = destructible_box(&world, BodyType::Dynamic, 1.0, 5.0, 0.0);

    assert!(world.fracture_body(body, Vector2::new(0.5, 0.0), Vector2::new(1.0, 0.0), 5.0));

    let events = world.fracture_events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.original_body, body);
    assert_eq!(event.fragment_count(), 2);
    assert_relative_eq!(event.approach_speed, 5.0);

    // The original body is gone and both halves are in the world
    assert!(!world.contains_body(body));
    assert_eq!(world.body_count(), 2);
    for fragment in &event.fragments {
        assert!(world.contains_body(fragment.body));
        assert_eq!(world.body_type(fragment.body), BodyType::Dynamic);
        assert_relative_eq!(fragment.area, 0.5, epsilon = 1e-4);
        assert_eq!(fragment.vertices.len(), fragment.uvs.len());
        assert_eq!(fragment.vertices.len(), fragment.normal_uvs.len());
        assert_relative_eq!(fragment.position.x, 0.0, epsilon = 1e-4);
        assert_relative_eq!(fragment.position.y.abs(), 0.25, epsilon = 1e-4);
    }
    // Brittleness 0 leaves the pieces inert
    assert!(world.body_destructible(event.fragments[0].body).is_none());
}

#[test]
fn test_projectile_breaks_box() {
    let world = zero_gravity_world();
    let target = destructible_box(&world, BodyType::Static, 1.0, 5.0, 0.0);

    let projectile = world.create_body(BodyType::Dynamic, 2.0, 0.0, 0.0);
    world.add_circle_fixture(projectile, Vector2::zero(), 0.1, Material::stone());
    world.set_linear_velocity(projectile, Vector2::new(-20.0, 0.0));

    let mut events = Vec::new();
    for _ in 0..60 {
        world.step(1.0 / 60.0, 1);
        events = world.fracture_events();
        if !events.is_empty() {
            break;
        }
    }

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].original_body, target);
    assert_eq!(events[0].fragment_count(), 2);
    assert!(events[0].approach_speed >= world.break_speed(5.0));
    assert!(!world.contains_body(target));
    assert!(world.contains_body(projectile));
}

#[test]
fn test_slow_impact_does_not_break() {
    let world = zero_gravity_world();
    let target = destructible_box(&world, BodyType::Static, 1.0, 5.0, 0.0);

    let projectile = world.create_body(BodyType::Dynamic, 1.0, 0.0, 0.0);
    world.add_circle_fixture(projectile, Vector2::zero(), 0.1, Material::default());
    world.set_linear_velocity(projectile, Vector2::new(-1.0, 0.0));

    let mut hits = 0;
    for _ in 0..60 {
        world.step(1.0 / 60.0, 1);
        hits += world.collision_hit_events().len();
        assert!(world.fracture_events().is_empty());
    }

    assert!(hits > 0);
    assert!(world.contains_body(target));
}

#[test]
fn test_fracture_callback_runs_before_polling() {
    let world = zero_gravity_world();
    let target = destructible_box(&world, BodyType::Static, 1.0, 2.0, 0.0);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    world.set_fracture_callback(move |event| sink.lock().unwrap().push(event.original_body));

    let projectile = world.create_body(BodyType::Dynamic, 2.0, 0.0, 0.0);
    world.add_circle_fixture(projectile, Vector2::zero(), 0.1, Material::default());
    world.set_linear_velocity(projectile, Vector2::new(-20.0, 0.0));

    for _ in 0..60 {
        world.step(1.0 / 60.0, 1);
        let polled = world.fracture_events();
        // Whatever can be polled has already been seen by the callback
        assert!(polled.len() <= seen.lock().unwrap().len());
    }

    assert_eq!(*seen.lock().unwrap(), vec![target]);
}

#[test]
fn test_fracture_callback_can_query_the_world() {
    let world = zero_gravity_world();
    let target = destructible_box(&world, BodyType::Static, 1.0, 2.0, 0.0);

    let projectile = world.create_body(BodyType::Dynamic, 2.0, 0.0, 0.0);
    world.add_circle_fixture(projectile, Vector2::zero(), 0.1, Material::default());
    world.set_linear_velocity(projectile, Vector2::new(-20.0, 0.0));

    let (tx, rx) = mpsc::channel();
    let observer = world.clone();
    world.set_fracture_callback(move |event| {
        let positions: Vec<Vector2> = event.fragments.iter().map(|f| observer.position(f.body)).collect();
        let _ = tx.send((event.original_body, observer.contains_body(event.original_body), positions));
    });

    let stepper = world.clone();
    let handle = thread::spawn(move || {
        for _ in 0..60 {
            stepper.step(1.0 / 60.0, 1);
        }
    });

    let (original, still_alive, positions) = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("fracture callback blocked on the world or never ran");
    handle.join().unwrap();

    assert_eq!(original, target);
    assert!(!still_alive);
    assert!(!positions.is_empty());
    assert!(positions.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
}

#[test]
fn test_brittle_fragments_stay_destructible() {
    let world = zero_gravity_world();
    let atlas = UvRect::new(Vector2::new(0.5, 0.0), Vector2::new(1.0, 0.5));
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.add_box_fixture(body, 2.0, 2.0, Material::glass());
    world.add_body_type(body, "glass");
    world.set_body_destructible(
        body,
        DestructibleProperties::rectangle(1.0, 0.5, 2.0, 2.0)
            .unwrap()
            .with_texture(3)
            .with_texture_uv(atlas),
    );

    world.fracture_body(body, Vector2::new(1.0, 0.3), Vector2::new(1.0, 0.0), 10.0);
    let event = world.fracture_events().remove(0);

    // One primary split and two secondary splits of the largest piece
    assert_eq!(event.fragment_count(), 4);
    let total: f32 = event.fragments.iter().map(|f| f.area).sum();
    assert_relative_eq!(total, 4.0, epsilon = 1e-3);

    for fragment in &event.fragments {
        assert!(world.body_has_type(fragment.body, "glass"));

        let props = world.body_destructible(fragment.body).unwrap();
        assert!(props.is_destructible);
        assert_eq!(props.texture, Some(3));
        assert_eq!(props.texture_uv, Some(atlas));
        let root = props.root_bounds.unwrap();
        assert_relative_eq!(root.min.x, -1.0, epsilon = 1e-6);
        assert_relative_eq!(root.max.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(props.root_offset.x, fragment.position.x, epsilon = 1e-4);
        assert_relative_eq!(props.root_offset.y, fragment.position.y, epsilon = 1e-4);
    }
}

#[test]
fn test_nested_fracture_keeps_root_uv_mapping() {
    let world = zero_gravity_world();
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.add_box_fixture(body, 2.0, 2.0, Material::default());
    world.set_body_destructible(body, DestructibleProperties::rectangle(1.0, 0.2, 2.0, 2.0).unwrap());
    let root = Aabb::new(Vector2::new(-1.0, -1.0), Vector2::new(1.0, 1.0));

    world.fracture_body(body, Vector2::new(1.0, 0.0), Vector2::new(1.0, 0.0), 10.0);
    let first = world.fracture_events().remove(0);
    assert_eq!(first.fragment_count(), 2);

    // Break one half again, along the other axis
    let half = first.fragments[0].clone();
    world.fracture_body(half.body, half.position, Vector2::new(0.0, 1.0), 10.0);
    let events = world.fracture_events();
    let second = events.last().unwrap();
    assert_eq!(second.original_body, half.body);
    assert_eq!(second.fragment_count(), 2);

    for fragment in &second.fragments {
        for (vertex, uv) in fragment.vertices.iter().zip(&fragment.uvs) {
            let expected = *vertex + fragment.position;
            let mapped = root_point_from_uv(*uv, &root, None);
            assert_relative_eq!(mapped.x, expected.x, epsilon = 1e-4);
            assert_relative_eq!(mapped.y, expected.y, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_uv_round_trip() {
    let world = zero_gravity_world();
    let atlas = UvRect::new(Vector2::new(0.25, 0.25), Vector2::new(0.75, 0.75));
    let normal_atlas = UvRect::new(Vector2::new(0.0, 0.5), Vector2::new(0.5, 1.0));
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.add_box_fixture(body, 1.0, 1.0, Material::default());
    world.set_body_destructible(
        body,
        DestructibleProperties::rectangle(1.0, 0.0, 1.0, 1.0)
            .unwrap()
            .with_texture_uv(atlas)
            .with_normal_uv(normal_atlas),
    );
    let root = Aabb::new(Vector2::new(-0.5, -0.5), Vector2::new(0.5, 0.5));

    world.fracture_body(body, Vector2::new(0.1, 0.5), Vector2::new(0.3, -1.0), 10.0);
    let event = world.fracture_events().remove(0);

    for fragment in &event.fragments {
        for i in 0..fragment.vertices.len() {
            let expected = fragment.vertices[i] + fragment.position;

            let uv = fragment.uvs[i];
            assert!(uv.x >= 0.25 - 1e-5 && uv.x <= 0.75 + 1e-5);
            let mapped = root_point_from_uv(uv, &root, Some(atlas));
            assert_relative_eq!(mapped.x, expected.x, epsilon = 1e-4);
            assert_relative_eq!(mapped.y, expected.y, epsilon = 1e-4);

            let mapped = root_point_from_uv(fragment.normal_uvs[i], &root, Some(normal_atlas));
            assert_relative_eq!(mapped.x, expected.x, epsilon = 1e-4);
            assert_relative_eq!(mapped.y, expected.y, epsilon = 1e-4);
        }
    }
}

#[test]
fn test_fragments_inherit_velocity() {
    let world = zero_gravity_world();
    let body = destructible_box(&world, BodyType::Dynamic, 1.0, 1.0, 0.0);
    world.set_linear_velocity(body, Vector2::new(2.0, -1.0));
    world.set_angular_velocity(body, 0.5);

    world.fracture_body(body, Vector2::new(0.5, 0.0), Vector2::new(1.0, 0.0), 10.0);
    for fragment in &world.fracture_events()[0].fragments {
        assert_relative_eq!(world.linear_velocity(fragment.body).x, 2.0);
        assert_relative_eq!(world.linear_velocity(fragment.body).y, -1.0);
        assert_relative_eq!(world.angular_velocity(fragment.body), 0.5);
    }
}

#[test]
fn test_non_destructible_body_is_left_alone() {
    let world = zero_gravity_world();
    let body = destructible_box(&world, BodyType::Dynamic, 1.0, 1.0, 0.0);

    let mut props = world.body_destructible(body).unwrap();
    props.is_destructible = false;
    world.set_body_destructible(body, props);
    assert!(!world.fracture_body(body, Vector2::zero(), Vector2::new(1.0, 0.0), 100.0));

    world.clear_body_destructible(body);
    assert!(world.body_destructible(body).is_none());
    assert!(!world.fracture_body(body, Vector2::zero(), Vector2::new(1.0, 0.0), 100.0));
    assert!(world.contains_body(body));
}

#[test]
fn test_fracture_destroys_attached_joints() {
    let world = zero_gravity_world();
    let body = destructible_box(&world, BodyType::Dynamic, 1.0, 1.0, 0.0);
    world.create_mouse_joint(body, Vector2::zero(), 100.0);
    assert_eq!(world.joint_count(), 1);

    world.fracture_body(body, Vector2::new(0.5, 0.0), Vector2::new(1.0, 0.0), 10.0);
    assert_eq!(world.joint_count(), 0);
}

#[test]
fn test_invalid_destructible_polygon() {
    assert!(DestructibleProperties::new(1.0, 0.0, &[Vector2::zero(), Vector2::new(1.0, 0.0)]).is_err());

    let nine: Vec<Vector2> = (0..9)
        .map(|i| {
            let a = i as f32 / 9.0 * std::f32::consts::TAU;
            Vector2::new(a.cos(), a.sin())
        })
        .collect();
    assert!(DestructibleProperties::new(1.0, 0.0, &nine).is_err());

    // Degenerate boxes still get a usable bounding box
    let flat = DestructibleProperties::rectangle(1.0, 0.0, 1.0, 0.0).unwrap();
    assert!(flat.bounds().height() > 0.0);
}

#[derive(Default)]
struct RecordingSink {
    log: Arc<Mutex<Vec<String>>>,
    next: LayerId,
}

impl FragmentLayerSink for RecordingSink {
    fn create_fragment_layer(
        &mut self,
        parent: LayerId,
        fragment: &Fragment,
        _properties: &DestructibleProperties,
    ) -> Option<LayerId> {
        self.next += 1;
        let layer = 100 + self.next;
        self.log.lock().unwrap().push(format!(
            "create {} from {} with {} vertices",
            layer,
            parent,
            fragment.vertices.len()
        ));
        Some(layer)
    }

    fn attach_layer(&mut self, layer: LayerId, body: BodyId) {
        self.log.lock().unwrap().push(format!("attach {} to {}", layer, body));
    }

    fn destroy_layer(&mut self, layer: LayerId) {
        self.log.lock().unwrap().push(format!("destroy {}", layer));
    }
}

#[test]
fn test_layer_sink_follows_fragments() {
    let world = zero_gravity_world();
    let log = Arc::new(Mutex::new(Vec::new()));
    world.set_layer_sink(RecordingSink { log: Arc::clone(&log), next: 0 });

    let body = destructible_box(&world, BodyType::Dynamic, 1.0, 1.0, 0.0);
    world.set_body_layer(body, Some(7));

    world.fracture_body(body, Vector2::new(0.5, 0.0), Vector2::new(1.0, 0.0), 10.0);
    let event = world.fracture_events().remove(0);
    assert_eq!(event.original_layer, Some(7));

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 5);
    assert!(log[0].starts_with("create 101 from 7"));
    assert!(log[1].starts_with("attach 101"));
    assert!(log[2].starts_with("create 102 from 7"));
    assert_eq!(log[4], "destroy 7");

    for fragment in &event.fragments {
        assert!(fragment.layer.is_some());
        assert_eq!(world.body_layer(fragment.body), fragment.layer);
    }
}

#[test]
fn test_bodies_without_layers_get_no_fragment_layers() {
    let world = zero_gravity_world();
    let log = Arc::new(Mutex::new(Vec::new()));
    world.set_layer_sink(RecordingSink { log: Arc::clone(&log), next: 0 });

    let body = destructible_box(&world, BodyType::Dynamic, 1.0, 1.0, 0.0);
    world.fracture_body(body, Vector2::new(0.5, 0.0), Vector2::new(1.0, 0.0), 10.0);

    assert!(log.lock().unwrap().is_empty());
    assert!(world.fracture_events()[0].fragments.iter().all(|f| f.layer.is_none()));
}

fn random_convex_polygon(rng: &mut StdRng) -> Vec<Vector2> {
    let count = rng.gen_range(3..=8);
    let radius = rng.gen_range(0.5..3.0);
    let mut angles: Vec<f32> = (0..count).map(|_| rng.gen_range(0.0..std::f32::consts::TAU)).collect();
    angles.sort_by(|a, b| a.partial_cmp(b).unwrap());
    angles.iter().map(|a| Vector2::new(radius * a.cos(), radius * a.sin())).collect()
}

#[test]
fn test_fracture_never_creates_area() {
    let mut rng = StdRng::seed_from_u64(42);
    let config = FractureConfig::default();

    for _ in 0..500 {
        let polygon = random_convex_polygon(&mut rng);
        let area = polygon_area(&polygon);
        let point = Vector2::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
        let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        let normal = Vector2::new(angle.cos(), angle.sin());
        let brittleness = rng.gen_range(0.0..1.0);

        let pieces = split_for_impact(&polygon, point, normal, brittleness, &config);
        assert!(pieces.len() <= config.max_fragments);

        let total: f32 = pieces.iter().map(|p| p.area).sum();
        assert!(total <= area * (1.0 + 1e-4) + 1e-5, "{} > {}", total, area);
        for piece in &pieces {
            assert!(piece.area >= config.min_fragment_area);
        }

        if brittleness <= config.secondary_brittleness_threshold {
            assert!(pieces.len() <= 2);
        }
    }
}
