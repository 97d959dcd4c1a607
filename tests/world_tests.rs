use phys_shatter::{
    core::{DebugOutline, SensorEventType},
    BodyId, BodyType, Material, PhysicsWorld, SimulationConfig, Vector2,
};
use approx::assert_relative_eq;
use std::sync::{Arc, Mutex};

fn zero_gravity_world() -> PhysicsWorld {
    PhysicsWorld::with_config(SimulationConfig {
        gravity: Vector2::zero(),
        ..SimulationConfig::default()
    })
}

#[test]
fn test_body_lifecycle() {
    let world = PhysicsWorld::new();

    let body = world.create_body(BodyType::Dynamic, 1.0, 2.0, 0.5);
    assert!(world.contains_body(body));
    assert_eq!(world.body_count(), 1);
    assert_eq!(world.body_type(body), BodyType::Dynamic);
    assert_relative_eq!(world.position(body).x, 1.0);
    assert_relative_eq!(world.position(body).y, 2.0);
    assert_relative_eq!(world.angle(body), 0.5);

    world.destroy_body(body);
    assert!(!world.contains_body(body));
    assert_eq!(world.body_count(), 0);

    // IDs are never handed out twice
    let next = world.create_body(BodyType::Static, 0.0, 0.0, 0.0);
    assert_ne!(next, body);
    assert!(next.raw() > body.raw());
}

#[test]
#[should_panic(expected = "not found")]
fn test_destroyed_body_cannot_be_used() {
    let world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.destroy_body(body);
    world.position(body);
}

#[test]
#[should_panic]
fn test_polygon_fixture_needs_three_vertices() {
    let world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.add_polygon_fixture(body, &[Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)], Material::default());
}

#[test]
#[should_panic]
fn test_polygon_fixture_rejects_nine_vertices() {
    let world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    let vertices: Vec<Vector2> = (0..9)
        .map(|i| {
            let a = i as f32 / 9.0 * std::f32::consts::TAU;
            Vector2::new(a.cos(), a.sin())
        })
        .collect();
    world.add_polygon_fixture(body, &vertices, Material::default());
}

#[test]
fn test_gravity_simulation() {
    let world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Dynamic, 0.0, 10.0, 0.0);
    world.add_box_fixture(body, 1.0, 1.0, Material::default());

    // One second of simulation in whole fixed steps
    let dt = world.fixed_timestep();
    for _ in 0..250 {
        world.step(dt, 1);
    }

    assert_relative_eq!(world.linear_velocity(body).y, -10.0, epsilon = 1e-2);
    assert!(world.position(body).y < 6.0);
}

#[test]
fn test_velocity_and_forces() {
    let world = zero_gravity_world();
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.add_box_fixture(body, 1.0, 1.0, Material::new(2.0, 0.5, 0.0));

    world.set_linear_velocity(body, Vector2::new(3.0, 0.0));
    world.set_angular_velocity(body, 1.5);
    assert_relative_eq!(world.linear_velocity(body).x, 3.0);
    assert_relative_eq!(world.angular_velocity(body), 1.5);

    // Mass is 2, so a unit impulse changes the velocity by 0.5
    world.apply_linear_impulse(body, Vector2::new(0.0, 1.0));
    assert_relative_eq!(world.linear_velocity(body).y, 0.5, epsilon = 1e-6);

    world.apply_force(body, Vector2::new(0.0, 100.0));
    world.step(world.fixed_timestep(), 1);
    assert!(world.linear_velocity(body).y > 0.5);

    world.set_position(body, Vector2::new(5.0, 5.0));
    assert_relative_eq!(world.world_center(body).x, 5.0, epsilon = 1e-5);
}

#[test]
fn test_box_rests_on_ground() {
    let world = PhysicsWorld::new();
    let ground = world.create_body(BodyType::Static, 0.0, 0.0, 0.0);
    world.add_box_fixture(ground, 20.0, 1.0, Material::default());

    let crate_body = world.create_body(BodyType::Dynamic, 0.0, 2.0, 0.0);
    world.add_box_fixture(crate_body, 1.0, 1.0, Material::default());

    for _ in 0..180 {
        world.step(1.0 / 60.0, 4);
    }

    // Ground top is at 0.5, so the box settles with its center near 1.0
    let y = world.position(crate_body).y;
    assert!(y > 0.8 && y < 1.2, "box came to rest at {}", y);
    assert!(world.linear_velocity(crate_body).length() < 0.5);
}

#[test]
fn test_collision_hit_events() {
    let world = zero_gravity_world();
    let wall = world.create_body(BodyType::Static, 0.0, 0.0, 0.0);
    world.add_box_fixture(wall, 1.0, 4.0, Material::default());

    let ball = world.create_body(BodyType::Dynamic, 3.0, 0.0, 0.0);
    world.add_circle_fixture(ball, Vector2::zero(), 0.25, Material::default());
    world.set_linear_velocity(ball, Vector2::new(-8.0, 0.0));

    let hits = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&hits);
    world.set_collision_callback(move |hit| sink.lock().unwrap().push(*hit));

    let mut polled = Vec::new();
    for _ in 0..60 {
        world.step(1.0 / 60.0, 1);
        polled.extend(world.collision_hit_events());
    }

    let hits = hits.lock().unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits.len(), polled.len());

    let hit = hits[0];
    assert!(hit.involves(ball));
    assert!(hit.involves(wall));
    assert_relative_eq!(hit.approach_speed, 8.0, epsilon = 1e-3);
    assert_relative_eq!(hit.point.x, 0.5, epsilon = 0.1);
}

#[test]
fn test_collision_callback_can_clear_itself() {
    let world = zero_gravity_world();
    let wall = world.create_body(BodyType::Static, 0.0, 0.0, 0.0);
    world.add_box_fixture(wall, 1.0, 4.0, Material::default());

    // The first ball arrives well before the second
    let early = world.create_body(BodyType::Dynamic, 3.0, 0.0, 0.0);
    world.add_circle_fixture(early, Vector2::zero(), 0.25, Material::default());
    world.set_linear_velocity(early, Vector2::new(-8.0, 0.0));
    let late = world.create_body(BodyType::Dynamic, -6.0, 0.0, 0.0);
    world.add_circle_fixture(late, Vector2::zero(), 0.25, Material::default());
    world.set_linear_velocity(late, Vector2::new(8.0, 0.0));

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    let handle = world.clone();
    world.set_collision_callback(move |hit| {
        sink.lock().unwrap().push(*hit);
        handle.clear_collision_callback();
    });

    let mut polled = Vec::new();
    for _ in 0..60 {
        world.step(1.0 / 60.0, 1);
        polled.extend(world.collision_hit_events());
    }

    let calls = calls.lock().unwrap();
    assert!(calls.iter().all(|hit| hit.involves(early)));
    assert!(!calls.is_empty());
    assert!(polled.iter().any(|hit| hit.involves(late)));
}

#[test]
fn test_sensor_events() {
    let world = zero_gravity_world();
    let trigger = world.create_body(BodyType::Static, 0.0, 0.0, 0.0);
    world.add_box_sensor(trigger, 2.0, 2.0);

    let ball = world.create_body(BodyType::Dynamic, -3.0, 0.0, 0.0);
    world.add_circle_fixture(ball, Vector2::zero(), 0.25, Material::default());
    world.set_linear_velocity(ball, Vector2::new(10.0, 0.0));

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    world.set_sensor_callback(move |event| sink.lock().unwrap().push(*event));

    for _ in 0..60 {
        world.step(1.0 / 60.0, 1);
    }

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].event_type, SensorEventType::Begin);
    assert_eq!(events[1].event_type, SensorEventType::End);
    for event in events.iter() {
        assert_eq!(event.sensor_body, trigger);
        assert_eq!(event.visitor_body, ball);
        assert_relative_eq!(event.visitor_velocity.x, 10.0, epsilon = 1e-4);
    }

    // The ball passes straight through the sensor
    assert!(world.position(ball).x > 3.0);
}

#[test]
fn test_joints() {
    let world = zero_gravity_world();
    let a = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    let b = world.create_body(BodyType::Dynamic, 1.0, 0.0, 0.0);
    world.add_box_fixture(a, 0.5, 0.5, Material::default());
    world.add_box_fixture(b, 0.5, 0.5, Material::default());

    let hinge = world.create_revolute_joint(a, b, Vector2::new(0.5, 0.0));
    assert_eq!(world.joint_count(), 1);

    // Destroying a body takes its joints with it
    world.destroy_body(b);
    assert_eq!(world.joint_count(), 0);
    assert!(!world.contains_joint(hinge));
}

#[test]
fn test_mouse_joint_drags_body() {
    let world = zero_gravity_world();
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.add_box_fixture(body, 1.0, 1.0, Material::default());

    // The grabbed point starts under the cursor
    let mouse = world.create_mouse_joint(body, Vector2::zero(), 1000.0);
    assert_eq!(world.joint_count(), 1);
    // The ground anchor is not a world body
    assert_eq!(world.body_count(), 1);

    let target = Vector2::new(2.0, 0.0);
    world.set_mouse_target(mouse, target);
    for _ in 0..60 {
        world.step(1.0 / 60.0, 1);
    }
    assert!(world.position(body).distance(&target) < 0.5);

    world.destroy_joint(mouse);
    assert_eq!(world.joint_count(), 0);
}

#[test]
fn test_query_body_at_point() {
    let world = zero_gravity_world();
    let floor = world.create_body(BodyType::Static, 0.0, 0.0, 0.0);
    world.add_box_fixture(floor, 2.0, 2.0, Material::default());

    let body = world.create_body(BodyType::Dynamic, 3.0, 3.0, 0.0);
    world.add_box_fixture(body, 1.0, 1.0, Material::default());

    let ball = world.create_body(BodyType::Dynamic, -3.0, 3.0, 0.0);
    world.add_circle_fixture(ball, Vector2::zero(), 0.5, Material::default());

    assert_eq!(world.query_body_at_point(Vector2::new(3.2, 3.1)), Some(body));
    assert_eq!(world.query_body_at_point(Vector2::new(-3.1, 2.8)), Some(ball));
    // Static bodies are never picked
    assert_eq!(world.query_body_at_point(Vector2::new(0.0, 0.0)), None);
    assert_eq!(world.query_body_at_point(Vector2::new(10.0, 10.0)), None);
}

#[test]
fn test_body_types() {
    let world = PhysicsWorld::new();
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);

    assert!(world.add_body_type(body, "heavy"));
    assert!(world.add_body_type(body, "metal"));
    assert!(!world.add_body_type(body, "heavy"));
    assert!(world.body_has_type(body, "heavy"));
    assert_eq!(world.body_types(body), vec!["heavy".to_string(), "metal".to_string()]);

    assert!(world.remove_body_type(body, "heavy"));
    assert!(!world.body_has_type(body, "heavy"));

    world.clear_body_types(body);
    assert!(world.body_types(body).is_empty());
}

fn destroyed_body(world: &PhysicsWorld) -> BodyId {
    let body = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    world.add_body_type(body, "heavy");
    world.destroy_body(body);
    body
}

#[test]
#[should_panic(expected = "not found")]
fn test_remove_body_type_of_destroyed_body() {
    let world = PhysicsWorld::new();
    let body = destroyed_body(&world);
    world.remove_body_type(body, "heavy");
}

#[test]
#[should_panic(expected = "not found")]
fn test_clear_body_types_of_destroyed_body() {
    let world = PhysicsWorld::new();
    let body = destroyed_body(&world);
    world.clear_body_types(body);
}

#[test]
#[should_panic(expected = "not found")]
fn test_body_has_type_of_destroyed_body() {
    let world = PhysicsWorld::new();
    let body = destroyed_body(&world);
    world.body_has_type(body, "heavy");
}

#[test]
#[should_panic(expected = "not found")]
fn test_body_types_of_destroyed_body() {
    let world = PhysicsWorld::new();
    let body = destroyed_body(&world);
    world.body_types(body);
}

#[test]
#[should_panic(expected = "not found")]
fn test_body_destructible_of_destroyed_body() {
    let world = PhysicsWorld::new();
    let body = destroyed_body(&world);
    world.body_destructible(body);
}

#[test]
#[should_panic(expected = "not found")]
fn test_clear_body_destructible_of_destroyed_body() {
    let world = PhysicsWorld::new();
    let body = destroyed_body(&world);
    world.clear_body_destructible(body);
}

#[test]
fn test_debug_shapes() {
    let world = zero_gravity_world();
    let body = world.create_body(BodyType::Static, 1.0, 1.0, 0.0);
    world.add_box_fixture(body, 2.0, 2.0, Material::default());
    world.create_radial_force_field(5.0, 5.0, 1.0, 1.0, 0.0);

    assert!(world.debug_shapes().is_empty());
    world.step(0.0, 1);

    let shapes = world.debug_shapes();
    assert_eq!(shapes.len(), 2);

    let outline = shapes.iter().find(|s| s.body == Some(body)).unwrap();
    assert!(!outline.is_sensor);
    match &outline.outline {
        DebugOutline::Polygon(vertices) => {
            assert_eq!(vertices.len(), 4);
            assert_relative_eq!(vertices[0].x, 0.0, epsilon = 1e-6);
            assert_relative_eq!(vertices[2].y, 2.0, epsilon = 1e-6);
        }
        other => panic!("unexpected outline {:?}", other),
    }

    let field = shapes.iter().find(|s| s.body.is_none()).unwrap();
    assert!(field.is_sensor);
}

#[test]
fn test_reset_clears_world() {
    let world = PhysicsWorld::new();
    let a = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    let b = world.create_body(BodyType::Dynamic, 1.0, 0.0, 0.0);
    world.create_revolute_joint(a, b, Vector2::new(0.5, 0.0));
    world.create_mouse_joint(a, Vector2::zero(), 10.0);
    world.create_radial_force_field(0.0, 0.0, 1.0, 1.0, 1.0);
    world.add_body_type(a, "heavy");

    world.reset();
    assert_eq!(world.body_count(), 0);
    assert_eq!(world.joint_count(), 0);
    assert_eq!(world.force_field_count(), 0);
    assert!(!world.contains_body(a));

    let c = world.create_body(BodyType::Dynamic, 0.0, 0.0, 0.0);
    assert!(c.raw() > b.raw());
    // A new ground anchor is created on demand
    world.create_mouse_joint(c, Vector2::zero(), 10.0);
    assert_eq!(world.joint_count(), 1);
}

#[test]
fn test_gravity_setting() {
    let world = PhysicsWorld::new();
    assert_relative_eq!(world.gravity().y, -10.0);
    world.set_gravity(Vector2::new(0.0, -3.0));
    assert_relative_eq!(world.gravity().y, -3.0);
    assert_relative_eq!(world.config().gravity.y, -3.0);
}
