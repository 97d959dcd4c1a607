use crate::core::BodyId;
use crate::math::Vector2;
use crate::render::LayerId;

#[cfg(feature = "serialize")]
use serde::{Serialize, Deserialize};

/// A contact that began during the step with the bodies closing on each other
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct CollisionHitEvent {
    /// `None` when the participant is not a world body (e.g. a force-field body)
    pub body_a: Option<BodyId>,
    pub body_b: Option<BodyId>,

    /// World-space contact point
    pub point: Vector2,

    /// Contact normal, pointing from body B towards body A
    pub normal: Vector2,

    /// Closing speed along the normal; always positive
    pub approach_speed: f32,
}

impl CollisionHitEvent {
    /// Whether `body` takes part in the contact
    pub fn involves(&self, body: BodyId) -> bool {
        self.body_a == Some(body) || self.body_b == Some(body)
    }
}

/// Types of sensor events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum SensorEventType {
    /// A body started overlapping the sensor
    Begin,

    /// A body stopped overlapping the sensor
    End,
}

/// A body entered or left a sensor volume
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SensorEvent {
    pub event_type: SensorEventType,

    /// Body carrying the sensor shape
    pub sensor_body: BodyId,

    /// Body that entered or left
    pub visitor_body: BodyId,

    /// Visitor position at the time of the event
    pub visitor_position: Vector2,

    /// Visitor linear velocity at the time of the event
    pub visitor_velocity: Vector2,
}

/// One piece produced by a fracture
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Fragment {
    /// The newly spawned body
    pub body: BodyId,

    /// Render layer created for the fragment, if a layer sink is installed
    pub layer: Option<LayerId>,

    /// Polygon relative to the fragment's centroid (the body origin)
    pub vertices: Vec<Vector2>,

    /// Texture coordinates, one per vertex
    pub uvs: Vec<Vector2>,

    /// Normal-map coordinates, one per vertex
    pub normal_uvs: Vec<Vector2>,

    pub area: f32,

    /// World-space centroid at spawn time
    pub position: Vector2,
}

/// A destructible body broke apart
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct FractureEvent {
    /// The body that broke; destroyed after the step's event pass
    pub original_body: BodyId,

    /// Render layer of the body that broke
    pub original_layer: Option<LayerId>,

    /// Successfully spawned fragments; dropped pieces are absent
    pub fragments: Vec<Fragment>,

    pub impact_point: Vector2,
    pub impact_normal: Vector2,
    pub approach_speed: f32,
}

impl FractureEvent {
    #[inline]
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}

/// Events gathered during one `step` call; cleared when the next one starts
#[derive(Debug, Default)]
pub struct StepEvents {
    pub(crate) collisions: Vec<CollisionHitEvent>,
    pub(crate) sensors: Vec<SensorEvent>,
    pub(crate) fractures: Vec<FractureEvent>,
}

impl StepEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collisions(&self) -> &[CollisionHitEvent] {
        &self.collisions
    }

    pub fn sensors(&self) -> &[SensorEvent] {
        &self.sensors
    }

    pub fn fractures(&self) -> &[FractureEvent] {
        &self.fractures
    }

    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty() && self.sensors.is_empty() && self.fractures.is_empty()
    }

    /// Clears all events
    pub fn clear(&mut self) {
        self.collisions.clear();
        self.sensors.clear();
        self.fractures.clear();
    }

    pub(crate) fn push(&mut self, event: StepEvent) {
        match event {
            StepEvent::Collision(hit) => self.collisions.push(hit),
            StepEvent::Sensor(event) => self.sensors.push(event),
            StepEvent::Fracture(event) => self.fractures.push(event),
        }
    }
}

/// An event raised during a tick, in the order the pipeline produced it
#[derive(Debug, Clone)]
pub(crate) enum StepEvent {
    Collision(CollisionHitEvent),
    Sensor(SensorEvent),
    Fracture(FractureEvent),
}

/// Called for every collision hit, on the stepping thread
pub type CollisionCallback = Box<dyn FnMut(&CollisionHitEvent) + Send>;

/// Called for every sensor event, on the stepping thread
pub type SensorCallback = Box<dyn FnMut(&SensorEvent) + Send>;

/// Called for every fracture, on the stepping thread
pub type FractureCallback = Box<dyn FnMut(&FractureEvent) + Send>;

/// A registered callback that can be lent out while the world is unlocked
pub(crate) struct CallbackSlot<F> {
    callback: Option<F>,

    /// Bumped on every `set`; a lent callback only returns to an unchanged slot
    revision: u64,
}

impl<F> Default for CallbackSlot<F> {
    fn default() -> Self {
        Self { callback: None, revision: 0 }
    }
}

impl<F> CallbackSlot<F> {
    pub(crate) fn set(&mut self, callback: Option<F>) {
        self.callback = callback;
        self.revision = self.revision.wrapping_add(1);
    }

    pub(crate) fn is_set(&self) -> bool {
        self.callback.is_some()
    }

    fn lend(&mut self) -> Lent<F> {
        Lent {
            callback: self.callback.take(),
            revision: self.revision,
        }
    }

    fn give_back(&mut self, lent: Lent<F>) {
        if lent.revision == self.revision {
            self.callback = lent.callback;
        }
    }
}

struct Lent<F> {
    callback: Option<F>,
    revision: u64,
}

/// The host's event callbacks
#[derive(Default)]
pub(crate) struct EventCallbacks {
    pub(crate) collision: CallbackSlot<CollisionCallback>,
    pub(crate) sensor: CallbackSlot<SensorCallback>,
    pub(crate) fracture: CallbackSlot<FractureCallback>,
}

impl EventCallbacks {
    pub(crate) fn is_empty(&self) -> bool {
        !self.collision.is_set() && !self.sensor.is_set() && !self.fracture.is_set()
    }

    /// Takes the callbacks out so they can run without the world lock
    pub(crate) fn lend(&mut self) -> LentCallbacks {
        LentCallbacks {
            collision: self.collision.lend(),
            sensor: self.sensor.lend(),
            fracture: self.fracture.lend(),
        }
    }

    /// Puts lent callbacks back, unless the host replaced or cleared them meanwhile
    pub(crate) fn give_back(&mut self, lent: LentCallbacks) {
        self.collision.give_back(lent.collision);
        self.sensor.give_back(lent.sensor);
        self.fracture.give_back(lent.fracture);
    }
}

pub(crate) struct LentCallbacks {
    collision: Lent<CollisionCallback>,
    sensor: Lent<SensorCallback>,
    fracture: Lent<FractureCallback>,
}

impl LentCallbacks {
    pub(crate) fn dispatch(&mut self, events: &[StepEvent]) {
        for event in events {
            match event {
                StepEvent::Collision(hit) => {
                    if let Some(callback) = self.collision.callback.as_mut() {
                        callback(hit);
                    }
                }
                StepEvent::Sensor(event) => {
                    if let Some(callback) = self.sensor.callback.as_mut() {
                        callback(event);
                    }
                }
                StepEvent::Fracture(event) => {
                    if let Some(callback) = self.fracture.callback.as_mut() {
                        callback(event);
                    }
                }
            }
        }
    }
}
