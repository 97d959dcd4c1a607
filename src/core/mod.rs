//! The world facade and everything it owns: handle tables, configuration,
//! events, the stepping controller and the body-type registry.

pub mod world;
pub mod config;
pub mod handles;
pub mod events;
pub mod registry;
pub mod stepping;
pub mod debug;
mod state;
mod pipeline;
mod shatter;

pub use self::world::PhysicsWorld;
pub use self::config::{FractureConfig, ForceFieldConfig, SimulationConfig, DEFAULT_FIXED_TIMESTEP};
pub use self::handles::{BodyId, ForceFieldId, HandleTable, JointId, TableId};
pub use self::events::{
    CollisionCallback, CollisionHitEvent, FractureCallback, FractureEvent, Fragment, SensorCallback, SensorEvent,
    SensorEventType, StepEvents,
};
pub use self::registry::BodyTypeRegistry;
pub use self::stepping::StepAccumulator;
pub use self::debug::{DebugOutline, DebugShape};
