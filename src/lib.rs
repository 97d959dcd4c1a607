pub mod math;
pub mod geometry;
pub mod kernel;
pub mod core;
pub mod forces;
pub mod destruction;
pub mod render;

/// Re-export common types for easier usage
pub use crate::core::{
    BodyId, CollisionHitEvent, ForceFieldId, FractureEvent, Fragment, JointId, PhysicsWorld, SensorEvent,
    SensorEventType, SimulationConfig,
};
pub use crate::destruction::{DestructibleProperties, UvRect};
pub use crate::kernel::{BodyType, Material, PhysicsKernel, SimpleKernel};
pub use crate::math::Vector2;
pub use crate::render::{FragmentLayerSink, LayerId};

/// Error types for the physics engine
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum PhysicsError {
        #[error("Invalid parameter: {0}")]
        InvalidParameter(String),

        #[error("Resource not found: {0}")]
        ResourceNotFound(String),
    }
}

/// Result type for physics engine operations
pub type Result<T> = std::result::Result<T, error::PhysicsError>;

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
