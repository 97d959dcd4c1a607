mod field;

pub use self::field::{
    damping_factor, linear_response, linear_zone, radial_force, FieldZone, ForceField, ForceFieldType,
};
