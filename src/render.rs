//! Interface to the rendering/layer system.
//!
//! The world never draws anything. When a body that has a layer breaks, it asks
//! the installed [`FragmentLayerSink`] to create a layer per fragment, attaches
//! each to its fragment body, and destroys the original layer together with the
//! original body.

use crate::core::{BodyId, Fragment};
use crate::destruction::DestructibleProperties;

/// Identifier of a drawable layer owned by the rendering system
pub type LayerId = u64;

/// Receives layer lifecycle requests for fracture fragments.
///
/// Called with the world lock held, on the stepping thread.
pub trait FragmentLayerSink: Send {
    /// Creates a drawable layer for a fragment of `parent`.
    /// Return `None` to leave the fragment without a layer.
    fn create_fragment_layer(
        &mut self,
        parent: LayerId,
        fragment: &Fragment,
        properties: &DestructibleProperties,
    ) -> Option<LayerId>;

    /// Binds a layer to the body whose transform it follows
    fn attach_layer(&mut self, layer: LayerId, body: BodyId);

    fn destroy_layer(&mut self, layer: LayerId);
}
