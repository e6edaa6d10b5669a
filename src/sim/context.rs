use super::content::ContentRegistry;
use crate::model::World;

/// Context passed to each event while it triggers and cleans up.
///
/// Bundled so event handlers can grow new inputs without changing every
/// signature.
pub struct EventContext<'a> {
    pub world: &'a mut World,
    /// Registered content generators, read-only during a run.
    pub content: &'a ContentRegistry,
}

impl<'a> EventContext<'a> {
    pub fn new(world: &'a mut World, content: &'a ContentRegistry) -> Self {
        Self { world, content }
    }
}
