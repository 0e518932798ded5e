/// Resource registries - keyed owners of long-lived GPU objects

pub mod resource_registry;
pub mod texture_registry;
pub mod render_resources;

pub use resource_registry::*;
pub use texture_registry::*;
pub use render_resources::*;
