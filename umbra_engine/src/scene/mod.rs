/// Scene module - model import, materials and GPU consolidation

pub mod vertex;
pub mod importer;
pub mod obj_importer;
pub mod material;
pub mod consolidator;

pub use vertex::*;
pub use importer::*;
pub use obj_importer::*;
pub use material::*;
pub use consolidator::*;
