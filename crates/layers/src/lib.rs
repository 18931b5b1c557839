pub mod dataset;
pub mod layer;
pub mod legend;
pub mod mapping;
pub mod raster;
pub mod record;
pub mod symbology;
pub mod table;

pub use dataset::*;
pub use layer::*;
pub use mapping::*;
pub use record::*;
pub use table::{SceneSink, TableLayer, TableStyle};
