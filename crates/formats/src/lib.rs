pub mod czml;
pub mod table;

pub use czml::{BillboardPacket, CzmlError, CzmlPacket, DocumentPacket};
pub use table::*;
