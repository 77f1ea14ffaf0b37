//! Grid module: the map arena, its file format, templates and generation.

pub mod export;
pub mod generator;
pub mod library;
pub mod map;

pub use export::{BlockInfo, ExportedMap, ImportError};
pub use generator::{GenerateError, MapGenerator, allocate_kings};
pub use library::MapLibrary;
pub use map::{Map, MapError};
