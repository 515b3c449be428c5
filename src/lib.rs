mod config;
mod engine;
mod error;
mod io_bridge;
mod loader;
mod memory;
mod stats;
mod word;

pub use config::{Alignment, EngineConfig, FileFlags, RuntimeFlags};
pub use engine::Engine;
pub use error::{EngineError, LoaderError};
pub use io_bridge::IoBridge;
pub use loader::{load_any, AnyImage, LoadedImage, SegmentRecord, FILL_THRESHOLD, MAGIC};
pub use memory::{Memory, ZeroSegment};
pub use stats::RunStatistics;
pub use word::Word;
