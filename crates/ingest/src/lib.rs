pub mod import;
pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod registry;

pub use import::{import_file, import_reader, open_source};
pub use loader::{LoadConfig, LoadEngine};
pub use parser::{ParseSummary, parse};
pub use pipeline::{PipelineConfig, run_import};
