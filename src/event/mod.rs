pub mod archive;
pub mod model;

pub use archive::{TraceArchive, TraceArchiveWriter, TRACE_ARCHIVE_SCHEMA_VERSION};
pub use model::*;
