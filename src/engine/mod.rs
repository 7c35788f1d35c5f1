pub mod assembler;
pub mod handlers;
pub mod registry;

pub use assembler::ArgumentAssembler;
pub use handlers::register_defaults;
pub use registry::{EventHandler, HandlerRegistry};
