pub mod handler;
pub mod registry;
pub use registry::ToolRegistry;
pub mod validation;
pub use validation::ArgumentSchema;
pub use handler::{ToolError, ToolHandler, ToolResult};
