pub mod tool_server;

pub use tool_server::{serve_stdio, ToolServer};
