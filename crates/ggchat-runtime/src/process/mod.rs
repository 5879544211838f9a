//! Child process plumbing for llama-server.

mod logs;
mod ports;
mod shutdown;

pub use logs::forward_output;
pub use ports::free_port;
pub use shutdown::shutdown_child;
