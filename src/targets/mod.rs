//! Target implementations

pub mod buffer;
pub mod console;
#[cfg(feature = "network")]
pub mod tcp;
pub mod writer;

pub use buffer::Buffer;
pub use console::ConsoleTarget;
#[cfg(feature = "network")]
pub use tcp::TcpStreamWriter;
#[cfg(feature = "network")]
pub use writer::TcpTarget;
pub use writer::{FileTarget, WriterTarget};

// Re-export the contracts for convenience
pub use crate::core::{RecordWriter, Target};
