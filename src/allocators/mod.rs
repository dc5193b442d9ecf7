pub mod pid;
pub mod pid_allocator;
pub mod shared_pid_allocator;

pub use pid::*;
pub use pid_allocator::*;
pub use shared_pid_allocator::*;
