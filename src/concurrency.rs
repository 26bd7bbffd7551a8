pub mod lock;

pub use lock::{LockManager, Permission};
