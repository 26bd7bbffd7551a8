pub mod tuple;

pub use tuple::{RecordId, Tuple};
