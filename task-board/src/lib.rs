pub mod store;
pub mod engine;
pub mod render;
pub mod error;

pub use engine::{Notice, ProtocolEngine, Role};
pub use error::TaskBoardError;
pub use store::TaskStore;
