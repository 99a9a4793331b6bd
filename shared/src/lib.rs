pub mod types;
pub mod messages;
pub mod codec;

pub use codec::CodecError;
pub use messages::Message;
pub use types::{PeerId, Task, TaskId, TaskStatus};
