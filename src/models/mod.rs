//! Domain model module declarations.

pub mod record;
pub mod session;
pub mod stream;

pub use record::{LogData, LogRecord};
pub use session::SessionPhase;
pub use stream::{PayloadType, StreamType};
