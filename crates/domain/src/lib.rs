pub mod context;
pub mod entities;
pub mod segments;
pub mod status;
pub mod timestamp;

pub use context::MeetingContextHeader;
pub use entities::*;
pub use segments::*;
pub use status::JobStatus;
pub use timestamp::format_hhmmss;
