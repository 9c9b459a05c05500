//! Session persistence: raw session-scoped media and the typed store over them.

pub mod file;
pub mod medium;
pub mod memory;
pub mod records;
pub mod session;

pub use file::FileMedium;
pub use medium::SessionMedium;
pub use memory::MemoryMedium;
pub use records::{ChatMessage, Role, Sender, SurveyRecord};
pub use session::{SessionStorageManager, SessionStore};
