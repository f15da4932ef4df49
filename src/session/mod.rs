pub mod file;
pub mod id;
pub(crate) mod locks;
pub mod manager;
pub mod memory;
pub mod store;
pub mod types;

pub use file::FileStore;
pub use id::{generate_session_id, validate_session_id};
pub use locks::LockMode;
pub use manager::SessionManager;
pub use memory::MemoryStore;
pub use store::{BackendKind, SessionStore};
pub use types::{Session, Value};
