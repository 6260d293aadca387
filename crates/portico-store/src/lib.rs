mod error;
mod memory;
mod traits;
mod types;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{validate_content_id, ContentStore, MAX_CONTENT_ID_LENGTH};
pub use types::Content;
