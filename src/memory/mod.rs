mod store;

pub use store::{Conversation, MemoryStore, Message, Role, StorageError};
