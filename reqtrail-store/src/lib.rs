pub mod entry_store;
pub mod policy_store;

pub use entry_store::{DEFAULT_CAPACITY, EntryStore};
pub use policy_store::PolicyStore;
