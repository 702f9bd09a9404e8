pub mod disk_store;
pub mod metadata;
