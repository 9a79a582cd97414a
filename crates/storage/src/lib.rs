#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, ResultFilter, ResultRepository, ResultRow, Storage, StorageError,
};
