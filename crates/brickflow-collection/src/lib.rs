//! A small parallel data-parallel collection, backed by a sequential
//! `Vec` iterator chain or a `rayon` thread pool depending on a runtime
//! [`Backend`] choice.

pub mod collection;
pub mod hashed_key;

pub use collection::{Backend, Collection, Persisted};
pub use hashed_key::HashedKey;
