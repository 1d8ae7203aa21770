//! Identity mapping
//!
//! - [`allocator`] - Surrogate key allocation from the persisted maximum
//! - [`store`] - Pass-scoped mapping cache with batched appends
//! - [`passes`] - Patient and encounter mapping passes

pub mod allocator;
pub mod passes;
pub mod store;

pub use allocator::SurrogateKeyAllocator;
pub use passes::{map_encounters, map_patients, MappingPassContext};
pub use store::IdentityMappingStore;
