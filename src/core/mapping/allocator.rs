//! Surrogate key allocation
//!
//! Keys are allocated as `max + 1` from a counter seeded once per pass from the highest
//! persisted key of the domain.

use crate::adapters::database::MappingStorage;
use crate::domain::ids::{MappingDomain, SurrogateKey};
use crate::domain::{DeidError, Result};

/// Pass-scoped key allocator for one mapping domain
///
/// Uniqueness holds only within the lifetime of one allocator. Two allocators seeded from
/// the same store hand out the same keys, so at most one pass may write a domain at a time.
#[derive(Debug)]
pub struct SurrogateKeyAllocator {
    domain: MappingDomain,
    last: Option<SurrogateKey>,
}

impl SurrogateKeyAllocator {
    /// Seeds the allocator from the persisted maximum of `domain`
    ///
    /// # Errors
    ///
    /// Returns a storage error if the maximum can't be read.
    pub async fn initialize(storage: &dyn MappingStorage, domain: MappingDomain) -> Result<Self> {
        let max = storage.max_surrogate_key(domain).await?;
        if max < 0 {
            return Err(DeidError::Other(format!(
                "Negative maximum surrogate key {max} in {domain} mapping"
            )));
        }

        tracing::debug!(domain = %domain, max_key = max, "Key allocator seeded");
        Ok(Self::starting_after(domain, max))
    }

    /// Allocator whose first key is `max + 1`
    pub fn starting_after(domain: MappingDomain, max: i64) -> Self {
        Self {
            domain,
            last: SurrogateKey::new(max).ok(),
        }
    }

    /// Returns the next unused key
    pub fn next_key(&mut self) -> SurrogateKey {
        let next = self
            .last
            .map(SurrogateKey::successor)
            .unwrap_or_else(SurrogateKey::first);
        self.last = Some(next);
        next
    }

    /// Last key handed out, or the seed when none was; 0 for an empty domain
    pub fn current(&self) -> i64 {
        self.last.map(|k| k.get()).unwrap_or(0)
    }

    pub fn domain(&self) -> MappingDomain {
        self.domain
    }
}
