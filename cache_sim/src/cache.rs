use thiserror::Error;

use crate::{
    bin,
    geometry::{AddressFields, CacheGeometry, ConfigError, GeometryReport},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("address {address:#x} out of range for {address_size}-bit address space")]
    OutOfRange { address: u64, address_size: u32 },
}

/// valid bit and resident tag of one line
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheLine {
    valid: bool,
    tag: u64,
}

impl CacheLine {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    /// resident tag, `None` while the line has never been filled
    pub fn tag(&self) -> Option<u64> {
        self.valid.then_some(self.tag)
    }
    fn fill(&mut self, tag: u64) {
        self.valid = true;
        self.tag = tag;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissKind {
    /// the line had never been filled
    Cold,
    /// another block was evicted from the line
    Conflict { evicted_tag: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss(MissKind),
}

impl Outcome {
    /// Returns `true` if the outcome is [`Hit`].
    ///
    /// [`Hit`]: Outcome::Hit
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessResult {
    pub outcome: Outcome,
    pub fields: AddressFields,
}

impl AccessResult {
    pub fn is_hit(&self) -> bool {
        self.outcome.is_hit()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessCounters {
    requests: u64,
    hits: u64,
    misses: u64,
}

impl AccessCounters {
    pub fn update_stat(&mut self, hit: bool) {
        self.requests += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
    }
    pub fn requests(&self) -> u64 {
        self.requests
    }
    pub fn hits(&self) -> u64 {
        self.hits
    }
    pub fn misses(&self) -> u64 {
        self.misses
    }
    pub fn snapshot(&self) -> StatsSnapshot {
        let rate = |n: u64| {
            if self.requests == 0 {
                0.
            } else {
                n as f64 / self.requests as f64
            }
        };
        StatsSnapshot {
            requests: self.requests,
            hits: self.hits,
            misses: self.misses,
            hit_rate: rate(self.hits),
            miss_rate: rate(self.misses),
        }
    }
}

/// Counters at one point in time. Rates are fractions and read `0.0` before
/// the first request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSnapshot {
    pub requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
}

/// A single-level direct-mapped cache, read path only.
///
/// Every block maps to the line selected by the index bits of its address.
/// A line holds at most one tag; a miss unconditionally overwrites it.
pub struct CacheModel {
    name: String,
    geometry: CacheGeometry,
    lines: Vec<CacheLine>,
    counters: AccessCounters,
}

impl CacheModel {
    pub fn new(
        name: impl Into<String>,
        address_size: u32,
        word_size: u32,
        block_size: u32,
        num_lines: u32,
    ) -> Result<Self, ConfigError> {
        let geometry = CacheGeometry::new(address_size, word_size, block_size, num_lines)?;
        Ok(Self::with_geometry(name, geometry))
    }

    pub fn with_geometry(name: impl Into<String>, geometry: CacheGeometry) -> Self {
        let name = name.into();
        log::debug!(
            "cache {name}: {} lines, offset {} / index {} / tag {} bits",
            geometry.num_lines(),
            geometry.offset_bits(),
            geometry.index_bits(),
            geometry.tag_bits()
        );
        Self {
            name,
            lines: vec![CacheLine::default(); geometry.num_lines() as usize],
            geometry,
            counters: Default::default(),
        }
    }

    /// Reads `address`. Bits above the address width are dropped before the
    /// address is decomposed; see [`Self::try_access`] for the strict variant.
    pub fn access(&mut self, address: u64) -> AccessResult {
        let masked = bin::mask_lower(address, self.geometry.address_size());
        if masked != address {
            log::trace!(
                "{}: truncated {address:#x} to {masked:#x}",
                self.name
            );
        }
        self.access_in_range(masked)
    }

    /// Like [`Self::access`] but rejects addresses wider than the address
    /// space. A rejected access leaves lines and counters untouched.
    pub fn try_access(&mut self, address: u64) -> Result<AccessResult, AccessError> {
        if !self.geometry.contains(address) {
            return Err(AccessError::OutOfRange {
                address,
                address_size: self.geometry.address_size(),
            });
        }
        Ok(self.access_in_range(address))
    }

    fn access_in_range(&mut self, address: u64) -> AccessResult {
        let fields = self.geometry.decompose(address);
        let line = &mut self.lines[fields.index as usize];
        let outcome = match line.tag() {
            None => {
                line.fill(fields.tag);
                Outcome::Miss(MissKind::Cold)
            }
            Some(tag) if tag == fields.tag => Outcome::Hit,
            Some(evicted_tag) => {
                line.fill(fields.tag);
                Outcome::Miss(MissKind::Conflict { evicted_tag })
            }
        };
        self.counters.update_stat(outcome.is_hit());
        log::trace!(
            "{}: {address:#x} -> line {} tag {:#x}: {outcome:?}",
            self.name,
            fields.index,
            fields.tag
        );
        AccessResult { outcome, fields }
    }

    pub fn stats_snapshot(&self) -> StatsSnapshot {
        self.counters.snapshot()
    }

    pub fn geometry_report(&self) -> GeometryReport {
        self.geometry.report()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    pub fn counters(&self) -> &AccessCounters {
        &self.counters
    }

    pub fn line(&self, index: usize) -> Option<&CacheLine> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }
}
