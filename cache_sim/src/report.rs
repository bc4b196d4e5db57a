//! Plain-text reports in the classic lab layout: one block per read, a size
//! report for the geometry, and a closing stats report.

use std::fmt;

use crate::{
    bin::Binary,
    cache::{AccessResult, CacheModel, MissKind, Outcome, StatsSnapshot},
    geometry::{CacheGeometry, GeometryReport},
};

/// Fields of one read, each followed by its binary form at field width.
pub struct AccessReport<'a> {
    geometry: &'a CacheGeometry,
    result: &'a AccessResult,
}

impl<'a> AccessReport<'a> {
    pub fn new(geometry: &'a CacheGeometry, result: &'a AccessResult) -> Self {
        Self { geometry, result }
    }
}

impl fmt::Display for AccessReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.geometry;
        let r = &self.result.fields;
        macro_rules! field {
            ($name:expr, $value:expr, $width:expr) => {
                writeln!(f, "{:<10}: {} ({})", $name, $value, Binary::new($value, $width))
            };
        }
        field!("Read Mem", r.address, g.address_size())?;
        field!("Block Addr", r.block_address, g.block_address_bits())?;
        field!("Offset", r.offset, g.offset_bits())?;
        field!("Block Num", r.index, g.index_bits())?;
        field!("Tag", r.tag, g.tag_bits())?;
        match self.result.outcome {
            Outcome::Hit => write!(f, "{:<10}: ** Hit **", "Result"),
            Outcome::Miss(MissKind::Cold) => write!(f, "{:<10}: Miss (cold)", "Result"),
            Outcome::Miss(MissKind::Conflict { evicted_tag }) => {
                write!(f, "{:<10}: Miss (evicted tag {evicted_tag})", "Result")
            }
        }
    }
}

pub struct SizeReport<'a> {
    name: &'a str,
    report: GeometryReport,
}

impl<'a> SizeReport<'a> {
    pub fn new(model: &'a CacheModel) -> Self {
        Self {
            name: model.name(),
            report: model.geometry_report(),
        }
    }
}

impl fmt::Display for SizeReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let GeometryReport {
            words_in_memory,
            bits_per_word,
            bytes_of_memory,
            num_lines,
            tag_bits,
            block_size,
            total_cache_bits,
        } = self.report;
        writeln!(f, "********** {} Cache Size Report **********", self.name)?;
        writeln!(
            f,
            "Memory : {words_in_memory} words of {bits_per_word} bits ({bytes_of_memory} bytes)"
        )?;
        write!(
            f,
            "Cache : {num_lines} lines with {tag_bits} bits of tag, 1 bit for the valid flag \
             and {block_size} words of data each ({total_cache_bits} bits)"
        )
    }
}

pub struct StatsReport<'a> {
    name: &'a str,
    snapshot: StatsSnapshot,
}

impl<'a> StatsReport<'a> {
    pub fn new(model: &'a CacheModel) -> Self {
        Self {
            name: model.name(),
            snapshot: model.stats_snapshot(),
        }
    }
}

impl fmt::Display for StatsReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.snapshot;
        writeln!(f, "********** {} Cache Stats Report", self.name)?;
        writeln!(f, "Requests: {}", s.requests)?;
        writeln!(f, "Hits    : {} ({:.6}%)", s.hits, 100. * s.hit_rate)?;
        write!(f, "Misses  : {} ({:.6}%)", s.misses, 100. * s.miss_rate)
    }
}
