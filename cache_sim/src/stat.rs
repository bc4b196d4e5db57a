use std::fmt;

use crate::{
    cache::{CacheLine, CacheModel, StatsSnapshot},
    geometry::GeometryReport,
};

pub trait Width {
    fn width_by_chunk_size(&self, chunk_size: usize) -> usize;
    fn chunk_size(&self, max_width: usize) -> usize {
        let mut chunk_size = 2;
        loop {
            if self.width_by_chunk_size(chunk_size) > max_width {
                break chunk_size - 1;
            }
            chunk_size += 1;
        }
    }
}

pub trait Stat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_>;
}

pub trait StatView: fmt::Display {
    /// header of stat
    fn header(&self) -> &'static str;
    /// body width
    fn width(&self) -> usize;
}

pub trait AddStats {
    /// add stat to `buf`.
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl Extend<Box<dyn Stat>> for Stats {
    fn extend<T: IntoIterator<Item = Box<dyn Stat>>>(&mut self, iter: T) {
        self.stats.extend(iter)
    }
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }
    pub fn len(&self) -> usize {
        self.stats.len()
    }
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

pub struct StatAllView<'s> {
    views: Vec<Box<dyn StatView + 's>>,
}

impl Stats {
    pub fn view(&self, max_width: usize) -> StatAllView<'_> {
        StatAllView {
            views: self.stats.iter().map(|s| s.view(max_width)).collect(),
        }
    }
}

impl fmt::Display for StatAllView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .views
            .iter()
            .map(|s| s.header().len().max(s.width()))
            .max()
            .unwrap_or(0);
        writeln!(f, "{:-^width$}", " statistics ")?;
        for sv in &self.views {
            writeln!(f, "{}:", sv.header())?;
            writeln!(f, "{}", sv)?;
        }
        write!(f, "{:-<width$}", "")
    }
}

impl AddStats for CacheModel {
    fn add_stats(&self, buf: &mut Stats) {
        buf.extend([
            Box::new(self.geometry_report()) as Box<dyn Stat>,
            Box::new(self.stats_snapshot()),
        ]);
    }
}

fn pct(rate: f64) -> String {
    format!("{:.6}", 100. * rate)
}

impl Stat for StatsSnapshot {
    fn view(&self, _: usize) -> Box<dyn StatView + '_> {
        Box::new(self)
    }
}

impl StatView for &'_ StatsSnapshot {
    fn header(&self) -> &'static str {
        "cache stat"
    }
    fn width(&self) -> usize {
        35
    }
}

impl fmt::Display for &'_ StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requests = self.requests;
        let hit = self.hits;
        let miss = self.misses;
        let hit_pct = pct(self.hit_rate);
        let miss_pct = pct(self.miss_rate);
        writeln!(f, "  requests: {requests:>10}")?;
        writeln!(f, "       hit: {hit:>10} ({hit_pct:>10}%)")?;
        write!(f, "      miss: {miss:>10} ({miss_pct:>10}%)")
    }
}

impl Stat for GeometryReport {
    fn view(&self, _: usize) -> Box<dyn StatView + '_> {
        Box::new(self)
    }
}

impl StatView for &'_ GeometryReport {
    fn header(&self) -> &'static str {
        "cache geometry"
    }
    fn width(&self) -> usize {
        38
    }
}

impl fmt::Display for &'_ GeometryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  memory words: {:>22}", self.words_in_memory)?;
        writeln!(f, "  bits per word: {:>21}", self.bits_per_word)?;
        writeln!(f, "  memory bytes: {:>22}", self.bytes_of_memory)?;
        writeln!(f, "  lines: {:>29}", self.num_lines)?;
        writeln!(f, "  words per line: {:>20}", self.block_size)?;
        writeln!(f, "  tag bits: {:>26}", self.tag_bits)?;
        write!(f, "  total bits: {:>24}", self.total_cache_bits)
    }
}

/// Copy of every line's state, rendered as a table.
pub struct LineTable {
    lines: Vec<CacheLine>,
    tag_bits: u32,
}

impl LineTable {
    pub fn new(model: &CacheModel) -> Self {
        Self {
            lines: model.lines().to_vec(),
            tag_bits: model.geometry().tag_bits(),
        }
    }
}

impl Stat for LineTable {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_> {
        Box::new(LineTableView::new(self, max_width))
    }
}

pub struct LineTableView<'a> {
    table: &'a LineTable,
    per_row: usize,
}

impl<'a> LineTableView<'a> {
    pub fn new(table: &'a LineTable, max_width: usize) -> Self {
        let mut view = Self { table, per_row: 1 };
        view.per_row = view.chunk_size(max_width).clamp(1, table.lines.len().max(1));
        view
    }
    fn index_width(&self) -> usize {
        self.table.lines.len().saturating_sub(1).to_string().len()
    }
    fn tag_width(&self) -> usize {
        // "0x" and at least one digit
        2 + (self.table.tag_bits as usize).div_ceil(4).max(1)
    }
    fn entry_width(&self) -> usize {
        self.index_width() + 2 + self.tag_width()
    }
}

impl Width for LineTableView<'_> {
    fn width_by_chunk_size(&self, chunk_size: usize) -> usize {
        2 + chunk_size * self.entry_width() + chunk_size.saturating_sub(1) * 3
    }
}

impl StatView for LineTableView<'_> {
    fn header(&self) -> &'static str {
        "cache lines"
    }
    fn width(&self) -> usize {
        self.width_by_chunk_size(self.per_row)
    }
}

impl fmt::Display for LineTableView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iw = self.index_width();
        let tw = self.tag_width();
        for (row, chunk) in self.table.lines.chunks(self.per_row).enumerate() {
            if row != 0 {
                writeln!(f)?;
            }
            write!(f, " ")?;
            for (col, line) in chunk.iter().enumerate() {
                let index = row * self.per_row + col;
                let sep = if col == 0 { " " } else { " | " };
                match line.tag() {
                    Some(tag) => write!(f, "{sep}{index:>iw$}: {tag:#0tw$x}")?,
                    None => write!(f, "{sep}{index:>iw$}: {:>tw$}", "-")?,
                }
            }
        }
        Ok(())
    }
}
