use std::fmt;

use anyhow::{Context, Result};

use crate::{
    cache::{AccessError, AccessResult, CacheModel},
    geometry::CacheGeometry,
};

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

/// What to do with addresses wider than the address space.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AddressPolicy {
    /// drop the high bits
    #[default]
    Truncate,
    /// fail the access
    Reject,
}

impl fmt::Display for AddressPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            AddressPolicy::Truncate => "truncate",
            AddressPolicy::Reject => "reject",
        })
    }
}

pub struct Simulator {
    model: CacheModel,
    policy: AddressPolicy,
    truncated: u64,
    #[cfg(feature = "stat")]
    stat_builder: stat::SimStatBuilder,
}

impl Simulator {
    pub fn new(model: CacheModel, policy: AddressPolicy) -> Self {
        Self {
            model,
            policy,
            truncated: 0,
            #[cfg(feature = "stat")]
            stat_builder: Default::default(),
        }
    }

    pub fn step(&mut self, address: u64) -> Result<AccessResult, AccessError> {
        match self.policy {
            AddressPolicy::Truncate => {
                if !self.model.geometry().contains(address) {
                    self.truncated += 1;
                }
                Ok(self.model.access(address))
            }
            AddressPolicy::Reject => self.model.try_access(address),
        }
    }

    /// Feeds `addresses` in order, calling `on_access` after each one.
    /// Stops at the first rejected address. Returns the number of accesses.
    pub fn run<I>(
        &mut self,
        addresses: I,
        mut on_access: impl FnMut(&CacheGeometry, &AccessResult),
    ) -> Result<usize>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut count = 0;
        for address in addresses {
            let r = self
                .step(address)
                .with_context(|| format!("access #{count} rejected"))?;
            on_access(self.model.geometry(), &r);
            count += 1;
        }
        #[cfg(feature = "stat")]
        self.stat_builder.stop_timer();
        log::info!("{}: simulated {count} accesses", self.model.name());
        Ok(count)
    }

    /// Replaces the model with a cold one of the same name and geometry.
    pub fn reset(&mut self) {
        let geometry = *self.model.geometry();
        self.model = CacheModel::with_geometry(self.model.name(), geometry);
        self.truncated = 0;
        #[cfg(feature = "stat")]
        {
            self.stat_builder = Default::default();
        }
    }

    pub fn model(&self) -> &CacheModel {
        &self.model
    }

    pub fn into_model(self) -> CacheModel {
        self.model
    }

    pub fn policy(&self) -> AddressPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: AddressPolicy) {
        self.policy = policy;
    }

    /// number of addresses whose high bits were dropped
    pub fn truncated(&self) -> u64 {
        self.truncated
    }
}

#[cfg(feature = "stat")]
impl Simulator {
    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

#[cfg(feature = "stat")]
impl AddStats for Simulator {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_builder.finish(self.policy, self.truncated)));
        self.model.add_stats(buf);
    }
}

#[cfg(feature = "stat")]
mod stat {
    use crate::stat::*;

    use super::*;
    use std::time;

    pub struct SimStatBuilder {
        begin: time::Instant,
        elapsed: Option<time::Duration>,
    }

    impl SimStatBuilder {
        pub fn new() -> Self {
            Self {
                begin: time::Instant::now(),
                elapsed: None,
            }
        }
        pub fn stop_timer(&mut self) {
            self.elapsed = Some(self.begin.elapsed())
        }
        pub fn finish(&self, policy: AddressPolicy, truncated: u64) -> SimStat {
            SimStat {
                policy,
                truncated,
                elapsed: self.elapsed.unwrap_or_else(|| self.begin.elapsed()),
            }
        }
    }

    impl Default for SimStatBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct SimStat {
        policy: AddressPolicy,
        truncated: u64,
        elapsed: time::Duration,
    }

    impl Stat for SimStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(self)
        }
    }

    impl StatView for &'_ SimStat {
        fn header(&self) -> &'static str {
            "simulator stat"
        }
        fn width(&self) -> usize {
            33
        }
    }

    impl fmt::Display for &'_ SimStat {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let us = format!("{} us", self.elapsed.as_micros());
            writeln!(f, "  elapsed total: {us:>13}")?;
            writeln!(f, "  address policy: {:>12}", self.policy)?;
            let truncated = format!("#{}", self.truncated);
            write!(f, "  truncated: {truncated:>17}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(policy: AddressPolicy) -> Simulator {
        let model = CacheModel::new("L1", 8, 8, 1, 4).unwrap();
        Simulator::new(model, policy)
    }

    #[test]
    fn test_run_reports_each_access() {
        let mut s = sim(AddressPolicy::Truncate);
        let mut hits = Vec::new();
        let n = s
            .run([1, 1, 5, 1], |_, r| hits.push(r.is_hit()))
            .unwrap();
        assert_eq!(4, n);
        assert_eq!(vec![false, true, false, false], hits);
        assert_eq!(4, s.model().stats_snapshot().requests);
    }
    #[test]
    fn test_truncate_counts() {
        let mut s = sim(AddressPolicy::Truncate);
        s.run([0x101, 0x1, 0x2ff], |_, _| ()).unwrap();
        assert_eq!(2, s.truncated());
        assert_eq!(1, s.model().stats_snapshot().hits);
    }
    #[test]
    fn test_reject_stops_run() {
        let mut s = sim(AddressPolicy::Reject);
        let mut seen = 0;
        let err = s.run([0x1, 0x100, 0x2], |_, _| seen += 1).unwrap_err();
        assert_eq!(1, seen);
        assert_eq!(1, s.model().stats_snapshot().requests);
        assert!(matches!(
            err.downcast_ref::<AccessError>(),
            Some(AccessError::OutOfRange { address: 0x100, .. })
        ));
    }
    #[test]
    fn test_reset() {
        let mut s = sim(AddressPolicy::Truncate);
        s.run([1, 1, 0x100], |_, _| ()).unwrap();
        s.reset();
        assert_eq!(0, s.model().stats_snapshot().requests);
        assert_eq!(0, s.truncated());
        assert_eq!("L1", s.model().name());
        assert!(s.model().lines().iter().all(|l| !l.is_valid()));
    }
    #[test]
    fn test_set_policy() {
        let mut s = sim(AddressPolicy::Truncate);
        s.set_policy(AddressPolicy::Reject);
        assert_eq!(AddressPolicy::Reject, s.policy());
        assert!(s.step(0x100).is_err());
    }
    #[cfg(feature = "stat")]
    #[test]
    fn test_collect_stat() {
        let mut s = sim(AddressPolicy::Truncate);
        s.run([1, 0x101], |_, _| ()).unwrap();
        let stats = s.collect_stat();
        assert_eq!(3, stats.len());
        let out = stats.view(80).to_string();
        assert!(out.contains("simulator stat:"));
        assert!(out.contains("truncate"));
        assert!(out.contains("#1"));
    }
}
