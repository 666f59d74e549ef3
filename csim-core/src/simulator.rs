use std::io::BufRead;
use std::time::{Duration, Instant};
use crate::cache::Cache;
use crate::error::SimError;
use crate::geometry::Geometry;
use crate::replacement::AccessOutcome;
use crate::statistics::Statistics;
use crate::trace::{AccessRecord, TraceReader};

/// The simulator owns a cache and the statistics for everything replayed against it.
///
/// It supports calling simulate multiple times, e.g. for a trace split over several files. The
/// cache state, statistics, and time taken carry over between calls.
///
/// A run that stops on a malformed trace line leaves the cache and counters partway through an
/// invalid trace. From then on every replay is refused with `SimError::Aborted`
#[derive(Debug)]
pub struct Simulator {
    cache: Cache,
    stats: Statistics,
    simulation_time: Duration,
    /// Trace line that aborted an earlier run
    aborted_at: Option<u64>,
}

impl Simulator {
    /// Creates a new simulator with an empty cache
    ///
    /// # Arguments
    ///
    /// * `geometry`: The cache geometry, usually from a [`crate::config::CacheConfig`]
    ///
    /// returns: Result<Simulator, SimError>, `AllocationFailure` if the cache doesn't fit in memory
    pub fn new(geometry: Geometry) -> Result<Self, SimError> {
        let cache = Cache::new(geometry)?;
        tracing::info!(
            s = geometry.set_bits(),
            E = geometry.associativity(),
            b = geometry.block_bits(),
            capacity = geometry.capacity(),
            "created cache"
        );
        Ok(Self {
            cache,
            stats: Statistics::default(),
            simulation_time: Duration::new(0, 0),
            aborted_at: None,
        })
    }

    /// Replays one record against the cache
    pub fn access(&mut self, record: &AccessRecord) -> Result<AccessOutcome, SimError> {
        self.check_not_aborted()?;
        Ok(self.replay(record))
    }

    /// Replays already parsed records, in order
    pub fn run<'a, I>(&mut self, records: I) -> Result<&Statistics, SimError>
    where
        I: IntoIterator<Item = &'a AccessRecord>,
    {
        self.check_not_aborted()?;
        let start = Instant::now();
        for record in records {
            self.replay(record);
        }
        self.simulation_time += start.elapsed();
        Ok(&self.stats)
    }

    /// Simulates the cache on a trace, see [`Simulator::simulate_with`]
    pub fn simulate<R: BufRead>(&mut self, reader: R) -> Result<&Statistics, SimError> {
        self.simulate_with(reader, |_, _| {})
    }

    /// Simulates the cache on a trace, calling `observer` with every record and what it did
    ///
    /// Records are parsed and simulated one at a time, strictly in trace order. The first malformed
    /// line ends the run with an error; the run is then invalid and no statistics are returned
    ///
    /// # Arguments
    ///
    /// * `reader`: The trace
    /// * `observer`: Called after each access, e.g. to print a verbose log
    ///
    /// returns: Result<&Statistics, SimError>
    pub fn simulate_with<R, F>(&mut self, reader: R, mut observer: F) -> Result<&Statistics, SimError>
    where
        R: BufRead,
        F: FnMut(&AccessRecord, AccessOutcome),
    {
        self.check_not_aborted()?;
        let start = Instant::now();
        let mut records: u64 = 0;
        let mut trace = TraceReader::new(reader);
        while let Some(record) = trace.next() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    self.simulation_time += start.elapsed();
                    self.aborted_at = Some(trace.line_number());
                    tracing::error!(error = %e, records, "aborting simulation");
                    return Err(e);
                }
            };
            let outcome = self.replay(&record);
            observer(&record, outcome);
            records += 1;
        }
        let elapsed = start.elapsed();
        self.simulation_time += elapsed;
        tracing::info!(
            records,
            hits = self.stats.hits(),
            misses = self.stats.misses(),
            evictions = self.stats.evictions(),
            elapsed = ?elapsed,
            "finished trace"
        );
        Ok(&self.stats)
    }

    /// The counters so far. Mid-run or after an aborted run these are for diagnostics only
    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Gets the wall-clock time spent simulating
    pub fn get_execution_time(&self) -> &Duration {
        &self.simulation_time
    }

    /// Gets the number of lines never filled
    pub fn get_invalid_line_count(&self) -> usize {
        self.cache.invalid_line_count()
    }

    /// Whether an earlier run was aborted, invalidating this simulator
    pub fn is_aborted(&self) -> bool {
        self.aborted_at.is_some()
    }

    /// Tears the cache down, keeping only the final statistics
    pub fn finish(self) -> Statistics {
        self.cache.teardown();
        self.stats
    }

    fn replay(&mut self, record: &AccessRecord) -> AccessOutcome {
        let outcome = self.cache.access(record.address, record.kind, &mut self.stats);
        tracing::debug!(%record, ?outcome);
        outcome
    }

    fn check_not_aborted(&self) -> Result<(), SimError> {
        match self.aborted_at {
            Some(line) => Err(SimError::Aborted { line }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use super::*;
    use crate::trace::AccessKind;

    fn simulate(s: u32, e: usize, b: u32, trace: &str) -> Result<Statistics, SimError> {
        let mut simulator = Simulator::new(Geometry::new(s, e, b)?)?;
        simulator.simulate(Cursor::new(trace))?;
        Ok(simulator.finish())
    }

    #[test]
    fn conflicting_loads_in_direct_mapped_cache() {
        // Addresses 0 and 2 share set 0, so both the third and fourth loads displace a line
        let stats = simulate(1, 1, 0, "L 0,1\nL 1,1\nL 2,1\nL 0,1\n").unwrap();
        assert_eq!((stats.hits(), stats.misses(), stats.evictions()), (0, 4, 2));
    }

    #[test]
    fn store_then_load_hits() {
        let mut simulator = Simulator::new(Geometry::new(1, 1, 0).unwrap()).unwrap();
        simulator.simulate(Cursor::new("S 0,1\n")).unwrap();
        assert_eq!(simulator.statistics().dirty_bytes_resident(), 1);
        let stats = *simulator.simulate(Cursor::new("L 0,1\n")).unwrap();
        assert_eq!((stats.hits(), stats.misses(), stats.evictions()), (1, 1, 0));
        assert_eq!(stats.dirty_bytes_resident(), 1);
        assert_eq!(stats.dirty_bytes_evicted(), 0);
    }

    #[test]
    fn malformed_kind_halts_run() {
        let mut simulator = Simulator::new(Geometry::new(1, 1, 0).unwrap()).unwrap();
        let mut seen = Vec::new();
        let result = simulator.simulate_with(Cursor::new("L 0,1\nM 1,1\nL 2,1\n"), |record, _| seen.push(*record));
        assert!(matches!(result, Err(SimError::MalformedAccessKind { line: 2, kind: 'M' })));
        // Nothing after the bad line is simulated
        assert_eq!(seen.len(), 1);
        assert_eq!(simulator.statistics().accesses(), 1);
    }

    #[test]
    fn aborted_run_refuses_further_replays() {
        let mut simulator = Simulator::new(Geometry::new(1, 1, 0).unwrap()).unwrap();
        assert!(simulator.simulate(Cursor::new("S 0,1\nX 1,1\n")).is_err());
        assert!(simulator.is_aborted());
        // The store before the bad line must not count towards a later trace
        assert!(matches!(simulator.simulate(Cursor::new("L 0,1\n")), Err(SimError::Aborted { line: 2 })));
        let record = AccessRecord { kind: AccessKind::Load, address: 0x0, size: 1 };
        assert!(matches!(simulator.access(&record), Err(SimError::Aborted { line: 2 })));
        assert!(matches!(simulator.run(&[record]), Err(SimError::Aborted { line: 2 })));
        assert_eq!(simulator.statistics().accesses(), 1);
        assert_eq!(simulator.statistics().hits(), 0);
    }

    #[test]
    fn completed_runs_accumulate() {
        let mut simulator = Simulator::new(Geometry::new(1, 1, 0).unwrap()).unwrap();
        simulator.simulate(Cursor::new("S 0,1\n")).unwrap();
        let stats = *simulator.simulate(Cursor::new("L 0,1\n")).unwrap();
        assert!(!simulator.is_aborted());
        assert_eq!((stats.hits(), stats.misses()), (1, 1));
    }

    #[test]
    fn largest_blocks_count_every_dirty_byte() {
        // Two lines of 2^62 bytes, the largest two-way geometry whose capacity fits in a u64
        let geometry = Geometry::new(0, 2, 62).unwrap();
        let mut simulator = Simulator::new(geometry).unwrap();
        simulator.simulate(Cursor::new("S 0,1\nS 4000000000000000,1\n")).unwrap();
        assert_eq!(simulator.statistics().dirty_bytes_resident(), geometry.capacity());
        assert_eq!(simulator.cache().resident_dirty_bytes(), geometry.capacity());
        // Two more stores push both dirty lines out
        let stats = *simulator.simulate(Cursor::new("S 8000000000000000,1\nS c000000000000000,1\n")).unwrap();
        assert_eq!(stats.evictions(), 2);
        assert_eq!(stats.dirty_bytes_resident(), 1 << 63);
        assert_eq!(stats.dirty_bytes_evicted(), 1 << 63);
        let stats = *simulator.simulate(Cursor::new("L 0,1\nL 4000000000000000,1\n")).unwrap();
        assert_eq!(stats.dirty_bytes_resident(), 0);
        assert_eq!(stats.dirty_bytes_evicted(), 1 << 64);
    }

    #[test]
    fn observer_sees_every_outcome() {
        let mut simulator = Simulator::new(Geometry::new(0, 1, 4).unwrap()).unwrap();
        let mut outcomes = Vec::new();
        simulator
            .simulate_with(Cursor::new("L 0,1\nS 8,1\nL 10,1\n"), |_, outcome| outcomes.push(outcome))
            .unwrap();
        assert_eq!(outcomes, vec![AccessOutcome::Miss, AccessOutcome::Hit, AccessOutcome::MissEviction]);
        assert_eq!(simulator.statistics().dirty_bytes_evicted(), 16);
    }

    #[test]
    fn parsed_records_match_trace() {
        let records = [
            AccessRecord { kind: AccessKind::Store, address: 0x0, size: 1 },
            AccessRecord { kind: AccessKind::Load, address: 0x2, size: 1 },
            AccessRecord { kind: AccessKind::Load, address: 0x0, size: 1 },
        ];
        let mut simulator = Simulator::new(Geometry::new(1, 1, 0).unwrap()).unwrap();
        let from_records = *simulator.run(&records).unwrap();
        let from_trace = simulate(1, 1, 0, "S 0,1\nL 2,1\nL 0,1\n").unwrap();
        assert_eq!(from_records, from_trace);
        assert_eq!(from_trace.dirty_bytes_evicted(), 1);
        assert_eq!(from_trace.dirty_bytes_resident(), 0);
    }
}
