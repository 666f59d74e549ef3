use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use csim_core::config::CacheConfig;
use csim_core::geometry::Geometry;
use csim_core::io::get_reader;
use csim_core::replacement::AccessOutcome;
use csim_core::simulator::Simulator;
use csim_core::statistics::Statistics;

#[cfg(debug_assertions)]
const DEBUG_DEFAULT: bool = true;

#[cfg(not(debug_assertions))]
const DEBUG_DEFAULT: bool = false;

#[derive(Parser, Debug)]
#[command(about = String::from("Replays a memory trace against a set-associative LRU write-back cache"))]
struct Args {
    /// Number of set index bits (S = 2^s is the number of sets)
    #[arg(short = 's')]
    set_bits: Option<u32>,

    /// Associativity (number of lines per set)
    #[arg(short = 'E')]
    associativity: Option<usize>,

    /// Number of block bits (B = 2^b is the block size)
    #[arg(short = 'b')]
    block_bits: Option<u32>,

    /// Name of the memory trace to replay
    #[arg(short = 't')]
    trace: PathBuf,

    /// JSON file with the cache geometry. Flags given on the command line take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every access and whether it hit, missed, or evicted
    #[arg(short, long)]
    verbose: bool,

    /// Print the final statistics as JSON
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long, default_value_t = DEBUG_DEFAULT)]
    debug: bool,
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let file_config = match &args.config {
        Some(path) => {
            let config_file = File::open(path).map_err(|e| format!("Couldn't open the config file at path {}: {e}", path.display()))?;
            CacheConfig::from_reader(BufReader::new(config_file)).map_err(|e| format!("Couldn't parse the config file: {e}"))?
        }
        None => CacheConfig::default(),
    };
    let config = file_config.merge(CacheConfig {
        set_bits: args.set_bits,
        associativity: args.associativity,
        block_bits: args.block_bits,
    });
    let geometry = config.geometry().map_err(|e| format!("{e}, see --help for usage"))?;
    let mut simulator = Simulator::new(geometry).map_err(|e| e.to_string())?;

    let trace_file = File::open(&args.trace).map_err(|e| format!("Couldn't open the trace file at path {}: {e}", args.trace.display()))?;
    let trace_reader = get_reader(trace_file).map_err(|e| format!("Couldn't read the trace file: {e}"))?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = if args.verbose {
        let mut write_result = Ok(());
        let result = simulator.simulate_with(trace_reader, |record, outcome| {
            if write_result.is_ok() {
                write_result = writeln!(out, "{record} {}", describe(outcome));
            }
        });
        write_result.map_err(|e| format!("Couldn't write the verbose output: {e}"))?;
        result
    } else {
        simulator.simulate(trace_reader)
    };
    // An aborted run has no meaningful statistics, so none are printed
    let stats = *result.map_err(|e| format!("Tracefile error: {e}"))?;

    write_report(&mut out, &stats, args.json)?;

    if args.performance {
        let simulation_time = simulator.get_execution_time();
        let total_time = start.elapsed();
        writeln!(out, "Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9).map_err(|e| e.to_string())?;
        writeln!(out, "Total execution time (includes configuration, trace mapping, and output): {}s", total_time.as_nanos() as f64 / 1e9)
            .map_err(|e| e.to_string())?;
    }
    out.flush().map_err(|e| e.to_string())?;
    drop(out);
    // Kept off stdout, which carries only the report
    if args.debug {
        for line in debug_lines(&geometry, simulator.get_invalid_line_count()) {
            eprintln!("{line}");
        }
    }
    simulator.finish();
    Ok(())
}

fn describe(outcome: AccessOutcome) -> &'static str {
    match outcome {
        AccessOutcome::Hit => "hit",
        AccessOutcome::Miss => "miss",
        AccessOutcome::MissEviction => "miss eviction",
    }
}

/// Writes the final statistics, the only output besides the verbose log that goes to stdout
fn write_report<W: Write>(out: &mut W, stats: &Statistics, json: bool) -> Result<(), String> {
    let report = if json {
        serde_json::to_string_pretty(stats).map_err(|e| format!("Couldn't serialise the output {e}"))?
    } else {
        summary(stats)
    };
    writeln!(out, "{report}").map_err(|e| format!("Couldn't write the output: {e}"))
}

fn debug_lines(geometry: &Geometry, invalid_lines: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if cfg!(debug_assertions) {
        lines.push("Running the debug binary, debug mode is enabled by default. If benchmarking, re-compile with the --release argument".to_string());
    }
    lines.push(format!("Cache geometry: {geometry:?}, capacity {} bytes", geometry.capacity()));
    lines.push(format!("Never filled cache lines: {invalid_lines} of {}", geometry.num_sets() * geometry.associativity()));
    lines
}

fn summary(stats: &Statistics) -> String {
    format!(
        "hits:{} misses:{} evictions:{} dirty_bytes_in_cache:{} dirty_bytes_evicted:{}",
        stats.hits(),
        stats.misses(),
        stats.evictions(),
        stats.dirty_bytes_resident(),
        stats.dirty_bytes_evicted()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_match_original_tool() {
        let args = Args::try_parse_from(["csim", "-v", "-s", "4", "-E", "1", "-b", "4", "-t", "traces/yi.trace"]).unwrap();
        assert_eq!(args.set_bits, Some(4));
        assert_eq!(args.associativity, Some(1));
        assert_eq!(args.block_bits, Some(4));
        assert!(args.verbose);
        assert_eq!(args.trace, PathBuf::from("traces/yi.trace"));
    }

    #[test]
    fn negative_bits_are_rejected() {
        assert!(Args::try_parse_from(["csim", "-s", "-1", "-E", "1", "-b", "4", "-t", "x"]).is_err());
    }

    #[test]
    fn summary_line() {
        let mut simulator = Simulator::new(Geometry::new(1, 1, 0).unwrap()).unwrap();
        let stats = *simulator.simulate("S 0,1\nL 0,1\n".as_bytes()).unwrap();
        assert_eq!(summary(&stats), "hits:1 misses:1 evictions:0 dirty_bytes_in_cache:1 dirty_bytes_evicted:0");
    }

    #[test]
    fn report_is_only_the_summary_line() {
        let mut simulator = Simulator::new(Geometry::new(1, 1, 0).unwrap()).unwrap();
        let stats = *simulator.simulate("S 0,1\nL 2,1\n".as_bytes()).unwrap();
        let mut out = Vec::new();
        write_report(&mut out, &stats, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hits:0 misses:2 evictions:1 dirty_bytes_in_cache:0 dirty_bytes_evicted:1\n");

        // Diagnostics are produced on their own, for stderr
        let debug = debug_lines(simulator.cache().geometry(), simulator.get_invalid_line_count());
        assert_eq!(debug.last().unwrap(), "Never filled cache lines: 1 of 2");
        assert!(debug.iter().all(|line| !line.starts_with("hits:")));
    }

    #[test]
    fn json_report_parses_back() {
        let mut simulator = Simulator::new(Geometry::new(0, 2, 4).unwrap()).unwrap();
        let stats = *simulator.simulate("S 0,1\n".as_bytes()).unwrap();
        let mut out = Vec::new();
        write_report(&mut out, &stats, true).unwrap();
        assert_eq!(serde_json::from_slice::<Statistics>(&out).unwrap(), stats);
    }
}
