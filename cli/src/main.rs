mod interactive;

use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use bitmask_enum::bitmask;
use cache_sim::{
    cache::AccessResult,
    config::CacheConfig,
    geometry::CacheGeometry,
    report::{AccessReport, SizeReport, StatsReport},
    sim::{AddressPolicy, Simulator},
    trace,
};
use clap::{ArgAction, Args, Parser, Subcommand};

use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the size report of a cache
    Geometry(CommonArgs),
    /// simulate reads through a cache
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// File path to a JSON cache configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Name of the cache shown in reports
    #[arg(long)]
    name: Option<String>,
    /// Address width in bits
    #[arg(short, long)]
    address_size: Option<u32>,
    /// Word width in bits
    #[arg(short, long)]
    word_size: Option<u32>,
    /// Words per line
    #[arg(short, long)]
    block_size: Option<u32>,
    /// Number of lines
    #[arg(short = 'l', long)]
    num_lines: Option<u32>,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    /// File path to an address trace
    #[arg(short, long)]
    trace: Option<PathBuf>,
    /// Addresses read after the trace (0x.., 0o.., 0b.. or decimal)
    #[arg(value_parser = trace::parse_address)]
    addresses: Vec<u64>,
    /// Omit the report of each read; twice to omit the size report as well
    #[arg(short, long, action = ArgAction::Count)]
    quiet: u8,
    /// Reject addresses wider than the address size instead of truncating them
    #[arg(short, long)]
    strict: bool,
    /// Enable interactive mode after the addresses are read
    #[arg(short, long)]
    interactive: bool,
}

#[bitmask(u8)]
enum Report {
    Geometry,
    Access,
    Stat,
}

impl Report {
    fn from_quiet(quiet: u8) -> Self {
        match quiet {
            0 => Report::all_bits(),
            1 => Report::Geometry | Report::Stat,
            _ => Report::Stat,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Geometry(common) => {
            init_logger(common.verbose);
            let model = load_config(common)?.build()?;
            println!("{}", SizeReport::new(&model));
            Ok(())
        }
        Command::Run(RunArgs {
            delegate,
            trace,
            addresses,
            quiet,
            strict,
            interactive,
        }) => {
            init_logger(delegate.verbose);
            let model = load_config(delegate)?.build()?;
            let mut seq = match trace {
                Some(p) => read_trace(p)?,
                None => Vec::new(),
            };
            seq.extend(addresses);
            log::info!("{} addresses to read.", seq.len());
            let policy = if strict {
                AddressPolicy::Reject
            } else {
                AddressPolicy::Truncate
            };
            let report = Report::from_quiet(quiet);
            if report.contains(Report::Geometry) {
                println!("{}\n", SizeReport::new(&model));
            }
            let mut sim = Simulator::new(model, policy);
            sim.run(seq, |g, r| print_access(report, g, r))?;
            if interactive {
                interactive::execute_interactive(&mut sim, report)?;
            }
            if report.contains(Report::Stat) {
                output_stat(&sim);
            }
            Ok(())
        }
    }
}

fn init_logger(verbose: bool) {
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
}

fn load_config(
    CommonArgs {
        config,
        name,
        address_size,
        word_size,
        block_size,
        num_lines,
        verbose: _,
    }: CommonArgs,
) -> Result<CacheConfig> {
    let mut c = match config {
        Some(p) => {
            let file = File::open(&p)
                .with_context(|| format!("failed to open config {}", p.display()))?;
            CacheConfig::deser(file)
                .with_context(|| format!("failed to parse config {}", p.display()))?
        }
        None => Default::default(),
    };
    if let Some(name) = name {
        c.name = name;
    }
    macro_rules! set {
        ($($field:ident),*) => {
            $(
                if let Some(v) = $field {
                    c.$field = v;
                }
            )*
        };
    }
    set!(address_size, word_size, block_size, num_lines);
    log::info!("cache configuration: {c:?}");
    Ok(c)
}

fn read_trace(path: PathBuf) -> Result<Vec<u64>> {
    let file =
        File::open(&path).with_context(|| format!("failed to open trace {}", path.display()))?;
    trace::read_trace(file).with_context(|| format!("failed to read trace {}", path.display()))
}

fn print_access(report: Report, geometry: &CacheGeometry, r: &AccessResult) {
    if report.contains(Report::Access) {
        println!("{}\n", AccessReport::new(geometry, r));
    }
}

#[cfg(not(feature = "stat"))]
fn output_stat(sim: &Simulator) {
    println!("{}", StatsReport::new(sim.model()));
}

#[cfg(feature = "stat")]
fn output_stat(sim: &Simulator) {
    println!("{}", StatsReport::new(sim.model()));
    let max_width = get_terminal_width().unwrap_or(120) as usize;
    log::info!("statistics:\n{}", sim.collect_stat().view(max_width));
}

fn get_terminal_width() -> Option<u16> {
    terminal_size().map(|(w, _)| w.0.saturating_sub(20))
}
