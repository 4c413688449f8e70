mod arg;

use cidrplan::geometry::BarSpan;
use cidrplan::store::SummaryRow;
use cidrplan::{enumerate, generate_catalog, AddressRange, AllocationStore, CandidateSize, Role};
use clap::Parser;
use serde::Serialize;

fn setup_logger(level: log::LevelFilter) {
    let config = simplelog::ConfigBuilder::new()
        .set_time_format_rfc3339()
        .build();
    // Keep stdout for the report itself
    simplelog::TermLogger::init(
        level,
        config,
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .expect("Failed to initialize logger");
}

/// A free position with its place on the bar
#[derive(Debug, Serialize)]
struct FreeSlot {
    cidr: String,
    range: AddressRange,
    span: BarSpan,
}

/// Everything the run prints
#[derive(Debug, Serialize)]
struct Report {
    base: String,
    range: AddressRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog: Option<Vec<CandidateSize>>,
    subnets: Vec<SummaryRow>,
    allocated: u64,
    allocated_percent: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    free: Option<Vec<FreeSlot>>,
}

impl Report {
    fn new(store: &AllocationStore, args: &arg::CidrPlan) -> Self {
        let base = store.base();
        let catalog = args
            .catalog
            .then(|| generate_catalog(base.prefix_len()));
        let free = args.free.map(|prefix_len| {
            enumerate(prefix_len, Role::Public, base, store.subnets(), None)
                .into_iter()
                .map(|slot| FreeSlot {
                    cidr: slot.candidate.cidr().to_string(),
                    range: slot.range,
                    span: BarSpan::of(&slot.range, &base.range(), args.bar_width),
                })
                .collect()
        });
        Self {
            base: base.to_string(),
            range: base.range(),
            catalog,
            subnets: store.summary(),
            allocated: store.allocated_size(),
            allocated_percent: store.allocated_percent(),
            free,
        }
    }

    fn print_text(&self) {
        println!(
            "Base {} ({}, {} addresses)",
            self.base, self.range, self.range.size
        );
        if let Some(catalog) = &self.catalog {
            println!();
            println!("{:<8} {:>10} {:>10}", "Prefix", "Addresses", "Hosts");
            for candidate in catalog {
                println!(
                    "{:<8} {:>10} {:>10}",
                    format!("/{}", candidate.prefix_len),
                    candidate.size,
                    candidate.host_count
                );
            }
        }
        println!();
        if self.subnets.is_empty() {
            println!("No subnets allocated");
        } else {
            println!(
                "{:>3}  {:<18} {:<15} {:<15} {:>8}  Role",
                "#", "CIDR", "First", "Last", "Hosts"
            );
            let mut rows: Vec<&SummaryRow> = self.subnets.iter().collect();
            rows.sort_unstable_by_key(|row| row.rank);
            for row in rows {
                println!(
                    "{:>3}  {:<18} {:<15} {:<15} {:>8}  {}",
                    row.rank, row.cidr, row.first, row.last, row.host_count, row.role
                );
            }
        }
        println!(
            "{} of {} addresses allocated ({}% used)",
            self.allocated, self.range.size, self.allocated_percent
        );
        if let Some(free) = &self.free {
            println!();
            println!("{} free positions", free.len());
            for slot in free {
                println!(
                    "  {:<18} {:<31}  [{:.1}px +{:.1}px]",
                    slot.cidr,
                    slot.range.to_string(),
                    slot.span.left,
                    slot.span.width
                );
            }
        }
    }
}

fn main() {
    let args = arg::CidrPlan::parse();
    setup_logger(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
    log::debug!("Base block {}", args.base);
    let mut store = AllocationStore::new(args.base);
    for placement in &args.placements {
        let cidr = placement.cidr;
        match store.place(cidr.address(), cidr.prefix_len, placement.role) {
            Ok(index) => log::debug!("Placed {cidr} ({}) at index {index}", placement.role),
            Err(e) => {
                log::error!("Cannot place {cidr}: {e}");
                std::process::exit(1);
            }
        }
    }
    let report = Report::new(&store, &args);
    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                log::error!("Failed to serialize report: {e}");
                std::process::exit(1);
            }
        }
    } else {
        report.print_text();
    }
}
