//! stats-runner: headless aggregation runner for fleetstats.
//!
//! Usage:
//!   stats-runner aggregate --db stats.db --tracker export.json --directory directory.json [--month 3 --year 2024]
//!   stats-runner import    --db stats.db --csv sheet.csv --directory directory.json --map "Roam=Roam,Strat Ops=Strategic" [--month 3 --year 2024]
//!   stats-runner show      --db stats.db --month 3 --year 2024 --source tracker
//!   stats-runner backfill  --db stats.db --account "Pilot X" --user 42

use anyhow::Result;
use chrono::Utc;
use fleetstats_core::{
    aggregator::{AggregationOutcome, Aggregator, Summary},
    directory::StaticDirectory,
    import_source::ColumnMapping,
    period::Period,
    source::EventSource,
    store::StatsStore,
    tracker_source::TrackerExport,
};
use std::env;
use std::str::FromStr;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    match command {
        "aggregate" => cmd_aggregate(&args),
        "import" => cmd_import(&args),
        "show" => cmd_show(&args),
        "backfill" => cmd_backfill(&args),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn cmd_aggregate(args: &[String]) -> Result<()> {
    let db = arg_str(args, "--db").unwrap_or("stats.db");
    let tracker_path = required(args, "--tracker")?;
    let directory_path = required(args, "--directory")?;
    let period = period_args(args)?;

    let store = open_store(db)?;
    let directory = StaticDirectory::load(directory_path)?;
    let export = TrackerExport::load(tracker_path)?;

    println!("fleetstats — aggregating tracker data for {period}");

    let aggregator = Aggregator::new(&store, &directory);
    let outcome = aggregator.aggregate_tracker(&export, period)?;
    print_outcome(&outcome);
    Ok(())
}

fn cmd_import(args: &[String]) -> Result<()> {
    let db = arg_str(args, "--db").unwrap_or("stats.db");
    let csv_path = required(args, "--csv")?;
    let directory_path = required(args, "--directory")?;
    let map_spec = required(args, "--map")?;
    let period = period_args(args)?;

    let store = open_store(db)?;
    let directory = StaticDirectory::load(directory_path)?;
    let csv_text = std::fs::read_to_string(csv_path)
        .map_err(|e| anyhow::anyhow!("Cannot read {csv_path}: {e}"))?;

    // The supplied mapping replaces the whitelist, the same way the
    // upload flow stores the operator's column choices before queueing
    // the run.
    let mapping = parse_map_spec(map_spec)?;
    store.clear_column_mappings()?;
    for (column, fleet_type) in &mapping {
        store.save_column_mapping(column, fleet_type)?;
    }
    if let Some(ignores) = arg_str(args, "--ignore") {
        for column in ignores.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            store.ignore_column(column)?;
        }
    }

    println!("fleetstats — importing spreadsheet data for {period}");

    let aggregator = Aggregator::new(&store, &directory);
    let outcome = aggregator.aggregate_import(&csv_text, &mapping, period)?;
    print_outcome(&outcome);

    let unknown = store.unknown_account_count()?;
    if unknown > 0 {
        println!("  note: {unknown} account label(s) await backfill (see `backfill`)");
    }
    Ok(())
}

fn cmd_show(args: &[String]) -> Result<()> {
    let db = arg_str(args, "--db").unwrap_or("stats.db");
    let source = EventSource::from_str(arg_str(args, "--source").unwrap_or("tracker"))
        .map_err(|e| anyhow::anyhow!(e))?;
    let period = period_args(args)?;

    let store = open_store(db)?;

    if !store.has_data_for_period(period)? {
        println!("no data for {period}");
        return Ok(());
    }

    println!("corporation totals for {period} ({source}):");
    for row in store.corp_totals(period, source)? {
        println!(
            "  corp {:<12} {:<24} {}",
            row.corporation_id, row.fleet_type, row.total
        );
    }

    let creators = store.creator_totals(period, source)?;
    if !creators.is_empty() {
        println!("fleet commander totals:");
        for row in creators {
            println!(
                "  user {:<12} {:<24} {}",
                row.creator_id, row.fleet_type, row.total_created
            );
        }
    }
    Ok(())
}

fn cmd_backfill(args: &[String]) -> Result<()> {
    let db = arg_str(args, "--db").unwrap_or("stats.db");
    let store = open_store(db)?;

    let account = match arg_str(args, "--account") {
        Some(a) => a,
        None => {
            // No account given: list what needs backfilling.
            for row in store.unknown_accounts()? {
                match row.user_id {
                    Some(user_id) => println!("  {:<32} -> user {user_id}", row.account_name),
                    None => println!("  {:<32} -> (unmapped)", row.account_name),
                }
            }
            return Ok(());
        }
    };
    let user_id: i64 = required(args, "--user")?.parse()?;

    store.backfill_unknown_account(account, user_id)?;
    println!("mapped '{account}' to user {user_id}; applies on the next reprocessing run");
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────

fn open_store(db: &str) -> Result<StatsStore> {
    log::debug!("opening database {db}");
    let store = StatsStore::open(db)?;
    store.migrate()?;
    Ok(store)
}

/// Period from --month/--year, defaulting to the previous calendar
/// month (live data is never aggregated).
fn period_args(args: &[String]) -> Result<Period> {
    let default = Period::last_month(Utc::now());
    let month = parse_arg(args, "--month", default.month);
    let year = parse_arg(args, "--year", default.year);
    Ok(Period::new(month, year)?)
}

/// "Column=Fleet Type,Other Column=Other Type" → mapping.
fn parse_map_spec(spec: &str) -> Result<ColumnMapping> {
    let mut mapping = ColumnMapping::new();
    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (column, fleet_type) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("bad --map entry '{pair}', expected Column=Type"))?;
        mapping.insert(column.trim().to_string(), fleet_type.trim().to_string());
    }
    if mapping.is_empty() {
        anyhow::bail!("--map produced no column mappings");
    }
    Ok(mapping)
}

fn print_outcome(outcome: &AggregationOutcome) {
    match outcome {
        AggregationOutcome::AlreadyProcessed => {
            println!("already processed — counters unchanged");
        }
        AggregationOutcome::Processed(summary) => print_summary(summary),
    }
}

fn print_summary(summary: &Summary) {
    println!("run {} complete:", summary.run_id);
    println!("  events accreted:        {}", summary.events_processed);
    println!("  events skipped:         {}", summary.events_skipped);
    println!("  unresolved identities:  {}", summary.unresolved_identities);
    println!("  unknown-type fallbacks: {}", summary.unknown_type_fallbacks);
    println!("  duplicate-key races:    {}", summary.duplicate_conflicts);
    if summary.fleets_created > 0 {
        println!("  fleets credited:        {}", summary.fleets_created);
    }
}

fn parse_arg<T: FromStr + Copy>(args: &[String], name: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == name)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn arg_str<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn required<'a>(args: &'a [String], name: &str) -> Result<&'a str> {
    arg_str(args, name).ok_or_else(|| anyhow::anyhow!("missing required argument {name}"))
}

fn print_usage() {
    println!("fleetstats — stats-runner");
    println!();
    println!("commands:");
    println!("  aggregate --db <file> --tracker <export.json> --directory <dir.json> [--month M --year Y]");
    println!("  import    --db <file> --csv <sheet.csv> --directory <dir.json> --map \"Col=Type,...\" [--ignore \"Col,...\"] [--month M --year Y]");
    println!("  show      --db <file> --month M --year Y [--source tracker|import]");
    println!("  backfill  --db <file> [--account <label> --user <id>]");
}
