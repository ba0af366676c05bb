use owo_colors::OwoColorize;
use xesload_core::model::{ImportSummary, StoreStats};

pub fn print_import_human(v: &ImportSummary, db_path: &str) {
    println!("{}", "IMPORTED".green().bold());
    println!(
        "log={} id={}",
        v.log_name.as_deref().unwrap_or("-").cyan(),
        v.log_id.map(|id| id.to_string()).unwrap_or_else(|| "-".into())
    );
    println!("traces={} events={}", v.traces, v.events);
    println!(
        "attributes={} extensions={} classifiers={} globals={}",
        v.attribute_definitions, v.extensions, v.classifiers, v.global_declarations
    );
    println!("batches={} elapsed={}ms", v.batches_flushed, v.elapsed_ms);
    println!("db_path={db_path}");
}

pub fn print_status_human(v: &StoreStats) {
    println!("{}", "STATUS".green().bold());
    println!("db_path={}", v.db_path);
    println!(
        "logs={} traces={} events={}",
        v.logs_count, v.traces_count, v.events_count
    );
    println!(
        "attributes={} extensions={} classifiers={}",
        v.attributes_count, v.extensions_count, v.classifiers_count
    );
    match &v.events_per_trace {
        Some(ept) => println!(
            "events_per_trace avg={:.2} min={} max={}",
            ept.avg, ept.min, ept.max
        ),
        None => println!("events_per_trace -"),
    }
    if !v.top_event_attributes.is_empty() {
        println!("{}", "top event attributes".bright_black());
        for usage in &v.top_event_attributes {
            println!("  {} {}", usage.key.cyan(), usage.count);
        }
    }
}

pub fn print_reset_human(db_path: &str) {
    println!("{} {db_path}", "RESET".yellow().bold());
}
