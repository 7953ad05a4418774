//! glucolog - personal glucose, insulin and meal log
//!
//! Usage:
//!   glucolog                 - Show today's dashboard
//!   glucolog history 30      - Statistics, daily averages and insights for 30 days
//!   glucolog add glucose 112 - Log a reading
//!   glucolog --help          - Show help
//!   GLUCOLOG_DBG=1 glucolog  - Enable debug output

use std::env;

use chrono::{DateTime, Local, Utc};
use log::{info, warn};

use glucolog::config::{
    config_file_path, default_database_path, default_export_dir, ensure_data_dir, get_data_dir,
    Config,
};
use glucolog::error::GlucologError;
use glucolog::export::{export_file_name, read_export, write_export};
use glucolog::records::{GlucosePatch, InjectionPatch, MealPatch};
use glucolog::report::{format_date_time, Dashboard, HistoryReport, Snapshot};
use glucolog::settings::{SettingsUpdate, UserSettings};
use glucolog::stats::HISTORY_PERIODS;
use glucolog::storage::Storage;
use glucolog::{classify, GlucoseReading, InsulinInjection, InsulinType, Meal, MealType};

const DEFAULT_PERIOD_DAYS: u32 = 7;
const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordKind {
    Glucose,
    Insulin,
    Meal,
}

impl RecordKind {
    fn parse(s: &str) -> Result<Self, GlucologError> {
        match s {
            "glucose" => Ok(RecordKind::Glucose),
            "insulin" => Ok(RecordKind::Insulin),
            "meal" | "meals" => Ok(RecordKind::Meal),
            _ => Err(GlucologError::Usage(format!(
                "unknown record kind '{}', expected glucose, insulin or meal",
                s
            ))),
        }
    }
}

fn main() -> Result<(), GlucologError> {
    let args: Vec<String> = env::args().collect();

    // Check for debug mode
    let debug_mode = env::var("GLUCOLOG_DBG").is_ok();

    // Initialize logger
    if debug_mode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    // Commands that don't touch the database
    match args.get(1).map(|s| s.as_str()) {
        Some("--help") | Some("-h") | Some("help") => {
            print_help();
            return Ok(());
        }
        Some("--version") | Some("-V") => {
            println!("glucolog {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some("path") | Some("paths") => {
            cmd_show_paths();
            return Ok(());
        }
        _ => {}
    }

    // Ensure data directory exists
    if let Err(e) = ensure_data_dir() {
        eprintln!("Warning: Could not create data directory: {}", e);
    }

    // Create default config if it doesn't exist
    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = Config::create_default(&cfg_path) {
            warn!("Could not create default config: {}", e);
        }
    }

    let config = Config::load(&cfg_path).unwrap_or_else(|e| {
        warn!("Could not load config: {}. Using defaults.", e);
        Config::default()
    });

    // Use configured path or default OS-specific path
    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| default_database_path().to_string_lossy().to_string());
    info!("Using database {}", db_path);
    let storage = Storage::new(&db_path)?;

    let rest = args.get(2..).unwrap_or(&[]);
    match args.get(1).map(|s| s.as_str()) {
        None | Some("summary") | Some("dashboard") => cmd_dashboard(&storage),
        Some("history") => {
            cmd_history(&storage, rest, config.default_period.unwrap_or(DEFAULT_PERIOD_DAYS))
        }
        Some("add") => cmd_add(&storage, rest),
        Some("list") => cmd_list(&storage, rest),
        Some("note") => cmd_note(&storage, rest),
        Some("delete") => cmd_delete(&storage, rest),
        Some("settings") => cmd_settings(&storage, rest),
        Some("export") => cmd_export(&storage, rest),
        Some("import") => cmd_import(&storage, rest),
        Some("clear") => cmd_clear(&storage, rest),
        Some(other) => Err(GlucologError::Usage(format!(
            "unknown command '{}', see `glucolog help`",
            other
        ))),
    }
}

/// Show data paths
fn cmd_show_paths() {
    println!("glucolog data paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Database:        {}", default_database_path().display());
    println!("  Config file:     {}", config_file_path().display());
    println!("  Export default:  {}", default_export_dir().display());
}

fn local(ts: DateTime<Utc>) -> DateTime<Local> {
    ts.with_timezone(&Local)
}

fn cmd_dashboard(storage: &Storage) -> Result<(), GlucologError> {
    let snapshot = Snapshot::load(storage)?;
    let unit = snapshot.settings.glucose_unit;
    let dashboard = Dashboard::compute(&snapshot, &Local::now());

    if !snapshot.settings.name.is_empty() {
        println!("Hello, {}!", snapshot.settings.name);
    }

    match (&dashboard.latest, dashboard.latest_category) {
        (Some(reading), Some(category)) => println!(
            "Latest reading:  {} ({}) at {}",
            unit.format(reading.glucose),
            category.label,
            format_date_time(&local(reading.timestamp))
        ),
        _ => println!("Latest reading:  none yet"),
    }

    println!();
    println!("Today");
    println!(
        "  Average glucose:  {}",
        format_glucose(dashboard.today.avg_glucose, &snapshot.settings)
    );
    println!("  Time in range:    {}", format_percent(dashboard.today.time_in_range));
    println!("  Insulin:          {} units", dashboard.today.total_insulin);
    println!("  Carbs:            {} g", dashboard.today.total_carbs);
    println!();
    println!("Last 7 days");
    println!(
        "  Average glucose:  {}",
        format_glucose(dashboard.week.avg_glucose, &snapshot.settings)
    );
    println!("  Time in range:    {}", format_percent(dashboard.week.time_in_range));
    println!("  Target range:     {}", snapshot.settings.target_range.format(unit));
    Ok(())
}

fn cmd_history(
    storage: &Storage,
    args: &[String],
    default_period: u32,
) -> Result<(), GlucologError> {
    let json = args.iter().any(|a| a == "--json");
    let period_days = match args.iter().find(|a| !a.starts_with("--")) {
        Some(days) => days
            .parse::<u32>()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| GlucologError::Usage(format!("invalid number of days: {}", days)))?,
        None => default_period,
    };
    if !HISTORY_PERIODS.iter().any(|(days, _)| *days == period_days) {
        info!("Non-standard history period of {} days", period_days);
    }

    let snapshot = Snapshot::load(storage)?;
    let report = HistoryReport::compute(&snapshot, period_days, &Local::now());

    if json {
        let value = serde_json::json!({
            "periodDays": report.period_days,
            "stats": report.stats,
            "series": report.series,
            "insights": report.insight_messages(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let settings = &snapshot.settings;
    let unit = settings.glucose_unit;
    println!("History: last {} days", period_days);
    println!("  Average glucose:    {}", format_glucose(report.stats.avg_glucose, settings));
    println!(
        "  Time in range:      {} ({})",
        format_percent(report.stats.time_in_range),
        settings.target_range.format(unit)
    );
    println!("  Readings:           {}", report.stats.total_readings);
    println!("  Avg daily insulin:  {} units", report.stats.avg_daily_insulin);
    println!("  Avg daily carbs:    {} g", report.stats.avg_daily_carbs);

    if !report.series.is_empty() {
        println!();
        println!("Daily averages");
        for (label, value) in report.series.points() {
            println!("  {:>5}  {}", label, unit.format(value));
        }
    }

    if !report.insights.is_empty() {
        println!();
        println!("Insights");
        for insight in &report.insights {
            println!("  {}", insight);
        }
    }
    Ok(())
}

fn cmd_add(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    let kind = RecordKind::parse(arg(args, 0, "record kind")?)?;
    match kind {
        RecordKind::Glucose => {
            let glucose = parse_number(arg(args, 1, "glucose value")?)?;
            let reading = GlucoseReading::new(glucose, notes_from(args, 2))?;
            storage.add_glucose_reading(&reading)?;
            println!("Added glucose reading {} ({})", reading.id, classify(reading.glucose).label);
        }
        RecordKind::Insulin => {
            let units = parse_number(arg(args, 1, "units")?)?;
            let type_arg = arg(args, 2, "insulin type")?;
            let insulin_type = InsulinType::parse(type_arg).ok_or_else(|| {
                GlucologError::Usage(format!(
                    "unknown insulin type '{}', expected rapid or long",
                    type_arg
                ))
            })?;
            let injection = InsulinInjection::new(units, insulin_type, notes_from(args, 3))?;
            storage.add_insulin_injection(&injection)?;
            println!("Added insulin injection {}", injection.id);
        }
        RecordKind::Meal => {
            let name = arg(args, 1, "meal name")?;
            let carbs = parse_number(arg(args, 2, "carbs")?)?;
            let type_arg = arg(args, 3, "meal type")?;
            let meal_type = parse_meal_type(type_arg)?;
            let meal = Meal::new(name, carbs, meal_type, notes_from(args, 4))?;
            storage.add_meal(&meal)?;
            println!("Added meal {}", meal.id);
        }
    }
    Ok(())
}

fn cmd_list(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    let kind = RecordKind::parse(arg(args, 0, "record kind")?)?;
    let limit = match args.get(1) {
        Some(n) => n
            .parse::<usize>()
            .map_err(|_| GlucologError::Usage(format!("invalid limit: {}", n)))?,
        None => DEFAULT_LIST_LIMIT,
    };
    let unit = storage.user_settings()?.glucose_unit;

    match kind {
        RecordKind::Glucose => {
            for r in storage.glucose_readings()?.iter().take(limit) {
                println!(
                    "{}  {}  {:>12}  {:<9}  {}",
                    r.id,
                    format_date_time(&local(r.timestamp)),
                    unit.format(r.glucose),
                    classify(r.glucose).label,
                    r.notes.as_deref().unwrap_or("")
                );
            }
        }
        RecordKind::Insulin => {
            for i in storage.insulin_injections()?.iter().take(limit) {
                println!(
                    "{}  {}  {:>6} units  {:<12}  {}",
                    i.id,
                    format_date_time(&local(i.timestamp)),
                    i.units,
                    i.kind.label(),
                    i.notes.as_deref().unwrap_or("")
                );
            }
        }
        RecordKind::Meal => {
            for m in storage.meals()?.iter().take(limit) {
                println!(
                    "{}  {}  {:<9}  {:>5} g  {}  {}",
                    m.id,
                    format_date_time(&local(m.timestamp)),
                    m.kind.label(),
                    m.carbs,
                    m.name,
                    m.notes.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

fn cmd_note(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    let kind = RecordKind::parse(arg(args, 0, "record kind")?)?;
    let id = arg(args, 1, "record id")?;
    let notes = Some(args.get(2..).unwrap_or(&[]).join(" "));

    match kind {
        RecordKind::Glucose => {
            storage.update_glucose_reading(id, &GlucosePatch { notes, ..Default::default() })?;
        }
        RecordKind::Insulin => {
            storage.update_insulin_injection(id, &InjectionPatch { notes, ..Default::default() })?;
        }
        RecordKind::Meal => {
            storage.update_meal(id, &MealPatch { notes, ..Default::default() })?;
        }
    }
    println!("Updated notes for {}", id);
    Ok(())
}

fn cmd_delete(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    let kind = RecordKind::parse(arg(args, 0, "record kind")?)?;
    let id = arg(args, 1, "record id")?;

    let (deleted, kind_name) = match kind {
        RecordKind::Glucose => (storage.delete_glucose_reading(id)?, "glucose"),
        RecordKind::Insulin => (storage.delete_insulin_injection(id)?, "insulin"),
        RecordKind::Meal => (storage.delete_meal(id)?, "meal"),
    };
    if !deleted {
        return Err(GlucologError::NotFound { kind: kind_name, id: id.to_string() });
    }
    println!("Deleted {} record {}", kind_name, id);
    Ok(())
}

fn cmd_settings(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    let settings = match args.first().map(|s| s.as_str()) {
        None => storage.user_settings()?,
        Some("set") => {
            let key = arg(args, 1, "setting name")?;
            let value = args.get(2..).unwrap_or(&[]).join(" ");
            let update = SettingsUpdate::from_key_value(key, &value)?;
            storage.update_user_settings(&update)?
        }
        Some(other) => {
            return Err(GlucologError::Usage(format!("unknown settings command: {}", other)))
        }
    };
    print_settings(&settings);
    Ok(())
}

fn cmd_export(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    let data = storage.export_all()?;
    if data.is_empty() {
        return Err(GlucologError::InvalidInput("no data available to export".to_string()));
    }

    match args.first().map(|s| s.as_str()) {
        None | Some("-") => println!("{}", serde_json::to_string_pretty(&data)?),
        Some("--default") => {
            let target = default_export_dir().join(export_file_name(data.export_date));
            let path = write_export(target, &data)?;
            eprintln!("Exported {} records to {}", data.record_count(), path.display());
        }
        Some(path) => {
            let path = write_export(path, &data)?;
            eprintln!("Exported {} records to {}", data.record_count(), path.display());
        }
    }
    Ok(())
}

fn cmd_import(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    let path = arg(args, 0, "export file")?;
    let data = read_export(path)?;
    let summary = storage.import(&data)?;

    eprintln!("Imported from {}", path);
    eprintln!("  Glucose readings:   {}", summary.glucose_readings);
    eprintln!("  Insulin injections: {}", summary.insulin_injections);
    eprintln!("  Meals:              {}", summary.meals);
    eprintln!("  Duplicates:         {} (skipped)", data.record_count() - summary.total());
    Ok(())
}

fn cmd_clear(storage: &Storage, args: &[String]) -> Result<(), GlucologError> {
    if !args.iter().any(|a| a == "--yes") {
        return Err(GlucologError::Usage(
            "this deletes every record and setting; rerun with --yes to confirm".to_string(),
        ));
    }
    storage.clear_all()?;
    println!("All data cleared");
    Ok(())
}

fn arg<'a>(args: &'a [String], idx: usize, what: &str) -> Result<&'a str, GlucologError> {
    args.get(idx)
        .map(|s| s.as_str())
        .ok_or_else(|| GlucologError::Usage(format!("missing {}", what)))
}

fn notes_from(args: &[String], idx: usize) -> Option<String> {
    args.get(idx..).filter(|rest| !rest.is_empty()).map(|rest| rest.join(" "))
}

fn parse_number(s: &str) -> Result<f64, GlucologError> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GlucologError::Usage(format!("not a number: {}", s)))
}

fn parse_meal_type(s: &str) -> Result<MealType, GlucologError> {
    MealType::parse(s).ok_or_else(|| {
        GlucologError::Usage(format!(
            "unknown meal type '{}', expected breakfast, lunch, dinner or snack",
            s
        ))
    })
}

fn format_glucose(avg: u32, settings: &UserSettings) -> String {
    if avg == 0 {
        "--".to_string()
    } else {
        settings.glucose_unit.format(f64::from(avg))
    }
}

fn format_percent(pct: u32) -> String {
    if pct == 0 { "--".to_string() } else { format!("{}%", pct) }
}

fn print_settings(settings: &UserSettings) {
    let unit = settings.glucose_unit;
    println!("Settings");
    let name = if settings.name.is_empty() {
        "(not set)"
    } else {
        settings.name.as_str()
    };
    println!("  Name:          {}", name);
    println!("  Glucose unit:  {}", unit.label());
    println!("  Target range:  {}", settings.target_range.format(unit));
    println!("  Reminders:     {}", if settings.reminder_enabled { "on" } else { "off" });
}

fn print_help() {
    eprintln!("glucolog v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  glucolog                                   Today's dashboard");
    eprintln!("  glucolog history [days] [--json]           Period statistics and insights");
    eprintln!("  glucolog add glucose <mg/dL> [notes]");
    eprintln!("  glucolog add insulin <units> <rapid|long> [notes]");
    eprintln!("  glucolog add meal <name> <carbs> <breakfast|lunch|dinner|snack> [notes]");
    eprintln!("  glucolog list <glucose|insulin|meals> [limit]");
    eprintln!("  glucolog note <glucose|insulin|meal> <id> <text>");
    eprintln!("  glucolog delete <glucose|insulin|meal> <id>");
    eprintln!("  glucolog settings [set <name|unit|target-min|target-max|reminders> <value>]");
    eprintln!("  glucolog export [file|--default]           Export all data as JSON");
    eprintln!("  glucolog import <file>                     Import a JSON export");
    eprintln!("  glucolog clear --yes                       Delete all data");
    eprintln!("  glucolog path                              Show data file locations");
    eprintln!();
    eprintln!("HISTORY PERIODS:");
    for (_, label) in HISTORY_PERIODS {
        eprintln!("  {}", label);
    }
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  GLUCOLOG_DBG=1                             Enable debug output");
    eprintln!();
    eprintln!("DATA LOCATIONS:");
    eprintln!("  Database:  {}", default_database_path().display());
    eprintln!("  Config:    {}", config_file_path().display());
}
