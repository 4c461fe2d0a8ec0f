use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use teacher_timetable::grid::{TimetableGrid, day_number};
use teacher_timetable::sources::{discover_schedule_ids, normalize_refs, read_urls_file, scan_dump_dir};
use teacher_timetable::{
    Config, HttpFetcher, LessonEntry, Resolution, Result, SourceFormat, TeacherIndex, aggregate,
    build_grid, resolve, search, store,
};

const DEFAULT_INDEX: &str = "teachers_index.json";
const DEFAULT_GROUPS: &str = "groups_raw.json";
const RU_DAYS_SHORT: [&str; 7] = ["Пн", "Вт", "Ср", "Чт", "Пт", "Сб", "Вс"];

#[derive(Parser)]
#[command(
    name = "teacher_timetable",
    about = "Per-teacher timetables from per-group university schedules"
)]
struct Cli {
    /// More log output (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch group schedules and build the teacher index
    Build(BuildArgs),
    /// Find teachers in a saved index
    Search {
        /// Teacher name or part of it, any case
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: PathBuf,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show one teacher's timetable
    Show {
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long, default_value = DEFAULT_INDEX)]
        index: PathBuf,
        /// Print the grid as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct BuildArgs {
    /// Schedule UUIDs, schedule URLs or local dump files
    sources: Vec<String>,
    /// Schedule list page to collect /schedule/<uuid> links from
    #[arg(long)]
    seed: Option<String>,
    /// File with one source per line
    #[arg(long)]
    urls_file: Option<PathBuf>,
    /// Directory of saved .ics/.json dumps
    #[arg(long)]
    dir: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_INDEX)]
    out: PathBuf,
    #[arg(long, default_value = DEFAULT_GROUPS)]
    groups_out: PathBuf,
    /// Use at most this many sources
    #[arg(long)]
    max: Option<usize>,
    #[arg(long)]
    concurrency: Option<usize>,
    /// Session cookie, e.g. "session=…"
    #[arg(long, conflicts_with = "cookie_file")]
    cookie: Option<String>,
    #[arg(long)]
    cookie_file: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<SourceFormat>,
    /// Per-request timeout, seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = match cli.command {
        Command::Build(args) => run_build(args),
        Command::Search {
            query,
            index,
            limit,
        } => run_search(&query.join(" "), &index, limit),
        Command::Show { query, index, json } => run_show(&query.join(" "), &index, json),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

// ═══════════════════════════════════════════════════════════════════════
//  BUILD MODE: fetch → parse → index → save
// ═══════════════════════════════════════════════════════════════════════

fn load_config(args: &BuildArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(n) = args.concurrency {
        config.concurrency = n;
    }
    if let Some(format) = args.format {
        config.fetch.format = format;
    }
    if let Some(secs) = args.timeout {
        config.fetch.timeout_secs = secs;
    }
    if let Some(cookie) = &args.cookie {
        config.fetch.cookie = Some(cookie.trim().to_string());
    } else if let Some(path) = &args.cookie_file {
        config.fetch.cookie = Some(fs::read_to_string(path)?.trim().to_string());
    }
    Ok(config)
}

fn run_build(args: BuildArgs) -> Result<()> {
    let config = load_config(&args)?;
    let fetcher = HttpFetcher::new(config.fetch.clone());

    // Phase 1: collect source references
    let mut refs: Vec<String> = Vec::new();
    if let Some(seed) = &args.seed {
        match fetcher.get(seed, seed) {
            Ok(html) => {
                let ids = discover_schedule_ids(&html);
                eprintln!("Seed page links {} schedule(s)", ids.len());
                refs.extend(ids);
            }
            Err(e) => eprintln!("Seed page skipped: {e}"),
        }
    }
    if let Some(path) = &args.urls_file {
        refs.extend(read_urls_file(path)?);
    }
    refs.extend(args.sources.iter().cloned());
    if let Some(dir) = &args.dir {
        let dumps = scan_dump_dir(dir);
        eprintln!("Found {} dump file(s) in {}", dumps.len(), dir.display());
        refs.extend(dumps.iter().map(|p| p.display().to_string()));
    }
    let refs = normalize_refs(&refs, args.max);
    eprintln!("Fetching {} source(s)", refs.len());

    // Phase 2: fetch, parse and fold
    let run = aggregate(&fetcher, &refs, &config)?;

    // ── Print statistics ───────────────────────────────────────────
    let report = &run.report;
    eprintln!("\n══════════════════════════════════════════");
    eprintln!("  RUN STATISTICS");
    eprintln!("══════════════════════════════════════════");
    eprintln!("  Sources:  {} resolved / {} attempted", report.resolved(), report.attempted.len());
    eprintln!("  Groups:   {}", run.groups.len());
    eprintln!(
        "  Events:   {} seen, {} malformed, {} without teacher",
        report.parse.events_seen, report.parse.dropped_malformed, report.parse.dropped_no_teacher
    );
    eprintln!(
        "  Lessons:  {} parsed, {} indexed",
        report.parse.lessons,
        run.index.lesson_count()
    );
    eprintln!("  Teachers: {}", run.index.len());
    if !report.skipped.is_empty() {
        eprintln!("\nSkipped {} source(s):", report.skipped.len());
        for skipped in &report.skipped {
            eprintln!("  {}: {}", skipped.source, skipped.reason);
        }
        let rejected = report.auth_rejected();
        if !rejected.is_empty() {
            eprintln!("  ({} need a session cookie: --cookie or --cookie-file)", rejected.len());
        }
    }

    // Phase 3: save
    eprintln!("\nWriting output:");
    for (path, bytes) in [
        (&args.out, store::save_index(&args.out, &run.index)?),
        (&args.groups_out, store::save(&args.groups_out, &run.groups)?),
    ] {
        eprintln!("  {} ({bytes} bytes)", path.display());
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  SEARCH MODE
// ═══════════════════════════════════════════════════════════════════════

fn run_search(query: &str, index_path: &Path, limit: usize) -> Result<()> {
    let index = store::load_index(index_path)?;
    let found = search(&index, query, limit);
    if found.is_empty() {
        eprintln!("No teachers match: {query}");
        return Ok(());
    }

    eprintln!("Found {} teacher(s) for: {query}", found.len());
    for key in &found {
        let lessons = index.get(key).map_or(0, <[LessonEntry]>::len);
        println!("{key}\t{lessons} lesson(s)");
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
//  SHOW MODE: one teacher's lessons and timetable grid
// ═══════════════════════════════════════════════════════════════════════

fn run_show(query: &str, index_path: &Path, json: bool) -> Result<()> {
    let index = store::load_index(index_path)?;
    let teacher = match resolve(&index, query, 20) {
        Resolution::Unique(key) => key,
        Resolution::NoMatch => {
            eprintln!("No teachers match: {query}");
            return Ok(());
        }
        Resolution::Ambiguous(keys) => {
            eprintln!("{} teachers match {query}; be more specific:", keys.len());
            for key in keys {
                println!("{key}");
            }
            return Ok(());
        }
    };

    let lessons = sorted_lessons(&index, &teacher);
    let grid = build_grid(&lessons);
    if json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
        return Ok(());
    }

    println!("{teacher}: {} lesson(s)\n", lessons.len());
    for lesson in &lessons {
        println!("  {}", lesson_line(lesson, true));
    }
    println!();
    print_grid(&grid);
    Ok(())
}

/// Lessons in (day, time, group, subject) order; unknown days last.
fn sorted_lessons(index: &TeacherIndex, teacher: &str) -> Vec<LessonEntry> {
    let mut lessons = index.get(teacher).map(<[LessonEntry]>::to_vec).unwrap_or_default();
    lessons.sort_by(|a, b| {
        let day = |l: &LessonEntry| (day_number(&l.day).unwrap_or(u8::MAX), l.day.clone());
        day(a)
            .cmp(&day(b))
            .then_with(|| a.time.cmp(&b.time))
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| a.subject.cmp(&b.subject))
    });
    lessons
}

fn lesson_line(lesson: &LessonEntry, with_when: bool) -> String {
    let mut line = if with_when {
        format!("{} {} • {}", lesson.day, lesson.time, lesson.subject)
    } else {
        lesson.subject.clone()
    };
    line.push_str(&format!(" • {}", lesson.group));
    if let Some(room) = &lesson.room {
        line.push_str(&format!(" • ауд. {room}"));
    }
    if !lesson.week.is_all() {
        line.push_str(&format!(" ({})", lesson.week.label()));
    }
    line
}

fn print_grid(grid: &TimetableGrid) {
    for row in &grid.rows {
        println!("{}", row.slot.label());
        for cell in row.cells.iter().filter(|c| c.has_content) {
            let day = RU_DAYS_SHORT[usize::from(cell.day - 1)];
            for (week, lessons) in cell.weeks.labelled() {
                for lesson in lessons {
                    println!("  {day} [{}] {}", week.label(), lesson_line(lesson, false));
                }
            }
        }
    }
    if !grid.unplaced.is_empty() {
        println!("Без дня недели:");
        for lesson in &grid.unplaced {
            println!("  {}", lesson_line(lesson, true));
        }
    }
}
