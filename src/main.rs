use std::process;
use std::time::Duration;

use clap::{App, Arg};
use log::debug;
use prettytable::{Cell, Row, Table};
use serde_derive::Serialize;

use fess_solver::fs;
use fess_solver::level::Level;
use fess_solver::parser::{self, CollectionEntry};
use fess_solver::solution_formatter::SolutionFormatter;
use fess_solver::solver::{FessEngine, SearchBudget};

fn main() {
    env_logger::init();

    let matches = App::new("fess-solver")
        .about("Sokoban solver based on feature space search")
        .arg(
            Arg::with_name("max-states")
                .long("--max-states")
                .takes_value(true)
                .help("Max states generated per level"),
        )
        .arg(
            Arg::with_name("time-limit")
                .long("--time-limit")
                .takes_value(true)
                .help("Time limit per level in seconds"),
        )
        .arg(
            Arg::with_name("json")
                .long("--json")
                .takes_value(true)
                .help("Write a benchmark report to this path"),
        )
        .arg(
            Arg::with_name("steps")
                .long("--steps")
                .help("Print the board after every push"),
        )
        .arg(Arg::with_name("file").required(true))
        .get_matches();

    let path = matches.value_of("file").unwrap();
    let mut budget = SearchBudget::default();
    if let Some(max_states) = matches.value_of("max-states") {
        budget.max_states = max_states.parse().unwrap_or_else(|_| {
            println!("Invalid --max-states: {}", max_states);
            process::exit(1);
        });
    }
    if let Some(time_limit) = matches.value_of("time-limit") {
        let secs: f64 = time_limit.parse().unwrap_or_else(|_| {
            println!("Invalid --time-limit: {}", time_limit);
            process::exit(1);
        });
        budget.time_limit = Duration::from_secs_f64(secs);
    }

    let text = fs::read_file(path).unwrap_or_else(|err| {
        println!("Can't read file {}: {}", path, err);
        process::exit(1);
    });

    let entries = parser::parse_collection(&text);
    let success = if entries.is_empty() {
        solve_single(path, &text, budget, matches.is_present("steps"))
    } else {
        run_collection(&entries, budget, matches.value_of("json"))
    };

    if !success {
        process::exit(1);
    }
}

fn solve_single(path: &str, text: &str, budget: SearchBudget, steps: bool) -> bool {
    println!("Solving {}...", path);

    let level: Level = match text.parse() {
        Ok(level) => level,
        Err(err) => {
            println!("Failed to parse: {}", err);
            return false;
        }
    };

    let mut engine = match FessEngine::new(&level, budget) {
        Ok(engine) => engine,
        Err(err) => {
            println!("Failed to process level: {}", err);
            return false;
        }
    };

    match engine.search(None) {
        Ok(solution) => {
            if steps {
                println!(
                    "{}",
                    SolutionFormatter::new(&level.map, level.initial_state(), &solution.moves, false)
                );
            }
            println!("Found solution:");
            println!("{}", solution.moves);
            println!("Moves: {}", solution.moves.move_cnt());
            println!("Pushes: {}", solution.moves.push_cnt());
            print!("{}", solution.stats);
            true
        }
        Err(failure) => {
            println!("Search failed: {}", failure.reason);
            print!("{}", failure.stats);
            false
        }
    }
}

#[derive(Serialize)]
struct LevelReport {
    level_number: u32,
    title: String,
    solved: bool,
    solve_time: f64,
    moves_count: usize,
    states_explored: u64,
    states_generated: u64,
    error_message: Option<String>,
}

#[derive(Serialize)]
struct BenchmarkReport {
    total_levels: usize,
    levels_solved: usize,
    total_time: f64,
    levels: Vec<LevelReport>,
}

fn run_collection(entries: &[CollectionEntry], budget: SearchBudget, json: Option<&str>) -> bool {
    let mut reports = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        println!(
            "[{:2}/{:2}] Level {}: {}",
            i + 1,
            entries.len(),
            entry.number,
            entry.title
        );
        let report = solve_entry(entry, budget);
        match report.error_message {
            None => println!(
                "Solved in {:.2}s ({} moves, {} states)",
                report.solve_time, report.moves_count, report.states_generated
            ),
            Some(ref message) => println!("Failed: {}", message),
        }
        reports.push(report);
    }

    let solved = reports.iter().filter(|r| r.solved).count();
    let total_time: f64 = reports.iter().map(|r| r.solve_time).sum();

    println!();
    print_report_table(&reports);
    println!(
        "Solved {}/{} levels in {:.2}s",
        solved,
        reports.len(),
        total_time
    );

    if let Some(json_path) = json {
        let report = BenchmarkReport {
            total_levels: reports.len(),
            levels_solved: solved,
            total_time,
            levels: reports,
        };
        let text = serde_json::to_string_pretty(&report).expect("report is serializable");
        if let Err(err) = fs::write_file(json_path, &text) {
            println!("Can't write report to {}: {}", json_path, err);
            return false;
        }
        debug!("wrote JSON report to {}", json_path);
        return solved == report.total_levels;
    }

    solved == reports.len()
}

fn solve_entry(entry: &CollectionEntry, budget: SearchBudget) -> LevelReport {
    let mut report = LevelReport {
        level_number: entry.number,
        title: entry.title.clone(),
        solved: false,
        solve_time: 0.0,
        moves_count: 0,
        states_explored: 0,
        states_generated: 0,
        error_message: None,
    };

    let level = match entry.level() {
        Ok(level) => level,
        Err(err) => {
            report.error_message = Some(err.to_string());
            return report;
        }
    };

    let mut engine = match FessEngine::new(&level, budget) {
        Ok(engine) => engine,
        Err(err) => {
            report.error_message = Some(err.to_string());
            return report;
        }
    };

    match engine.search(None) {
        Ok(solution) => {
            report.solved = true;
            report.solve_time = solution.stats.solve_time.as_secs_f64();
            report.moves_count = solution.moves.move_cnt();
            report.states_explored = solution.stats.states_explored;
            report.states_generated = solution.stats.states_generated;
        }
        Err(failure) => {
            report.solve_time = failure.stats.solve_time.as_secs_f64();
            report.states_explored = failure.stats.states_explored;
            report.states_generated = failure.stats.states_generated;
            report.error_message = Some(failure.reason.to_string());
        }
    }

    report
}

fn print_report_table(reports: &[LevelReport]) {
    let mut table = Table::new();
    table.set_titles(Row::new(vec![
        Cell::new("Level"),
        Cell::new("Title"),
        Cell::new("Solved"),
        Cell::new("Time [s]"),
        Cell::new("Moves"),
        Cell::new("Explored"),
        Cell::new("Generated"),
        Cell::new("Error"),
    ]));
    for report in reports {
        table.add_row(Row::new(vec![
            Cell::new(&report.level_number.to_string()),
            Cell::new(&report.title),
            Cell::new(if report.solved { "yes" } else { "no" }),
            Cell::new(&format!("{:.2}", report.solve_time)),
            Cell::new(&report.moves_count.to_string()),
            Cell::new(&report.states_explored.to_string()),
            Cell::new(&report.states_generated.to_string()),
            Cell::new(report.error_message.as_ref().map_or("", |m| m.as_str())),
        ]));
    }
    table.printstd();
}
