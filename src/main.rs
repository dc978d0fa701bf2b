//! Entry point for the `ossim` scheduler/VM simulator.
//!
//! CLI parsing is hand-rolled exactly as `original_source/ossim.c`'s
//! `parse_args` does it — no `clap`, matching the small undecorated
//! flag handling used elsewhere in this crate's dependency stack.

use ossim::config::Config;
use ossim::Simulation;
use std::process::ExitCode;

fn print_usage(program: &str) {
    println!(
        "Usage: {program} [--pages N] [--frames N] [--threshold N] [--policy {{fifo,lru,random,nru,clock}}] [--socket PATH]"
    );
}

enum ParseOutcome {
    Run(Config),
    Help,
    Error(String),
}

fn parse_args(program: &str, args: &[String]) -> ParseOutcome {
    let mut config = Config::default();
    let mut i = 0;

    fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, String> {
        *i += 1;
        args.get(*i)
            .map(|s| s.as_str())
            .ok_or_else(|| format!("{flag} requires a value"))
    }

    while i < args.len() {
        match args[i].as_str() {
            "--pages" => match next_value(args, &mut i, "--pages") {
                Ok(v) => match v.parse::<usize>() {
                    Ok(n) if n > 0 => config.pages = n,
                    _ => return ParseOutcome::Error(format!("invalid number for --pages: {v}")),
                },
                Err(e) => return ParseOutcome::Error(e),
            },
            "--frames" => match next_value(args, &mut i, "--frames") {
                Ok(v) => match v.parse::<usize>() {
                    Ok(n) if n > 0 => config.frames = n,
                    _ => return ParseOutcome::Error(format!("invalid number for --frames: {v}")),
                },
                Err(e) => return ParseOutcome::Error(e),
            },
            "--threshold" => match next_value(args, &mut i, "--threshold") {
                Ok(v) => match v.parse::<usize>() {
                    Ok(n) => config.threshold = n,
                    _ => return ParseOutcome::Error(format!("invalid number for --threshold: {v}")),
                },
                Err(e) => return ParseOutcome::Error(e),
            },
            "--policy" => match next_value(args, &mut i, "--policy") {
                Ok(v) => match v.parse() {
                    Ok(policy) => config.policy = policy,
                    Err(e) => return ParseOutcome::Error(e),
                },
                Err(e) => return ParseOutcome::Error(e),
            },
            "--socket" => match next_value(args, &mut i, "--socket") {
                Ok(v) => config.socket_path = v.to_string(),
                Err(e) => return ParseOutcome::Error(e),
            },
            "--help" => return ParseOutcome::Help,
            other => {
                return ParseOutcome::Error(format!("unknown option: {other}\nTry --help"));
            }
        }
        i += 1;
    }

    let _ = program;
    ParseOutcome::Run(config)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).with_level(true).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "ossim".to_string());

    let config = match parse_args(&program, &args[1..]) {
        ParseOutcome::Help => {
            print_usage(&program);
            return ExitCode::SUCCESS;
        }
        ParseOutcome::Error(msg) => {
            eprintln!("Error: {msg}");
            return ExitCode::from(2);
        }
        ParseOutcome::Run(config) => config,
    };

    tracing::info!(
        pages = config.pages,
        frames = config.frames,
        threshold = config.threshold,
        "OSSIM scheduler configured"
    );

    ossim::tick::install_signal_handlers();

    let mut simulation = match Simulation::new(config) {
        Ok(sim) => sim,
        Err(e) => {
            eprintln!("Error: failed to start scheduler: {e}");
            return ExitCode::from(2);
        }
    };

    tracing::info!(policy = simulation.policy_name(), "scheduler server listening");

    if let Err(e) = simulation.run() {
        eprintln!("Error: {e}");
        return ExitCode::from(2);
    }

    let stats = simulation.stats();
    tracing::info!(
        page_accesses = stats.total_page_accesses,
        page_faults = stats.total_page_faults,
        fault_rate = stats.page_fault_rate(),
        swaps_in = stats.total_swaps_in,
        swaps_out = stats.total_swaps_out,
        "shutdown complete"
    );

    ExitCode::SUCCESS
}
