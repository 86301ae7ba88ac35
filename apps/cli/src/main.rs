#![deny(warnings)]

//! Terminal host for Deadline Shell.
//!
//! Reads commands from stdin on a background thread and drives the run's
//! logical clock from wall time. Lines starting with `:` are host controls:
//! `:pause`, `:resume`, `:hud`, `:restart` (after a run ends) and `:quit`.

use anyhow::{bail, Context, Result};
use deadline_core::{
    validate_tuning, Feedback, HudSnapshot, OutputSink, Severity, TerminalEvent, Tuning,
};
use deadline_meta::MetaProgression;
use deadline_runtime::{Run, RunConfig};
use persistence::{default_save_path, JsonFileStore, MetaStore, NullStore};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// How often the clock is advanced while waiting for input.
const POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Default, PartialEq)]
struct Args {
    seed: Option<u64>,
    save: Option<PathBuf>,
    tuning: Option<PathBuf>,
    no_save: bool,
}

const USAGE: &str = "usage: deadline-shell [--seed N] [--save PATH] [--tuning FILE] [--no-save]";

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => {
                let raw = it.next().context("--seed needs a value")?;
                parsed.seed = Some(raw.parse().with_context(|| format!("bad seed: {raw}"))?);
            }
            "--save" => {
                parsed.save = Some(PathBuf::from(it.next().context("--save needs a path")?));
            }
            "--tuning" => {
                parsed.tuning = Some(PathBuf::from(it.next().context("--tuning needs a path")?));
            }
            "--no-save" => parsed.no_save = true,
            other => bail!("unknown argument: {other} ({USAGE})"),
        }
    }
    Ok(parsed)
}

fn load_tuning(path: Option<&PathBuf>) -> Result<Tuning> {
    let tuning = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading tuning file {}", path.display()))?;
            serde_yaml::from_str(&text)
                .with_context(|| format!("parsing tuning file {}", path.display()))?
        }
        None => Tuning::default(),
    };
    validate_tuning(&tuning).context("invalid tuning")?;
    Ok(tuning)
}

/// Prints feedback lines to stdout and keeps the latest HUD for `:hud`.
#[derive(Default)]
struct TerminalSink {
    hud: Option<HudSnapshot>,
}

impl TerminalSink {
    fn print_hud(&self) {
        let Some(h) = &self.hud else {
            return;
        };
        let paused = if h.paused { " [PAUSED]" } else { "" };
        println!(
            "-- {} | {} | HP {} O2 {} PWR {} NOISE {} | dist {} | {}s{paused}",
            h.location.label(),
            h.permission,
            h.hp,
            h.o2,
            h.power,
            h.noise,
            h.threat_distance,
            h.elapsed_seconds
        );
        for event in &h.events {
            println!("-- [!] {} ({} left)", event.label, event.remaining_ticks);
        }
    }
}

impl OutputSink for TerminalSink {
    fn emit(&mut self, feedback: Feedback) {
        let tag = match feedback.severity {
            Severity::Info => "   ",
            Severity::Success => "[+]",
            Severity::Warning => "[!]",
            Severity::Error => "[x]",
        };
        println!("{tag} {}", feedback.text);
    }

    fn snapshot(&mut self, hud: &HudSnapshot) {
        self.hud = Some(hud.clone());
    }

    fn terminal(&mut self, _event: &TerminalEvent) {
        println!("    Type :restart for a new run. shop, buy, stats and achievements still work.");
    }

    fn error_cue(&mut self) {
        print!("\x07");
    }
}

fn spawn_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let tuning = load_tuning(args.tuning.as_ref())?;
    let store: Box<dyn MetaStore> = if args.no_save {
        Box::new(NullStore)
    } else {
        Box::new(JsonFileStore::new(
            args.save.clone().unwrap_or_else(default_save_path),
        ))
    };
    let mut seed = match args.seed {
        Some(seed) => seed,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
    };
    info!(
        seed,
        save = ?args.save,
        no_save = args.no_save,
        sha = env!("GIT_SHA"),
        built = env!("BUILD_DATE"),
        "starting deadline shell"
    );
    println!("deadline-shell {} ({})", env!("CARGO_PKG_VERSION"), env!("GIT_SHA"));

    let mut out = TerminalSink::default();
    let input = spawn_reader();
    let mut meta = MetaProgression::load(store);

    'runs: loop {
        let config = RunConfig {
            seed,
            training: !meta.tutorial_completed(),
            tuning: tuning.clone(),
        };
        let mut run = Run::start(config, meta, &mut out)?;
        prompt();
        let mut last = Instant::now();

        loop {
            let line = match input.recv_timeout(POLL) {
                Ok(line) => Some(line),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break 'runs,
            };
            let now = Instant::now();
            run.advance(now - last, &mut out);
            last = now;

            let Some(line) = line else { continue };
            match line.trim() {
                ":quit" | ":q" => break 'runs,
                ":pause" => {
                    if !run.pause(&mut out) {
                        out.warning("already paused");
                    }
                }
                ":resume" => {
                    if !run.resume(&mut out) {
                        out.warning("not paused");
                    }
                }
                ":hud" => out.print_hud(),
                ":restart" if run.is_over() => {
                    seed = seed.wrapping_add(1);
                    meta = run.into_meta();
                    continue 'runs;
                }
                ":restart" => out.warning("the run is still going"),
                "" => {}
                text => {
                    let _ = run.submit(text, &mut out);
                    if !run.is_over() {
                        out.print_hud();
                    }
                }
            }
            prompt();
        }
    }

    println!("Signal closed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_all_flags() {
        let parsed = parse_args(args(&[
            "--seed", "42", "--save", "m.json", "--tuning", "t.yaml", "--no-save",
        ]))
        .unwrap();
        assert_eq!(
            parsed,
            Args {
                seed: Some(42),
                save: Some(PathBuf::from("m.json")),
                tuning: Some(PathBuf::from("t.yaml")),
                no_save: true,
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(args(&["--fast"])).is_err());
        assert!(parse_args(args(&["--tuning"])).is_err());
        assert!(parse_args(args(&["--seed", "soon"])).is_err());
    }
}
