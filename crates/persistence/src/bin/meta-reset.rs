#![deny(warnings)]

//! Wipes the meta-progression save.
//!
//! Usage: `meta-reset [--save PATH] [--keep-tutorial]`

use anyhow::{bail, Context, Result};
use persistence::{default_save_path, JsonFileStore, MetaStore};
use std::path::PathBuf;

#[derive(Debug, Default, PartialEq)]
struct Args {
    save: Option<PathBuf>,
    keep_tutorial: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--save" => {
                parsed.save = Some(PathBuf::from(it.next().context("--save needs a path")?));
            }
            "--keep-tutorial" => parsed.keep_tutorial = true,
            other => bail!(
                "unknown argument: {other} (usage: meta-reset [--save PATH] [--keep-tutorial])"
            ),
        }
    }
    Ok(parsed)
}

fn main() -> Result<()> {
    let Args {
        save,
        keep_tutorial,
    } = parse_args(std::env::args().skip(1))?;
    let mut store = JsonFileStore::new(save.unwrap_or_else(default_save_path));

    if keep_tutorial {
        let tutorial_completed = store
            .load()
            .ok()
            .flatten()
            .map(|r| r.tutorial_completed)
            .unwrap_or(false);
        let record = deadline_core::MetaRecord {
            tutorial_completed,
            ..Default::default()
        };
        store.save(&record)?;
    } else {
        store.clear()?;
    }
    println!("Meta progress reset at {}", store.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_known_flags() {
        let parsed = parse_args(args(&["--save", "x.json", "--keep-tutorial"])).unwrap();
        assert_eq!(parsed.save, Some(PathBuf::from("x.json")));
        assert!(parsed.keep_tutorial);
    }

    #[test]
    fn rejects_unknown_and_incomplete_flags() {
        assert!(parse_args(args(&["--force"])).is_err());
        assert!(parse_args(args(&["--save"])).is_err());
    }
}
