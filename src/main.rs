//! lineview - virtual access to text files too large to load
//!
//! Thin command-line front end over the library: inspect, read, search, edit or
//! page through a file.

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lineview::file_handler::validate_file_path;
use lineview::ui::PagerOptions;
use lineview::{Application, EditSet, EngineConfig, LargeFileEngine, SearchOptions};
use std::path::{Path, PathBuf};

fn file_arg() -> Arg {
    Arg::new("file")
        .help("Path to the text file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

fn search_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("regex")
            .long("regex")
            .short('e')
            .help("Treat the pattern as a regular expression")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("ignore-case")
            .long("ignore-case")
            .short('i')
            .help("Match case-insensitively")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("word")
            .long("word")
            .short('w')
            .help("Only match whole words")
            .action(ArgAction::SetTrue),
    )
}

fn cli() -> Command {
    Command::new("lineview")
        .version(lineview::VERSION)
        .about("Open, search and line-edit text files too large to load")
        .long_about(
            "lineview indexes a file in one streaming pass, then reads any line range \
             with a single positioned read. Searches stream the raw file and edits are \
             applied as one atomic rewrite.",
        )
        .subcommand_required(true)
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .global(true)
                .help("Size in bytes at which a file counts as large")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("chunk-size")
                .long("chunk-size")
                .global(true)
                .help("Read chunk size in bytes for indexing and search")
                .value_parser(value_parser!(usize)),
        )
        .subcommand(
            Command::new("info")
                .about("Index a file and print its line count and size")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("lines")
                .about("Print lines [start, end), 0-based")
                .arg(file_arg())
                .arg(
                    Arg::new("start")
                        .required(true)
                        .value_parser(value_parser!(u64)),
                )
                .arg(Arg::new("end").required(true).value_parser(value_parser!(u64))),
        )
        .subcommand(search_flags(
            Command::new("search")
                .about("Print matching lines as line:text")
                .arg(file_arg())
                .arg(Arg::new("pattern").required(true))
                .arg(
                    Arg::new("max")
                        .long("max")
                        .short('m')
                        .help("Stop after this many matches")
                        .value_parser(value_parser!(usize)),
                ),
        ))
        .subcommand(
            Command::new("edit")
                .about("Replace lines (1-based) in one atomic rewrite")
                .arg(file_arg())
                .arg(
                    Arg::new("set")
                        .long("set")
                        .short('s')
                        .value_name("N=TEXT")
                        .help("Replace line N with TEXT; may be repeated")
                        .action(ArgAction::Append)
                        .required(true),
                ),
        )
        .subcommand(search_flags(
            Command::new("view")
                .about("Page through the file in the terminal")
                .arg(file_arg())
                .arg(
                    Arg::new("search")
                        .long("search")
                        .help("Search for PATTERN once the file is indexed"),
                ),
        ))
}

fn load_config(matches: &ArgMatches) -> Result<EngineConfig> {
    #[cfg(feature = "config")]
    let mut config = EngineConfig::load_default()?;
    #[cfg(not(feature = "config"))]
    let mut config = EngineConfig::default();

    if let Some(threshold) = matches.get_one::<u64>("threshold") {
        config.large_file_threshold = *threshold;
    }
    if let Some(chunk_size) = matches.get_one::<usize>("chunk-size") {
        config.chunk_size = *chunk_size;
    }
    Ok(config)
}

fn search_options(matches: &ArgMatches) -> SearchOptions {
    SearchOptions {
        case_sensitive: !matches.get_flag("ignore-case"),
        regex_mode: matches.get_flag("regex"),
        whole_word: matches.get_flag("word"),
    }
}

fn parse_edit(entry: &str) -> Result<(u64, String)> {
    let Some((line, text)) = entry.split_once('=') else {
        bail!("expected N=TEXT, got '{}'", entry);
    };
    let line = line
        .trim()
        .parse::<u64>()
        .with_context(|| format!("invalid line number in '{}'", entry))?;
    Ok((line, text.to_string()))
}

fn file_path(matches: &ArgMatches) -> Result<&Path> {
    let path = matches
        .get_one::<PathBuf>("file")
        .context("file argument is required")?;
    validate_file_path(path)?;
    Ok(path)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = cli().get_matches();
    let mut config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("info", sub)) => {
            let path = file_path(sub)?;
            let engine = LargeFileEngine::new(config)?;
            let large = engine.classify(path).await;
            let info = engine.open(path).await?;
            println!("path:  {}", path.display());
            println!("lines: {}", info.total_lines);
            println!("bytes: {}", info.file_size);
            println!("large: {}", if large { "yes" } else { "no" });
        }
        Some(("lines", sub)) => {
            let path = file_path(sub)?;
            let start = *sub.get_one::<u64>("start").context("start is required")?;
            let end = *sub.get_one::<u64>("end").context("end is required")?;
            let engine = LargeFileEngine::new(config)?;
            engine.open(path).await?;
            for line in engine.read_lines(path, start, end).await? {
                println!("{}", line);
            }
        }
        Some(("search", sub)) => {
            let path = file_path(sub)?;
            let pattern = sub
                .get_one::<String>("pattern")
                .context("pattern is required")?;
            if let Some(max) = sub.get_one::<usize>("max") {
                config.max_search_results = *max;
            }
            let limit = config.max_search_results;
            let engine = LargeFileEngine::new(config)?;
            engine.open(path).await?;

            let results = engine.search(path, pattern, &search_options(sub)).await?;
            for found in &results.matches {
                println!("{}:{}", found.line_number, found.text);
            }
            if results.truncated {
                eprintln!("(stopped after {} matches)", limit);
            }
        }
        Some(("edit", sub)) => {
            let path = file_path(sub)?;
            let edits = sub
                .get_many::<String>("set")
                .context("at least one --set is required")?
                .map(|entry| parse_edit(entry))
                .collect::<Result<EditSet>>()?;

            let engine = LargeFileEngine::new(config)?;
            engine.open(path).await?;
            let info = engine.write_edits(path, &edits).await?;
            println!(
                "replaced {} lines in {} ({} lines, {} bytes)",
                edits.len(),
                path.display(),
                info.total_lines,
                info.file_size
            );
        }
        Some(("view", sub)) => {
            let path = file_path(sub)?;
            let options = PagerOptions {
                initial_search: sub.get_one::<String>("search").cloned(),
                search_options: search_options(sub),
            };
            let app = Application::new(config)?;
            app.view(path, options).await?;
        }
        _ => unreachable!("subcommand_required is set"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!lineview::VERSION.is_empty());
    }

    #[test]
    fn test_cli_is_well_formed() {
        cli().debug_assert();
    }

    #[test]
    fn test_parse_edit() {
        assert_eq!(parse_edit("2=B").unwrap(), (2, "B".to_string()));
        assert_eq!(parse_edit("3=a=b").unwrap(), (3, "a=b".to_string()));
        assert_eq!(parse_edit("4=").unwrap(), (4, String::new()));
        assert!(parse_edit("x=1").is_err());
        assert!(parse_edit("nothing").is_err());
    }

    #[test]
    fn test_global_flags_override_config() {
        let matches = cli()
            .try_get_matches_from([
                "lineview",
                "--threshold",
                "10",
                "info",
                "f.log",
                "--chunk-size",
                "4096",
            ])
            .unwrap();
        let config = load_config(&matches).unwrap();
        assert_eq!(config.large_file_threshold, 10);
        assert_eq!(config.chunk_size, 4096);
    }
}
