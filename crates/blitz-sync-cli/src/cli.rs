//! Command parsing and execution
//!
//! Options:
//!   --json                 Output wire JSON instead of summary lines
//!   --rate-limit <rps>     Outbound budget in requests per second
//!   --auth-token <token>   API token sent with every request
//!   --title <title>        Upload title (defaults to the file stem)
//!   --account-id <id>      Uploader account id
//!   --private              Mark uploads as private

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use blitz_sync_core::{WotInspector, DEFAULT_RATE_LIMIT};
use tracing::warn;

/// CLI command to execute
#[derive(Debug, Clone)]
pub enum CliCommand {
    Fetch { replay_ids: Vec<String> },
    Upload { files: Vec<PathBuf> },
    List { pages: Vec<u32> },
    ParseIds { files: Vec<PathBuf> },
}

/// CLI options
#[derive(Debug, Clone)]
pub struct CliOptions {
    pub json: bool,
    pub rate_limit: f64,
    pub auth_token: Option<String>,
    pub title: Option<String>,
    pub account_id: i64,
    pub private: bool,
}

impl Default for CliOptions {
    fn default() -> Self {
        Self {
            json: false,
            rate_limit: DEFAULT_RATE_LIMIT,
            auth_token: None,
            title: None,
            account_id: 0,
            private: false,
        }
    }
}

/// Parse CLI arguments and return command + options
pub fn parse_args(args: &[String]) -> Result<(CliCommand, CliOptions), String> {
    let mut options = CliOptions::default();
    let mut command: Option<&str> = None;
    let mut operands: Vec<String> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--json" => options.json = true,
            "--private" => options.private = true,
            "--rate-limit" => {
                i += 1;
                let value = args.get(i).ok_or("--rate-limit requires a value")?;
                options.rate_limit = value
                    .parse()
                    .map_err(|_| format!("invalid rate limit: {value}"))?;
            }
            "--auth-token" => {
                i += 1;
                let value = args.get(i).ok_or("--auth-token requires a value")?;
                options.auth_token = Some(value.clone());
            }
            "--title" => {
                i += 1;
                let value = args.get(i).ok_or("--title requires a value")?;
                options.title = Some(value.clone());
            }
            "--account-id" => {
                i += 1;
                let value = args.get(i).ok_or("--account-id requires a value")?;
                options.account_id = value
                    .parse()
                    .map_err(|_| format!("invalid account id: {value}"))?;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown option: {other}"));
            }
            other => {
                if command.is_none() {
                    command = Some(arg.as_str());
                    match other {
                        "fetch" | "upload" | "list" | "parse-ids" => {}
                        _ => return Err(format!("unknown command: {other}")),
                    }
                } else {
                    operands.push(arg.clone());
                }
            }
        }
        i += 1;
    }

    let command = command.ok_or("no command given")?;
    if operands.is_empty() {
        return Err(format!("{command} requires at least one argument"));
    }
    let command = match command {
        "fetch" => CliCommand::Fetch { replay_ids: operands },
        "upload" => CliCommand::Upload {
            files: operands.into_iter().map(PathBuf::from).collect(),
        },
        "list" => CliCommand::List {
            pages: operands
                .iter()
                .map(|p| p.parse().map_err(|_| format!("invalid page index: {p}")))
                .collect::<Result<_, _>>()?,
        },
        "parse-ids" => CliCommand::ParseIds {
            files: operands.into_iter().map(PathBuf::from).collect(),
        },
        _ => unreachable!("command validated above"),
    };
    Ok((command, options))
}

/// Execute a parsed command
pub async fn run(command: CliCommand, options: CliOptions) -> anyhow::Result<()> {
    match command {
        CliCommand::Fetch { replay_ids } => fetch(replay_ids, &options).await,
        CliCommand::Upload { files } => upload(files, &options).await,
        CliCommand::List { pages } => list(pages, &options).await,
        CliCommand::ParseIds { files } => parse_ids(files).await,
    }
}

fn client(options: &CliOptions) -> anyhow::Result<WotInspector> {
    WotInspector::new(options.rate_limit, options.auth_token.as_deref())
        .context("could not build the sync client")
}

async fn fetch(replay_ids: Vec<String>, options: &CliOptions) -> anyhow::Result<()> {
    let client = client(options)?;
    let mut found = 0usize;
    for replay_id in &replay_ids {
        match client.get_replay(replay_id).await {
            Some(replay) => {
                found += 1;
                if options.json {
                    println!("{}", replay.to_wire_json()?);
                } else {
                    let summary = &replay.data.summary;
                    println!(
                        "{replay_id}: {} - {} ({}): {}",
                        summary.map_name,
                        summary.vehicle,
                        summary.player_name,
                        replay.battle_result(None),
                    );
                }
            }
            None => warn!("{replay_id}: not found"),
        }
    }
    anyhow::ensure!(found > 0, "no replays found");
    Ok(())
}

async fn upload(files: Vec<PathBuf>, options: &CliOptions) -> anyhow::Result<()> {
    let client = client(options)?;
    let mut uploaded = 0usize;
    for path in &files {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Replay".to_string());
        let title = options.title.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Replay".to_string())
        });
        match client
            .post_replay(&data, &filename, &title, options.account_id, options.private)
            .await
        {
            Some(replay) => {
                uploaded += 1;
                match replay.data.view_url.as_deref() {
                    Some(url) => println!("{}: {url}", path.display()),
                    None => println!("{}: uploaded", path.display()),
                }
            }
            None => warn!("{}: upload failed", path.display()),
        }
    }
    anyhow::ensure!(uploaded > 0, "no replays uploaded");
    Ok(())
}

async fn list(pages: Vec<u32>, options: &CliOptions) -> anyhow::Result<()> {
    let client = client(options)?;
    let mut replay_ids = BTreeSet::new();
    for page in pages {
        let body = client
            .get_replay_listing(page)
            .await
            .with_context(|| format!("could not fetch listing page {page}"))?;
        replay_ids.extend(WotInspector::parse_replay_ids(&body));
    }
    for replay_id in replay_ids {
        println!("{replay_id}");
    }
    Ok(())
}

async fn parse_ids(files: Vec<PathBuf>) -> anyhow::Result<()> {
    let mut replay_ids = BTreeSet::new();
    for path in &files {
        let body = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        replay_ids.extend(WotInspector::parse_replay_ids(&body));
    }
    for replay_id in replay_ids {
        println!("{replay_id}");
    }
    Ok(())
}

/// Print usage information
pub fn print_help() {
    println!("blitz-sync v{}", env!("CARGO_PKG_VERSION"));
    println!("Fetch, upload and list WoT Blitz replays on replays.wotinspector.com");
    println!();
    println!("USAGE:");
    println!("    blitz-sync [OPTIONS] <COMMAND> <ARGS>...");
    println!();
    println!("COMMANDS:");
    println!("    fetch <replay-id>...    Fetch replay records by id");
    println!("    upload <file>...        Upload replay files (idempotent by content)");
    println!("    list <page>...          Scan listing pages for replay ids");
    println!("    parse-ids <file>...     Extract replay ids from saved HTML");
    println!();
    println!("OPTIONS:");
    println!("    --json                  Output wire JSON instead of summary lines");
    println!("    --rate-limit <rps>      Outbound budget in requests per second");
    println!("    --auth-token <token>    API token sent with every request");
    println!("    --title <title>         Upload title (defaults to the file stem)");
    println!("    --account-id <id>       Uploader account id");
    println!("    --private               Mark uploads as private");
    println!("    --help                  Show this help message");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_fetch() {
        let (command, options) = parse_args(&args(&["fetch", "abc", "def", "--json"])).unwrap();
        assert!(options.json);
        match command {
            CliCommand::Fetch { replay_ids } => assert_eq!(replay_ids, vec!["abc", "def"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_upload_options() {
        let (command, options) = parse_args(&args(&[
            "--rate-limit",
            "0.5",
            "upload",
            "a.wotbreplay",
            "--account-id",
            "1037453781",
            "--private",
        ]))
        .unwrap();
        assert_eq!(options.rate_limit, 0.5);
        assert_eq!(options.account_id, 1037453781);
        assert!(options.private);
        assert!(matches!(command, CliCommand::Upload { .. }));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_args(&args(&["frobnicate", "x"])).is_err());
        assert!(parse_args(&args(&["fetch"])).is_err());
        assert!(parse_args(&args(&["list", "one"])).is_err());
        assert!(parse_args(&args(&["fetch", "x", "--bogus"])).is_err());
        assert!(parse_args(&args(&["--rate-limit"])).is_err());
    }
}
