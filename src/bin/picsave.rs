use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use picsave_engine::config::ClientConfig;
use picsave_engine::download::{run_site_download, DownloadSummary};
use picsave_engine::fetch::HttpTransport;
use picsave_engine::paths::OutputPaths;

#[derive(Debug, Default)]
struct Args {
    url: Option<String>,
    output_dir: Option<PathBuf>,
    browser: Option<PathBuf>,
    no_browser: bool,
    log_file: Option<PathBuf>,
    summary_json: Option<PathBuf>,
    no_wait: bool,
}

fn main() -> ExitCode {
    let raw: Vec<String> = std::env::args().collect();
    if raw.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return ExitCode::SUCCESS;
    }

    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let result = run(&args);
    let code = match &result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\nError: {err}");
            ExitCode::FAILURE
        }
    };

    if !args.no_wait {
        print!("\nPress Enter to exit...");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
    }
    code
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args::default();
    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--output-dir" => {
                i += 1;
                let v = raw
                    .get(i)
                    .ok_or_else(|| "--output-dir requires a value".to_string())?;
                args.output_dir = Some(PathBuf::from(v));
            }
            "--browser" => {
                i += 1;
                let v = raw
                    .get(i)
                    .ok_or_else(|| "--browser requires a value".to_string())?;
                args.browser = Some(PathBuf::from(v));
            }
            "--no-browser" => args.no_browser = true,
            "--log-file" => {
                i += 1;
                let v = raw
                    .get(i)
                    .ok_or_else(|| "--log-file requires a value".to_string())?;
                args.log_file = Some(PathBuf::from(v));
            }
            "--summary-json" => {
                i += 1;
                let v = raw
                    .get(i)
                    .ok_or_else(|| "--summary-json requires a value".to_string())?;
                args.summary_json = Some(PathBuf::from(v));
            }
            "--no-wait" => args.no_wait = true,
            other if other.starts_with("--") => {
                return Err(format!("unknown arg: {other} (try --help)"));
            }
            other => {
                if args.url.is_some() {
                    return Err(format!("unexpected extra argument: {other}"));
                }
                args.url = Some(other.to_string());
            }
        }
        i += 1;
    }
    Ok(args)
}

fn run(args: &Args) -> Result<DownloadSummary, String> {
    let url = match &args.url {
        Some(url) => url.clone(),
        None => prompt_for_url().map_err(|e| e.to_string())?,
    };

    let mut config = ClientConfig::from_env();
    if args.browser.is_some() {
        config.browser_path = args.browser.clone();
    }
    let config = config.resolve_script_capability(!args.no_browser);

    let output = match &args.output_dir {
        Some(dir) => OutputPaths::new(dir.clone()),
        None => OutputPaths::from_current_dir().map_err(|e| e.to_string())?,
    };

    let transport = HttpTransport::new(config);
    let log_file = args.log_file.clone();
    let summary = run_site_download(&url, &transport, &output, |level, event, data| {
        if let Some(message) = data.get("message").and_then(|m| m.as_str()) {
            if level == "info" {
                println!("{message}");
            } else {
                eprintln!("{message}");
            }
        }
        if let Some(path) = &log_file {
            append_jsonl(path, level, event, &data)?;
        }
        Ok(())
    })
    .map_err(|e| e.to_string())?;

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        std::fs::write(path, format!("{json}\n")).map_err(|e| e.to_string())?;
    }

    Ok(summary)
}

fn prompt_for_url() -> std::io::Result<String> {
    println!(
        r#"picsave - image downloader

Supported sites:
  - Naver Blog (blog.naver.com)
  - Naver Post (post.naver.com)
  - SBS K-Pop Magazine (sbskpop.kr)
  - SBS Programs (programs.sbs.co.kr)
  - Weverse (weverse.io)
  - Berriz (berriz.in)
"#
    );
    print!("Enter URL: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn append_jsonl(
    path: &Path,
    level: &str,
    event: &str,
    data: &serde_json::Value,
) -> picsave_engine::Result<()> {
    let line = serde_json::json!({
        "ts_ms": now_ms(),
        "level": level,
        "event": event,
        "data": data
    })
    .to_string();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(format!("{line}\n").as_bytes())?;
    Ok(())
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn print_help() {
    println!(
        r#"picsave

Downloads every content image of a post into a folder named after the post.

Usage:
  picsave https://blog.naver.com/abc123/222333444
  picsave --output-dir D:\pictures https://weverse.io/artist/media/4-139468848
  picsave                      (prompts for the URL)

Options:
  --output-dir <path>     Parent folder for post folders (default: current directory)
  --browser <path>        Headless Chromium-family browser used for script-rendered pages
  --no-browser            Never render with a browser; fetch pages over plain HTTP
  --log-file <path>       Append structured JSONL events to this file
  --summary-json <path>   Write the run summary as JSON
  --no-wait               Do not wait for Enter before exiting

Environment:
  PICSAVE_USER_AGENT      Override the HTTP User-Agent
  PICSAVE_TIMEOUT_SECS    Request timeout in seconds (default 30)
  PICSAVE_BROWSER         Same as --browser
"#
    );
}
