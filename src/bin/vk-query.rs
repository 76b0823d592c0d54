//! Run metric queries against an export from the command line.
//!
//! ```text
//! vk-query <export.csv|export.xls> [--options '{"delimiter": ";"}'] [REQUEST ...]
//! ```
//!
//! Each REQUEST is a JSON object such as
//! `{"metric": "city", "key": "Moscow", "start": "2021-01-10"}` and
//! produces one JSON line. Without requests the table summary is printed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use serde_json::json;

use vk_stats::data::loader::{load_file, LoadOptions};
use vk_stats::data::query::QueryRequest;
use vk_stats::MetricTable;

struct Args {
    path: PathBuf,
    options: LoadOptions,
    requests: Vec<String>,
}

fn parse_args() -> Result<Args> {
    let mut path = None;
    let mut options = LoadOptions::default();
    let mut requests = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--options" => {
                let text = args.next().context("--options needs a JSON object")?;
                options = LoadOptions::from_json(&text).context("parsing --options")?;
            }
            _ if path.is_none() => path = Some(PathBuf::from(arg)),
            _ => requests.push(arg),
        }
    }

    let Some(path) = path else {
        bail!("usage: vk-query <export.csv|export.xls> [--options JSON] [REQUEST ...]");
    };
    Ok(Args {
        path,
        options,
        requests,
    })
}

fn summary(table: &MetricTable) -> serde_json::Value {
    json!({
        "rows": table.len(),
        "start": table.start_date(),
        "end": table.end_date(),
        "cities": table.available_cities(),
        "countries": table.available_countries(),
    })
}

fn main() -> Result<ExitCode> {
    env_logger::init();

    let args = parse_args()?;
    let table = load_file(&args.path, &args.options)
        .with_context(|| format!("loading {}", args.path.display()))?;

    if args.requests.is_empty() {
        println!("{}", summary(&table));
        return Ok(ExitCode::SUCCESS);
    }

    let mut failed = 0usize;
    for text in &args.requests {
        let outcome = QueryRequest::from_json(text)
            .context("parsing request")
            .and_then(|request| Ok(request.run(&table)?));
        match outcome {
            Ok(response) => println!("{}", serde_json::to_string(&response)?),
            Err(e) => {
                failed += 1;
                log::error!("request {text} failed: {e:#}");
                println!("{}", json!({ "request": text, "error": format!("{e:#}") }));
            }
        }
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
