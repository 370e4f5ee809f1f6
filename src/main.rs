use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use console::{Term, style};
use sitemap_search::cache::CacheStore;
use sitemap_search::metrics::walk_summary;
use sitemap_search::network::{self, Fetcher};
use sitemap_search::options::{Cli, ConfigFile, defaults, sitemap_url_from_answer};
use sitemap_search::results::ResultSet;
use sitemap_search::selector;
use sitemap_search::sitemap::Walker;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,sitemap_search=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn write_reports(options: &Cli, results: &ResultSet) -> Result<(), Box<dyn Error>> {
    if let Some(path) = options.report_path.as_ref() {
        results.write_csv_report(path, options.json)?;
    }
    if let Some(path) = options.report_path_json.as_ref() {
        results.write_json_report(path, options.json)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // Parse terminal arguments.
    let mut options = Cli::parse();

    // Load config file and apply values (CLI args take priority).
    let config = ConfigFile::load(options.config.as_ref()).unwrap_or_else(|e| {
        eprintln!("{} {}", style("[ERROR]").red(), e);
        std::process::exit(1);
    });
    options.apply_config(&config);
    init_tracing(options.verbose);

    // Keep stdout clean for JSON output.
    let term = if options.json {
        Term::stderr()
    } else {
        Term::stdout()
    };
    let sitemap_url = match options.sitemap_url.clone() {
        Some(url) => url,
        None => {
            let answer = selector::prompt(
                &term,
                &format!(
                    "Enter the URL of the sitemap XML (Leave empty to use {}):",
                    defaults::SITEMAP_URL
                ),
            )?;
            match sitemap_url_from_answer(&answer) {
                Ok(url) => url,
                Err(e) => {
                    eprintln!(
                        "{} Invalid sitemap URL {:?}: {}",
                        style("[ERROR]").red(),
                        answer,
                        e
                    );
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    };

    let walk_options = options.walk_options();
    let cache = walk_options
        .use_cache
        .then(|| CacheStore::new(&options.cache_dir));
    let client = network::build_client(&options)?;
    let fetcher = Arc::new(Fetcher::new(
        client,
        cache,
        walk_options.concurrency_limit,
    ));
    let walker = Walker::new(Arc::clone(&fetcher), &walk_options);
    let start_time = Instant::now();

    if !options.json {
        println!(
            "{} 🔎 Loading {}...",
            style("[1/2]").dim(),
            sitemap_url
        );
    }

    // Walk the sitemap and every nested sitemap index.
    let outcome = match walker.walk(sitemap_url.as_str()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{} Failed to load sitemap: {}", style("[ERROR]").red(), e);
            return Ok(ExitCode::FAILURE);
        }
    };

    for error in &outcome.errors {
        eprintln!("{} {}", style("[ERROR]").red(), error);
    }

    let results = if options.sort {
        outcome.entries.sorted_by_link()
    } else {
        outcome.entries.clone()
    };

    if options.json {
        // Print clean JSON to stdout for piping.
        let matches = results.search(options.query.as_deref().unwrap_or_default());
        println!("{}", matches.to_json_string()?);
        write_reports(&options, &matches)?;
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} ✅ Done!\n", style("[2/2]").dim());
    println!(
        "{}",
        walk_summary(
            &outcome,
            fetcher.requests_issued(),
            fetcher.cache().map(CacheStore::root),
            start_time.elapsed(),
        )
        .build_table()
    );

    if results.is_empty() {
        println!("The sitemap does not list any pages.");
        return Ok(ExitCode::SUCCESS);
    }

    let query = match options.query.clone() {
        Some(query) => query,
        None => selector::prompt(
            &term,
            "Enter the search query (Leave empty to get all pages):",
        )?,
    };
    let matches = results.search(&query);
    write_reports(&options, &matches)?;

    if matches.is_empty() {
        println!("No page title contains {}.", style(&query).bold());
        return Ok(ExitCode::SUCCESS);
    }

    match selector::select_entry(&term, &matches) {
        Ok(entry) => {
            println!("Page URL: {}", style(&entry.link).underlined().cyan());
            if !options.no_open && selector::confirm(&term, "Would you like to open it?")? {
                if let Err(e) = selector::open_in_browser(&entry.link) {
                    eprintln!("{} Could not open a browser: {}", style("[ERROR]").red(), e);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{} {}", style("[ERROR]").red(), e);
            println!("No site selected.");
            Ok(ExitCode::FAILURE)
        }
    }
}
