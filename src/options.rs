use crate::utils::validate_basic_auth;
use clap::{Parser, ValueHint, value_parser};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Default values used throughout the project.
pub mod defaults {
    /// Maximum number of concurrent network requests. `0` lifts the limit.
    pub const SEMAPHORE: u8 = 4;

    /// The default user agent header value used for network requests.
    pub const USER_AGENT: &str = concat!(
        "Mozilla/5.0 (compatible; sitemap-search/",
        env!("CARGO_PKG_VERSION"),
        ")"
    );

    /// Where cached documents and titles are kept unless told otherwise.
    pub const CACHE_DIR: &str = "~/.cache/sitemap-search";

    /// Sitemap walked when no URL is given and the prompt is left empty.
    pub const SITEMAP_URL: &str = "https://ellinet13.github.io/sitemap.xml";

    /// Config file picked up from the working directory when `--config` is absent.
    pub const CONFIG_FILE: &str = ".sitemap-search.toml";
}

/// Expands a leading `~` and environment variables in a user supplied path.
pub fn expand_path(s: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(s).into_owned())
}

/// Turns the answer to the sitemap URL prompt into a URL. An empty answer
/// selects [`defaults::SITEMAP_URL`].
///
/// ```rust
/// use sitemap_search::options::{defaults, sitemap_url_from_answer};
///
/// assert_eq!(sitemap_url_from_answer("  ").unwrap().as_str(), defaults::SITEMAP_URL);
/// assert!(sitemap_url_from_answer("not a url").is_err());
/// ```
pub fn sitemap_url_from_answer(answer: &str) -> Result<Url, url::ParseError> {
    match answer.trim() {
        "" => Url::parse(defaults::SITEMAP_URL),
        answer => Url::parse(answer),
    }
}

fn parse_cache_dir(s: &str) -> Result<PathBuf, String> {
    let path = expand_path(s);
    if path.exists() && !path.is_dir() {
        return Err(format!(
            "❌ The cache path '{}' is not a directory.",
            path.display()
        ));
    }
    Ok(path)
}

#[derive(Debug, Parser)]
#[command(version, about, term_width = 80)]
pub struct Cli {
    #[arg(
        help = "The URL of the sitemap to be walked. Prompts when omitted.",
        value_hint = ValueHint::Url,
        value_parser = value_parser!(Url)
    )]
    pub sitemap_url: Option<Url>,

    #[arg(
        short = 'e',
        long,
        help = "Report sitemaps and entries that could not be processed"
    )]
    pub show_errors: bool,

    #[arg(short = 'p', long, help = "Show a progress bar while walking the sitemap")]
    pub progress: bool,

    #[arg(
        long,
        help = "Keep fetched documents and resolved titles in an on-disk cache"
    )]
    pub cache: bool,

    #[arg(
        long,
        help = "Directory used by --cache",
        default_value = defaults::CACHE_DIR,
        value_hint = ValueHint::DirPath,
        value_parser = parse_cache_dir
    )]
    pub cache_dir: PathBuf,

    #[arg(
        short = 'c',
        long,
        help = "Maximum number of concurrent requests allowed (0 for no limit)",
        default_value_t = defaults::SEMAPHORE,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub concurrency_limit: u8,

    #[arg(
        short = 'q',
        long,
        help = "Search query matched against page titles. Prompts when omitted."
    )]
    pub query: Option<String>,

    #[arg(long, help = "Order results by link instead of sitemap order")]
    pub sort: bool,

    #[arg(
        long,
        help = "Print the matching entries as JSON to stdout and exit without prompting"
    )]
    pub json: bool,

    #[arg(
        short = 'r',
        long,
        help = "File path for storing the matching entries as CSV",
        value_hint = ValueHint::FilePath,
        value_parser = clap::value_parser!(PathBuf)
    )]
    pub report_path: Option<PathBuf>,

    #[arg(
        long,
        help = "File path for storing the matching entries as JSON",
        value_hint = ValueHint::FilePath,
        value_parser = clap::value_parser!(PathBuf)
    )]
    pub report_path_json: Option<PathBuf>,

    #[arg(
        long,
        help = "Custom User-Agent header to be used in requests",
        default_value_t = defaults::USER_AGENT.to_string(),
    )]
    pub user_agent: String,

    #[arg(
        long,
        help = "Basic authentication credentials in the format `username:password`",
        value_parser = validate_basic_auth,
    )]
    pub basic_auth: Option<String>,

    #[arg(long, help = "Never offer to open the selected page in a browser")]
    pub no_open: bool,

    #[arg(
        long,
        help = "Path to a TOML config file. Defaults to `.sitemap-search.toml` in the working directory.",
        value_hint = ValueHint::FilePath,
        value_parser = clap::value_parser!(PathBuf)
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', long, help = "Print debug logging to stderr")]
    pub verbose: bool,
}

/// Settings read from a TOML config file. Every key is optional; command
/// line arguments always take priority.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub show_errors: Option<bool>,
    pub progress: Option<bool>,
    pub cache: Option<bool>,
    pub cache_dir: Option<String>,
    pub concurrency_limit: Option<u8>,
    pub sort: Option<bool>,
    pub user_agent: Option<String>,
    pub basic_auth: Option<String>,
    pub no_open: Option<bool>,
}

impl ConfigFile {
    /// Loads the config file at `path`. Without a path, `.sitemap-search.toml`
    /// in the working directory is used when it exists, and an empty config
    /// otherwise.
    pub fn load(path: Option<&PathBuf>) -> Result<ConfigFile, String> {
        match path {
            Some(path) => {
                let path = expand_path(&path.to_string_lossy());
                if !path.exists() {
                    return Err(format!("Config file not found: {}", path.display()));
                }
                Self::read(&path)
            }
            None => {
                let path = Path::new(defaults::CONFIG_FILE);
                if path.exists() {
                    Self::read(path)
                } else {
                    Ok(ConfigFile::default())
                }
            }
        }
    }

    fn read(path: &Path) -> Result<ConfigFile, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| format!("Invalid config file {}: {}", path.display(), e))
    }
}

/// Short options that take a value. In a cluster such as `-pc8` everything
/// after one of these is its value, not more flags.
const SHORT_WITH_VALUE: [char; 3] = ['c', 'q', 'r'];

/// Whether `--long` (or `-short`, alone or inside a cluster like `-ep`)
/// appears in `args`. `args[0]` is the program name.
fn arg_provided(args: &[String], long: &str, short: Option<char>) -> bool {
    let long_flag = format!("--{long}");
    let long_prefix = format!("--{long}=");
    args.iter()
        .skip(1)
        .take_while(|arg| *arg != "--")
        .any(|arg| {
            if arg == &long_flag || arg.starts_with(&long_prefix) {
                return true;
            }
            let (Some(short), Some(cluster)) = (short, arg.strip_prefix('-')) else {
                return false;
            };
            if cluster.starts_with('-') {
                return false;
            }
            for flag in cluster.chars() {
                if flag == short {
                    return true;
                }
                if SHORT_WITH_VALUE.contains(&flag) {
                    break;
                }
            }
            false
        })
}

impl Cli {
    /// Fills in values from `config` for every option not given on the
    /// command line of this process.
    pub fn apply_config(&mut self, config: &ConfigFile) {
        let args: Vec<String> = std::env::args().collect();
        self.apply_config_with_args(config, &args);
    }

    /// Like [`Cli::apply_config`], with `args` standing in for the process
    /// arguments.
    pub fn apply_config_with_args(&mut self, config: &ConfigFile, args: &[String]) {
        let given = |long: &str, short: Option<char>| arg_provided(args, long, short);
        if let Some(v) = config.show_errors {
            if !given("show-errors", Some('e')) {
                self.show_errors = v;
            }
        }
        if let Some(v) = config.progress {
            if !given("progress", Some('p')) {
                self.progress = v;
            }
        }
        if let Some(v) = config.cache {
            if !given("cache", None) {
                self.cache = v;
            }
        }
        if let Some(v) = config.cache_dir.as_deref() {
            if !given("cache-dir", None) {
                self.cache_dir = expand_path(v);
            }
        }
        if let Some(v) = config.concurrency_limit {
            if !given("concurrency-limit", Some('c')) {
                self.concurrency_limit = v.min(100);
            }
        }
        if let Some(v) = config.sort {
            if !given("sort", None) {
                self.sort = v;
            }
        }
        if let Some(v) = config.user_agent.as_ref() {
            if !given("user-agent", None) {
                self.user_agent = v.clone();
            }
        }
        if let Some(v) = config.basic_auth.as_ref() {
            if !given("basic-auth", None) && validate_basic_auth(v).is_ok() {
                self.basic_auth = Some(v.clone());
            }
        }
        if let Some(v) = config.no_open {
            if !given("no-open", None) {
                self.no_open = v;
            }
        }
    }

    /// The subset of options the sitemap walker consumes.
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            show_errors: self.show_errors,
            use_cache: self.cache,
            show_progress: self.progress && !self.json,
            concurrency_limit: match self.concurrency_limit {
                0 => None,
                n => Some(n as usize),
            },
        }
    }
}

/// Configuration of a single walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Collect messages for nested sitemaps and entries that failed.
    pub show_errors: bool,
    /// Read and write the on-disk cache.
    pub use_cache: bool,
    /// Draw a progress bar on stderr.
    pub show_progress: bool,
    /// Upper bound on simultaneous network requests; `None` is unbounded.
    pub concurrency_limit: Option<usize>,
}
