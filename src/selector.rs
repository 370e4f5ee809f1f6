use crate::error::SelectionError;
use crate::results::{ResultSet, SitemapEntry};
use console::{Term, style};
use std::io;
use std::process::{Command, Stdio};

/// Prints every entry's title, numbered from 1.
pub fn list_entries(term: &Term, results: &ResultSet) -> io::Result<()> {
    let width = results.len().to_string().len();
    for (index, entry) in results.iter().enumerate() {
        term.write_line(&format!(
            "{} {}",
            style(format!("{:>width$}.", index + 1)).dim(),
            entry.title
        ))?;
    }
    Ok(())
}

/// Turns the user's answer into a zero based index into a list of `len`
/// entries.
///
/// # Examples
///
/// ```rust
/// use sitemap_search::selector::parse_selection;
///
/// assert_eq!(parse_selection(" 2 ", 3).unwrap(), 1);
/// assert!(parse_selection("4", 3).is_err());
/// assert!(parse_selection("two", 3).is_err());
/// ```
pub fn parse_selection(input: &str, len: usize) -> Result<usize, SelectionError> {
    let input = input.trim();
    let selected: usize = input
        .parse()
        .map_err(|_| SelectionError::NotANumber(input.to_string()))?;
    if (1..=len).contains(&selected) {
        Ok(selected - 1)
    } else {
        Err(SelectionError::OutOfRange { selected, max: len })
    }
}

/// Asks once for `prompt` and returns the trimmed answer.
///
/// The answer is read from stdin rather than the terminal so that piped
/// input works too.
pub fn prompt(term: &Term, prompt: &str) -> io::Result<String> {
    term.write_str(&format!("{} ", style(prompt).bold()))?;
    term.flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(answer.trim().to_string())
}

/// Lists `results` and asks for one of them. An invalid answer is an error;
/// there is no second attempt.
pub fn select_entry<'a>(
    term: &Term,
    results: &'a ResultSet,
) -> Result<&'a SitemapEntry, SelectionError> {
    list_entries(term, results)?;
    let answer = prompt(term, "Enter the number of the site to see its URL:")?;
    let index = parse_selection(&answer, results.len())?;
    results
        .get(index)
        .ok_or(SelectionError::OutOfRange {
            selected: index + 1,
            max: results.len(),
        })
}

/// Asks a yes/no question. Only `y` and `yes` (any case) count as yes.
pub fn confirm(term: &Term, question: &str) -> io::Result<bool> {
    let answer = prompt(term, &format!("{question} (yes/no):"))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

/// Opens `url` with the platform's default browser.
pub fn open_in_browser(url: &str) -> io::Result<()> {
    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };

    command
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
}
