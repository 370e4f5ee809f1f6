use std::io::Write;
use std::process::{Command, Output, Stdio};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sitemap_search() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sitemap-search"))
}

/// Runs the binary with `stdin` piped in as the user's answers.
fn run_with_input(args: &[&str], stdin: &str) -> Output {
    let mut child = sitemap_search()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute sitemap-search binary");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes())
        .expect("Failed to write stdin");
    child.wait_with_output().expect("Failed to wait for binary")
}

async fn mount_site(mock_server: &MockServer) {
    let uri = mock_server.uri();
    let sitemap = format!(
        r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{uri}/hello</loc></url>
  <url><loc>{uri}/about</loc><name>About Us</name></url>
</urlset>"#
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Hello World</title>"))
        .mount(mock_server)
        .await;
}

#[test]
fn test_cli_help() {
    let output = sitemap_search()
        .arg("--help")
        .output()
        .expect("Failed to execute sitemap-search binary");

    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Help should show usage");
    assert!(stdout.contains("SITEMAP_URL"), "Help should mention sitemap URL");
    for flag in [
        "--show-errors",
        "--progress",
        "--cache",
        "--concurrency-limit",
        "--query",
        "--json",
    ] {
        assert!(stdout.contains(flag), "Help should document {flag}");
    }
}

#[test]
fn test_cli_version() {
    let output = sitemap_search()
        .arg("--version")
        .output()
        .expect("Failed to execute sitemap-search binary");

    assert!(output.status.success(), "Version command should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sitemap-search"), "Version should mention package name");
}

#[test]
fn test_cli_prompts_for_missing_sitemap_url() {
    let output = run_with_input(&["--no-open"], "not a url\n");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Enter the URL of the sitemap XML"), "got: {stdout}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid sitemap URL"), "got: {stderr}");
}

#[test]
fn test_cli_config_nonexistent_path_errors() {
    let output = sitemap_search()
        .args([
            "http://example.com/sitemap.xml",
            "--config",
            "/tmp/nonexistent_sitemap_search_99999.toml",
        ])
        .output()
        .expect("Failed to execute sitemap-search binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "got: {stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_json_output() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let sitemap_url = format!("{}/sitemap.xml", mock_server.uri());
    let output = sitemap_search()
        .args([sitemap_url.as_str(), "--json", "--query", "HELLO"])
        .output()
        .expect("Failed to execute sitemap-search binary");

    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    let entries = json.as_array().expect("an array of entries");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["title"], "Hello World");
    assert_eq!(entries[0]["link"], format!("{}/hello", mock_server.uri()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_root_failure_exits_with_error() {
    let mock_server = MockServer::start().await;

    let sitemap_url = format!("{}/sitemap.xml", mock_server.uri());
    let output = sitemap_search()
        .args([sitemap_url.as_str(), "--json"])
        .output()
        .expect("Failed to execute sitemap-search binary");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("[ERROR]"), "got: {stderr}");
    assert!(stderr.contains("404"), "got: {stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_interactive_selection() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let sitemap_url = format!("{}/sitemap.xml", mock_server.uri());
    // Empty query, then pick the second page.
    let output = run_with_input(&[sitemap_url.as_str(), "--no-open"], "\n2\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hello World"), "got: {stdout}");
    assert!(stdout.contains("About Us"), "got: {stdout}");
    assert!(
        stdout.contains(&format!("Page URL: {}/about", mock_server.uri())),
        "got: {stdout}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_interactive_invalid_selection() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let sitemap_url = format!("{}/sitemap.xml", mock_server.uri());
    let output = run_with_input(
        &[sitemap_url.as_str(), "--no-open", "--query", "about"],
        "7\n",
    );

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid selection"), "got: {stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cli_reads_sitemap_url_from_prompt() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let answers = format!("{}/sitemap.xml\nhello\n1\n", mock_server.uri());
    let output = run_with_input(&["--no-open"], &answers);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&format!("Page URL: {}/hello", mock_server.uri())),
        "got: {stdout}"
    );
}
