//! Purpose: `jsonfetch` CLI entry point.
//! Role: Binary crate root; parses args, fetches one URL, prints JSON on stdout.
//! Invariants: stdout carries only the fetched document (compact or pretty).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod render;

use jsonfetch::api::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_BODY_BYTES, DEFAULT_READ_TIMEOUT, Error, ErrorKind,
    FetchClient, FetchOptions, JsonMap, StatusPolicy, to_exit_code,
};
use render::{Layout, render_json};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => std::process::exit(report_clap_error(&err)),
    };

    init_tracing(cli.verbose);
    let Command::Get(args) = cli.command;
    let exit_code = match run_get(args, cli.color) {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err, cli.color);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

/// Help and version go to stdout as clap renders them; anything else is a usage error.
fn report_clap_error(err: &clap::Error) -> i32 {
    let exit_code = match err.kind() {
        ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion => 0,
        ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => 2,
        _ => {
            let usage = Error::new(ErrorKind::Usage)
                .with_message(clap_error_summary(err))
                .with_hint("Run `jsonfetch --help` for usage.");
            emit_error(&usage, ColorMode::Auto);
            return to_exit_code(usage.kind());
        }
    };
    let _ = err.print();
    exit_code
}

#[derive(Parser)]
#[command(
    name = "jsonfetch",
    version,
    about = "Fetch a JSON document over HTTP and print it",
    after_help = r#"EXAMPLES
  $ jsonfetch get https://jsonplaceholder.typicode.com/posts/1
  $ jsonfetch get --pretty https://jsonplaceholder.typicode.com/posts/1
  $ jsonfetch get --field id --field title https://jsonplaceholder.typicode.com/posts/1

EXIT CODES
  0 ok, 2 usage, 3 transport, 4 http status, 5 decode, 6 body too large"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,
    #[arg(
        short,
        long,
        global = true,
        help = "Log request details to stderr (overrides RUST_LOG)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "GET a URL and print the JSON body",
        long_about = r#"GET a URL and print the JSON body.

The body must be a JSON object unless --any is given. Non-2xx responses fail
unless --allow-error-status is given."#
    )]
    Get(GetArgs),
}

#[derive(Args)]
struct GetArgs {
    #[arg(help = "http:// or https:// URL to fetch", value_hint = ValueHint::Url)]
    url: String,
    #[arg(long, help = "Indent output (colored when --color allows)")]
    pretty: bool,
    #[arg(long, help = "Accept any top-level JSON value, not only objects")]
    any: bool,
    #[arg(
        long = "field",
        value_name = "KEY",
        help = "Print only these top-level keys (repeatable)"
    )]
    fields: Vec<String>,
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_CONNECT_TIMEOUT.as_secs(),
        help = "Connect timeout"
    )]
    connect_timeout: u64,
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = DEFAULT_READ_TIMEOUT.as_secs(),
        help = "Read timeout"
    )]
    timeout: u64,
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_BODY_BYTES,
        help = "Largest accepted response body in bytes"
    )]
    max_bytes: u64,
    #[arg(
        long = "header",
        value_name = "NAME:VALUE",
        value_parser = parse_header,
        help = "Extra request header (repeatable)"
    )]
    headers: Vec<(String, String)>,
    #[arg(long, value_name = "UA", help = "Override the User-Agent header")]
    user_agent: Option<String>,
    #[arg(long, help = "Decode the body even when the status is not 2xx")]
    allow_error_status: bool,
    #[arg(
        long,
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        conflicts_with = "insecure",
        help = "Trust only the CA certificates in this PEM file"
    )]
    tls_ca: Option<PathBuf>,
    #[arg(long, help = "Skip TLS certificate verification")]
    insecure: bool,
}

fn run_get(args: GetArgs, color_mode: ColorMode) -> Result<(), Error> {
    if args.any && !args.fields.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("--field requires an object response and cannot be combined with --any"));
    }

    let client = build_client(&args)?;
    let value = if args.any {
        client.fetch_value(&args.url)?
    } else {
        let map = client.fetch_data(&args.url)?;
        if args.fields.is_empty() {
            Value::Object(map)
        } else {
            Value::Object(
                project_fields(&map, &args.fields).map_err(|err| err.with_url(&args.url))?,
            )
        }
    };

    emit_document(&value, args.pretty, color_mode);
    Ok(())
}

fn build_client(args: &GetArgs) -> Result<FetchClient, Error> {
    let mut options = FetchOptions {
        connect_timeout: Duration::from_secs(args.connect_timeout),
        read_timeout: Duration::from_secs(args.timeout),
        max_body_bytes: args.max_bytes,
        headers: args.headers.clone(),
        status_policy: if args.allow_error_status {
            StatusPolicy::Decode
        } else {
            StatusPolicy::Fail
        },
        ..FetchOptions::default()
    };
    if let Some(user_agent) = &args.user_agent {
        options.user_agent = user_agent.clone();
    }

    let client = FetchClient::with_options(options);
    if let Some(path) = &args.tls_ca {
        return client.with_tls_ca_file(path);
    }
    if args.insecure {
        return Ok(client.with_tls_skip_verify());
    }
    Ok(client)
}

fn project_fields(map: &JsonMap, fields: &[String]) -> Result<JsonMap, Error> {
    let mut out = Map::new();
    for field in fields {
        let Some(value) = map.get(field) else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("field `{field}` is not present in the response"))
                .with_hint(format!(
                    "Available keys: {}",
                    map.keys().cloned().collect::<Vec<_>>().join(", ")
                )));
        };
        out.insert(field.clone(), value.clone());
    }
    Ok(out)
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let Some((name, value)) = raw.split_once(':') else {
        return Err("expected NAME:VALUE".to_string());
    };
    let name = name.trim();
    if name.is_empty() || name.chars().any(|ch| ch.is_whitespace()) {
        return Err("header name must be non-empty and contain no whitespace".to_string());
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn init_tracing(verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("jsonfetch=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn emit_document(value: &Value, pretty: bool, color_mode: ColorMode) {
    let layout = if pretty {
        Layout::Pretty {
            color: color_mode.use_color(io::stdout().is_terminal()),
        }
    } else {
        Layout::Compact
    };
    println!("{}", render_json(value, layout));
}

/// Interactive stderr gets a readable block; pipes and files get one JSON line.
fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    let rendered = if is_tty {
        error_text(err, color_mode.use_color(is_tty))
    } else {
        error_json(err).to_string()
    };
    eprintln!("{rendered}");
}

const LABEL_RED: &str = "31";
const LABEL_YELLOW: &str = "33";

fn label(text: &str, use_color: bool, code: &str) -> String {
    if use_color {
        format!("\u{1b}[{code}m{text}\u{1b}[0m")
    } else {
        text.to_string()
    }
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Transport => "transport error".to_string(),
        ErrorKind::Status => "unexpected http status".to_string(),
        ErrorKind::Decode => "response is not valid json".to_string(),
        ErrorKind::TooLarge => "response body too large".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        label("error:", use_color, LABEL_RED),
        error_message(err)
    )];

    if let Some(hint) = err.hint() {
        lines.push(format!("{} {hint}", label("hint:", use_color, LABEL_YELLOW)));
    }
    if let Some(url) = err.url() {
        lines.push(format!("{} {url}", label("url:", use_color, LABEL_YELLOW)));
    }
    if let Some(status) = err.status() {
        lines.push(format!("{} {status}", label("status:", use_color, LABEL_YELLOW)));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("{} {cause}", label("caused by:", use_color, LABEL_YELLOW)));
    }

    lines.join("\n")
}
