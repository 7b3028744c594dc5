//! CLI argument parsing (spec §6 "CLI surface"). Grounded on the teacher's
//! `cli.rs`: hand-rolled `--flag value` lookahead parsing, no `clap`.

use complior_engine::api::ReportFormat;

pub(crate) fn print_help() {
    println!(
        "Usage:\n  complior help\n  complior version\n  complior init [--path <dir>]\n  complior scan [--path <dir>] [--json] [--ci] [--threshold N]\n  complior fix [--all | --check <id> [--obligation <id>]] [--path <dir>]\n  complior report [--format markdown|json] [--path <dir>]\n  complior undo [--id N] [--path <dir>]\n  complior status [--path <dir>]\n  complior serve | mcp-server\n\nNotes:\n  - No args => start the MCP server over stdio.\n  - --path defaults to $COMPLIOR_PROJECT_PATH or the current directory.\n  - Exit codes: 0 success, 1 failure, 2 usage/threshold failure.\n"
    );
}

pub(crate) fn default_project_path(path: Option<String>) -> String {
    path.or_else(|| std::env::var("COMPLIOR_PROJECT_PATH").ok())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| ".".to_string())
}

/// Defaults to the `data/catalogue` directory bundled next to this crate's
/// sources; overridable for packaged installs that ship the catalogue
/// elsewhere.
pub(crate) fn default_data_dir() -> String {
    std::env::var("COMPLIOR_DATA_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalogue").to_string())
}

fn take_value(args: &[String], i: usize, flag: &str) -> Result<(String, usize), String> {
    let v = args.get(i + 1).ok_or_else(|| format!("{flag} requires a value"))?;
    if v.starts_with("--") {
        return Err(format!("{flag} requires a value"));
    }
    Ok((v.clone(), i + 2))
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScanCli {
    pub(crate) path: Option<String>,
    pub(crate) json: bool,
    pub(crate) ci: bool,
    pub(crate) threshold: Option<f64>,
}

pub(crate) fn parse_scan_cli(args: &[String]) -> Result<ScanCli, String> {
    let mut out = ScanCli::default();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--path" => {
                let (v, next) = take_value(args, i, "--path")?;
                out.path = Some(v);
                i = next;
            }
            "--json" => {
                out.json = true;
                i += 1;
            }
            "--ci" => {
                out.ci = true;
                i += 1;
            }
            "--threshold" => {
                let (v, next) = take_value(args, i, "--threshold")?;
                out.threshold = Some(v.parse().map_err(|_| format!("invalid --threshold value: {v}"))?);
                i = next;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub(crate) enum FixCliMode {
    All,
    Check { check_id: String, obligation_id: Option<String> },
}

#[derive(Debug, Clone)]
pub(crate) struct FixCli {
    pub(crate) path: Option<String>,
    pub(crate) mode: FixCliMode,
}

pub(crate) fn parse_fix_cli(args: &[String]) -> Result<FixCli, String> {
    let mut path: Option<String> = None;
    let mut all = false;
    let mut check_id: Option<String> = None;
    let mut obligation_id: Option<String> = None;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--path" => {
                let (v, next) = take_value(args, i, "--path")?;
                path = Some(v);
                i = next;
            }
            "--all" => {
                all = true;
                i += 1;
            }
            "--check" => {
                let (v, next) = take_value(args, i, "--check")?;
                check_id = Some(v);
                i = next;
            }
            "--obligation" => {
                let (v, next) = take_value(args, i, "--obligation")?;
                obligation_id = Some(v);
                i = next;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    let mode = match (all, check_id) {
        (true, None) => FixCliMode::All,
        (false, Some(check_id)) => FixCliMode::Check { check_id, obligation_id },
        (true, Some(_)) => return Err("--all and --check are mutually exclusive".to_string()),
        (false, None) => return Err("fix requires --all or --check <id>".to_string()),
    };

    Ok(FixCli { path, mode })
}

#[derive(Debug, Clone, Default)]
pub(crate) struct UndoCli {
    pub(crate) path: Option<String>,
    pub(crate) id: Option<u64>,
}

pub(crate) fn parse_undo_cli(args: &[String]) -> Result<UndoCli, String> {
    let mut out = UndoCli::default();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--path" => {
                let (v, next) = take_value(args, i, "--path")?;
                out.path = Some(v);
                i = next;
            }
            "--id" => {
                let (v, next) = take_value(args, i, "--id")?;
                out.id = Some(v.parse().map_err(|_| format!("invalid --id value: {v}"))?);
                i = next;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PathOnlyCli {
    pub(crate) path: Option<String>,
}

pub(crate) fn parse_path_only_cli(args: &[String]) -> Result<PathOnlyCli, String> {
    let mut out = PathOnlyCli::default();
    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--path" => {
                let (v, next) = take_value(args, i, "--path")?;
                out.path = Some(v);
                i = next;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone)]
pub(crate) struct ReportCli {
    pub(crate) path: Option<String>,
    pub(crate) format: ReportFormat,
}

pub(crate) fn parse_report_cli(args: &[String]) -> Result<ReportCli, String> {
    let mut path: Option<String> = None;
    let mut format = ReportFormat::Markdown;

    let mut i = 0usize;
    while i < args.len() {
        match args[i].as_str() {
            "--path" => {
                let (v, next) = take_value(args, i, "--path")?;
                path = Some(v);
                i = next;
            }
            "--format" => {
                let (v, next) = take_value(args, i, "--format")?;
                format = match v.as_str() {
                    "markdown" => ReportFormat::Markdown,
                    "json" => ReportFormat::Json,
                    "pdf" => ReportFormat::Pdf,
                    other => return Err(format!("unknown report format: {other}")),
                };
                i = next;
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }
    Ok(ReportCli { path, format })
}
