use complior_engine::service::{self, ApplicationState};
use rmcp::ServiceExt;

mod cli;

fn print_version() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

fn load_state(path: Option<String>) -> Result<ApplicationState, String> {
    let project_path = cli::default_project_path(path);
    let data_dir = cli::default_data_dir();
    let catalogue = complior_engine::catalogue::load(std::path::Path::new(&data_dir))
        .map_err(|e| format!("failed to load catalogue from {data_dir}: {e}"))?;
    Ok(ApplicationState::new(catalogue, project_path.into()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    match command {
        Some("version") | Some("--version") | Some("-V") => {
            print_version();
            return Ok(());
        }
        Some("help") | Some("--help") | Some("-h") => {
            cli::print_help();
            return Ok(());
        }
        Some("init") => {
            let parsed = match cli::parse_path_only_cli(&args[2..]) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(2);
                }
            };
            let project_path = cli::default_project_path(parsed.path);
            if let Err(e) = std::fs::create_dir_all(std::path::Path::new(&project_path).join(".complior")) {
                eprintln!("complior: failed to initialize {project_path}: {e}");
                std::process::exit(1);
            }
            println!("initialized complior project state in {project_path}/.complior");
            return Ok(());
        }
        Some("scan") => {
            let parsed = match cli::parse_scan_cli(&args[2..]) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(2);
                }
            };
            let mut state = match load_state(parsed.path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(1);
                }
            };
            let result = match service::scan(&mut state) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("complior: {}", e.message());
                    std::process::exit(1);
                }
            };

            if parsed.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "zone {:?}, score {:.2} ({} checks: {} passed, {} failed, {} skipped)",
                    result.score.zone,
                    result.score.total_score,
                    result.score.total_checks,
                    result.score.passed_checks,
                    result.score.failed_checks,
                    result.score.skipped_checks
                );
            }

            if parsed.ci {
                if let Some(threshold) = parsed.threshold {
                    if result.score.total_score < threshold {
                        eprintln!(
                            "complior: score {:.2} is below threshold {:.2}",
                            result.score.total_score, threshold
                        );
                        std::process::exit(2);
                    }
                }
            }
            return Ok(());
        }
        Some("fix") => {
            let parsed = match cli::parse_fix_cli(&args[2..]) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(2);
                }
            };
            let mut state = match load_state(parsed.path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = service::scan(&mut state) {
                eprintln!("complior: {}", e.message());
                std::process::exit(1);
            }

            match parsed.mode {
                cli::FixCliMode::All => match service::fix_apply_all(&mut state) {
                    Ok((results, summary)) => {
                        println!("{}", serde_json::to_string_pretty(&summary)?);
                        if summary.failed_count > 0 {
                            eprintln!("complior: {} of {} fixes failed", summary.failed_count, results.len());
                            std::process::exit(1);
                        }
                    }
                    Err(e) => {
                        eprintln!("complior: {}", e.message());
                        std::process::exit(1);
                    }
                },
                cli::FixCliMode::Check { check_id, obligation_id } => {
                    match service::fix_apply(&mut state, &check_id, obligation_id.as_deref()) {
                        Ok(result) => {
                            println!("{}", serde_json::to_string_pretty(&result)?);
                            if !result.applied {
                                std::process::exit(1);
                            }
                        }
                        Err(e) => {
                            eprintln!("complior: {}", e.message());
                            std::process::exit(1);
                        }
                    }
                }
            }
            return Ok(());
        }
        Some("report") => {
            let parsed = match cli::parse_report_cli(&args[2..]) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(2);
                }
            };
            let mut state = match load_state(parsed.path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = service::scan(&mut state) {
                eprintln!("complior: {}", e.message());
                std::process::exit(1);
            }
            match service::report(&state, parsed.format) {
                Ok(out) => {
                    println!("{}", out.content);
                }
                Err(e) => {
                    eprintln!("complior: {}", e.message());
                    std::process::exit(1);
                }
            }
            return Ok(());
        }
        Some("undo") => {
            let parsed = match cli::parse_undo_cli(&args[2..]) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(2);
                }
            };
            let mut state = match load_state(parsed.path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(1);
                }
            };
            match service::fix_undo(&mut state, parsed.id) {
                Ok(validation) => println!("{}", serde_json::to_string_pretty(&validation)?),
                Err(e) => {
                    eprintln!("complior: {}", e.message());
                    std::process::exit(1);
                }
            }
            return Ok(());
        }
        Some("status") => {
            let parsed = match cli::parse_path_only_cli(&args[2..]) {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(2);
                }
            };
            let state = match load_state(parsed.path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("complior: {e}");
                    std::process::exit(1);
                }
            };
            println!("{}", serde_json::to_string_pretty(&service::status(&state))?);
            return Ok(());
        }
        Some("serve") | Some("mcp-server") => {}
        Some(other) => {
            eprintln!(
                "complior: unknown command `{other}`; use init|scan|fix|report|undo|status, or no args to start the MCP server"
            );
            std::process::exit(2);
        }
        None => {}
    }

    let state = load_state(None).map_err(|e| -> Box<dyn std::error::Error> { e.into() })?;
    let server = complior_engine::server::ComplierServer::new(state);
    let service = server.serve(complior_engine::mcp_stdio::HybridStdioTransport::new()).await?;
    service.waiting().await?;
    Ok(())
}
