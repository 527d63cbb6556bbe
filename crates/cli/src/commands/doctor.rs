use serde::Serialize;
use sheetbot_core::config::{AppConfig, LoadOptions};
use sheetbot_core::LookupService;

use crate::commands::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let export_binary = check_export_binary(&config.svn.binary);
            let source_columns = if export_binary.status == CheckStatus::Pass {
                check_source_columns(&config)
            } else {
                DoctorCheck {
                    name: "source_columns",
                    status: CheckStatus::Skipped,
                    details: "skipped because the export binary is unavailable".to_string(),
                }
            };
            checks.push(export_binary);
            checks.push(source_columns);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "export_binary",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
            checks.push(DoctorCheck {
                name: "source_columns",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_export_binary(binary: &str) -> DoctorCheck {
    match which::which(binary) {
        Ok(path) => DoctorCheck {
            name: "export_binary",
            status: CheckStatus::Pass,
            details: format!("`{binary}` resolved to {}", path.display()),
        },
        Err(error) => DoctorCheck {
            name: "export_binary",
            status: CheckStatus::Fail,
            details: format!("`{binary}` is not installed or not on PATH: {error}"),
        },
    }
}

/// Exports the configured source once and checks its header against the search settings.
fn check_source_columns(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "source_columns",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let lookup = LookupService::from_config(config);
    match runtime.block_on(lookup.verify_columns()) {
        Ok(()) => DoctorCheck {
            name: "source_columns",
            status: CheckStatus::Pass,
            details: format!(
                "`{}` and {} found in {}",
                config.search.search_column,
                config.search.return_columns.join(", "),
                config.svn.url
            ),
        },
        Err(error) => DoctorCheck {
            name: "source_columns",
            status: CheckStatus::Fail,
            details: format!("{} check failed: {error}", error.class()),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
