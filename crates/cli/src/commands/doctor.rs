use std::path::PathBuf;

use serde::Serialize;

use tramite_client::{ApiError, ApprovalsApi, ProfileStorage, RestClient, SessionStore};
use tramite_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use crate::commands::CommandResult;

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

pub async fn run(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    offline: bool,
    json_output: bool,
) -> CommandResult {
    let report = build_report(config_path, overrides, offline).await;
    let exit_code = u8::from(report.overall_status != CheckStatus::Pass);

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!("{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed: {error}\"}}")
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

async fn build_report(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
    offline: bool,
) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions { config_path, require_file: false, overrides }) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_owned(),
            });
            checks.push(check_storage(&config));
            checks.push(check_backend(&config, offline).await);
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["storage_writability", "backend_reachability"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_owned(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    DoctorReport {
        overall_status: if all_pass { CheckStatus::Pass } else { CheckStatus::Fail },
        summary: if all_pass {
            "doctor: all readiness checks passed".to_owned()
        } else {
            "doctor: one or more readiness checks failed".to_owned()
        },
        checks,
    }
}

fn check_storage(config: &AppConfig) -> DoctorCheck {
    let storage = ProfileStorage::new(config.storage.dir.clone());
    let probe_dir = storage.dir().to_path_buf();
    let probe = probe_dir.join(".doctor_probe");

    let result = std::fs::create_dir_all(&probe_dir)
        .and_then(|()| std::fs::write(&probe, b"probe"))
        .and_then(|()| std::fs::remove_file(&probe));

    match result {
        Ok(()) => DoctorCheck {
            name: "storage_writability",
            status: CheckStatus::Pass,
            details: format!("session storage is writable at `{}`", probe_dir.display()),
        },
        Err(error) => DoctorCheck {
            name: "storage_writability",
            status: CheckStatus::Fail,
            details: format!("could not write under `{}`: {error}", probe_dir.display()),
        },
    }
}

/// Any HTTP answer counts as reachable - an unauthenticated `401` proves the
/// backend is there. Only a transport failure fails the check.
async fn check_backend(config: &AppConfig, offline: bool) -> DoctorCheck {
    if offline {
        return DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: "offline mode uses the in-process backend".to_owned(),
        };
    }

    let session = SessionStore::new(ProfileStorage::new(config.storage.dir.clone()));
    let client = match RestClient::new(&config.api, session) {
        Ok(client) => client,
        Err(error) => {
            return DoctorCheck {
                name: "backend_reachability",
                status: CheckStatus::Fail,
                details: format!("backend client did not initialize: {error}"),
            }
        }
    };

    match client.users().await {
        Ok(_) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!("backend answered at `{}`", config.api.base_url),
        },
        Err(ApiError::Transport(details)) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Fail,
            details: format!("could not reach `{}`: {details}", config.api.base_url),
        },
        Err(error) => DoctorCheck {
            name: "backend_reachability",
            status: CheckStatus::Pass,
            details: format!(
                "backend answered at `{}` ({})",
                config.api.base_url,
                error.user_message()
            ),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
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
