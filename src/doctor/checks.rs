use std::process::Command;

use chrono::Utc;
use regex::Regex;

use crate::bootstrap::AppPaths;
use crate::config::{AppConfig, BackendKind};
use crate::doctor::report::{CheckResult, CheckStatus, DoctorReport, DoctorState};

const MIN_FFMPEG_VERSION: &str = "4.0";

pub fn run_doctor(paths: &AppPaths, config: &AppConfig) -> DoctorReport {
    let backend = config.session.backend;
    let checks = vec![
        check_binary_version(
            &config.media.ffmpeg_binary,
            MIN_FFMPEG_VERSION,
            true,
            Some("Install ffmpeg via your package manager or set media.ffmpeg_binary."),
        ),
        check_binary_version(
            &config.media.ffprobe_binary,
            MIN_FFMPEG_VERSION,
            true,
            Some("Install the ffmpeg package, which ships ffprobe, or set media.ffprobe_binary."),
        ),
        check_api_key(backend, config),
        check_endpoint(backend, config),
        check_clips_dir(paths),
    ];

    DoctorReport {
        generated_at_rfc3339: Utc::now().to_rfc3339(),
        state: aggregate_state(&checks),
        checks,
    }
}

fn aggregate_state(checks: &[CheckResult]) -> DoctorState {
    let required_failed = checks
        .iter()
        .any(|check| check.required && check.status == CheckStatus::Fail);
    let any_degraded = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Warn | CheckStatus::Fail));

    if required_failed {
        DoctorState::Unavailable
    } else if any_degraded {
        DoctorState::Degraded
    } else {
        DoctorState::Ready
    }
}

fn check_binary_version(
    binary: &str,
    min_version: &str,
    required: bool,
    remediation: Option<&str>,
) -> CheckResult {
    let path = match which::which(binary) {
        Ok(path) => path,
        Err(_) => {
            return CheckResult {
                name: binary.to_owned(),
                status: CheckStatus::Fail,
                detail: "binary not found in PATH".to_owned(),
                required,
                remediation: remediation.map(ToOwned::to_owned),
            }
        }
    };

    let found = version_output(binary)
        .as_deref()
        .and_then(parse_version_triplet);
    let Some(found) = found else {
        return CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Warn,
            detail: format!("installed at {}, version parse failed", path.display()),
            required,
            remediation: remediation.map(ToOwned::to_owned),
        };
    };

    if found >= parse_target_version(min_version) {
        CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Pass,
            detail: format!(
                "{} (>= {min_version}) at {}",
                version_triplet_string(&found),
                path.display()
            ),
            required,
            remediation: None,
        }
    } else {
        CheckResult {
            name: binary.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("{} (< {min_version})", version_triplet_string(&found)),
            required,
            remediation: remediation.map(ToOwned::to_owned),
        }
    }
}

fn version_output(binary: &str) -> Option<String> {
    // ffmpeg tools only understand the single-dash spelling on older builds.
    for flag in ["-version", "--version"] {
        let output = Command::new(binary).arg(flag).output().ok()?;
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        if !text.trim().is_empty() {
            return Some(text);
        }
    }
    None
}

fn parse_version_triplet(text: &str) -> Option<[u32; 3]> {
    let regex = Regex::new(r"version\s+n?(?P<a>\d+)\.(?P<b>\d+)(?:\.(?P<c>\d+))?").ok()?;
    let captures = regex.captures(text)?;

    let major = captures.name("a")?.as_str().parse::<u32>().ok()?;
    let minor = captures.name("b")?.as_str().parse::<u32>().ok()?;
    let patch = match captures.name("c") {
        Some(patch) => patch.as_str().parse::<u32>().ok()?,
        None => 0,
    };

    Some([major, minor, patch])
}

fn parse_target_version(text: &str) -> [u32; 3] {
    let mut parts = [0; 3];
    for (slot, part) in parts
        .iter_mut()
        .zip(text.split('.').filter_map(|part| part.parse::<u32>().ok()))
    {
        *slot = part;
    }
    parts
}

fn version_triplet_string(value: &[u32; 3]) -> String {
    format!("{}.{}.{}", value[0], value[1], value[2])
}

fn check_api_key(backend: BackendKind, config: &AppConfig) -> CheckResult {
    let (name, key, required, env_key) = match backend {
        BackendKind::Vision => (
            "vision_api_key",
            config.vision.api_key.as_deref(),
            false,
            "FRAMECAST_VISION_API_KEY",
        ),
        BackendKind::Live => (
            "live_api_key",
            config.live.api_key.as_deref(),
            true,
            "FRAMECAST_LIVE_API_KEY",
        ),
    };

    match key.map(str::trim).filter(|key| !key.is_empty()) {
        Some(_) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Pass,
            detail: "configured".to_owned(),
            required,
            remediation: None,
        },
        None if required => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Fail,
            detail: "not set".to_owned(),
            required,
            remediation: Some(format!("Export {env_key} or set it in config.toml.")),
        },
        None => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Skip,
            detail: "not set; requests are sent unauthenticated".to_owned(),
            required,
            remediation: None,
        },
    }
}

fn check_endpoint(backend: BackendKind, config: &AppConfig) -> CheckResult {
    let (name, endpoint, schemes): (&str, &str, &[&str]) = match backend {
        BackendKind::Vision => (
            "vision_endpoint",
            config.vision.endpoint.as_str(),
            &["http", "https"][..],
        ),
        BackendKind::Live => ("live_endpoint", config.live.endpoint.as_str(), &["ws", "wss"][..]),
    };

    match reqwest::Url::parse(endpoint) {
        Ok(url) if schemes.contains(&url.scheme()) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Pass,
            detail: endpoint.to_owned(),
            required: true,
            remediation: None,
        },
        Ok(url) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("unsupported scheme `{}`", url.scheme()),
            required: true,
            remediation: Some(format!("Use one of: {}.", schemes.join(", "))),
        },
        Err(error) => CheckResult {
            name: name.to_owned(),
            status: CheckStatus::Fail,
            detail: format!("invalid URL: {error}"),
            required: true,
            remediation: Some("Fix the endpoint in config.toml.".to_owned()),
        },
    }
}

fn check_clips_dir(paths: &AppPaths) -> CheckResult {
    let writable = std::fs::create_dir_all(&paths.clips_dir)
        .and_then(|()| tempfile::tempfile_in(&paths.clips_dir).map(drop));
    match writable {
        Ok(()) => CheckResult {
            name: "clips_dir".to_owned(),
            status: CheckStatus::Pass,
            detail: paths.clips_dir.display().to_string(),
            required: false,
            remediation: None,
        },
        Err(error) => CheckResult {
            name: "clips_dir".to_owned(),
            status: CheckStatus::Warn,
            detail: format!("{} is not writable: {error}", paths.clips_dir.display()),
            required: false,
            remediation: Some(
                "Windowed vision sessions need a writable cache directory.".to_owned(),
            ),
        },
    }
}
