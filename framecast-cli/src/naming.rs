//! Output file naming
//!
//! Generated names look like
//! `minimax_20250101_120000_a_red_kite_over_du_1b2c3d4e_i2v-01-director.mp4`:
//! provider, local timestamp, a sanitized prompt prefix, a stable prompt hash
//! and the model (plus the quality mode where the provider has one).

use chrono::{DateTime, Local};
use framecast_core::ProviderKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const PROMPT_PREFIX_CHARS: usize = 20;

/// Replaces everything except ASCII letters and digits with `_`
fn sanitize_prompt(prompt: &str) -> String {
    prompt
        .chars()
        .take(PROMPT_PREFIX_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Like the prompt, but keeps `-` and `.` which appear in model names
pub fn sanitize_model(model: &str) -> String {
    model
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// First 8 hex digits of the name-based UUID of the prompt
fn prompt_hash(prompt: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, prompt.as_bytes())
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect()
}

/// Builds a unique video file name
pub fn generate_filename(
    provider: ProviderKind,
    prompt: &str,
    model: &str,
    mode: Option<&str>,
    now: DateTime<Local>,
) -> String {
    let mut name = format!(
        "{}_{}_{}_{}_{}",
        provider.as_str(),
        now.format("%Y%m%d_%H%M%S"),
        sanitize_prompt(prompt),
        prompt_hash(prompt),
        sanitize_model(model),
    );
    if let Some(mode) = mode {
        name.push('_');
        name.push_str(&sanitize_model(mode));
    }
    name.push_str(".mp4");
    name
}

/// Default destination: `<output_dir>/<provider>/<model>/<generated name>`
pub fn default_output_path(
    output_dir: &Path,
    provider: ProviderKind,
    prompt: &str,
    model: &str,
    mode: Option<&str>,
) -> PathBuf {
    output_dir
        .join(provider.as_str())
        .join(sanitize_model(model))
        .join(generate_filename(provider, prompt, model, mode, Local::now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 14, 12, 0, 5).unwrap()
    }

    #[test]
    fn test_prompt_hash_matches_name_based_uuid() {
        // uuid5(NAMESPACE_DNS, "python.org") = 886313e1-3b8a-5372-9b90-0c9aee199e5d
        assert_eq!(prompt_hash("python.org"), "886313e1");
    }

    #[test]
    fn test_prompt_is_truncated_and_sanitized() {
        assert_eq!(
            sanitize_prompt("A Red Kite, over the dunes at dawn"),
            "a_red_kite__over_the"
        );
    }

    #[test]
    fn test_filename_layout() {
        let name = generate_filename(
            ProviderKind::MiniMax,
            "python.org",
            "I2V-01-Director",
            None,
            at_noon(),
        );
        assert_eq!(
            name,
            "minimax_20250314_120005_python_org_886313e1_i2v-01-director.mp4"
        );
    }

    #[test]
    fn test_filename_with_mode() {
        let name = generate_filename(
            ProviderKind::PiApiKling,
            "python.org",
            "2.0",
            Some("pro"),
            at_noon(),
        );
        assert_eq!(name, "kling_20250314_120005_python_org_886313e1_2.0_pro.mp4");
    }

    #[test]
    fn test_default_path_groups_by_provider_and_model() {
        let path = default_output_path(
            Path::new("outputs"),
            ProviderKind::Runway,
            "waves",
            "gen3a_turbo",
            None,
        );
        assert!(path.starts_with("outputs/runway/gen3a_turbo"));
        let file = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file.starts_with("runway_"));
        assert!(file.ends_with("_gen3a_turbo.mp4"));
    }
}
