use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

pub const DEFAULT_BASE_IMAGE: &str = "alpine:latest";

fn from_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*FROM\s+(.+)$").expect("static regex"))
}

/// First base image declared in `contents`, skipping `--platform=...` style
/// flags in front of the reference.
pub fn detect_base_image(contents: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let caps = from_line().captures(line)?;
        caps[1]
            .split_whitespace()
            .find(|token| !token.starts_with("--"))
            .map(str::to_string)
    })
}

/// Read the descriptor and detect its base image. An unreadable file or a
/// file with no `FROM` line yields the default image.
pub fn detect_from_file(descriptor: &Path) -> String {
    let detected = match std::fs::read_to_string(descriptor) {
        Ok(contents) => detect_base_image(&contents),
        Err(e) => {
            tracing::warn!(path = %descriptor.display(), error = %e, "could not read build descriptor");
            None
        }
    };

    match detected {
        Some(image) => {
            tracing::info!(image = %image, "detected base image");
            image
        }
        None => {
            tracing::info!(image = DEFAULT_BASE_IMAGE, "no base image declared, using default");
            DEFAULT_BASE_IMAGE.to_string()
        }
    }
}
