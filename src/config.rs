//! Loads [`RecorderConfig`] from an optional TOML file and overlays CLI
//! flag overrides on top. Every field in [`RecorderConfig`] carries a
//! default via `#[serde(default)]`, so a config file only needs to name the
//! fields it wants to change.

use std::path::Path;

use hls_model::RecorderConfig;

use crate::cli::Args;

pub fn load(args: &Args) -> anyhow::Result<RecorderConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => RecorderConfig::default(),
    };

    if let Some(buffering_threshold) = args.buffering_threshold {
        config.buffering_threshold = buffering_threshold;
    }

    Ok(config)
}

fn read_config(path: &Path) -> anyhow::Result<RecorderConfig> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
    toml::from_str(&text).map_err(|e| anyhow::anyhow!("invalid config file {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::cli::RecorderIdArg;

    fn base_args() -> Args {
        Args {
            channel_url: "https://cdn.example.com/live.m3u8".to_string(),
            rec_dir: std::path::PathBuf::from("recording"),
            config: None,
            recorder_id: RecorderIdArg::HlsLive,
            buffering_threshold: None,
            log_dir: std::path::PathBuf::from("logs"),
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn no_config_file_uses_defaults() {
        let config = load(&base_args()).unwrap();
        assert_eq!(config.buffering_threshold, RecorderConfig::default().buffering_threshold);
    }

    #[test]
    fn config_file_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_segment_failures = 20").unwrap();

        let mut args = base_args();
        args.config = Some(file.path().to_path_buf());
        let config = load(&args).unwrap();

        assert_eq!(config.max_segment_failures, 20);
        assert_eq!(config.max_playlist_failures, RecorderConfig::default().max_playlist_failures);
    }

    #[test]
    fn cli_flag_overrides_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "buffering_threshold = 5").unwrap();

        let mut args = base_args();
        args.config = Some(file.path().to_path_buf());
        args.buffering_threshold = Some(9);
        let config = load(&args).unwrap();

        assert_eq!(config.buffering_threshold, 9);
    }
}
