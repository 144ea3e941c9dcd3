use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::config::{AcquisitionMode, RunConfig, DEFAULT_TIMEOUT_SECS};
use crate::dimensions::SizeBounds;

/// Download all images from a webpage
#[derive(Parser, Debug)]
#[command(name = "imgpull", version, about)]
pub struct Cli {
    /// URL of the webpage to download images from (http or https)
    #[arg(value_parser = parse_page_url)]
    pub url: String,

    /// Directory to save downloaded images (created if missing)
    #[arg(value_parser = parse_output_dir)]
    pub output_dir: PathBuf,

    /// Minimum image width in pixels (filter out narrower images)
    #[arg(long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    pub min_width: Option<u32>,

    /// Minimum image height in pixels (filter out shorter images)
    #[arg(long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    pub min_height: Option<u32>,

    /// Maximum image width in pixels (filter out wider images)
    #[arg(long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_width: Option<u32>,

    /// Maximum image height in pixels (filter out taller images)
    #[arg(long, value_name = "PIXELS", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_height: Option<u32>,

    /// Render the page in headless Chrome and capture images as displayed.
    /// Use for pages that build their images with JavaScript.
    #[arg(long, visible_alias = "playwright", default_value_t = false)]
    pub render: bool,

    /// Timeout in seconds for each page load, download or capture
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn into_config(self) -> RunConfig {
        let mut config = RunConfig::new(self.url, self.output_dir);
        config.bounds = SizeBounds {
            min_width: self.min_width,
            min_height: self.min_height,
            max_width: self.max_width,
            max_height: self.max_height,
        };
        if self.render {
            config.mode = AcquisitionMode::Rendered;
        }
        config.timeout = Duration::from_secs(self.timeout);
        config.verbose = self.verbose;
        config
    }
}

fn parse_page_url(value: &str) -> Result<String, String> {
    let parsed = Url::parse(value).map_err(|e| format!("invalid URL '{}': {}", value, e))?;
    match parsed.scheme() {
        "http" | "https" => Ok(value.to_string()),
        other => Err(format!(
            "invalid URL scheme '{}', only 'http' and 'https' are supported",
            other
        )),
    }
}

fn parse_output_dir(value: &str) -> Result<PathBuf, String> {
    if value.trim().is_empty() {
        return Err("output directory path cannot be empty".to_string());
    }
    let path = PathBuf::from(value);
    if path.exists() && !path.is_dir() {
        return Err(format!("'{}' exists but is not a directory", value));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("imgpull").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn minimal_arguments_give_static_unfiltered_run() {
        let config = parse(&["https://example.com", "/tmp/output"])
            .unwrap()
            .into_config();

        assert_eq!(config.url, "https://example.com");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/output"));
        assert_eq!(config.mode, AcquisitionMode::Static);
        assert!(!config.bounds.is_active());
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(!config.verbose);
    }

    #[test]
    fn all_options_are_carried_into_config() {
        let config = parse(&[
            "https://example.com",
            "/tmp/output",
            "--min-width",
            "800",
            "--min-height",
            "600",
            "--max-width",
            "4000",
            "--max-height",
            "3000",
            "--render",
            "--timeout",
            "30",
            "--verbose",
        ])
        .unwrap()
        .into_config();

        assert_eq!(
            config.bounds,
            SizeBounds {
                min_width: Some(800),
                min_height: Some(600),
                max_width: Some(4000),
                max_height: Some(3000),
            }
        );
        assert_eq!(config.mode, AcquisitionMode::Rendered);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.verbose);
    }

    #[test]
    fn playwright_alias_selects_rendered_mode() {
        let cli = parse(&["https://example.com", "/tmp/output", "--playwright"]).unwrap();
        assert!(cli.render);
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(parse(&["ftp://example.com", "/tmp/output"]).is_err());
        assert!(parse(&["example.com", "/tmp/output"]).is_err());
        assert!(parse(&["not a url", "/tmp/output"]).is_err());
    }

    #[test]
    fn rejects_non_positive_sizes() {
        for bad in ["0", "-100", "abc", "1.5"] {
            assert!(
                parse(&["https://example.com", "/tmp/output", "--min-width", bad]).is_err(),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn rejects_output_path_that_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();

        assert!(parse(&["https://example.com", file.to_str().unwrap()]).is_err());
        assert!(parse(&["https://example.com", ""]).is_err());
        assert!(parse(&["https://example.com", dir.path().to_str().unwrap()]).is_ok());
    }

    #[test]
    fn url_and_output_are_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["https://example.com"]).is_err());
    }
}
