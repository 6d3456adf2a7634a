use clap::Parser;
use std::path::PathBuf;
use track_frame_lib::Config;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Track Frame - Convert GPS tracks into event-relative x,y,t tables along reference axes
pub struct Settings {
    /// Directory containing the .gpx files to convert
    #[clap(short, long, value_name = "DIR")]
    pub gpx_dir: PathBuf,

    /// GeoJSON FeatureCollection with the reference axes and their events
    #[clap(short, long, value_name = "FILE")]
    pub refs: PathBuf,

    /// Output directory, receives <event>/<segment>.csv
    #[clap(short, long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Worker threads (default: one per core)
    #[clap(short, long)]
    pub threads: Option<usize>,

    /// Process everything on the main thread
    #[clap(long, default_value = "false")]
    pub sequential: bool,

    /// Log debug diagnostics (overridden by RUST_LOG)
    #[clap(short, long, default_value = "false")]
    pub verbose: bool,

    /// Exit with an error if any axis was rejected or any combination failed
    #[clap(long, default_value = "false")]
    pub strict: bool,
}

impl Settings {
    /// Parse the command line, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn pipeline_config(&self) -> Config {
        Config {
            parallel: !self.sequential,
            threads: self.threads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_paths() {
        let settings = Settings::try_parse_from([
            "track-frame",
            "--gpx-dir",
            "gpx/",
            "--refs",
            "refs.geojson",
            "--out-dir",
            "out/",
        ])
        .unwrap();
        assert_eq!(settings.gpx_dir, PathBuf::from("gpx/"));
        assert_eq!(settings.refs, PathBuf::from("refs.geojson"));
        assert_eq!(settings.out_dir, PathBuf::from("out/"));
        assert!(!settings.strict);

        let config = settings.pipeline_config();
        assert!(config.parallel);
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_missing_argument_is_rejected() {
        assert!(Settings::try_parse_from(["track-frame", "--gpx-dir", "gpx/"]).is_err());
    }

    #[test]
    fn test_execution_flags() {
        let settings = Settings::try_parse_from([
            "track-frame",
            "-g",
            "gpx/",
            "-r",
            "refs.geojson",
            "-o",
            "out/",
            "--threads",
            "4",
            "--sequential",
            "--strict",
            "-v",
        ])
        .unwrap();
        assert!(settings.verbose);
        assert!(settings.strict);

        let config = settings.pipeline_config();
        assert!(!config.parallel);
        assert_eq!(config.threads, Some(4));
    }
}
