use std::ffi::OsString;
use std::path::PathBuf;

use clap::{value_parser, Arg, ArgMatches, Command};

use crate::{baseline::AssetBaseline, exercises};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub baseline: AssetBaseline,
    /// Zero-based catalog index.
    pub exercise: usize,
    pub snippet_dir: PathBuf,
}

pub fn command() -> Command {
    Command::new("animlab")
        .about("Guided animation exercises for a glTF character")
        .arg(
            Arg::new("variant")
                .long("variant")
                .help("Character preset the lesson runs with")
                .value_parser(AssetBaseline::PRESETS)
                .default_value("soldier"),
        )
        .arg(
            Arg::new("asset")
                .long("asset")
                .help("glTF/GLB file to load instead of the preset's asset")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("exercise")
                .long("exercise")
                .help("Exercise to open first, starting at 1")
                .value_parser(value_parser!(u64).range(1..=exercises::CATALOG.len() as u64))
                .default_value("1"),
        )
        .arg(
            Arg::new("snippets")
                .long("snippets")
                .help("Directory saved snippets are written to")
                .value_parser(value_parser!(PathBuf))
                .default_value("snippets"),
        )
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = command().try_get_matches_from(args)?;
        Ok(Self::from_matches(&matches))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        let variant = matches
            .get_one::<String>("variant")
            .map(String::as_str)
            .unwrap_or("soldier");
        let mut baseline = AssetBaseline::preset(variant).unwrap_or_default();
        if let Some(path) = matches.get_one::<PathBuf>("asset") {
            baseline = baseline.with_asset_path(path);
        }

        Self {
            baseline,
            exercise: matches.get_one::<u64>("exercise").copied().unwrap_or(1) as usize - 1,
            snippet_dir: matches
                .get_one::<PathBuf>("snippets")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("snippets")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_soldier_and_first_exercise() {
        let config = Config::from_args(["animlab"]).unwrap();
        assert_eq!(config.baseline, AssetBaseline::soldier());
        assert_eq!(config.exercise, 0);
        assert_eq!(config.snippet_dir, PathBuf::from("snippets"));
    }

    #[test]
    fn asset_overrides_preset_path() {
        let config =
            Config::from_args(["animlab", "--variant", "fox", "--asset", "my/Fox.gltf"]).unwrap();
        assert_eq!(config.baseline.name, "fox");
        assert_eq!(config.baseline.asset_path, PathBuf::from("my/Fox.gltf"));
    }

    #[test]
    fn exercise_is_one_based_and_bounded() {
        let config = Config::from_args(["animlab", "--exercise", "3"]).unwrap();
        assert_eq!(config.exercise, 2);

        assert!(Config::from_args(["animlab", "--exercise", "0"]).is_err());
        let too_far = (exercises::CATALOG.len() + 1).to_string();
        assert!(Config::from_args(["animlab", "--exercise", too_far.as_str()]).is_err());
        assert!(Config::from_args(["animlab", "--variant", "dragon"]).is_err());
    }
}
