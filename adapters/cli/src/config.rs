use std::{fs, path::Path};

use anyhow::{Context, Result};
use rockfall_core::tuning::GameTuning;

/// Loads tuning from a TOML file, or the built-in defaults when no path is given.
pub(crate) fn load_tuning(path: Option<&Path>) -> Result<GameTuning> {
    let Some(path) = path else {
        return Ok(GameTuning::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read tuning file at {}", path.display()))?;
    parse_tuning(&contents)
        .with_context(|| format!("invalid tuning file at {}", path.display()))
}

/// Parses tuning TOML. Missing tables and keys keep their defaults.
pub(crate) fn parse_tuning(contents: &str) -> Result<GameTuning> {
    toml::from_str(contents).context("failed to parse tuning toml contents")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rockfall_core::TimeBase;

    #[test]
    fn empty_file_yields_defaults() {
        let tuning = parse_tuning("").expect("empty toml is valid");
        assert_eq!(tuning, GameTuning::default());
    }

    #[test]
    fn partial_tables_override_only_their_keys() {
        let tuning = parse_tuning(
            r#"
            [difficulty]
            increase_interval = 5.0

            [scaling.rock_fall_speed]
            base = 8.0
            per_level = 1.2
            bound = 24.0

            [spawning]
            blinks_before_drop = 2
            time_base = "presentation"
            rock_spawn_x = { min = -5.0, max = 5.0 }
            "#,
        )
        .expect("partial toml is valid");

        assert_eq!(tuning.difficulty.increase_interval, 5.0);
        assert_eq!(tuning.scaling.rock_fall_speed.bound, 24.0);
        assert_eq!(tuning.scaling.spawn_delay, GameTuning::default().scaling.spawn_delay);
        assert_eq!(tuning.spawning.blinks_before_drop, 2);
        assert_eq!(tuning.spawning.time_base, TimeBase::Presentation);
        assert_eq!(tuning.spawning.rock_spawn_x.max, 5.0);
        assert_eq!(tuning.spawning.wolves_per_line, 3);
    }

    #[test]
    fn malformed_values_are_reported() {
        let error = parse_tuning("[phases]\ndanger_phase_start = \"soon\"\n")
            .expect_err("string threshold must fail");
        assert!(error.to_string().contains("tuning"), "{error:#}");
    }

    #[test]
    fn missing_file_names_the_path() {
        let path = std::env::temp_dir().join("rockfall-missing-tuning.toml");
        let _ = fs::remove_file(&path);
        let error = load_tuning(Some(&path)).expect_err("file does not exist");
        assert!(format!("{error:#}").contains("rockfall-missing-tuning.toml"));
    }

    #[test]
    fn tuning_file_is_read_from_disk() {
        let path = std::env::temp_dir().join(format!("rockfall-tuning-{}.toml", std::process::id()));
        fs::write(&path, "[session]\ntime_limit = 30.0\n").expect("temp file is writable");
        let tuning = load_tuning(Some(&path)).expect("tuning file is valid");
        let _ = fs::remove_file(&path);
        assert_eq!(tuning.session.time_limit, 30.0);
    }
}
