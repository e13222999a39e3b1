//! Icon and background paths for a weather category.

use std::path::{Path, PathBuf};

use crate::types::{DayPhase, WeatherCategory, WeatherError};

const ASSET_PREFIX: &str = "assets";

/// `assets/icons/{slug}_{day|night}.png`
pub fn icon_path(category: WeatherCategory, phase: DayPhase) -> String {
    format!(
        "{}/icons/{}_{}.png",
        ASSET_PREFIX,
        category.slug(),
        phase.slug()
    )
}

/// `assets/backgrounds/{slug}_{day|night}.jpeg`
pub fn background_path(category: WeatherCategory, phase: DayPhase) -> String {
    format!(
        "{}/backgrounds/{}_{}.jpeg",
        ASSET_PREFIX,
        category.slug(),
        phase.slug()
    )
}

/// Maps the fixed `assets/...` paths onto an asset directory on disk.
#[derive(Debug, Clone)]
pub struct AssetLocator {
    root: PathBuf,
}

impl AssetLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an asset path against the root, failing if the file is absent.
    pub fn locate(&self, asset_path: &str) -> Result<PathBuf, WeatherError> {
        let relative = Path::new(asset_path);
        let relative = relative.strip_prefix(ASSET_PREFIX).unwrap_or(relative);
        let full = self.root.join(relative);

        if full.is_file() {
            Ok(full)
        } else {
            Err(WeatherError::AssetMissing(full))
        }
    }

    /// Every asset file that should exist but doesn't.
    pub fn missing(&self) -> Vec<PathBuf> {
        let phases = [DayPhase::Day, DayPhase::Night];
        WeatherCategory::ALL
            .iter()
            .flat_map(|category| {
                phases.iter().flat_map(move |phase| {
                    [
                        icon_path(*category, *phase),
                        background_path(*category, *phase),
                    ]
                })
            })
            .filter_map(|path| match self.locate(&path) {
                Err(WeatherError::AssetMissing(full)) => Some(full),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::classify;

    #[test]
    fn test_icon_path_format() {
        assert_eq!(
            icon_path(WeatherCategory::Clear, DayPhase::Day),
            "assets/icons/clear_day.png"
        );
        assert_eq!(
            icon_path(WeatherCategory::ThunderStorm, DayPhase::Night),
            "assets/icons/thunderstorm_night.png"
        );
    }

    #[test]
    fn test_background_path_format() {
        assert_eq!(
            background_path(WeatherCategory::Snowy, DayPhase::Night),
            "assets/backgrounds/snowy_night.jpeg"
        );
    }

    #[test]
    fn test_every_code_yields_well_formed_paths() {
        for code in -5..=105 {
            for phase in [DayPhase::Day, DayPhase::Night] {
                let category = classify(code);
                let icon = icon_path(category, phase);
                let background = background_path(category, phase);
                assert!(icon.starts_with("assets/icons/") && icon.ends_with(".png"));
                assert!(
                    background.starts_with("assets/backgrounds/") && background.ends_with(".jpeg")
                );
                assert!(icon.contains(category.slug()));
            }
        }
    }

    #[test]
    fn test_locate_existing_asset() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("icons")).unwrap();
        std::fs::write(dir.path().join("icons/clear_day.png"), b"png").unwrap();

        let locator = AssetLocator::new(dir.path());
        let found = locator
            .locate(&icon_path(WeatherCategory::Clear, DayPhase::Day))
            .unwrap();
        assert_eq!(found, dir.path().join("icons/clear_day.png"));
    }

    #[test]
    fn test_locate_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let locator = AssetLocator::new(dir.path());
        let err = locator
            .locate(&background_path(WeatherCategory::Foggy, DayPhase::Night))
            .unwrap_err();
        assert!(matches!(err, WeatherError::AssetMissing(p) if p.ends_with("foggy_night.jpeg")));
    }

    #[test]
    fn test_missing_lists_all_28_files_for_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        let locator = AssetLocator::new(dir.path());
        assert_eq!(locator.missing().len(), 28);
    }
}
