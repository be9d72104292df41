use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Positioning and hit-testing strategy for the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum LayoutMode {
    #[default]
    #[value(name = "force")]
    #[serde(rename = "force")]
    ForceLayout,
    #[value(name = "radial")]
    #[serde(rename = "radial")]
    RadialCluster,
    #[value(name = "exploration")]
    #[serde(rename = "exploration")]
    ProximityExploration,
}

impl LayoutMode {
    pub const ALL: [Self; 3] = [
        Self::ForceLayout,
        Self::RadialCluster,
        Self::ProximityExploration,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ForceLayout => "Force layout",
            Self::RadialCluster => "Radial clusters",
            Self::ProximityExploration => "Exploration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub repulsion: f32,
    pub repulsion_cutoff: f32,
    pub spring: f32,
    pub rest_length: f32,
    pub cluster_pull: f32,
    pub damping: f32,
    pub max_force: f32,
    pub max_speed: f32,
    pub sleep_speed: f32,
    pub rest_energy: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            repulsion: 1800.0,
            repulsion_cutoff: 900.0,
            spring: 0.02,
            rest_length: 140.0,
            cluster_pull: 0.004,
            damping: 0.88,
            max_force: 40.0,
            max_speed: 12.0,
            sleep_speed: 0.01,
            rest_energy: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub smoothing: f32,
    pub zoom_min: f32,
    pub zoom_max: f32,
    pub focus_zoom: f32,
    pub wheel_step: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.08,
            zoom_min: 0.3,
            zoom_max: 2.5,
            focus_zoom: 1.6,
            wheel_step: 1.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    pub enabled: bool,
    pub zoom_threshold: f32,
    pub cell_size: f32,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            zoom_threshold: 0.6,
            cell_size: 400.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub label_min_zoom: f32,
    pub minimap_scale: f32,
    pub show_minimap: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            label_min_zoom: 0.45,
            minimap_scale: 0.06,
            show_minimap: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    pub avatar_speed: f32,
    pub proximity_radius: f32,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            avatar_speed: 10.0,
            proximity_radius: 140.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub mode: LayoutMode,
    pub layout: LayoutConfig,
    pub camera: CameraConfig,
    pub lod: LodConfig,
    pub render: RenderConfig,
    pub exploration: ExplorationConfig,
}

impl AtlasConfig {
    /// Clamps values that would break the camera or integrator.
    pub fn sanitized(mut self) -> Self {
        let camera = &mut self.camera;
        camera.smoothing = finite_or(camera.smoothing, 0.08).clamp(0.01, 1.0);
        camera.zoom_min = finite_or(camera.zoom_min, 0.3).max(0.01);
        camera.zoom_max = finite_or(camera.zoom_max, 2.5).max(camera.zoom_min);
        camera.focus_zoom = finite_or(camera.focus_zoom, 1.6).clamp(camera.zoom_min, camera.zoom_max);
        camera.wheel_step = finite_or(camera.wheel_step, 1.1).max(1.001);

        let layout = &mut self.layout;
        layout.damping = finite_or(layout.damping, 0.88).clamp(0.0, 0.99);
        layout.max_speed = finite_or(layout.max_speed, 12.0).max(0.1);
        layout.max_force = finite_or(layout.max_force, 40.0).max(0.1);

        self.lod.cell_size = finite_or(self.lod.cell_size, 400.0).max(1.0);
        self
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

pub fn config_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "cognitive-atlas")?;
    Some(proj.config_dir().join("atlas.toml"))
}

pub fn load_or_default(path: Option<&Path>) -> AtlasConfig {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(path) => path,
            None => return AtlasConfig::default(),
        },
    };
    load_or_default_from_path(&path)
}

fn load_or_default_from_path(path: &Path) -> AtlasConfig {
    let Ok(contents) = fs::read_to_string(path) else {
        return AtlasConfig::default();
    };
    match toml::from_str::<AtlasConfig>(&contents) {
        Ok(config) => config.sanitized(),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "ignoring malformed config");
            AtlasConfig::default()
        }
    }
}

pub fn save(cfg: &AtlasConfig, path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path().ok_or_else(|| anyhow::anyhow!("no config directory available"))?,
    };
    save_to_path(cfg, &path)?;
    Ok(path)
}

fn save_to_path(cfg: &AtlasConfig, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(cfg).context("failed to serialize atlas config")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write atlas config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atlas_config_roundtrip_save_load() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("atlas.toml");
        let mut cfg = AtlasConfig::default();
        cfg.mode = LayoutMode::RadialCluster;
        cfg.camera.focus_zoom = 1.7;

        save_to_path(&cfg, &path).expect("save config");
        let loaded = load_or_default_from_path(&path);

        assert_eq!(cfg, loaded);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let cfg: AtlasConfig = toml::from_str(
            r#"
mode = "exploration"

[camera]
zoom_max = 4.0
"#,
        )
        .expect("parse partial config");

        assert_eq!(cfg.mode, LayoutMode::ProximityExploration);
        assert_eq!(cfg.camera.zoom_max, 4.0);
        assert_eq!(cfg.camera.zoom_min, CameraConfig::default().zoom_min);
        assert_eq!(cfg.layout, LayoutConfig::default());
    }

    #[test]
    fn malformed_config_falls_back_to_default() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("atlas.toml");
        fs::write(&path, "mode = [").expect("write config");

        assert_eq!(load_or_default_from_path(&path), AtlasConfig::default());
    }

    #[test]
    fn sanitized_orders_zoom_bounds() {
        let mut cfg = AtlasConfig::default();
        cfg.camera.zoom_min = 2.0;
        cfg.camera.zoom_max = 0.5;
        cfg.camera.smoothing = f32::NAN;

        let cfg = cfg.sanitized();
        assert_eq!(cfg.camera.zoom_max, 2.0);
        assert_eq!(cfg.camera.focus_zoom, 2.0);
        assert_eq!(cfg.camera.smoothing, 0.08);
    }
}
