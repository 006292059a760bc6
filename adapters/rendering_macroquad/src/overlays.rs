use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use macroquad::texture::Texture2D;
use stabilize_rendering::{OverlayKey, OverlaySet};

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Cache of overlay textures loaded from an asset manifest.
///
/// Every entry is optional. Entries that are missing from the manifest or
/// whose image cannot be read are simply absent, and scenes fall back to
/// their procedural visuals for them.
#[derive(Debug, Default)]
pub struct OverlayAtlas {
    textures: HashMap<OverlayKey, Texture2D>,
}

impl OverlayAtlas {
    /// Loads overlays from the manifest located at the provided path.
    pub fn from_manifest_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_manifest_with_loader(path, default_loader)
    }

    /// Returns the default manifest path relative to the working directory.
    #[must_use]
    pub fn default_manifest_path() -> PathBuf {
        PathBuf::from("assets/manifest.toml")
    }

    /// Returns whether the atlas contains the provided key.
    #[must_use]
    pub fn contains(&self, key: OverlayKey) -> bool {
        self.textures.contains_key(&key)
    }

    /// Retrieves the texture associated with the provided key.
    #[must_use]
    pub fn texture(&self, key: OverlayKey) -> Option<Texture2D> {
        self.textures.get(&key).copied()
    }

    /// Set of overlays that scenes may reference.
    #[must_use]
    pub fn available(&self) -> OverlaySet {
        self.textures.keys().copied().collect()
    }

    fn from_manifest_with_loader(
        path: impl AsRef<Path>,
        mut loader: impl FnMut(OverlayKey, &Path) -> Result<Texture2D>,
    ) -> Result<Self> {
        let manifest_path = path.as_ref();
        let contents = fs::read_to_string(manifest_path).with_context(|| {
            format!(
                "failed to read overlay manifest at {}",
                manifest_path.display()
            )
        })?;
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let entries = parse_manifest(&contents, &base)?;
        Ok(Self::from_entries(entries, &mut loader))
    }

    fn from_entries(
        entries: Vec<(OverlayKey, PathBuf)>,
        loader: &mut impl FnMut(OverlayKey, &Path) -> Result<Texture2D>,
    ) -> Self {
        let mut textures = HashMap::with_capacity(entries.len());
        for (key, path) in entries {
            match loader(key, &path) {
                Ok(texture) => {
                    let _ = textures.insert(key, texture);
                }
                Err(error) => {
                    log::warn!(
                        "overlay {} unavailable, using fallback: {error:#}",
                        key.name()
                    );
                }
            }
        }
        Self { textures }
    }
}

fn default_loader(_key: OverlayKey, path: &Path) -> Result<Texture2D> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read overlay image at {}", path.display()))?;
    Ok(Texture2D::from_file_with_format(&bytes, None))
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    version: u32,
    #[serde(default)]
    overlays: HashMap<String, String>,
}

fn parse_manifest(contents: &str, base_path: &Path) -> Result<Vec<(OverlayKey, PathBuf)>> {
    let manifest: Manifest =
        toml::from_str(contents).context("failed to parse overlay manifest toml contents")?;
    if manifest.version != SUPPORTED_MANIFEST_VERSION {
        bail!(
            "unsupported overlay manifest version {}; expected {}",
            manifest.version,
            SUPPORTED_MANIFEST_VERSION
        );
    }

    let mut resolved = HashMap::new();
    for (name, relative_path) in manifest.overlays {
        let Some(key) = OverlayKey::from_name(&name) else {
            bail!("unknown overlay key `{name}` in manifest");
        };
        let _ = resolved.insert(key, base_path.join(relative_path));
    }

    Ok(OverlayKey::ALL
        .into_iter()
        .filter_map(|key| resolved.remove(&key).map(|path| (key, path)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::RefCell;

    #[test]
    fn manifest_entries_are_optional() {
        let manifest = r#"
            version = 1

            [overlays]
            play_idle = "ui/play_idle.png"
        "#;

        let parsed = parse_manifest(manifest, Path::new("assets")).expect("manifest should parse");
        assert_eq!(
            parsed,
            vec![(OverlayKey::PlayIdle, PathBuf::from("assets/ui/play_idle.png"))]
        );
    }

    #[test]
    fn manifest_without_overlay_table_is_empty() {
        let parsed = parse_manifest("version = 1\n", Path::new(".")).expect("manifest parses");
        assert!(parsed.is_empty());
    }

    #[test]
    fn manifest_rejects_unknown_keys() {
        let manifest = r#"
            version = 1

            [overlays]
            lane_glass_overlay = "lanes/glass.png"
            sparkles = "extra.png"
        "#;

        let result = parse_manifest(manifest, Path::new("assets"));
        assert!(result.is_err(), "unknown keys must be rejected");
    }

    #[test]
    fn manifest_rejects_other_versions() {
        let result = parse_manifest("version = 2\n", Path::new("assets"));
        assert!(result.is_err());
    }

    #[test]
    fn manifest_lists_entries_in_canonical_order() {
        let manifest = r#"
            version = 1

            [overlays]
            play_pressed = "ui/pressed.png"
            bg_grain_vignette = "bg.png"
            waveform_panel_bg = "panel.png"
        "#;

        let keys: Vec<_> = parse_manifest(manifest, Path::new("root"))
            .expect("manifest should parse")
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(
            keys,
            vec![
                OverlayKey::BgGrainVignette,
                OverlayKey::WaveformPanelBg,
                OverlayKey::PlayPressed,
            ]
        );
    }

    #[test]
    fn failed_images_are_skipped() {
        let entries = vec![
            (OverlayKey::BgGrainVignette, PathBuf::from("bg.png")),
            (OverlayKey::PlayIdle, PathBuf::from("missing.png")),
        ];
        let attempts = RefCell::new(Vec::new());
        let atlas = OverlayAtlas::from_entries(entries, &mut |key, _| {
            attempts.borrow_mut().push(key);
            if key == OverlayKey::PlayIdle {
                Err(anyhow!("no such file"))
            } else {
                Ok(Texture2D::empty())
            }
        });

        assert_eq!(attempts.borrow().len(), 2);
        assert!(atlas.contains(OverlayKey::BgGrainVignette));
        assert!(!atlas.contains(OverlayKey::PlayIdle));
        let available = atlas.available();
        assert!(available.contains(OverlayKey::BgGrainVignette));
        assert!(!available.contains(OverlayKey::PlayIdle));
    }
}
