use std::{collections::HashMap, path::Path};

use image::imageops::FilterType;

use crate::{
    render::{Affine, Canvas, Picture, TextRenderer, GRAY, WHITE},
    LyricVideoError, Result,
};

/// Every sprite is normalised to a square of this many pixels.
pub const SPRITE_SIZE: u32 = 200;
const LABEL_FONT_SIZE: f32 = 24.0;

/// Sprites referenced by the keyword effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteId {
    Megaphone,
    KendrickSilhouette,
    Grammy,
    SearchLight,
    House,
    Clippers,
    BoxingGlove,
    PharrellHat,
    OvoOwl,
}

impl SpriteId {
    pub const ALL: [SpriteId; 9] = [
        SpriteId::Megaphone,
        SpriteId::KendrickSilhouette,
        SpriteId::Grammy,
        SpriteId::SearchLight,
        SpriteId::House,
        SpriteId::Clippers,
        SpriteId::BoxingGlove,
        SpriteId::PharrellHat,
        SpriteId::OvoOwl,
    ];

    /// File stem looked up in the assets directory.
    pub fn name(self) -> &'static str {
        match self {
            SpriteId::Megaphone => "megaphone",
            SpriteId::KendrickSilhouette => "kendrick_silhouette",
            SpriteId::Grammy => "grammy",
            SpriteId::SearchLight => "search_light",
            SpriteId::House => "house",
            SpriteId::Clippers => "clippers",
            SpriteId::BoxingGlove => "boxing_glove",
            SpriteId::PharrellHat => "pharrell_hat",
            SpriteId::OvoOwl => "ovo_owl",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.png", self.name())
    }
}

/// A 200x200 picture, either decoded from disk or generated.
#[derive(Debug, Clone)]
pub struct Sprite {
    picture: Picture,
    placeholder: bool,
}

impl Sprite {
    /// Gray square with `label` written across the middle.
    pub fn placeholder(label: &str, text: &mut TextRenderer) -> Self {
        let side = SPRITE_SIZE as f32;
        let size = text.fit_size(label, side - 20.0, LABEL_FONT_SIZE);
        let block = text.layout(label, size, WHITE);
        let y = (side - block.height()) / 2.0;

        let mut canvas = Canvas::new(SPRITE_SIZE, SPRITE_SIZE);
        canvas.fill(GRAY);
        canvas.paint(|p| p.text(&block, Affine::translate((10.0, f64::from(y)))));
        Self {
            picture: Picture::from_canvas(&canvas),
            placeholder: true,
        }
    }

    fn decoded(image: &image::DynamicImage) -> Result<Self> {
        let resized = image::imageops::resize(
            &image.to_rgba8(),
            SPRITE_SIZE,
            SPRITE_SIZE,
            FilterType::Triangle,
        );
        Ok(Self {
            picture: Picture::from_rgba(&resized)?,
            placeholder: false,
        })
    }

    pub fn picture(&self) -> &Picture {
        &self.picture
    }

    pub fn width(&self) -> u32 {
        self.picture.width()
    }

    pub fn height(&self) -> u32 {
        self.picture.height()
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// Registry for all sprites used by the effect catalog.
#[derive(Debug)]
pub struct AssetStore {
    sprites: HashMap<SpriteId, Sprite>,
    fallback: Sprite,
}

impl AssetStore {
    /// Loads every sprite from `root`. Files that are missing or fail to
    /// decode are replaced by placeholders, so this never fails.
    pub fn load_dir(root: impl AsRef<Path>, text: &mut TextRenderer) -> Self {
        let root = root.as_ref();
        let sprites = SpriteId::ALL
            .iter()
            .map(|&id| (id, Self::load_image(root.join(id.file_name()), text)))
            .collect::<HashMap<_, _>>();

        let missing = sprites.values().filter(|s| s.is_placeholder()).count();
        tracing::info!(
            root = %root.display(),
            loaded = sprites.len() - missing,
            placeholders = missing,
            "sprites ready"
        );

        Self {
            sprites,
            fallback: Sprite::placeholder("missing", text),
        }
    }

    /// Store made only of placeholders.
    pub fn placeholders(text: &mut TextRenderer) -> Self {
        Self {
            sprites: SpriteId::ALL
                .iter()
                .map(|&id| (id, Sprite::placeholder(id.name(), text)))
                .collect(),
            fallback: Sprite::placeholder("missing", text),
        }
    }

    /// Decodes an image and resizes it to the sprite size. A missing or
    /// unreadable file yields a placeholder labelled with the file stem.
    pub fn load_image(path: impl AsRef<Path>, text: &mut TextRenderer) -> Sprite {
        let path = path.as_ref();
        let sprite = image::open(path)
            .map_err(LyricVideoError::from)
            .and_then(|decoded| Sprite::decoded(&decoded));
        match sprite {
            Ok(sprite) => sprite,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "sprite unavailable, using placeholder");
                let label = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("placeholder");
                Sprite::placeholder(label, text)
            }
        }
    }

    pub fn sprite(&self, id: SpriteId) -> &Sprite {
        self.sprites.get(&id).unwrap_or(&self.fallback)
    }

    pub fn placeholder_count(&self) -> usize {
        self.sprites.values().filter(|s| s.is_placeholder()).count()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::RgbaImage;

    use super::*;
    use crate::render::{near, GOLD};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lyric-video-assets-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn shown(sprite: &Sprite) -> Canvas {
        let mut canvas = Canvas::new(SPRITE_SIZE, SPRITE_SIZE);
        canvas.paint(|p| p.picture(sprite.picture(), Affine::IDENTITY));
        canvas
    }

    #[test]
    fn missing_megaphone_becomes_placeholder() {
        let dir = scratch_dir("missing");
        let mut text = TextRenderer::embedded().unwrap();
        let sprite = AssetStore::load_image(dir.join("megaphone.png"), &mut text);
        assert!(sprite.is_placeholder());
        assert_eq!((sprite.width(), sprite.height()), (200, 200));
        assert!(near(shown(&sprite).pixel(2, 2), GRAY));
    }

    #[test]
    fn placeholder_carries_its_label() {
        let mut text = TextRenderer::embedded().unwrap();
        let canvas = shown(&Sprite::placeholder("search_light", &mut text));
        let lit = (80..120).any(|y| (10..190).any(|x| canvas.pixel(x, y)[0] > 200));
        assert!(lit);
    }

    #[test]
    fn loads_and_resizes_real_images() {
        let dir = scratch_dir("real");
        let path = dir.join("grammy.png");
        RgbaImage::from_pixel(50, 80, image::Rgba([255, 215, 0, 255]))
            .save(&path)
            .unwrap();

        let mut text = TextRenderer::embedded().unwrap();
        let store = AssetStore::load_dir(&dir, &mut text);
        let grammy = store.sprite(SpriteId::Grammy);
        assert!(!grammy.is_placeholder());
        assert_eq!((grammy.width(), grammy.height()), (200, 200));
        assert!(near(shown(grammy).pixel(100, 100), GOLD));
        assert_eq!(store.placeholder_count(), SpriteId::ALL.len() - 1);
    }

    #[test]
    fn undecodable_file_is_recovered() {
        let dir = scratch_dir("garbage");
        let path = dir.join("house.png");
        std::fs::write(&path, b"not a png").unwrap();
        let mut text = TextRenderer::embedded().unwrap();
        assert!(AssetStore::load_image(&path, &mut text).is_placeholder());
    }
}
