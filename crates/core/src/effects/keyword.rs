use super::{EffectTag, FrameContext, LyricLayout};
use crate::{
    assets::{AssetStore, Sprite, SpriteId, SPRITE_SIZE},
    render::{centred, Affine, Canvas, Painter, Point},
};

const GLOVE_COUNT: usize = 5;

/// Draws the sprite effect selected for the active lyric. Sprites sit
/// horizontally centred just below the lyric text unless the effect moves
/// them elsewhere.
pub fn draw_keyword_effect(
    canvas: &mut Canvas,
    assets: &AssetStore,
    ctx: &FrameContext,
    tag: EffectTag,
    progress: f32,
    layout: &LyricLayout,
) {
    let t = f64::from(ctx.elapsed);
    let progress = f64::from(progress);
    let (w, h) = (f64::from(canvas.width()), f64::from(canvas.height()));
    let size = f64::from(SPRITE_SIZE);
    let left = w / 2.0 - size / 2.0;
    let top = f64::from(layout.sprite_top);
    // Centre of a sprite scaled by `scale` whose top-left corner is at (left, top).
    let anchored = |scale: f64| Point::new(left + size * scale / 2.0, top + size * scale / 2.0);
    let mut rng = ctx.rng(37);

    canvas.paint(|p| match tag {
        EffectTag::KendrickSilhouette => {
            let side = 200.0 + (t * 5.0).sin() * 20.0;
            let sprite = assets.sprite(SpriteId::KendrickSilhouette);
            spin(p, sprite, Point::new(w / 2.0, h / 2.0), side / size, 0.0);
        }
        EffectTag::Megaphone => {
            let angle = (t * 5.0).sin() * 15.0;
            spin(p, assets.sprite(SpriteId::Megaphone), anchored(1.0), 1.0, angle);
        }
        EffectTag::FlyingGrammy => {
            let center = Point::new(w * progress, h / 2.0 + (progress * 10.0).sin() * 50.0);
            spin(p, assets.sprite(SpriteId::Grammy), center, 1.0, progress * 360.0);
        }
        EffectTag::SearchLight => {
            let scale = 1.0 + (t * 3.0).sin() * 0.2;
            spin(p, assets.sprite(SpriteId::SearchLight), anchored(scale), scale, 0.0);
        }
        EffectTag::ShakingHouse => {
            let shake = (t * 10.0).sin() * 5.0;
            let sprite = assets.sprite(SpriteId::House);
            p.picture(sprite.picture(), Affine::translate((left + shake, top)));
        }
        EffectTag::SpinningClippers => {
            spin(p, assets.sprite(SpriteId::Clippers), anchored(1.0), 1.0, t * 180.0);
        }
        EffectTag::BoxingGloves => {
            let sprite = assets.sprite(SpriteId::BoxingGlove);
            for _ in 0..GLOVE_COUNT {
                let x = rng.f64() * w;
                let y = rng.f64() * h;
                let angle = rng.f64() * 360.0;
                let center = Point::new(x + size / 2.0, y + size / 2.0);
                spin(p, sprite, center, 1.0, angle);
            }
        }
        EffectTag::BouncingHat => {
            let bounce = (t * 5.0).sin() * 20.0;
            let sprite = assets.sprite(SpriteId::PharrellHat);
            p.picture(sprite.picture(), Affine::translate((left, top + bounce)));
        }
        EffectTag::BreathingOwl => {
            let scale = 1.0 + (t * 2.0).sin() * 0.1;
            spin(p, assets.sprite(SpriteId::OvoOwl), anchored(scale), scale, 0.0);
        }
        EffectTag::Plain => {}
    });
}

/// `sprite` centred on `center`, scaled, and turned counter-clockwise by
/// `degrees`.
fn spin(p: &mut Painter<'_>, sprite: &Sprite, center: Point, scale: f64, degrees: f64) {
    let picture = sprite.picture();
    p.picture(picture, centred(center, picture.size(), scale, degrees));
}
