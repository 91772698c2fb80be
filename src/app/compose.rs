use image::{Rgba, RgbaImage, imageops};

pub const DEFAULT_CANVAS_WIDTH: u32 = 1280;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 720;
/// Margin reserved on each side of the canvas, as a fraction of its size.
pub const PADDING_PERCENT: f64 = 0.05;

/// Neutral backdrop drawn when no background is selected.
const BACKDROP: Rgba<u8> = Rgba([45, 45, 68, 255]);
/// Drop shadow: semi-transparent black, blurred, offset down-right.
const SHADOW_ALPHA: u16 = 153; // 0.6 * 255
const SHADOW_BLUR: u32 = 35;
const SHADOW_OFFSET: (i64, i64) = (18, 18);

/// Placement of the cover within the canvas, in canvas coordinates.
/// Kept in f64 so the fit math stays exact until drawing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// The single composited output surface. Fully rebuilt on every call to
/// [`compose`]; nothing is patched incrementally.
pub struct Surface {
    image: RgbaImage,
    placeholder: bool,
}

impl Surface {
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// True when neither a background nor a cover was drawn, i.e. the panel
    /// should overlay its instructional hint on the preview.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// Fit the cover into the 90%x90% centered padded region, preserving its
/// aspect ratio, and center the result within the full canvas. The returned
/// rect never exceeds the padded region and touches it on at least one axis.
pub fn fit_cover(cover: (u32, u32), canvas: (u32, u32)) -> CoverRect {
    let (canvas_w, canvas_h) = (canvas.0 as f64, canvas.1 as f64);
    let available_w = canvas_w - 2.0 * canvas_w * PADDING_PERCENT;
    let available_h = canvas_h - 2.0 * canvas_h * PADDING_PERCENT;

    let cover_aspect = cover.0 as f64 / cover.1 as f64;
    let available_aspect = available_w / available_h;

    let (width, height) = if cover_aspect > available_aspect {
        (available_w, available_w / cover_aspect)
    } else {
        (available_h * cover_aspect, available_h)
    };

    CoverRect {
        x: (canvas_w - width) / 2.0,
        y: (canvas_h - height) / 2.0,
        width,
        height,
    }
}

/// Rebuild the output surface from the current state. Canvas dimensions come
/// from the background's native resolution, or the 1280x720 default.
pub fn compose(background: Option<&RgbaImage>, cover: Option<&RgbaImage>) -> Surface {
    let (width, height) = background
        .map(|bg| bg.dimensions())
        .unwrap_or((DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT));

    let mut canvas = match background {
        Some(bg) if bg.dimensions() == (width, height) => bg.clone(),
        Some(bg) => imageops::resize(bg, width, height, imageops::FilterType::Lanczos3),
        None => RgbaImage::from_pixel(width, height, BACKDROP),
    };

    if let Some(cover) = cover {
        let rect = fit_cover(cover.dimensions(), (width, height));
        let draw_w = (rect.width.round() as u32).max(1);
        let draw_h = (rect.height.round() as u32).max(1);
        let x = rect.x.round() as i64;
        let y = rect.y.round() as i64;

        draw_shadow(&mut canvas, x, y, draw_w, draw_h);
        let scaled = imageops::resize(cover, draw_w, draw_h, imageops::FilterType::Lanczos3);
        imageops::overlay(&mut canvas, &scaled, x, y);
    }

    Surface {
        image: canvas,
        placeholder: background.is_none() && cover.is_none(),
    }
}

/// Composite a blurred 60%-black silhouette of the cover rect, offset by
/// (18,18), under where the cover will be drawn. Works on an alpha mask only;
/// the shadow color is constant so the blur is single-channel.
fn draw_shadow(canvas: &mut RgbaImage, x: i64, y: i64, width: u32, height: u32) {
    let (cw, ch) = canvas.dimensions();
    let mut mask = vec![0u8; cw as usize * ch as usize];

    let x0 = (x + SHADOW_OFFSET.0).clamp(0, cw as i64) as usize;
    let y0 = (y + SHADOW_OFFSET.1).clamp(0, ch as i64) as usize;
    let x1 = (x + SHADOW_OFFSET.0 + width as i64).clamp(0, cw as i64) as usize;
    let y1 = (y + SHADOW_OFFSET.1 + height as i64).clamp(0, ch as i64) as usize;
    for row in y0..y1 {
        mask[row * cw as usize + x0..row * cw as usize + x1].fill(255);
    }

    let blurred = blur_mask(&mask, cw, ch, SHADOW_BLUR);
    for (i, pixel) in canvas.pixels_mut().enumerate() {
        let shadow_a = blurred[i] as u16 * SHADOW_ALPHA / 255;
        if shadow_a == 0 {
            continue;
        }
        let inv = 255 - shadow_a;
        let Rgba([r, g, b, a]) = *pixel;
        *pixel = Rgba([
            (r as u16 * inv / 255) as u8,
            (g as u16 * inv / 255) as u8,
            (b as u16 * inv / 255) as u8,
            (shadow_a + a as u16 * inv / 255) as u8,
        ]);
    }
}

/// Two-pass separable gaussian blur over a single-channel mask, clamped at
/// the edges. Sigma is half the radius, matching a canvas-style blur value.
fn blur_mask(mask: &[u8], width: u32, height: u32, radius: u32) -> Vec<u8> {
    let kernel = gaussian_kernel(radius, radius as f64 / 2.0);
    let mut tmp = vec![0u8; mask.len()];
    let mut out = vec![0u8; mask.len()];

    let (w, h) = (width as i64, height as i64);
    let r = radius as i64;

    for row in 0..h {
        for col in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sample = (col + k as i64 - r).clamp(0, w - 1);
                acc += weight * mask[(row * w + sample) as usize] as f64;
            }
            tmp[(row * w + col) as usize] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    for row in 0..h {
        for col in 0..w {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let sample = (row + k as i64 - r).clamp(0, h - 1);
                acc += weight * tmp[(sample * w + col) as usize] as f64;
            }
            out[(row * w + col) as usize] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

fn gaussian_kernel(radius: u32, sigma: f64) -> Vec<f64> {
    let r = radius as i64;
    let denom = 2.0 * sigma * sigma;
    let mut weights: Vec<f64> = (-r..=r)
        .map(|i| (-(i as f64 * i as f64) / denom).exp())
        .collect();
    let sum: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn available(canvas: (u32, u32)) -> (f64, f64) {
        (
            canvas.0 as f64 * (1.0 - 2.0 * PADDING_PERCENT),
            canvas.1 as f64 * (1.0 - 2.0 * PADDING_PERCENT),
        )
    }

    #[test]
    fn fit_wide_cover_fills_available_width() {
        let rect = fit_cover((4000, 1000), (1280, 720));
        let (avail_w, _) = available((1280, 720));
        assert!((rect.width - avail_w).abs() < EPS);
        assert!((rect.height - avail_w / 4.0).abs() < EPS);
        assert!((rect.x - (1280.0 - rect.width) / 2.0).abs() < EPS);
        assert!((rect.y - (720.0 - rect.height) / 2.0).abs() < EPS);
    }

    #[test]
    fn fit_tall_cover_fills_available_height() {
        let rect = fit_cover((1000, 4000), (1280, 720));
        let (_, avail_h) = available((1280, 720));
        assert!((rect.height - avail_h).abs() < EPS);
        assert!((rect.width - avail_h / 4.0).abs() < EPS);
    }

    #[test]
    fn fit_never_overflows_and_touches_one_axis() {
        let covers = [(1, 1), (1920, 1080), (720, 1280), (10_000, 3), (3, 10_000)];
        let canvases = [(1280, 720), (720, 1280), (100, 100), (3840, 2160)];
        for &cover in &covers {
            for &canvas in &canvases {
                let rect = fit_cover(cover, canvas);
                let (avail_w, avail_h) = available(canvas);
                assert!(rect.width <= avail_w + EPS, "{cover:?} on {canvas:?}");
                assert!(rect.height <= avail_h + EPS, "{cover:?} on {canvas:?}");
                assert!(
                    (rect.width - avail_w).abs() < EPS || (rect.height - avail_h).abs() < EPS,
                    "{cover:?} on {canvas:?} touches neither axis"
                );
            }
        }
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        for &cover in &[(1920, 1080), (640, 480), (333, 777)] {
            let rect = fit_cover(cover, (1280, 720));
            let cover_aspect = cover.0 as f64 / cover.1 as f64;
            assert!((rect.width / rect.height - cover_aspect).abs() < 1e-6);
        }
    }

    #[test]
    fn placeholder_surface_is_default_sized_and_idempotent() {
        let first = compose(None, None);
        assert!(first.is_placeholder());
        assert_eq!(
            first.dimensions(),
            (DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
        );
        assert_eq!(first.image().get_pixel(0, 0), &BACKDROP);

        let second = compose(None, None);
        assert_eq!(first.image().as_raw(), second.image().as_raw());
    }

    #[test]
    fn canvas_adopts_background_native_resolution() {
        let bg = RgbaImage::from_pixel(640, 360, Rgba([200, 10, 10, 255]));
        let surface = compose(Some(&bg), None);
        assert_eq!(surface.dimensions(), (640, 360));
        assert!(!surface.is_placeholder());
        assert_eq!(surface.image().get_pixel(0, 0), &Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn cover_alone_draws_on_default_canvas() {
        let cover = RgbaImage::from_pixel(100, 100, Rgba([0, 255, 0, 255]));
        let surface = compose(None, Some(&cover));
        assert!(!surface.is_placeholder());
        assert_eq!(
            surface.dimensions(),
            (DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
        );
        // Square cover on the default canvas fits the 648px available height.
        let center = surface
            .image()
            .get_pixel(DEFAULT_CANVAS_WIDTH / 2, DEFAULT_CANVAS_HEIGHT / 2);
        assert_eq!(center, &Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn shadow_stays_inside_the_margin() {
        // Shadow reach is offset + blur = 53px, inside the 64px left margin,
        // so the canvas corner must be untouched background.
        let bg = RgbaImage::from_pixel(1280, 720, Rgba([7, 7, 7, 255]));
        let cover = RgbaImage::from_pixel(1920, 1080, Rgba([255, 255, 255, 255]));
        let surface = compose(Some(&bg), Some(&cover));
        assert_eq!(surface.image().get_pixel(0, 0), &Rgba([7, 7, 7, 255]));

        // And below-right of the cover the shadow must actually darken.
        let rect = fit_cover((1920, 1080), (1280, 720));
        let sx = (rect.x + rect.width) as u32 + 10;
        let sy = (rect.y + rect.height) as u32 + 10;
        let shaded = surface.image().get_pixel(sx, sy);
        assert!(shaded[0] < 7, "expected shadow darkening, got {shaded:?}");
        assert_eq!(shaded[3], 255);
    }
}
