//! Bear face rasterizer
//!
//! Draws one complete 320x240 frame from the mood, blink and mouth values.
//! Shapes are filled with simple coverage tests on pixel centers; the panel
//! is small enough that anti-aliasing is not worth the cost.

use image::{Rgb as Pixel, RgbImage};

use super::mood::{Decoration, Mood, Rgb};

/// Frame width in pixels
pub const WIDTH: u32 = 320;

/// Frame height in pixels
pub const HEIGHT: u32 = 240;

const FUR: Rgb = [185, 142, 97];
const EYE: Rgb = [25, 25, 25];
const GLINT: Rgb = [255, 255, 255];
const MOUTH: Rgb = [180, 50, 60];

const LEFT_EYE_X: f32 = 110.0;
const RIGHT_EYE_X: f32 = 200.0;
const EYE_Y: f32 = 110.0;
const EYE_RADIUS: f32 = 40.0;

const LEFT_CHEEK_X: f32 = 105.0;
const RIGHT_CHEEK_X: f32 = 215.0;
const CHEEK_Y: f32 = 150.0;
const CHEEK_RADIUS: f32 = 15.0;

const MOUTH_LEFT: f32 = 145.0;
const MOUTH_RIGHT: f32 = 175.0;
const MOUTH_TOP: f32 = 160.0;

/// Below this openness the mouth is drawn shut
pub const CLOSED_MOUTH_THRESHOLD: f32 = 0.05;

/// Inputs for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceFrame {
    pub mood: Mood,
    /// Eye height scale, 1.0 is fully open
    pub blink: f32,
    /// Mouth openness in [0, 1]
    pub mouth_open: f32,
}

impl FaceFrame {
    /// Resting face with open eyes and closed mouth
    #[must_use]
    pub const fn resting(mood: Mood) -> Self {
        Self {
            mood,
            blink: 1.0,
            mouth_open: 0.0,
        }
    }
}

/// Render a full frame
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn draw_face(frame: &FaceFrame) -> RgbImage {
    let mut canvas = Canvas::new(FUR);

    // ears
    canvas.fill_ellipse(52.0, 44.0, 40.0, 40.0, FUR);
    canvas.fill_ellipse(WIDTH as f32 - 52.0, 44.0, 40.0, 40.0, FUR);

    let eye_height = EYE_RADIUS * frame.blink.clamp(0.0, 1.0);
    for x in [LEFT_EYE_X, RIGHT_EYE_X] {
        canvas.fill_ellipse(x, EYE_Y, EYE_RADIUS, eye_height, EYE);
        if frame.blink > 0.5 {
            canvas.fill_ellipse(x - 3.0, EYE_Y - 3.0, 3.0, 3.0, GLINT);
        }
    }

    // nose
    canvas.fill_ellipse(160.0, 127.5, 10.0, 7.5, EYE);

    let open = frame.mouth_open.clamp(0.0, 1.0);
    if open < CLOSED_MOUTH_THRESHOLD {
        canvas.fill_rect(MOUTH_LEFT, 163.5, MOUTH_RIGHT, 166.5, EYE);
    } else {
        canvas.fill_rect(MOUTH_LEFT, MOUTH_TOP, MOUTH_RIGHT, MOUTH_TOP + 8.0 + 10.0 * open, MOUTH);
    }

    for x in [LEFT_CHEEK_X, RIGHT_CHEEK_X] {
        match frame.mood.decoration() {
            Decoration::Cheeks(color) => {
                canvas.fill_ellipse(x, CHEEK_Y, CHEEK_RADIUS, CHEEK_RADIUS, color);
            }
            Decoration::Hearts(color) => canvas.heart(x, CHEEK_Y, CHEEK_RADIUS, color),
            Decoration::Tears(color) => canvas.tear(x, CHEEK_Y, color),
        }
    }

    if let Some(tint) = frame.mood.tint() {
        canvas.tint(tint);
    }

    canvas.into_image()
}

struct Canvas {
    image: RgbImage,
}

impl Canvas {
    fn new(background: Rgb) -> Self {
        Self {
            image: RgbImage::from_pixel(WIDTH, HEIGHT, Pixel(background)),
        }
    }

    fn into_image(self) -> RgbImage {
        self.image
    }

    /// Pixel rows/columns whose centers may fall inside `[lo, hi]`
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn span(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
        let start = lo.floor().max(0.0) as u32;
        let end = (hi.ceil().max(0.0) as u32).min(limit);
        start..end.max(start)
    }

    #[allow(clippy::cast_precision_loss)]
    fn fill_where(&mut self, bounds: (f32, f32, f32, f32), color: Rgb, inside: impl Fn(f32, f32) -> bool) {
        let (x0, y0, x1, y1) = bounds;
        for y in Self::span(y0, y1, HEIGHT) {
            for x in Self::span(x0, x1, WIDTH) {
                if inside(x as f32 + 0.5, y as f32 + 0.5) {
                    self.image.put_pixel(x, y, Pixel(color));
                }
            }
        }
    }

    fn fill_ellipse(&mut self, cx: f32, cy: f32, rx: f32, ry: f32, color: Rgb) {
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        self.fill_where((cx - rx, cy - ry, cx + rx, cy + ry), color, |x, y| {
            let dx = (x - cx) / rx;
            let dy = (y - cy) / ry;
            dx * dx + dy * dy <= 1.0
        });
    }

    fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb) {
        self.fill_where((x0, y0, x1, y1), color, |x, y| {
            x >= x0 && x <= x1 && y >= y0 && y <= y1
        });
    }

    fn fill_triangle(&mut self, a: (f32, f32), b: (f32, f32), c: (f32, f32), color: Rgb) {
        let edge = |p: (f32, f32), q: (f32, f32), x: f32, y: f32| {
            (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
        };
        let min_x = a.0.min(b.0).min(c.0);
        let max_x = a.0.max(b.0).max(c.0);
        let min_y = a.1.min(b.1).min(c.1);
        let max_y = a.1.max(b.1).max(c.1);
        self.fill_where((min_x, min_y, max_x, max_y), color, |x, y| {
            let e0 = edge(a, b, x, y);
            let e1 = edge(b, c, x, y);
            let e2 = edge(c, a, x, y);
            (e0 >= 0.0 && e1 >= 0.0 && e2 >= 0.0) || (e0 <= 0.0 && e1 <= 0.0 && e2 <= 0.0)
        });
    }

    /// Two round lobes over a downward point
    fn heart(&mut self, cx: f32, cy: f32, size: f32, color: Rgb) {
        let half = size / 2.0;
        self.fill_ellipse(cx - half, cy, half, half, color);
        self.fill_ellipse(cx + half, cy, half, half, color);
        self.fill_triangle((cx - size, cy), (cx + size, cy), (cx, cy + size * 1.3), color);
    }

    fn tear(&mut self, cx: f32, cy: f32, color: Rgb) {
        self.fill_ellipse(cx, cy + 3.0, 8.0, 8.0, color);
        self.fill_triangle((cx - 8.0, cy + 3.0), (cx + 8.0, cy + 3.0), (cx, cy + 25.0), color);
    }

    /// Alpha-blend `rgba` over every pixel
    #[allow(clippy::cast_possible_truncation)]
    fn tint(&mut self, rgba: [u8; 4]) {
        let alpha = u16::from(rgba[3]);
        for pixel in self.image.pixels_mut() {
            for (channel, overlay) in pixel.0.iter_mut().zip(rgba) {
                let blended =
                    (u16::from(overlay) * alpha + u16::from(*channel) * (255 - alpha) + 127) / 255;
                *channel = blended as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(image: &RgbImage, x: u32, y: u32) -> Rgb {
        image.get_pixel(x, y).0
    }

    #[test]
    fn frame_has_panel_size() {
        let image = draw_face(&FaceFrame::resting(Mood::Neutral));
        assert_eq!(image.dimensions(), (WIDTH, HEIGHT));
    }

    #[test]
    fn neutral_cheeks_use_mood_color() {
        let image = draw_face(&FaceFrame::resting(Mood::Neutral));
        assert_eq!(pixel(&image, 105, 150), Mood::Neutral.cheek_color());
    }

    #[test]
    fn sad_face_draws_tears() {
        let image = draw_face(&FaceFrame::resting(Mood::Sad));
        // tip of the tear sits below where a cheek would end
        assert_eq!(pixel(&image, 105, 170), [120, 160, 255]);
        assert_ne!(pixel(&image, 105, 170), Mood::Sad.cheek_color());
    }

    #[test]
    fn love_face_draws_hearts() {
        let image = draw_face(&FaceFrame::resting(Mood::Love));
        // the heart's point reaches further down than a round cheek
        assert_eq!(pixel(&image, 105, 167), [255, 120, 150]);
    }

    #[test]
    fn angry_face_is_tinted() {
        let calm = draw_face(&FaceFrame::resting(Mood::Neutral));
        let angry = draw_face(&FaceFrame::resting(Mood::Angry));
        let [r0, g0, _] = pixel(&calm, 5, 235);
        let [r1, g1, _] = pixel(&angry, 5, 235);
        assert!(r1 >= r0);
        assert!(g1 < g0);
    }

    #[test]
    fn closed_mouth_is_a_line() {
        let image = draw_face(&FaceFrame::resting(Mood::Neutral));
        assert_eq!(pixel(&image, 160, 165), EYE);
        assert_eq!(pixel(&image, 160, 170), FUR);
    }

    #[test]
    fn open_mouth_grows_with_openness() {
        let wide = draw_face(&FaceFrame {
            mood: Mood::Neutral,
            blink: 1.0,
            mouth_open: 1.0,
        });
        assert_eq!(pixel(&wide, 160, 176), MOUTH);

        let narrow = draw_face(&FaceFrame {
            mood: Mood::Neutral,
            blink: 1.0,
            mouth_open: 0.1,
        });
        assert_eq!(pixel(&narrow, 160, 162), MOUTH);
        assert_eq!(pixel(&narrow, 160, 176), FUR);
    }

    #[test]
    fn glint_only_when_eyes_open() {
        let open = draw_face(&FaceFrame::resting(Mood::Neutral));
        assert_eq!(pixel(&open, 107, 107), GLINT);

        let closing = draw_face(&FaceFrame {
            mood: Mood::Neutral,
            blink: 0.4,
            mouth_open: 0.0,
        });
        assert_eq!(pixel(&closing, 107, 107), EYE);
        // eye is squashed vertically
        assert_eq!(pixel(&closing, 110, 80), FUR);
    }
}
