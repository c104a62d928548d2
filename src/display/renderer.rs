use super::{Overlay, RenderFrame};
use crate::config::DisplayConfig;
use crate::detector::Blob;
use crate::round::{RoundPhase, RoundState};
use image::{buffer::ConvertBuffer, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use imageproc::point::Point;
use rusttype::{Font, Scale};
use tracing::{debug, warn};

const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const HULL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const COUNT_COLOR: Rgb<u8> = Rgb([210, 15, 85]);
const TIMER_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const GOAL_COLOR: Rgb<u8> = Rgb([50, 0, 210]);
const SUCCESS_COLOR: Rgb<u8> = Rgb([10, 210, 0]);
const FAILED_COLOR: Rgb<u8> = Rgb([210, 10, 0]);
const LINE_THICKNESS: i32 = 2;

/// Builds the annotated image handed to the display sink
pub struct OverlayRenderer {
    font: Option<Font<'static>>,
    font_size: f32,
}

impl OverlayRenderer {
    /// Create a renderer, loading the configured font if there is one.
    ///
    /// A missing or unreadable font only disables text drawing.
    pub fn new(config: &DisplayConfig) -> Self {
        let font = config.font_path.as_deref().and_then(|path| {
            match std::fs::read(path) {
                Ok(data) => {
                    let font = Font::try_from_vec(data);
                    if font.is_none() {
                        warn!("Failed to parse font file '{}', drawing without text", path);
                    }
                    font
                }
                Err(e) => {
                    warn!("Failed to read font file '{}': {}, drawing without text", path, e);
                    None
                }
            }
        });

        Self {
            font,
            font_size: config.font_size,
        }
    }

    /// Renderer that only draws geometry
    pub fn without_text() -> Self {
        Self {
            font: None,
            font_size: 0.0,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Annotate the mask with blob geometry and round counters
    pub fn render(
        &self,
        frame_id: u64,
        mask: &GrayImage,
        blob: Option<&Blob>,
        state: &RoundState,
    ) -> RenderFrame {
        let mut image: RgbImage = mask.convert();

        let (contour, hull) = match blob {
            Some(blob) => {
                draw_closed_polyline(&mut image, &blob.contour, CONTOUR_COLOR);
                draw_closed_polyline(&mut image, &blob.hull, HULL_COLOR);
                (blob.contour.clone(), blob.hull.clone())
            }
            None => (Vec::new(), Vec::new()),
        };

        let overlay = Overlay::from_state(state);
        self.draw_counters(&mut image, &overlay);

        debug!(
            "Rendered frame {}: {} contour points, message {:?}",
            frame_id,
            contour.len(),
            overlay.message
        );

        RenderFrame {
            frame_id,
            image,
            overlay,
            contour,
            hull,
        }
    }

    fn draw_counters(&self, image: &mut RgbImage, overlay: &Overlay) {
        let Some(font) = &self.font else {
            return;
        };

        let small = Scale::uniform(self.font_size);
        let large = Scale::uniform(self.font_size * 2.0);

        let count_text = format!("CNT:{}", overlay.punch_count);
        let timer_text = format!("{:02}", overlay.seconds_remaining);
        let goal_text = format!("TOT:{}", overlay.goal);

        // Positions are text baselines, as laid out on the 350x380 crop
        let small_top = baseline_to_top(30, self.font_size);
        draw_text_mut(image, COUNT_COLOR, 0, small_top, small, font, &count_text);
        draw_text_mut(image, GOAL_COLOR, 240, small_top, small, font, &goal_text);
        draw_text_mut(
            image,
            TIMER_COLOR,
            140,
            baseline_to_top(200, self.font_size * 2.0),
            large,
            font,
            &timer_text,
        );

        if let Some(message) = overlay.message {
            let (x, color) = match overlay.phase {
                RoundPhase::Success => (55, SUCCESS_COLOR),
                _ => (75, FAILED_COLOR),
            };
            draw_text_mut(
                image,
                color,
                x,
                baseline_to_top(280, self.font_size * 2.0),
                large,
                font,
                message,
            );
        }
    }
}

fn baseline_to_top(baseline: i32, size: f32) -> i32 {
    (baseline - size as i32).max(0)
}

/// Draw a closed polygon outline LINE_THICKNESS pixels wide
pub fn draw_closed_polyline(image: &mut RgbImage, points: &[Point<i32>], color: Rgb<u8>) {
    if points.len() < 2 {
        return;
    }

    for (a, b) in points.iter().zip(points.iter().cycle().skip(1)) {
        for offset in 0..LINE_THICKNESS {
            let start = ((a.x + offset) as f32, (a.y + offset) as f32);
            let end = ((b.x + offset) as f32, (b.y + offset) as f32);
            draw_line_segment_mut(image, start, end, color);
        }
    }
}
