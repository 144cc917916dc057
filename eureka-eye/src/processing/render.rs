//! Drawing of detection results onto their source image

use crate::error::VisionError;
use crate::models::{ClassId, DetectionResult, Polygon};
use ab_glyph::{FontRef, PxScale};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut, draw_polygon_mut, draw_text_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::warn;

static LABEL_FONT: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");
const LABEL_HEIGHT: f32 = 14.0;

const PALETTE: &[[u8; 3]] = &[
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [146, 204, 23],
    [61, 219, 134],
    [26, 147, 52],
    [0, 212, 187],
    [44, 153, 168],
    [0, 194, 255],
    [52, 69, 147],
    [100, 115, 255],
    [0, 24, 236],
    [132, 56, 255],
    [82, 0, 133],
    [203, 56, 255],
    [255, 149, 200],
    [255, 55, 199],
];

/// Stable colour per class id
pub fn class_colour(class_id: ClassId) -> Rgb<u8> {
    Rgb(PALETTE[class_id as usize % PALETTE.len()])
}

/// Render box and mask outlines of `result` onto a copy of its image, each
/// box labelled `"<class name> <confidence>"` above its top-left corner.
///
/// Results without an attached image are drawn on a black canvas of the
/// recorded image size.
pub fn render_result(result: &DetectionResult) -> Result<RgbImage, VisionError> {
    let mut canvas = match &result.image {
        Some(image) => image.as_ref().clone(),
        None => {
            let (w, h) = result.image_size;
            if w == 0 || h == 0 {
                return Err(VisionError::Inference("result has no image and no image size".to_string()));
            }
            RgbImage::new(w, h)
        }
    };

    let font = match FontRef::try_from_slice(LABEL_FONT) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Label font unusable, drawing boxes only: {}", e);
            None
        }
    };
    let scale = PxScale::from(LABEL_HEIGHT);

    for detection in &result.detections {
        let colour = class_colour(detection.class_id);

        if let Some(polygon) = &detection.mask {
            for (i, start) in polygon.iter().enumerate() {
                let end = polygon[(i + 1) % polygon.len()];
                draw_line_segment_mut(&mut canvas, (start[0], start[1]), (end[0], end[1]), colour);
            }
        }

        if let Some(rect) = to_rect(detection.bbox.to_array(), canvas.width(), canvas.height()) {
            draw_hollow_rect_mut(&mut canvas, rect, colour);

            if let Some(font) = &font {
                let label = format!("{} {:.2}", result.class_name(detection.class_id), detection.confidence);
                let y = (rect.top() - LABEL_HEIGHT as i32).max(0);
                draw_text_mut(&mut canvas, colour, rect.left(), y, scale, font, &label);
            }
        }
    }

    Ok(canvas)
}

/// Fill `polygon` into a binary mask of `size`: 255 inside, 0 outside.
///
/// Degenerate polygons (fewer than three distinct vertices) give an empty
/// mask.
pub fn rasterize_mask(polygon: &Polygon, size: (u32, u32)) -> GrayImage {
    let (width, height) = size;
    let mut mask = GrayImage::new(width, height);

    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for [x, y] in polygon {
        if !x.is_finite() || !y.is_finite() {
            continue;
        }
        let point = Point::new(x.round() as i32, y.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    // draw_polygon_mut expects an open ring.
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    if points.len() >= 3 && width > 0 && height > 0 {
        draw_polygon_mut(&mut mask, &points, Luma([255u8]));
    }
    mask
}

/// Clip a box to the canvas; `None` when nothing of it is visible.
fn to_rect(bbox: [f32; 4], width: u32, height: u32) -> Option<Rect> {
    let [x1, y1, x2, y2] = bbox;
    let x1 = x1.max(0.0).round() as i64;
    let y1 = y1.max(0.0).round() as i64;
    let x2 = (x2.round() as i64).min(width as i64 - 1);
    let y2 = (y2.round() as i64).min(height as i64 - 1);

    if x2 < x1 || y2 < y1 {
        return None;
    }

    let w = (x2 - x1 + 1) as u32;
    let h = (y2 - y1 + 1) as u32;
    Some(Rect::at(x1 as i32, y1 as i32).of_size(w, h))
}
