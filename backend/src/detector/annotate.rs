use super::{BoundingBox, label_matches};
use image::{Rgb, RgbImage};

const ALERT_COLOR: Rgb<u8> = Rgb([230, 40, 40]);
const DEFAULT_COLOR: Rgb<u8> = Rgb([40, 200, 80]);

fn line_thickness(image: &RgbImage) -> u32 {
    let (w, h) = image.dimensions();
    (w.min(h) / 200).max(2)
}

/// Outlines every box; boxes of the target class are drawn in the alert color.
pub fn draw_boxes(image: &mut RgbImage, boxes: &[BoundingBox], names: &[String], target: &str) {
    let thickness = line_thickness(image);
    for bbox in boxes {
        let is_target = names
            .get(bbox.class_id)
            .is_some_and(|name| label_matches(name, target));
        let color = if is_target { ALERT_COLOR } else { DEFAULT_COLOR };
        draw_rect(image, bbox, color, thickness);
    }
}

fn draw_rect(image: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let clamp_x = |v: f32| (v.max(0.0) as u32).min(w - 1);
    let clamp_y = |v: f32| (v.max(0.0) as u32).min(h - 1);
    let (x1, y1, x2, y2) = (
        clamp_x(bbox.x1),
        clamp_y(bbox.y1),
        clamp_x(bbox.x2),
        clamp_y(bbox.y2),
    );
    if x2 < x1 || y2 < y1 {
        return;
    }

    for t in 0..thickness {
        let top = (y1 + t).min(y2);
        let bottom = y2.saturating_sub(t).max(y1);
        for x in x1..=x2 {
            image.put_pixel(x, top, color);
            image.put_pixel(x, bottom, color);
        }
        let left = (x1 + t).min(x2);
        let right = x2.saturating_sub(t).max(x1);
        for y in y1..=y2 {
            image.put_pixel(left, y, color);
            image.put_pixel(right, y, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(class_id: usize) -> BoundingBox {
        BoundingBox {
            x1: 10.0,
            y1: 10.0,
            x2: 30.0,
            y2: 30.0,
            confidence: 0.9,
            class_id,
        }
    }

    fn names() -> Vec<String> {
        vec!["Swimming".into(), "Drowning".into()]
    }

    #[test]
    fn target_boxes_use_alert_color() {
        let mut image = RgbImage::new(100, 100);
        draw_boxes(&mut image, &[bbox(1)], &names(), "drowning");
        assert_eq!(image.get_pixel(20, 10), &ALERT_COLOR);
        assert_eq!(image.get_pixel(30, 20), &ALERT_COLOR);
        assert_eq!(image.get_pixel(20, 20), &Rgb([0, 0, 0]));
    }

    #[test]
    fn other_boxes_use_default_color() {
        let mut image = RgbImage::new(100, 100);
        draw_boxes(&mut image, &[bbox(0)], &names(), "drowning");
        assert_eq!(image.get_pixel(10, 20), &DEFAULT_COLOR);
    }

    #[test]
    fn target_match_ignores_non_ascii_case() {
        let mut image = RgbImage::new(100, 100);
        let names = vec!["Nage".to_string(), "Noyé".to_string()];
        draw_boxes(&mut image, &[bbox(1)], &names, "NOYÉ");
        assert_eq!(image.get_pixel(20, 10), &ALERT_COLOR);
    }

    #[test]
    fn boxes_outside_the_image_are_clamped() {
        let mut image = RgbImage::new(20, 20);
        let outside = BoundingBox {
            x1: -50.0,
            y1: -50.0,
            x2: 500.0,
            y2: 500.0,
            confidence: 0.9,
            class_id: 0,
        };
        draw_boxes(&mut image, &[outside], &names(), "drowning");
        assert_eq!(image.get_pixel(19, 19), &DEFAULT_COLOR);
        assert_eq!(image.get_pixel(0, 0), &DEFAULT_COLOR);
    }
}
