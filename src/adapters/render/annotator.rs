use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::sync::Mutex;

use super::glyphs::draw_text;
use super::layout::{label_lines, layout_label, AnnotationStyle};
use crate::application::ports::AnnotatorPort;
use crate::domain::detection::Detection;

const TEXT_COLOR: Rgb<u8> = Rgb([48, 48, 48]);

/// Colores de fondo de etiqueta; el texto siempre va en gris oscuro.
pub const PALETTE: [Rgb<u8>; 6] = [
    Rgb([255, 229, 102]),
    Rgb([102, 204, 255]),
    Rgb([102, 255, 178]),
    Rgb([255, 127, 80]),
    Rgb([221, 160, 221]),
    Rgb([64, 224, 208]),
];

/// Anotador que elige un color de la paleta al azar para cada objeto.
pub struct PaletteAnnotator {
    rng: Mutex<StdRng>,
}

impl PaletteAnnotator {
    /// Con semilla la salida es reproducible; sin ella se usa entropía del sistema.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }

    fn pick_colors(&self, n: usize) -> Vec<Rgb<u8>> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        (0..n)
            .map(|_| *PALETTE.choose(&mut *rng).unwrap_or(&PALETTE[0]))
            .collect()
    }
}

impl AnnotatorPort for PaletteAnnotator {
    fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage {
        let mut out = image.clone();
        let style = AnnotationStyle::for_width(image.width());
        let colors = self.pick_colors(detections.len());

        for (i, (det, bg)) in detections.iter().zip(colors).enumerate() {
            let [x1, y1, x2, y2] = det.pixel_box();
            draw_box(&mut out, x1, y1, x2, y2, style.bbox_thickness, bg);

            let layout = layout_label(&label_lines(i, &det.label, det.score), x1, y1, &style);
            if layout.width > 0 && layout.height > 0 {
                draw_filled_rect_mut(
                    &mut out,
                    Rect::at(layout.x, layout.y).of_size(layout.width, layout.height),
                    bg,
                );
            }
            for line in &layout.lines {
                draw_text(&mut out, line.x, line.y, &line.text, style.glyph_scale, TEXT_COLOR);
            }
        }
        out
    }
}

/// Rectángulo hueco de grosor `thickness`, centrado sobre el borde de la caja.
pub fn draw_box(image: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, thickness: u32, color: Rgb<u8>) {
    let half = (thickness / 2) as i32;
    for k in 0..thickness as i32 {
        let off = k - half;
        let w = x2 - x1 + 1 + 2 * off;
        let h = y2 - y1 + 1 + 2 * off;
        if w <= 0 || h <= 0 {
            continue;
        }
        draw_hollow_rect_mut(image, Rect::at(x1 - off, y1 - off).of_size(w as u32, h as u32), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb<u8> = Rgb([0, 0, 0]);

    fn det(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection { x1, y1, x2, y2, score: 0.83, class_id: 16, label: "dog".into() }
    }

    #[test]
    fn no_detections_leaves_image_untouched() {
        let img = RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]));
        let out = PaletteAnnotator::new(Some(1)).annotate(&img, &[]);
        assert_eq!(out, img);
    }

    #[test]
    fn same_seed_renders_the_same_image() {
        let img = RgbImage::from_pixel(320, 240, BG);
        let dets = vec![det(40.0, 120.0, 200.0, 230.0), det(10.0, 10.0, 60.0, 60.0)];
        let a = PaletteAnnotator::new(Some(42)).annotate(&img, &dets);
        let b = PaletteAnnotator::new(Some(42)).annotate(&img, &dets);
        assert_eq!(a, b);
        assert_ne!(a, img);
    }

    #[test]
    fn box_edge_and_label_use_a_palette_color() {
        let img = RgbImage::from_pixel(320, 240, BG);
        let out = PaletteAnnotator::new(Some(3)).annotate(&img, &[det(40.0, 150.0, 200.0, 230.0)]);

        let edge = *out.get_pixel(120, 230);
        assert!(PALETTE.contains(&edge));
        // Esquina de la etiqueta: encima de la caja, pegada a x1.
        let style = AnnotationStyle::for_width(320);
        let layout = layout_label(&label_lines(0, "dog", 0.83), 40, 150, &style);
        assert!(layout.y >= 0 && layout.y < 150);
        assert_eq!(*out.get_pixel(40, layout.y as u32), edge);
        // El interior de la caja, lejos de la etiqueta, no se pinta.
        assert_eq!(*out.get_pixel(120, 200), BG);
    }

    #[test]
    fn thick_box_covers_both_sides_of_the_edge() {
        let mut img = RgbImage::from_pixel(50, 50, BG);
        let red = Rgb([255, 0, 0]);
        draw_box(&mut img, 10, 10, 40, 40, 4, red);
        assert_eq!(*img.get_pixel(9, 25), red);
        assert_eq!(*img.get_pixel(12, 25), red);
        assert_eq!(*img.get_pixel(13, 25), BG);
        assert_eq!(*img.get_pixel(8, 25), BG);
    }

    #[test]
    fn boxes_touching_the_border_do_not_panic() {
        let img = RgbImage::from_pixel(100, 80, BG);
        let out = PaletteAnnotator::new(None).annotate(&img, &[det(0.0, 0.0, 100.0, 80.0), det(99.0, 79.0, 100.0, 80.0)]);
        assert_eq!(out.dimensions(), (100, 80));
    }
}
