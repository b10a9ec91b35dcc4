use super::glyphs::text_size;

/// Grosores y tamaños de anotación proporcionales al ancho de la imagen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    pub font_scale: f32,
    pub glyph_scale: u32,
    pub thickness: u32,
    pub bbox_thickness: u32,
    pub padding: u32,
    pub line_spacing: u32,
}

impl AnnotationStyle {
    pub fn for_width(img_width: u32) -> Self {
        let font_scale = (img_width as f32 / 1200.0).clamp(0.5, 3.0);
        Self {
            font_scale,
            // Una escala 1.0 equivale a unos 21 px de alto de glifo.
            glyph_scale: ((font_scale * 3.0).round() as u32).max(1),
            thickness: (img_width / 600).max(1),
            bbox_thickness: (img_width / 300).max(2),
            padding: (img_width / 200).max(3),
            line_spacing: (img_width / 250).max(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    /// Borde superior de la línea.
    pub y: i32,
    pub height: u32,
}

/// Caja de etiqueta de fondo más las líneas de texto apiladas dentro.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub lines: Vec<PlacedLine>,
}

pub fn label_lines(object_id: usize, class_name: &str, confidence: f32) -> Vec<String> {
    vec![
        format!("ID: {}", object_id),
        class_name.to_string(),
        format!("Score: {:.2}", confidence),
    ]
}

/// Coloca la etiqueta encima de la caja (x1, y1), sin salirse por arriba de la imagen.
pub fn layout_label(lines: &[String], x1: i32, y1: i32, style: &AnnotationStyle) -> LabelLayout {
    let sizes: Vec<(u32, u32)> = lines.iter().map(|l| text_size(l, style.glyph_scale)).collect();
    let max_line_width = sizes.iter().map(|(w, _)| *w).max().unwrap_or(0);
    let total_text_height: u32 = sizes.iter().map(|(_, h)| *h).sum::<u32>()
        + style.line_spacing * (lines.len().saturating_sub(1) as u32);

    let padding = style.padding as i32;
    let label_y = (y1 - total_text_height as i32 - padding * 2 - style.thickness as i32 * 4).max(0);
    let label_x = x1;

    let mut placed = Vec::with_capacity(lines.len());
    let mut current_y = label_y + padding;
    for (text, (_, h)) in lines.iter().zip(sizes.iter()) {
        placed.push(PlacedLine {
            text: text.clone(),
            x: label_x + padding,
            y: current_y,
            height: *h,
        });
        current_y += *h as i32 + style.line_spacing as i32;
    }

    LabelLayout {
        x: label_x,
        y: label_y,
        width: max_line_width + style.padding * 2,
        height: total_text_height + style.padding * 2,
        lines: placed,
    }
}
