use regex::Regex;

/// Clases COCO en el orden que usan los modelos YOLO de Ultralytics.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Lee el campo `names` que Ultralytics escribe en los metadatos del ONNX:
/// `{0: 'person', 1: 'bicycle', ...}`.
pub fn parse_names(raw: &str) -> Option<Vec<String>> {
    let re = Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#).ok()?;
    let mut pairs: Vec<(usize, String)> = re
        .captures_iter(raw)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].to_string())))
        .collect();
    if pairs.is_empty() {
        return None;
    }
    pairs.sort_by_key(|(idx, _)| *idx);

    let len = pairs.last().map(|(idx, _)| idx + 1).unwrap_or(0);
    let mut names = vec![String::new(); len];
    for (idx, name) in pairs {
        names[idx] = name;
    }
    Some(names)
}

pub fn default_names() -> Vec<String> {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ultralytics_metadata() {
        let names = parse_names("{0: 'person', 1: 'bicycle', 2: \"traffic light\"}").unwrap();
        assert_eq!(names, vec!["person", "bicycle", "traffic light"]);
    }

    #[test]
    fn keeps_index_order_even_if_unsorted() {
        let names = parse_names("{1: 'b', 0: 'a'}").unwrap();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_names("not a dict").is_none());
        assert_eq!(default_names().len(), 80);
    }
}
