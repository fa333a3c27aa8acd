use super::TextBlock;

// Widths are fractions of the font size, calibrated for a sans-serif stack.
pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.31,
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 0.26,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '{' | '}' | '-' | '/' => 0.35,
        'm' | 'w' => 0.84,
        'M' | 'W' => 0.93,
        '@' | '#' | '%' | '&' => 0.95,
        '0'..='9' => 0.6,
        'A'..='Z' => 0.68,
        'a'..='z' => 0.56,
        ch if ch.is_ascii() => 0.56,
        // CJK and other wide glyphs
        ch if (ch as u32) >= 0x2E80 => 1.0,
        _ => 0.6,
    }
}

pub(crate) fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

/// Greedy word wrap. A single word wider than `max_width` stays on its own line.
pub(crate) fn wrap_text(text: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim();
        if text_width(paragraph, font_size) <= max_width {
            lines.push(paragraph.to_string());
            continue;
        }
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, font_size) > max_width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            } else {
                current = candidate;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Keeps at most `max_lines`, marking the cut with an ellipsis.
pub(crate) fn clamp_lines(mut lines: Vec<String>, max_lines: usize) -> Vec<String> {
    if max_lines == 0 {
        return Vec::new();
    }
    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            last.push('…');
        }
    }
    lines
}

pub(crate) fn measure_label(
    text: &str,
    font_size: f32,
    max_width: f32,
    max_lines: usize,
    line_height: f32,
) -> TextBlock {
    let lines = clamp_lines(wrap_text(text, max_width, font_size), max_lines);
    let width = lines
        .iter()
        .map(|line| text_width(line, font_size))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}
