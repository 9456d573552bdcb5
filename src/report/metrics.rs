//! Glyph advance widths for the standard Helvetica faces.
//!
//! Values are the AFM widths in 1/1000 em for printable ASCII. Latin-1
//! accented letters fall back to their base letter, which is what the
//! standard faces ship with.

const MM_PER_POINT: f64 = 25.4 / 72.0;

/// Unknown glyphs are measured as a digit.
const DEFAULT_WIDTH: u16 = 556;

const ELLIPSIS_WIDTH: u16 = 1000;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    // space ! " # $ % & ' ( ) * + , - . /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // : ; < = > ? @
    278, 278, 584, 584, 584, 556, 1015,
    // A-Z
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [ \ ] ^ _ `
    278, 278, 278, 469, 556, 333,
    // a-z
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // { | } ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

fn base_letter(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'ç' => 'c',
        'Ç' => 'C',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' => 'Y',
        '\u{00A0}' | '\u{202F}' => ' ',
        '\u{2019}' => '\'',
        other => other,
    }
}

fn glyph_width(c: char, bold: bool) -> u16 {
    if c == '…' {
        return ELLIPSIS_WIDTH;
    }
    let table = if bold { &HELVETICA_BOLD } else { &HELVETICA };
    let c = base_letter(c);
    match c as u32 {
        code @ 32..=126 => table[(code - 32) as usize],
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of `text` in millimetres at `font_size` points.
pub fn text_width(text: &str, font_size: f64, bold: bool) -> f64 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c, bold))).sum();
    f64::from(units) / 1000.0 * font_size * MM_PER_POINT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(text_width("", 10.0, false), 0.0);
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let text = "Montant total";
        assert!(text_width(text, 12.0, true) > text_width(text, 12.0, false));
    }

    #[test]
    fn width_scales_with_font_size() {
        let small = text_width("Session", 9.0, false);
        let large = text_width("Session", 18.0, false);
        assert!((large - 2.0 * small).abs() < 1e-9);
    }

    #[test]
    fn accented_letters_use_base_glyph() {
        assert_eq!(
            text_width("é", 10.0, false),
            text_width("e", 10.0, false)
        );
    }

    #[test]
    fn digit_width_at_ten_points() {
        // 556/1000 em at 10pt
        let expected = 0.556 * 10.0 * 25.4 / 72.0;
        assert!((text_width("0", 10.0, false) - expected).abs() < 1e-9);
    }
}
