//! Minimal single-page PDF writer.
//!
//! Emits a complete PDF document containing one page of positioned text runs
//! drawn with a standard Type1 base font (no embedded font programs, no
//! compression). The output is a pure function of its inputs: the same page
//! geometry, font, and text runs always produce byte-identical documents,
//! which is what makes render idempotence testable at the byte level.

use std::fmt::Write as _;

/// One piece of text placed at an absolute position on the page,
/// in PDF user-space coordinates (origin at the bottom-left corner).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub text: String,
}

/// Escape a string for use inside a PDF literal string `(...)`.
///
/// The page font is declared with /WinAnsiEncoding, so Latin-1 supplement
/// characters are emitted as single-byte octal escapes. Characters outside
/// that encoding have no glyph in an unembedded Type1 font and are replaced
/// with `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ch if ch.is_ascii_graphic() || ch == ' ' => out.push(ch),
            ch if ('\u{A0}'..='\u{FF}').contains(&ch) => {
                let _ = write!(out, "\\{:03o}", ch as u32);
            }
            _ => out.push('?'),
        }
    }
    out
}

/// Format a coordinate or size without trailing noise ("571", "151.5").
fn num(value: f64) -> String {
    // Ryū via Display already prints the shortest representation
    format!("{value}")
}

/// Build the page content stream: one text object per run.
fn content_stream(runs: &[TextRun]) -> String {
    let mut content = String::new();
    for run in runs {
        let _ = writeln!(
            content,
            "BT /F1 {} Tf {} {} Td ({}) Tj ET",
            num(run.size),
            num(run.x),
            num(run.y),
            escape_text(&run.text)
        );
    }
    content
}

/// Serialize a complete one-page document.
///
/// `base_font` must be one of the 14 standard PDF fonts (e.g.
/// "Helvetica-Bold"); it is referenced, not embedded.
pub fn render_single_page(width: f64, height: f64, base_font: &str, runs: &[TextRun]) -> Vec<u8> {
    let content = content_stream(runs);

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>",
            num(width),
            num(height)
        ),
        format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base_font} /Encoding /WinAnsiEncoding >>"),
        format!("<< /Length {} >>\nstream\n{content}endstream", content.len()),
    ];

    let mut buf: Vec<u8> = Vec::with_capacity(content.len() + 512);
    buf.extend_from_slice(b"%PDF-1.4\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(buf.len());
        buf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", index + 1).as_bytes());
    }

    let xref_offset = buf.len();
    buf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    buf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    buf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_runs() -> Vec<TextRun> {
        vec![
            TextRun {
                x: 75.0,
                y: 571.0,
                size: 10.0,
                text: "INVOICE 1001".to_string(),
            },
            TextRun {
                x: 142.0,
                y: 212.0,
                size: 9.0,
                text: "20-05-2025".to_string(),
            },
        ]
    }

    #[test]
    fn document_has_pdf_framing() {
        let bytes = render_single_page(595.0, 842.0, "Helvetica-Bold", &sample_runs());

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn xref_offset_points_at_xref_table() {
        let bytes = render_single_page(595.0, 842.0, "Helvetica-Bold", &sample_runs());
        let text = String::from_utf8_lossy(&bytes);

        let startxref = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .and_then(|line| line.parse::<usize>().ok())
            .expect("startxref offset");

        assert_eq!(&bytes[startxref..startxref + 4], b"xref");
    }

    #[test]
    fn output_is_deterministic() {
        let a = render_single_page(842.0, 595.0, "Helvetica-Bold", &sample_runs());
        let b = render_single_page(842.0, 595.0, "Helvetica-Bold", &sample_runs());
        assert_eq!(a, b);
    }

    #[test]
    fn text_content_appears_in_stream() {
        let bytes = render_single_page(595.0, 842.0, "Helvetica", &sample_runs());
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("(INVOICE 1001) Tj"));
        assert!(text.contains("/F1 9 Tf 142 212 Td"));
    }

    #[test]
    fn parens_and_backslashes_are_escaped() {
        let runs = vec![TextRun {
            x: 10.0,
            y: 10.0,
            size: 10.0,
            text: r"Fee (late) \ due".to_string(),
        }];
        let bytes = render_single_page(595.0, 842.0, "Helvetica", &runs);
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains(r"(Fee \(late\) \\ due) Tj"));
    }

    #[test]
    fn latin1_text_is_emitted_as_octal_escapes() {
        let runs = vec![TextRun {
            x: 10.0,
            y: 10.0,
            size: 10.0,
            text: "José Müller".to_string(),
        }];
        let bytes = render_single_page(595.0, 842.0, "Helvetica", &runs);
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains(r"(Jos\351 M\374ller) Tj"));
        assert!(text.contains("/Encoding /WinAnsiEncoding"));
    }

    #[test]
    fn unencodable_text_falls_back_to_placeholders() {
        let runs = vec![TextRun {
            x: 10.0,
            y: 10.0,
            size: 10.0,
            text: "学生 Ahmed".to_string(),
        }];
        let bytes = render_single_page(595.0, 842.0, "Helvetica", &runs);
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.contains("(?? Ahmed) Tj"));
    }

    #[test]
    fn stream_length_matches_content() {
        let runs = sample_runs();
        let bytes = render_single_page(595.0, 842.0, "Helvetica", &runs);
        let text = String::from_utf8_lossy(&bytes);

        let length: usize = text
            .split("/Length ")
            .nth(1)
            .and_then(|tail| tail.split_whitespace().next())
            .and_then(|n| n.parse().ok())
            .expect("length entry");

        let stream_start = text.find("stream\n").expect("stream keyword") + "stream\n".len();
        let stream_end = text.find("endstream").expect("endstream keyword");
        assert_eq!(stream_end - stream_start, length);
    }
}
