use crate::constants::{
    FONT_SIZE_INGREDIENTS, FONT_SIZE_SUB_TITLE, FONT_SIZE_TITLE, LINE_STEP, PAGE_HEIGHT,
    PAGE_WIDTH, X_FOR_INGREDIENTS, X_FOR_RULE_END, X_FOR_RULE_START, Y_FOR_INGREDIENTS,
    Y_FOR_RULE, Y_FOR_SUB_TITLE, Y_FOR_TITLE, Y_PAGE_BOTTOM,
};
use crate::schema::ManifestEntry;

/// Renders the shopping manifest into a printable PDF: centered title and
/// date subtitle, a horizontal rule, then one `"{name} - {amount} {unit}"`
/// line per entry in manifest order. Entries that no longer fit continue on
/// the next page; nothing is dropped or reordered.
pub fn render_shopping_list(manifest: &[ManifestEntry], title: &str, subtitle: &str) -> Vec<u8> {
    let lines: Vec<String> = manifest
        .iter()
        .map(|e| format!("{} - {} {}", e.name, e.amount, e.measurement_unit))
        .collect();

    let contents: Vec<String> = paginate(&lines)
        .iter()
        .enumerate()
        .map(|(i, page)| page_content(page, i == 0, title, subtitle))
        .collect();

    assemble(&contents)
}

fn lines_per_page() -> usize {
    ((Y_FOR_INGREDIENTS - Y_PAGE_BOTTOM) / LINE_STEP) as usize + 1
}

/// Splits entry lines across pages. An empty manifest still yields one page
/// so the header renders alone.
fn paginate(lines: &[String]) -> Vec<Vec<String>> {
    if lines.is_empty() {
        return vec![vec![]];
    }

    lines
        .chunks(lines_per_page())
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Escapes a string for a PDF literal: backslash, parentheses.
///
/// Text is emitted as-is into Helvetica literals, which cover ASCII only;
/// names outside Latin-1 need an embedded Unicode font before they render
/// correctly.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Crude centering with an average Helvetica glyph width of half an em;
/// close enough for a header line.
fn centered_x(text: &str, font_size: f64) -> f64 {
    let width = text.chars().count() as f64 * font_size * 0.5;
    ((PAGE_WIDTH - width) / 2.0).max(0.0)
}

fn page_content(lines: &[String], with_header: bool, title: &str, subtitle: &str) -> String {
    let mut content = String::new();

    if with_header {
        content.push_str(&format!(
            "BT /F1 {FONT_SIZE_TITLE} Tf {} {Y_FOR_TITLE} Td ({}) Tj ET\n",
            centered_x(title, FONT_SIZE_TITLE),
            escape(title)
        ));
        content.push_str(&format!(
            "BT /F1 {FONT_SIZE_SUB_TITLE} Tf {} {Y_FOR_SUB_TITLE} Td ({}) Tj ET\n",
            centered_x(subtitle, FONT_SIZE_SUB_TITLE),
            escape(subtitle)
        ));
        content.push_str(&format!(
            "{X_FOR_RULE_START} {Y_FOR_RULE} m {X_FOR_RULE_END} {Y_FOR_RULE} l S\n"
        ));
    }

    let mut y = Y_FOR_INGREDIENTS;
    for line in lines {
        content.push_str(&format!(
            "BT /F1 {FONT_SIZE_INGREDIENTS} Tf {X_FOR_INGREDIENTS} {y} Td ({}) Tj ET\n",
            escape(line)
        ));
        y -= LINE_STEP;
    }

    content
}

/* object layout: 1 catalog, 2 page tree, 3 font, then (page, content) pairs */
fn assemble(contents: &[String]) -> Vec<u8> {
    let page_id = |i: usize| 4 + 2 * i;
    let content_id = |i: usize| 5 + 2 * i;

    let kids: Vec<String> = (0..contents.len())
        .map(|i| format!("{} 0 R", page_id(i)))
        .collect();

    let mut objects: Vec<String> = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            contents.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    for (i, content) in contents.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            content_id(i)
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ));
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n".to_vec();
    let mut offsets: Vec<usize> = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend(format!("{} 0 obj\n", i + 1).bytes());
        out.extend(body.bytes());
        out.extend(b"\nendobj\n");
    }

    let xref_at = out.len();
    out.extend(format!("xref\n0 {}\n", objects.len() + 1).bytes());
    out.extend(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend(format!("{offset:010} 00000 n \n").bytes());
    }
    out.extend(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .bytes(),
    );

    out
}
