//! HTML preview of a ticket tree.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::model::TicketNode;
use crate::walk;

/// Depths at or beyond this share one visual style.
const MAX_STYLED_DEPTH: usize = 4;

const STYLE: &str = "\
body { font-family: sans-serif; margin: 2rem; color: #222; }
.summary { display: flex; gap: 2rem; margin-bottom: 1rem; }
.summary div { background: #f3f4f6; padding: 0.5rem 1rem; border-radius: 4px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 0.4rem 0.6rem; text-align: left; vertical-align: top; }
th { background: #f9fafb; }
td.hours { text-align: right; white-space: nowrap; }
td.description { font-size: 0.85rem; color: #555; }
tr.level-0 { background: #e8f0fe; font-weight: bold; }
tr.level-1 { background: #f1f8e9; }
tr.level-2 { background: #fffde7; }
tr.level-3 { background: #fff3e0; }
tr.level-4-plus { background: #fce4ec; }
.indent-0 { padding-left: 0.6rem; }
.indent-1 { padding-left: 2rem; }
.indent-2 { padding-left: 3.5rem; }
.indent-3 { padding-left: 5rem; }
.indent-4-plus { padding-left: 6.5rem; }
.badge { display: inline-block; padding: 0.1rem 0.5rem; border-radius: 999px; background: #e0e7ff; font-size: 0.8rem; }
";

/// Escape text for interpolation into HTML element content or attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn depth_class(depth: usize) -> String {
    if depth >= MAX_STYLED_DEPTH {
        format!("{MAX_STYLED_DEPTH}-plus")
    } else {
        depth.to_string()
    }
}

/// Render `tree` as a standalone HTML page: a summary header followed by one
/// table row per node in pre-order.
#[must_use]
pub fn render_html(tree: &[TicketNode]) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang=\"en\">");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>Ticket preview</title>");
    let _ = writeln!(html, "<style>\n{STYLE}</style>");
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "<h1>Ticket preview</h1>");

    let _ = writeln!(html, "<div class=\"summary\">");
    let _ = writeln!(html, "<div>Root tickets: {}</div>", tree.len());
    let _ = writeln!(html, "<div>Total tickets: {}</div>", walk::count(tree));
    let _ = writeln!(
        html,
        "<div>Total estimated hours: {}h</div>",
        walk::total_hours(tree)
    );
    let _ = writeln!(html, "</div>");

    let _ = writeln!(html, "<table>");
    let _ = writeln!(
        html,
        "<thead><tr><th>Level</th><th>Type</th><th>Name</th><th>Subject</th><th>Process</th><th>Hours</th><th>Description</th></tr></thead>"
    );
    let _ = writeln!(html, "<tbody>");
    walk::walk(tree, |node, depth| render_row(&mut html, node, depth));
    let _ = writeln!(html, "</tbody>");
    let _ = writeln!(html, "</table>");
    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");
    html
}

fn render_row(html: &mut String, node: &TicketNode, depth: usize) {
    let bucket = depth_class(depth);
    let badge = node.process_type().map_or_else(String::new, |p| {
        format!(
            "<span class=\"badge badge-{}\">{}</span>",
            p.as_str(),
            escape_html(p.label())
        )
    });
    let description = escape_html(&node.description).replace('\n', "<br>");

    let _ = writeln!(
        html,
        "<tr class=\"level-{bucket}\"><td>{depth}</td><td>{}</td><td class=\"indent-{bucket}\">{}</td><td>{}</td><td>{badge}</td><td class=\"hours\">{}h</td><td class=\"description\">{description}</td></tr>",
        node.kind.type_name(),
        escape_html(node.display_name()),
        escape_html(&node.subject),
        node.estimated_hours,
    );
}

/// Render `tree` and write the page to `path`.
///
/// # Errors
///
/// Returns [`crate::TicketError::Io`] if the file cannot be written.
pub fn write_html(path: &Path, tree: &[TicketNode]) -> Result<()> {
    crate::document::write_file(path, &render_html(tree))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProcessType;

    fn chain(depth: usize) -> TicketNode {
        let mut node = TicketNode::task("leaf", ProcessType::UnitTest, "leaf", "", 1.0);
        for i in 0..depth {
            node = TicketNode::group(format!("g{i}"), format!("g{i}"), "", vec![node]);
        }
        node
    }

    #[test]
    fn escapes_all_special_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn header_counts_and_hours() {
        let tree = vec![
            TicketNode::process(
                ProcessType::DetailDesign,
                "Detail design",
                "",
                vec![
                    TicketNode::task("Login", ProcessType::DetailDesign, "Login", "", 8.0),
                    TicketNode::task("Logout", ProcessType::DetailDesign, "Logout", "", 8.0),
                ],
            ),
            TicketNode::process(
                ProcessType::Implementation,
                "Implementation",
                "",
                vec![TicketNode::task("Login", ProcessType::Implementation, "Login", "", 32.0)],
            ),
        ];
        let html = render_html(&tree);
        assert!(html.contains("Root tickets: 2"));
        assert!(html.contains("Total tickets: 5"));
        assert!(html.contains("Total estimated hours: 48h"));
        assert_eq!(html.matches("<tr class=\"level-").count(), 5);
        assert!(html.contains("<td class=\"indent-0\">—</td>"));
        assert!(html.contains("badge-implementation"));
    }

    #[test]
    fn deep_rows_share_the_last_bucket() {
        let html = render_html(&[chain(6)]);
        assert!(html.contains("level-3\""));
        assert!(html.contains("level-4-plus"));
        assert!(!html.contains("level-5"));
        assert!(html.contains("<td>6</td>"));
    }

    #[test]
    fn interpolated_fields_are_escaped() {
        let tree = vec![TicketNode::task(
            "<script>",
            ProcessType::UnitTest,
            "a & b",
            "line1\n\"quoted\"",
            1.5,
        )];
        let html = render_html(&tree);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b"));
        assert!(html.contains("line1<br>&quot;quoted&quot;"));
        assert!(html.contains("1.5h"));
    }

    #[test]
    fn empty_tree_renders_zero_summary() {
        let html = render_html(&[]);
        assert!(html.contains("Root tickets: 0"));
        assert!(html.contains("Total estimated hours: 0h"));
    }
}
