//! Mermaid helpers for chat replies and generated diagrams.

use std::sync::OnceLock;

use regex::Regex;

pub const FLOWCHART_HEADER: &str = "graph LR";

fn fence_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z0-9_+-]*)[^\n]*\n(.*?)```")
            .expect("fence regex must compile")
    })
}

fn header_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"^(graph|flowchart)(\s|;|$)").expect("header regex must compile")
    })
}

/// Bodies of closed fenced code blocks tagged `lang`, in document order.
///
/// A block still missing its closing fence is skipped; the reply it belongs to
/// may still be streaming.
pub fn extract_code_blocks(text: &str, lang: &str) -> Vec<String> {
    fence_regex()
        .captures_iter(text)
        .filter(|captures| captures[1].eq_ignore_ascii_case(lang))
        .map(|captures| captures[2].trim_end().to_string())
        .collect()
}

/// A `graph`/`flowchart` keyword line that is not itself an edge.
fn is_header(line: &str) -> bool {
    header_regex().is_match(line) && !line.contains("-->")
}

/// Reduce model output to a left-to-right flowchart of `A --> B` edges.
///
/// Fences, comments, label-bearing lines (anything with `:`) and malformed
/// edges are dropped. Normalizing an already normalized diagram is a no-op.
pub fn normalize_flowchart(raw: &str) -> String {
    let text = raw.replace("```mermaid", "").replace("```", "");
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let start = lines
        .iter()
        .position(|line| is_header(line))
        .map(|index| index + 1)
        .unwrap_or(0);

    let mut diagram = vec![FLOWCHART_HEADER.to_string()];
    for line in &lines[start..] {
        if line.is_empty() || line.starts_with('%') || line.contains(':') {
            continue;
        }

        let mut cleaned = line.replace(';', "");
        while cleaned.contains("  ") {
            cleaned = cleaned.replace("  ", " ");
        }

        let edges: Vec<&str> = cleaned.split("-->").collect();
        if let [source, target] = edges.as_slice() {
            let (source, target) = (source.trim(), target.trim());
            if !source.is_empty() && !target.is_empty() {
                diagram.push(format!("{source} --> {target}"));
            }
        }
    }

    diagram.join("\n")
}
