//! CLI output formatting.
//!
//! Output is information-first: each page leads with its URL, with the
//! source file as an indented context line. Every section has a `format_*`
//! function returning lines, which keeps the formatting testable, and a
//! `print_*` wrapper that writes them to stdout.
//!
//! # Build
//!
//! ```text
//! Pages
//! 001 / → index.html
//!     Source: index.html
//! 002 /about/ → about/index.html
//!     Source: about.md
//!
//! Drafts hidden
//!     posts/unfinished-idea.md
//!
//! Navigation
//! 001 Home
//! 002 About
//!     001 First Post
//!
//! Collections
//!     all (4)
//!     posts (2)
//!
//! Assets
//!     assets/css/style.scss → assets/css/style.css (1.2 KB)
//!
//! Built 4 pages, 1 asset, copied 3 files → dist
//! ```

use crate::assets::CompiledAsset;
use crate::site::BuildReport;
use crate::types::NavItem;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Human-readable byte count.
fn format_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Navigation tree with positional indices per sibling level.
pub fn format_nav_tree(items: &[NavItem]) -> Vec<String> {
    let mut lines = Vec::new();
    walk_nav(items, 0, &mut lines);
    lines
}

fn walk_nav(items: &[NavItem], depth: usize, lines: &mut Vec<String>) {
    for (i, item) in items.iter().enumerate() {
        let external = match &item.url {
            Some(url) if url.contains("://") => format!(" ({url})"),
            _ => String::new(),
        };
        lines.push(format!(
            "{}{} {}{}",
            indent(depth),
            format_index(i + 1),
            item.title,
            external
        ));
        walk_nav(&item.children, depth + 1, lines);
    }
}

fn asset_line(asset: &CompiledAsset) -> String {
    if asset.input == asset.output {
        format!("    {} ({})", asset.output, format_bytes(asset.bytes))
    } else {
        format!(
            "    {} → {} ({})",
            asset.input,
            asset.output,
            format_bytes(asset.bytes)
        )
    }
}

fn section(lines: &mut Vec<String>, title: &str) {
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(title.to_string());
}

/// Everything a report knows, minus the closing summary line.
fn format_report_body(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();

    section(&mut lines, "Pages");
    for (i, page) in report.pages.iter().enumerate() {
        lines.push(format!("{} {} → {}", format_index(i + 1), page.url, page.output));
        lines.push(format!("    Source: {}", page.input));
    }

    if !report.drafts_hidden.is_empty() {
        section(&mut lines, "Drafts hidden");
        lines.extend(report.drafts_hidden.iter().map(|p| format!("    {p}")));
    }

    if !report.not_routed.is_empty() {
        section(&mut lines, "Not written (permalink: false)");
        lines.extend(report.not_routed.iter().map(|p| format!("    {p}")));
    }

    if !report.navigation.is_empty() {
        section(&mut lines, "Navigation");
        lines.extend(format_nav_tree(&report.navigation));
    }

    if !report.collections.is_empty() {
        section(&mut lines, "Collections");
        for (name, size) in &report.collections {
            lines.push(format!("    {name} ({size})"));
        }
    }

    if !report.assets.is_empty() {
        section(&mut lines, "Assets");
        lines.extend(report.assets.iter().map(asset_line));
    }

    lines
}

/// Build output: the report followed by a summary line.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = format_report_body(report);
    lines.push(String::new());
    let mut summary = format!(
        "Built {}, {}, copied {} → {}",
        plural(report.pages.len(), "page", "pages"),
        plural(report.assets.len(), "asset", "assets"),
        plural(report.copied, "file", "files"),
        report.output_dir.display()
    );
    if report.drafts_enabled {
        summary.push_str(" (drafts included)");
    }
    lines.push(summary);
    lines
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

/// Check output: what a build would write.
pub fn format_check_output(report: &BuildReport) -> Vec<String> {
    let mut lines = format_report_body(report);
    lines.push(String::new());
    lines.push(format!(
        "Site is valid: {} would be written",
        plural(report.pages.len(), "page", "pages")
    ));
    lines
}

pub fn print_check_output(report: &BuildReport) {
    for line in format_check_output(report) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKind;
    use crate::site::PageOutput;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn nav(key: &str, title: &str, children: Vec<NavItem>) -> NavItem {
        NavItem {
            key: key.to_string(),
            title: title.to_string(),
            url: Some(format!("/{key}/")),
            children,
        }
    }

    fn report() -> BuildReport {
        BuildReport {
            output_dir: PathBuf::from("dist"),
            drafts_enabled: false,
            pages: vec![
                PageOutput {
                    input: "index.html".to_string(),
                    url: "/".to_string(),
                    output: "index.html".to_string(),
                },
                PageOutput {
                    input: "about.md".to_string(),
                    url: "/about/".to_string(),
                    output: "about/index.html".to_string(),
                },
            ],
            not_routed: Vec::new(),
            drafts_hidden: vec!["posts/unfinished-idea.md".to_string()],
            collections: vec![("all".to_string(), 2), ("posts".to_string(), 1)],
            navigation: vec![nav("about", "About", vec![nav("first-post", "First Post", vec![])])],
            assets: vec![CompiledAsset {
                kind: AssetKind::Stylesheet,
                input: "assets/css/style.scss".to_string(),
                output: "assets/css/style.css".to_string(),
                bytes: 2048,
                dependencies: Vec::new(),
            }],
            copied: 3,
        }
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn nav_tree_indents_children() {
        let items = vec![
            nav("home", "Home", vec![]),
            nav("docs", "Docs", vec![nav("a", "A", vec![]), nav("b", "B", vec![])]),
        ];
        assert_eq!(
            format_nav_tree(&items),
            vec!["001 Home", "002 Docs", "    001 A", "    002 B"]
        );
    }

    #[test]
    fn nav_tree_marks_external_links() {
        let mut item = nav("gh", "GitHub", vec![]);
        item.url = Some("https://github.com/x".to_string());
        assert_eq!(format_nav_tree(&[item]), vec!["001 GitHub (https://github.com/x)"]);
    }

    #[test]
    fn build_output_full() {
        let lines = format_build_output(&report());
        assert_eq!(
            lines,
            vec![
                "Pages",
                "001 / → index.html",
                "    Source: index.html",
                "002 /about/ → about/index.html",
                "    Source: about.md",
                "",
                "Drafts hidden",
                "    posts/unfinished-idea.md",
                "",
                "Navigation",
                "001 About",
                "    001 First Post",
                "",
                "Collections",
                "    all (2)",
                "    posts (1)",
                "",
                "Assets",
                "    assets/css/style.scss → assets/css/style.css (2.0 KB)",
                "",
                "Built 2 pages, 1 asset, copied 3 files → dist",
            ]
        );
    }

    #[test]
    fn build_output_notes_drafts() {
        let mut r = report();
        r.drafts_enabled = true;
        let last = format_build_output(&r).pop().unwrap();
        assert!(last.ends_with("(drafts included)"));
    }

    #[test]
    fn check_output_summary() {
        let lines = format_check_output(&report());
        assert_eq!(lines.last().unwrap(), "Site is valid: 2 pages would be written");
    }

    #[test]
    fn not_routed_section() {
        let mut r = report();
        r.not_routed = vec!["hidden.md".to_string()];
        let lines = format_build_output(&r);
        let i = lines
            .iter()
            .position(|l| l == "Not written (permalink: false)")
            .unwrap();
        assert_eq!(lines[i + 1], "    hidden.md");
    }

    #[test]
    fn script_asset_without_rename() {
        let asset = CompiledAsset {
            kind: AssetKind::Script,
            input: "assets/js/index.js".to_string(),
            output: "assets/js/index.js".to_string(),
            bytes: 100,
            dependencies: Vec::new(),
        };
        assert_eq!(asset_line(&asset), "    assets/js/index.js (100 B)");
    }
}
