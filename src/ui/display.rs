//! Display functions for run summaries
//!
//! Lines are built by `format_*` functions and printed by `display_*`, so the
//! wording can be tested without a terminal.

use console::Style;

use crate::pipeline::RunSummary;

/// Print the outcome of a completed run
pub fn display_summary(summary: &RunSummary) {
    for line in format_summary(summary) {
        println!("{line}");
    }
}

/// Print the planned copies of a dry run
pub fn display_plan(summary: &RunSummary) {
    for line in format_plan(summary) {
        println!("{line}");
    }
}

pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    let bold = Style::new().bold();
    let mut lines = Vec::new();

    let headline = if summary.dry_run {
        Style::new().bold().cyan().apply_to("Dry run:").to_string()
    } else {
        Style::new().bold().green().apply_to("Bundled").to_string()
    };
    lines.push(format!(
        "{headline} {} from {} ({} modules, {} packages, {} copied in full)",
        pluralize(summary.files.len(), "file"),
        summary.entry,
        summary.modules,
        summary.packages,
        summary.full_packages,
    ));

    if !summary.dry_run {
        lines.push(format!(
            "  {} {} copied, {} unchanged, {} removed",
            bold.apply_to("Files:"),
            summary.copy.copied,
            summary.copy.skipped,
            summary.pruned
        ));
    }
    lines.push(format!(
        "  {} {}",
        bold.apply_to("Output:"),
        summary.output.display()
    ));
    if let Some(launcher) = &summary.launcher {
        lines.push(format!(
            "  {} {}",
            bold.apply_to("Launcher:"),
            launcher.display()
        ));
    }

    if !summary.warnings.is_empty() {
        lines.push(format!(
            "{} {}",
            Style::new().bold().yellow().apply_to("Warnings:"),
            summary.warnings.len()
        ));
        for warning in &summary.warnings {
            lines.push(format!("  - {warning}"));
        }
    }
    lines
}

pub fn format_plan(summary: &RunSummary) -> Vec<String> {
    let dim = Style::new().dim();
    summary
        .files
        .iter()
        .map(|(source, destination)| {
            format!("  {destination} {} {source}", dim.apply_to("<-"))
        })
        .collect()
}

fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::Warning;
    use crate::graph::PackageId;
    use crate::materializer::CopyStats;

    fn summary() -> RunSummary {
        RunSummary {
            output: PathBuf::from("/srv/out"),
            entry: "server.js".to_string(),
            modules: 3,
            packages: 2,
            full_packages: 1,
            files: vec![("server.js".to_string(), "app/server.js".to_string())],
            copy: CopyStats {
                copied: 1,
                skipped: 0,
            },
            pruned: 2,
            launcher: Some(PathBuf::from("/srv/out/server/start.sh")),
            warnings: vec![Warning::MissingDependency {
                package: PackageId::new("node_modules/a"),
                dependency: "fsevents".to_string(),
                optional: true,
            }],
            dry_run: false,
        }
    }

    #[test]
    fn test_format_summary() {
        console::set_colors_enabled(false);
        let lines = format_summary(&summary());

        assert_eq!(
            lines[0],
            "Bundled 1 file from server.js (3 modules, 2 packages, 1 copied in full)"
        );
        assert_eq!(lines[1], "  Files: 1 copied, 0 unchanged, 2 removed");
        assert!(lines.iter().any(|l| l.contains("start.sh")));
        assert!(lines.last().unwrap().contains("fsevents"));
    }

    #[test]
    fn test_format_plan() {
        console::set_colors_enabled(false);
        let mut summary = summary();
        summary.dry_run = true;

        assert_eq!(format_plan(&summary), vec!["  app/server.js <- server.js"]);
        assert!(format_summary(&summary)[0].starts_with("Dry run: 1 file"));
    }
}
