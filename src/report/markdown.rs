//! Markdown layout of the digest.

use std::io::{self, Write};

use super::Report;

const HEADER_TOPIC_SEPARATOR: &str = "\t\n";
const RULE: &str = "---\n\n";

/// Write the full digest document
pub fn write_markdown<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    writeln!(
        out,
        "# arXiv Paper Summary ({})\n",
        report.generated_on.format("%Y-%m-%d")
    )?;
    writeln!(
        out,
        "### Examined Papers Date Range: {}\n",
        report.date_range.label()
    )?;
    writeln!(
        out,
        "### Topics:\n{}\n\n",
        report.topics.as_slice().join(HEADER_TOPIC_SEPARATOR)
    )?;

    for paper in &report.papers {
        writeln!(out, "- [{}](#{})", paper.title, paper.target)?;
    }
    write!(out, "\n\n{}", RULE)?;

    for paper in &report.papers {
        writeln!(out, "<a name=\"{}\">", paper.target)?;
        if report.include_summaries {
            writeln!(out, "## [{}](#summary-of-{})\n</a>", paper.title, paper.target)?;
            writeln!(out, "**Link:** [{}]({})\n", paper.link, paper.link)?;
        } else {
            writeln!(out, "## [{}]({})\n</a>", paper.title, paper.link)?;
        }
        writeln!(out, "**Abstract:** {}\n", paper.r#abstract)?;
        writeln!(out, "**Analysis:** {}\n", paper.analysis)?;
        write!(out, "{}", RULE)?;
    }

    if report.include_summaries {
        for paper in &report.papers {
            writeln!(out, "<a name=\"summary-of-{}\">", paper.target)?;
            writeln!(out, "## Summary of {}\n</a>", paper.title)?;
            writeln!(out, "**Link:** [{}]({})\n", paper.link, paper.link)?;
            writeln!(out, "**Summary:** {}\n", paper.summary)?;
            write!(out, "{}", RULE)?;
        }
    }

    out.flush()
}
