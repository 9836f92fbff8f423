use crate::{cli::OutputFormat, error::Result};
#[cfg(feature = "colored-output")]
use colored::*;
use serde::Serialize;
use solu_engine::{
    CatalogSnapshot, PageModel, ProbeReport, QuestionStatus, Selection, Subject, YearCode,
};
use std::fmt::Write as _;
use std::io::Write;

pub struct OutputManager {
    colored: bool,
    format: OutputFormat,
}

impl OutputManager {
    pub fn new(colored: bool, format: OutputFormat) -> Self {
        Self { colored, format }
    }

    pub fn subjects(&self, subjects: &[Subject]) -> Result<String> {
        if let Some(json) = self.json(&subjects)? {
            return Ok(json);
        }

        let mut output = self.colorize("Subjects:", &Color::Green, true);
        output.push('\n');
        for subject in subjects {
            let _ = writeln!(
                output,
                "  {}",
                self.colorize(subject.as_str(), &Color::Cyan, false)
            );
        }
        Ok(output)
    }

    pub fn years(&self, subject: &Subject, years: &[YearCode]) -> Result<String> {
        if let Some(json) = self.json(&years)? {
            return Ok(json);
        }

        let mut output = self.colorize(&format!("Years for {subject}:"), &Color::Green, true);
        output.push('\n');
        if years.is_empty() {
            let _ = writeln!(
                output,
                "  {}",
                self.colorize("(none found)", &Color::Yellow, false)
            );
        }
        for year in years {
            let _ = writeln!(
                output,
                "  {}",
                self.colorize(year.as_str(), &Color::Cyan, false)
            );
        }
        Ok(output)
    }

    pub fn catalog(&self, catalog: &CatalogSnapshot) -> Result<String> {
        if let Some(json) = self.json(catalog)? {
            return Ok(json);
        }

        let mut output = String::new();
        self.push_catalog(&mut output, catalog);
        Ok(output)
    }

    pub fn audit(&self, selection: &Selection, diagnostic: Option<&ProbeReport>) -> Result<String> {
        if self.format != OutputFormat::Pretty {
            let value = serde_json::json!({
                "selection": selection,
                "diagnostic": diagnostic,
            });
            return Ok(self.json(&value)?.unwrap_or_default());
        }

        let mut output = String::new();
        if let Some(report) = diagnostic {
            self.push_probe(&mut output, report);
            output.push('\n');
        }
        self.push_selection(&mut output, selection);
        Ok(output)
    }

    pub fn probe(&self, report: &ProbeReport) -> Result<String> {
        if let Some(json) = self.json(report)? {
            return Ok(json);
        }

        let mut output = String::new();
        self.push_probe(&mut output, report);
        Ok(output)
    }

    pub fn page(&self, page: &PageModel) -> Result<String> {
        if let Some(json) = self.json(page)? {
            return Ok(json);
        }

        let mut output = String::new();
        self.push_catalog(&mut output, &page.catalog);
        if let Some(report) = &page.diagnostic {
            output.push('\n');
            self.push_probe(&mut output, report);
        }
        if let Some(selection) = &page.selection {
            output.push('\n');
            self.push_selection(&mut output, selection);
        }
        let _ = writeln!(output, "\nLoaded in {} ms", page.elapsed_ms);
        Ok(output)
    }

    /// Serialized form for the JSON formats, `None` for pretty output
    fn json<T: Serialize + ?Sized>(&self, value: &T) -> Result<Option<String>> {
        let rendered = match self.format {
            OutputFormat::Pretty => return Ok(None),
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::JsonCompact => serde_json::to_string(value)?,
        };
        Ok(Some(rendered + "\n"))
    }

    fn push_catalog(&self, output: &mut String, catalog: &CatalogSnapshot) {
        output.push_str(&self.colorize("Catalog:", &Color::Green, true));
        output.push('\n');
        if catalog.is_degraded() {
            let _ = writeln!(
                output,
                "  {}",
                self.colorize(
                    "Archive unreachable, showing the built-in subject list",
                    &Color::Red,
                    false
                )
            );
        }
        for subject in &catalog.subjects {
            let years: Vec<&str> = catalog
                .years_of(subject)
                .iter()
                .map(YearCode::as_str)
                .collect();
            let years = if years.is_empty() {
                "-".to_string()
            } else {
                years.join(", ")
            };
            let _ = writeln!(
                output,
                "  {}: {}",
                self.colorize(subject.as_str(), &Color::Yellow, false),
                self.colorize(&years, &Color::Cyan, false)
            );
        }
    }

    fn push_selection(&self, output: &mut String, selection: &Selection) {
        let title = format!("Audit of {} {}:", selection.subject, selection.year);
        output.push_str(&self.colorize(&title, &Color::Green, true));
        output.push('\n');

        for question in &selection.questions {
            output.push_str(&self.question_line(question));
            output.push('\n');
        }

        let summary = &selection.summary;
        let _ = writeln!(
            output,
            "\n  {}: {}  {}: {}  {}: {:.1}%",
            self.colorize("Uploaded", &Color::Yellow, false),
            self.colorize(&summary.uploaded.to_string(), &Color::Green, true),
            self.colorize("Missing", &Color::Yellow, false),
            self.colorize(&summary.missing.to_string(), &Color::Red, true),
            self.colorize("Complete", &Color::Yellow, false),
            summary.percentage
        );
    }

    fn question_line(&self, question: &QuestionStatus) -> String {
        let number = format!("Q{:02}", question.question_number);
        match (&question.url, question.checked_at) {
            (Some(url), Some(checked_at)) if question.is_uploaded() => format!(
                "  {} {} {} ({})",
                number,
                self.colorize("uploaded", &Color::Green, false),
                self.colorize(url, &Color::Blue, false),
                checked_at.format("%Y-%m-%d %H:%M:%S")
            ),
            _ => format!(
                "  {} {}",
                number,
                self.colorize("missing", &Color::Red, false)
            ),
        }
    }

    fn push_probe(&self, output: &mut String, report: &ProbeReport) {
        output.push_str(&self.colorize("Probe result:", &Color::Green, true));
        output.push('\n');
        let _ = writeln!(
            output,
            "  {}: {}",
            self.colorize("URL", &Color::Yellow, false),
            self.colorize(&report.final_url, &Color::Blue, false)
        );
        let status = report
            .status_code
            .map_or_else(|| "no response".to_string(), |code| code.to_string());
        let _ = writeln!(
            output,
            "  {}: {}",
            self.colorize("HTTP Status", &Color::Yellow, false),
            self.colorize(&status, &Color::Cyan, false)
        );
        let exists = if report.exists {
            self.colorize("yes", &Color::Green, true)
        } else {
            self.colorize("no", &Color::Red, true)
        };
        let _ = writeln!(
            output,
            "  {}: {}",
            self.colorize("Exists", &Color::Yellow, false),
            exists
        );
    }

    fn colorize(&self, text: &str, color: &Color, bold: bool) -> String {
        #[cfg(feature = "colored-output")]
        {
            if self.colored {
                let colored_text = match color {
                    Color::Green => text.green(),
                    Color::Yellow => text.yellow(),
                    Color::Blue => text.blue(),
                    Color::Cyan => text.cyan(),
                    Color::Red => text.red(),
                };
                if bold {
                    colored_text.bold().to_string()
                } else {
                    colored_text.to_string()
                }
            } else {
                text.to_string()
            }
        }

        #[cfg(not(feature = "colored-output"))]
        {
            let _ = (color, bold, self.colored);
            text.to_string()
        }
    }
}

enum Color {
    Green,
    Yellow,
    Blue,
    Cyan,
    Red,
}

pub fn write_output(content: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
