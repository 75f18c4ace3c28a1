//! Formatting of command output

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::{self, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => Err(anyhow::anyhow!("Unknown output format: {}", s)),
        }
    }
}

pub struct OutputWriter {
    writer: Box<dyn Write>,
    format: OutputFormat,
    pretty: bool,
}

impl OutputWriter {
    pub fn new(writer: impl Write + 'static, format: OutputFormat) -> Self {
        Self {
            writer: Box::new(writer),
            format,
            pretty: false,
        }
    }

    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }

    /// Pretty-printed JSON
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// JSON in every format; text output is always pretty-printed
    pub fn write_object<T: Serialize>(&mut self, obj: &T) -> Result<()> {
        let json = if self.pretty || self.format != OutputFormat::Json {
            serde_json::to_string_pretty(obj)?
        } else {
            serde_json::to_string(obj)?
        };
        writeln!(self.writer, "{}", json)?;
        Ok(())
    }

    pub fn write_header(&mut self, header: &str) -> Result<()> {
        match self.format {
            OutputFormat::Text => {
                writeln!(self.writer, "\n{}", header.bold().blue())?;
                writeln!(self.writer, "{}", "=".repeat(header.chars().count()).blue())?;
            }
            _ => {
                writeln!(self.writer, "{}", header)?;
            }
        }
        Ok(())
    }

    /// Column-aligned table, or an array of objects keyed by header in JSON
    pub fn write_table(&mut self, headers: &[&str], rows: Vec<Vec<String>>) -> Result<()> {
        match self.format {
            OutputFormat::Table | OutputFormat::Text => {
                let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
                for row in &rows {
                    for (i, cell) in row.iter().enumerate() {
                        if i < widths.len() {
                            widths[i] = widths[i].max(cell.chars().count());
                        }
                    }
                }

                for (i, header) in headers.iter().enumerate() {
                    if i > 0 {
                        write!(self.writer, " │ ")?;
                    }
                    write!(self.writer, "{}", pad(header, widths[i]).bold())?;
                }
                writeln!(self.writer)?;

                for (i, width) in widths.iter().enumerate() {
                    if i > 0 {
                        write!(self.writer, "─┼─")?;
                    }
                    write!(self.writer, "{}", "─".repeat(*width))?;
                }
                writeln!(self.writer)?;

                for row in rows {
                    let line = row
                        .iter()
                        .enumerate()
                        .map(|(i, cell)| match widths.get(i) {
                            Some(width) => pad(cell, *width),
                            None => cell.clone(),
                        })
                        .collect::<Vec<_>>()
                        .join(" │ ");
                    writeln!(self.writer, "{}", line.trim_end())?;
                }
            }
            OutputFormat::Json => {
                let objects: Vec<serde_json::Value> = rows
                    .into_iter()
                    .map(|row| {
                        let object = headers
                            .iter()
                            .zip(row)
                            .map(|(header, cell)| (header.to_string(), serde_json::Value::String(cell)))
                            .collect::<serde_json::Map<_, _>>();
                        serde_json::Value::Object(object)
                    })
                    .collect();
                self.write_object(&objects)?;
            }
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{}{}", text, " ".repeat(width.saturating_sub(len)))
}
