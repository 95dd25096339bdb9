use exporter_core::{ChatMessage, ExportFormat, Settings};

use crate::convert::Converter;

/// What the transcript header says about where it came from.
#[derive(Debug, Clone, Copy)]
pub struct TranscriptHeader<'a> {
    pub title: &'a str,
    pub url: Option<&'a str>,
    pub exported_at: &'a str,
}

/// Renders a full transcript in the format chosen in `settings`.
pub fn build_transcript(
    header: TranscriptHeader<'_>,
    messages: &[ChatMessage],
    settings: &Settings,
    converter: &dyn Converter,
) -> String {
    match settings.format {
        ExportFormat::Markdown => {
            build_markdown(header, messages, settings.include_metadata, converter)
        }
        ExportFormat::Text => build_text(header, messages, settings.include_metadata, converter),
    }
}

fn build_markdown(
    header: TranscriptHeader<'_>,
    messages: &[ChatMessage],
    include_metadata: bool,
    converter: &dyn Converter,
) -> String {
    let mut doc = format!("# {}\n\n", header.title);
    if include_metadata {
        doc.push_str(&format!("> Exported at: {}\n", header.exported_at));
        if let Some(url) = header.url {
            doc.push_str(&format!("> Source: {url}\n"));
        }
        doc.push_str(&format!("> Messages: {}\n\n", messages.len()));
    }
    for message in messages {
        doc.push_str(&format!("## {}\n\n", message.role));
        doc.push_str(&converter.render(&message.content));
        doc.push_str("\n\n---\n\n");
    }
    doc
}

fn build_text(
    header: TranscriptHeader<'_>,
    messages: &[ChatMessage],
    include_metadata: bool,
    converter: &dyn Converter,
) -> String {
    let underline = "=".repeat(header.title.chars().count().max(3));
    let mut doc = format!("{}\n{underline}\n\n", header.title);
    if include_metadata {
        doc.push_str(&format!("Exported at: {}\n", header.exported_at));
        if let Some(url) = header.url {
            doc.push_str(&format!("Source: {url}\n"));
        }
        doc.push_str(&format!("Messages: {}\n\n", messages.len()));
    }
    for message in messages {
        doc.push_str(&format!("[{}]\n", message.role));
        doc.push_str(&converter.render(&message.content));
        doc.push_str("\n\n");
    }
    doc
}
