use exporter_core::{ChatMessage, ExportFormat, Role, Settings};
use exporter_engine::{
    build_transcript, converter_for, error_filename, export_filename, sanitize_title,
    DomTranscriptExtractor, TranscriptHeader,
};
use pretty_assertions::assert_eq;

fn header() -> TranscriptHeader<'static> {
    TranscriptHeader {
        title: "Rust lifetimes",
        url: Some("https://chat.test/app/abc"),
        exported_at: "2024-05-01 12:00:00",
    }
}

fn messages() -> Vec<ChatMessage> {
    vec![
        ChatMessage::new(Role::User, "What is &#39;a?"),
        ChatMessage::new(
            Role::Model,
            "<p>A <strong>lifetime</strong>.</p><ul><li>one</li><li>two</li></ul>",
        ),
    ]
}

#[test]
fn markdown_transcript_layout() {
    let settings = Settings::default();
    let converter = converter_for(settings.format);

    let doc = build_transcript(header(), &messages(), &settings, converter.as_ref());

    assert!(doc.starts_with(
        "# Rust lifetimes\n\n> Exported at: 2024-05-01 12:00:00\n> Source: https://chat.test/app/abc\n> Messages: 2\n\n## User\n\n"
    ));
    assert!(doc.contains("## Model\n\nA **lifetime**."));
    assert_eq!(doc.matches("\n\n---\n\n").count(), 2);
}

#[test]
fn metadata_block_is_optional() {
    let settings = Settings {
        include_metadata: false,
        ..Settings::default()
    };
    let converter = converter_for(settings.format);

    let doc = build_transcript(header(), &messages(), &settings, converter.as_ref());

    assert!(doc.starts_with("# Rust lifetimes\n\n## User\n\n"));
    assert!(!doc.contains("Exported at"));
}

#[test]
fn text_transcript_layout() {
    let settings = Settings {
        format: ExportFormat::Text,
        ..Settings::default()
    };
    let converter = converter_for(settings.format);

    let doc = build_transcript(header(), &messages(), &settings, converter.as_ref());

    assert!(doc.starts_with("Rust lifetimes\n==============\n\nExported at: 2024-05-01 12:00:00\n"));
    assert!(doc.contains("[Model]\nA lifetime.\n\n- one\n- two\n\n"));
}

#[test]
fn export_filenames() {
    assert_eq!(
        export_filename("Plan: trip / budget?", "c-42", ExportFormat::Markdown),
        "Plan_trip_budget_c-42.md"
    );
    assert_eq!(
        export_filename("Résumé ideas", "x1", ExportFormat::Text),
        "Résumé_ideas_x1.txt"
    );
    assert_eq!(export_filename("???", "x1", ExportFormat::Markdown), "Untitled_x1.md");
    assert_eq!(error_filename("c-42"), "ERROR_c-42.txt");
}

#[test]
fn long_titles_are_truncated() {
    let title = "word ".repeat(30);
    let sanitized = sanitize_title(&title);
    assert!(sanitized.chars().count() <= 50);
    assert!(!sanitized.ends_with('_'));
}

#[test]
fn extractor_walks_rows_in_order() {
    let html = r#"<div class="chat-history">
        <user-query>Show <code>a < b</code> please <button>Edit</button></user-query>
        <model-response><div class="message-content"><p>Sure</p></div></model-response>
        <user-query>Thanks edit</user-query>
        <model-response><p>Welcome</p></model-response>
    </div>"#;

    let messages = DomTranscriptExtractor::default().extract(html).unwrap();

    let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Model, Role::User, Role::Model]);
    assert_eq!(messages[0].content, "Show a &lt; b please");
    assert_eq!(messages[1].content, "<p>Sure</p>");
    assert_eq!(messages[2].content, "Thanks");
    assert_eq!(messages[3].content, "<p>Welcome</p>");
}

#[test]
fn page_without_chat_container_extracts_nothing() {
    let extractor = DomTranscriptExtractor::default();
    assert!(extractor.extract("<main><p>Loading</p></main>").is_none());
    assert!(!extractor.has_chat_container("<main></main>"));
}
