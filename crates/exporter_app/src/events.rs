use std::sync::mpsc;
use std::thread;

use exporter_engine::ExportEvent;

/// Prints engine events on a background thread until every sender is gone.
pub fn spawn_printer(rx: mpsc::Receiver<ExportEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut printer = EventPrinter::default();
        for event in rx {
            if let Some(line) = printer.render(event) {
                println!("{line}");
            }
        }
    })
}

/// Turns events into terminal lines, skipping progress updates whose text
/// did not change.
#[derive(Debug, Default)]
struct EventPrinter {
    last_status: String,
}

impl EventPrinter {
    fn render(&mut self, event: ExportEvent) -> Option<String> {
        match event {
            ExportEvent::Status(text) => Some(text),
            ExportEvent::Progress(report) => {
                if report.text == self.last_status {
                    return None;
                }
                let line = format!("[{:>3}%] {}", report.percent, report.text);
                self.last_status = report.text;
                Some(line)
            }
            ExportEvent::ItemCompleted {
                filename, failed, ..
            } => failed.then(|| format!("       failed, wrote {filename}")),
        }
    }
}
