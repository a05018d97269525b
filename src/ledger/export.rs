use crate::ledger::store::ResultLedger;
use crate::timing::format_interval;

/// Plain-text export: one `<start>–<end>\n<text>` block per meaningful
/// result in video order, blocks separated by a blank line.
pub fn render_export(ledger: &ResultLedger) -> String {
    ledger
        .chronological()
        .into_iter()
        .map(|entry| {
            format!(
                "{}\n{}",
                format_interval(&entry.interval()),
                entry.result.display_text().trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
