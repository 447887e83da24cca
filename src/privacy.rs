use crate::types::Table;
use tracing::info;

/// Remove every column named `column` (exact, case-sensitive match on the
/// normalized header). A no-op when the column is absent.
///
/// Run this after `normalize`, which folds spelling variants of the sensitive
/// header onto its canonical name, and before anything reaches an exporter.
pub fn strip_sensitive(mut table: Table, column: &str) -> Table {
    let removed = table.remove_columns(column);
    if removed > 0 {
        info!(column = %column, copies = removed, "privacy check: column removed");
    }
    table
}
