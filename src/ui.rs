//! Terminal UI utilities.
//!
//! A box-drawn table that shrinks its widest columns to fit the terminal.
//!
//! ```rust
//! use incbuild::ui::Table;
//!
//! let mut table = Table::new(&["Variant", "Entry"]);
//! table.add_row(vec!["debug".to_string(), "src/main.c".to_string()]);
//! table.print();
//! ```

use colored::*;

const MIN_COLUMN: usize = 8;

pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Rows with the wrong number of cells are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        if row.len() == self.headers.len() {
            self.rows.push(row);
        }
    }

    pub fn print(&self) {
        let (_rows, cols) = console::Term::stdout().size();
        for line in self.render(cols as usize) {
            println!("{}", line);
        }
    }

    /// Lines of the table laid out for a terminal `max_width` columns wide.
    pub fn render(&self, max_width: usize) -> Vec<String> {
        if self.headers.is_empty() {
            return Vec::new();
        }
        let widths = self.column_widths(max_width);

        let sep = |left: &str, mid: &str, right: &str| -> String {
            let inner: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            format!("  {}{}{}", left, inner.join(mid), right)
        };
        let row = |cells: &[String], bold: bool| -> String {
            let mut s = String::from("  │");
            for (cell, &width) in cells.iter().zip(&widths) {
                let text = console::truncate_str(&flatten(cell), width, "...").to_string();
                let pad = width.saturating_sub(console::measure_text_width(&text));
                let text = if bold { text.bold().to_string() } else { text };
                s.push_str(&format!(" {}{} │", text, " ".repeat(pad)));
            }
            s
        };

        let mut lines = vec![sep("┌", "┬", "┐"), row(&self.headers, true), sep("├", "┼", "┤")];
        lines.extend(self.rows.iter().map(|r| row(r, false)));
        lines.push(sep("└", "┴", "┘"));
        lines
    }

    fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .headers
            .iter()
            .map(|h| console::measure_text_width(h))
            .collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(console::measure_text_width(&flatten(cell)));
            }
        }

        let overhead = 3 + 3 * widths.len();
        let available = max_width.saturating_sub(overhead);
        while widths.iter().sum::<usize>() > available {
            let Some((idx, &widest)) = widths.iter().enumerate().max_by_key(|(_, w)| **w) else {
                break;
            };
            if widest <= MIN_COLUMN {
                break;
            }
            widths[idx] -= 1;
        }
        widths
    }
}

fn flatten(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            _ => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_layout() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Variant", "Output"]);
        table.add_row(vec!["debug".into(), "app-debug".into()]);
        let lines = table.render(120);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "  ┌─────────┬───────────┐");
        assert_eq!(lines[3], "  │ debug   │ app-debug │");
    }

    #[test]
    fn test_mismatched_row_ignored() {
        let mut table = Table::new(&["A", "B"]);
        table.add_row(vec!["only one".into()]);
        assert_eq!(table.render(80).len(), 4);
    }

    #[test]
    fn test_narrow_terminal_truncates_widest_column() {
        colored::control::set_override(false);
        let mut table = Table::new(&["Variant", "Entry"]);
        table.add_row(vec!["debug".into(), "src/some/really/long/path/to/entry.c".into()]);
        let lines = table.render(30);
        assert!(lines[3].contains("..."));
        assert!(console::measure_text_width(&lines[3]) <= 30);
    }
}
