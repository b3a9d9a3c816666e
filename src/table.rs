use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub title: &'a str,
    pub align: Align,
}

impl<'a> Column<'a> {
    pub const fn left(title: &'a str) -> Self {
        Self {
            title,
            align: Align::Left,
        }
    }

    pub const fn right(title: &'a str) -> Self {
        Self {
            title,
            align: Align::Right,
        }
    }
}

/// Renders a pipe table. A `footer` row is set off from the body by a rule.
pub fn render(columns: &[Column<'_>], rows: &[Vec<String>], footer: Option<&[String]>) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.title.chars().count()).collect();
    for row in rows.iter().map(Vec::as_slice).chain(footer) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let titles: Vec<String> = columns.iter().map(|c| c.title.to_string()).collect();
    push_row(&mut out, columns, &widths, &titles);
    push_rule(&mut out, &widths);
    for row in rows {
        push_row(&mut out, columns, &widths, row);
    }
    if let Some(footer) = footer {
        push_rule(&mut out, &widths);
        push_row(&mut out, columns, &widths, footer);
    }
    out
}

fn push_row(out: &mut String, columns: &[Column<'_>], widths: &[usize], cells: &[String]) {
    out.push('|');
    for (i, (col, &w)) in columns.iter().zip(widths).enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        // Writing into a String cannot fail.
        let _ = match col.align {
            Align::Left => write!(out, " {cell:<w$} |"),
            Align::Right => write!(out, " {cell:>w$} |"),
        };
    }
    out.push('\n');
}

fn push_rule(out: &mut String, widths: &[usize]) {
    out.push('|');
    for w in widths {
        out.push_str(&"-".repeat(w + 2));
        out.push('|');
    }
    out.push('\n');
}
