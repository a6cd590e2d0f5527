//! The fill location report: which leaf got its value from where.
//!
//! One row per successfully filled leaf, in UID order. `dump()` renders the
//! two-column path/origin table used for debugging and audit.

use std::fmt;

/// Provenance of one filled leaf.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub uid: usize,
    pub path: String,
    pub location: String,
}

#[derive(Debug, Clone, Default)]
pub struct FillReport {
    pub rows: Vec<ReportRow>,
}

impl FillReport {
    /// Render rows as an aligned two-column table.
    pub fn dump(&self) -> String {
        let width = self
            .rows
            .iter()
            .map(|r| r.path.len())
            .max()
            .unwrap_or(0);
        let mut out = String::new();
        for row in &self.rows {
            out.push_str(&format!("{:<width$}  {}\n", row.path, row.location));
        }
        out
    }
}

impl fmt::Display for FillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_aligns_on_longest_path() {
        let report = FillReport {
            rows: vec![
                ReportRow {
                    uid: 0,
                    path: "host".into(),
                    location: "env[APP__HOST]".into(),
                },
                ReportRow {
                    uid: 1,
                    path: "database-pool_size".into(),
                    location: "struct[defaults]:database-pool_size".into(),
                },
            ],
        };
        let dump = report.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        // Both origin columns start at the same offset: longest path + 2.
        assert_eq!(lines[0].find("env[").unwrap(), 20);
        assert_eq!(lines[1].find("struct[").unwrap(), 20);
    }

    #[test]
    fn empty_report_dumps_empty() {
        assert_eq!(FillReport::default().dump(), "");
    }
}
