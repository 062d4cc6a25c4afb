//! Result-table extraction from a page snapshot.

use scraper::{Html, Selector};

/// A selector string that did not parse.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid selector `{selector}`")]
pub struct InvalidSelector {
    pub selector: String,
}

pub(crate) fn parse_selector(raw: &str) -> Result<Selector, InvalidSelector> {
    Selector::parse(raw).map_err(|_| InvalidSelector {
        selector: raw.to_string(),
    })
}

/// Extracts the newest result table as rows of trimmed cell text.
#[derive(Debug)]
pub struct TableScraper {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl TableScraper {
    pub fn new(table_selector: &str) -> Result<Self, InvalidSelector> {
        Ok(Self {
            table: parse_selector(table_selector)?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
        })
    }

    /// Pull the last matching table out of `html`, skipping its header row
    /// and trimming every cell. The last table is the newest conversation
    /// turn; earlier ones are leftovers from previous exchanges.
    pub fn extract(&self, html: &str) -> Vec<Vec<String>> {
        let document = Html::parse_document(html);
        let Some(table) = document.select(&self.table).last() else {
            return Vec::new();
        };
        table
            .select(&self.row)
            .skip(1)
            .map(|row| {
                row.select(&self.cell)
                    .map(|cell| cell.text().collect::<String>().trim().to_string())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> TableScraper {
        TableScraper::new("table").expect("valid selector")
    }

    #[test]
    fn rejects_bad_selector() {
        let err = TableScraper::new("table[[[").expect_err("invalid");
        assert!(err.to_string().contains("table[[["));
    }

    #[test]
    fn skips_header_and_trims_cells() {
        let html = r#"<table>
            <tr><th>Date</th><th>Meeting</th></tr>
            <tr><td> 2024-01-01 </td><td>Weekly Sync
            </td></tr>
        </table>"#;
        let rows = scraper().extract(html);
        assert_eq!(
            rows,
            vec![vec!["2024-01-01".to_string(), "Weekly Sync".to_string()]]
        );
    }

    #[test]
    fn uses_last_table_in_document() {
        let html = r#"
            <table><tr><th>old</th></tr><tr><td>stale</td></tr></table>
            <table><tr><th>new</th></tr><tr><td>fresh</td></tr></table>
        "#;
        let rows = scraper().extract(html);
        assert_eq!(rows, vec![vec!["fresh".to_string()]]);
    }

    #[test]
    fn no_table_yields_no_rows() {
        assert!(scraper().extract("<p>still thinking</p>").is_empty());
    }

    #[test]
    fn flattens_bulleted_cell_content() {
        let html = r#"<table>
            <tr><th>h</th></tr>
            <tr><td><ul><li>did a</li><li>did b</li></ul></td></tr>
        </table>"#;
        let rows = scraper().extract(html);
        assert_eq!(rows.len(), 1);
        assert!(rows[0][0].contains("did a"));
        assert!(rows[0][0].contains("did b"));
    }
}
