//! Streaming CSV access for lead lists (§4.B: "row access is by zero-based index
//! with bounds checking").

use csv_async::AsyncReaderBuilder;
use futures::StreamExt;

use crate::error::{StorageError, StorageResult};

/// A parsed lead CSV: a header row plus data rows, indexed by zero-based position.
pub struct LeadCsv {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl LeadCsv {
    /// Parse CSV bytes via a streaming reader, materializing rows (files are capped at
    /// 5 MB by the fetch layer, so holding them in memory afterward is cheap).
    pub async fn parse(bytes: &[u8]) -> StorageResult<Self> {
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .create_reader(bytes);

        let headers = reader
            .headers()
            .await?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        let mut records = reader.records();
        while let Some(record) = records.next().await {
            let record = record?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn row_count(&self) -> i64 {
        self.rows.len() as i64
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Zero-based row lookup with bounds checking (§4.G step 1).
    pub fn row(&self, index: i64) -> StorageResult<&[String]> {
        if index < 0 || index >= self.row_count() {
            return Err(StorageError::CsvRowOutOfRange {
                index,
                row_count: self.row_count(),
            });
        }
        Ok(&self.rows[index as usize])
    }

    /// Look up `column` in the row at `index`, trimmed.
    pub fn column_value(&self, index: i64, column: &str) -> StorageResult<String> {
        let row = self.row(index)?;
        let col_idx = self
            .headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| StorageError::CsvColumnNotFound(column.to_string()))?;
        Ok(row.get(col_idx).map(|s| s.trim().to_string()).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_headers_and_rows() {
        let csv = LeadCsv::parse(b"name,url\nAcme,https://acme.test\nBeta,https://beta.test\n")
            .await
            .unwrap();
        assert_eq!(csv.row_count(), 2);
        assert_eq!(csv.column_value(0, "name").unwrap(), "Acme");
        assert_eq!(csv.column_value(1, "url").unwrap(), "https://beta.test");
    }

    #[tokio::test]
    async fn out_of_range_row_is_rejected() {
        let csv = LeadCsv::parse(b"name\nAcme\n").await.unwrap();
        assert!(matches!(
            csv.row(5),
            Err(StorageError::CsvRowOutOfRange { index: 5, row_count: 1 })
        ));
    }

    #[tokio::test]
    async fn unknown_column_is_rejected() {
        let csv = LeadCsv::parse(b"name\nAcme\n").await.unwrap();
        assert!(matches!(
            csv.column_value(0, "missing"),
            Err(StorageError::CsvColumnNotFound(_))
        ));
    }
}
