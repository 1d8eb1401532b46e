//! Google Sheets ledger store
//!
//! The ledger lives in one worksheet. Row 1 is a header row that contains an
//! `ID` cell; identifiers fill the cells below it. Other columns are left
//! untouched.

use super::{build_client, endpoint};
use crate::adapters::traits::LedgerStore;
use crate::config::{SecretString, SheetsLedgerConfig};
use crate::domain::{LedgerError, RecordId, Result, DEFAULT_ID_COLUMN};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Column letter in A1 notation for a 0-based column index
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Worksheet name as used in an A1 range
fn sheet_ref(worksheet: &str) -> String {
    if worksheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        worksheet.to_string()
    } else {
        format!("'{}'", worksheet.replace('\'', "''"))
    }
}

fn cell_text(cell: &serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Ledger store backed by a Google Sheets worksheet
pub struct SheetsLedgerStore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    worksheet: String,
    access_token: SecretString,
}

impl SheetsLedgerStore {
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &SheetsLedgerConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
            access_token: config.access_token.clone(),
        })
    }

    async fn get_values(&self, range: &str) -> std::result::Result<ValueRange, LedgerError> {
        let url = endpoint(
            &self.base_url,
            &["v4", "spreadsheets", &self.spreadsheet_id, "values", range],
        )
        .map_err(|e| LedgerError::ReadFailed(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(self.access_token.expose_secret().as_ref())
            .send()
            .await
            .map_err(|e| LedgerError::ReadFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::ReadFailed(format!(
                "Sheets API returned {}: {}",
                status, body
            )));
        }

        response
            .json::<ValueRange>()
            .await
            .map_err(|e| LedgerError::Malformed(format!("unexpected Sheets response: {e}")))
    }

    async fn append_values(
        &self,
        range: &str,
        rows: Vec<Vec<String>>,
    ) -> std::result::Result<(), LedgerError> {
        let mut url = endpoint(
            &self.base_url,
            &[
                "v4",
                "spreadsheets",
                &self.spreadsheet_id,
                "values",
                &format!("{range}:append"),
            ],
        )
        .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");

        let response = self
            .client
            .post(url)
            .bearer_auth(self.access_token.expose_secret().as_ref())
            .json(&json!({ "majorDimension": "ROWS", "values": rows }))
            .send()
            .await
            .map_err(|e| LedgerError::WriteFailed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LedgerError::WriteFailed(format!(
                "Sheets API returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }

    /// Position of the `ID` header cell, `None` when the header row is empty
    fn id_column(header: Option<&Vec<serde_json::Value>>) -> std::result::Result<Option<usize>, LedgerError> {
        let Some(header) = header.filter(|h| h.iter().any(|c| !cell_text(c).trim().is_empty())) else {
            return Ok(None);
        };
        header
            .iter()
            .position(|c| cell_text(c).trim() == DEFAULT_ID_COLUMN)
            .map(Some)
            .ok_or_else(|| {
                LedgerError::Malformed(format!(
                    "no '{}' column in header row [{}]",
                    DEFAULT_ID_COLUMN,
                    header.iter().map(cell_text).collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

#[async_trait]
impl LedgerStore for SheetsLedgerStore {
    async fn load(&self) -> Result<Vec<String>> {
        let range = self.get_values(&sheet_ref(&self.worksheet)).await?;
        let mut rows = range.values.iter();

        let Some(index) = Self::id_column(rows.next())? else {
            return Ok(Vec::new());
        };

        Ok(rows
            .map(|row| row.get(index).map(cell_text).unwrap_or_default())
            .collect())
    }

    async fn append(&self, ids: &[RecordId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let sheet = sheet_ref(&self.worksheet);
        let header = self
            .get_values(&format!("{sheet}!1:1"))
            .await
            .map_err(|e| LedgerError::WriteFailed(e.to_string()))?;

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(ids.len() + 1);
        let column = match Self::id_column(header.values.first())? {
            Some(index) => column_letter(index),
            None => {
                rows.push(vec![DEFAULT_ID_COLUMN.to_string()]);
                column_letter(0)
            }
        };
        rows.extend(ids.iter().map(|id| vec![id.as_str().to_string()]));

        self.append_values(&format!("{sheet}!{column}:{column}"), rows)
            .await?;

        tracing::debug!(
            spreadsheet = %self.spreadsheet_id,
            worksheet = %self.worksheet,
            appended = ids.len(),
            "Appended identifiers to ledger sheet"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "google sheets ledger {}/{}",
            self.spreadsheet_id, self.worksheet
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use crate::domain::TallyError;
    use mockito::Matcher;
    use test_case::test_case;

    fn store(base_url: String) -> SheetsLedgerStore {
        SheetsLedgerStore::new(&SheetsLedgerConfig {
            spreadsheet_id: "sheet123".to_string(),
            worksheet: "Sheet1".to_string(),
            access_token: secret_string("tok".to_string()),
            base_url,
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test_case(0, "A")]
    #[test_case(25, "Z")]
    #[test_case(26, "AA")]
    #[test_case(51, "AZ")]
    #[test_case(702, "AAA")]
    fn test_column_letter(index: usize, expected: &str) {
        assert_eq!(column_letter(index), expected);
    }

    #[test]
    fn test_sheet_ref_quotes_when_needed() {
        assert_eq!(sheet_ref("Sheet1"), "Sheet1");
        assert_eq!(sheet_ref("Exported IDs"), "'Exported IDs'");
        assert_eq!(sheet_ref("Bob's"), "'Bob''s'");
    }

    #[tokio::test]
    async fn test_load_reads_id_column() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v4/spreadsheets/sheet123/values/Sheet1")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"range":"Sheet1!A1:B4","majorDimension":"ROWS",
                    "values":[["NOTE","ID"],["x","101"],["y"],["z",102]]}"#,
            )
            .create_async()
            .await;

        let values = store(server.url()).load().await.unwrap();

        mock.assert_async().await;
        assert_eq!(values, vec!["101", "", "102"]);
    }

    #[tokio::test]
    async fn test_load_empty_sheet() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/spreadsheets/sheet123/values/Sheet1")
            .with_status(200)
            .with_body(r#"{"range":"Sheet1!A1:Z1000","majorDimension":"ROWS"}"#)
            .create_async()
            .await;

        assert!(store(server.url()).load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_without_id_header_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/spreadsheets/sheet123/values/Sheet1")
            .with_status(200)
            .with_body(r#"{"values":[["RECORD"],["1"]]}"#)
            .create_async()
            .await;

        let err = store(server.url()).load().await.unwrap_err();
        assert!(matches!(err, TallyError::Ledger(LedgerError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_load_http_error_is_read_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/spreadsheets/sheet123/values/Sheet1")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;

        let err = store(server.url()).load().await.unwrap_err();
        assert!(matches!(err, TallyError::Ledger(LedgerError::ReadFailed(_))));
    }

    #[tokio::test]
    async fn test_append_uses_existing_id_column() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/spreadsheets/sheet123/values/Sheet1!1:1")
            .with_status(200)
            .with_body(r#"{"values":[["NOTE","ID"]]}"#)
            .create_async()
            .await;
        let append = server
            .mock("POST", "/v4/spreadsheets/sheet123/values/Sheet1!B:B:append")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("valueInputOption".into(), "RAW".into()),
                Matcher::UrlEncoded("insertDataOption".into(), "INSERT_ROWS".into()),
            ]))
            .match_body(Matcher::Json(serde_json::json!({
                "majorDimension": "ROWS",
                "values": [["R1"], ["R2"]]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let ids = vec![RecordId::new("R1").unwrap(), RecordId::new("R2").unwrap()];
        store(server.url()).append(&ids).await.unwrap();

        append.assert_async().await;
    }

    #[tokio::test]
    async fn test_append_writes_header_on_empty_sheet() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/spreadsheets/sheet123/values/Sheet1!1:1")
            .with_status(200)
            .with_body(r#"{"range":"Sheet1!1:1"}"#)
            .create_async()
            .await;
        let append = server
            .mock("POST", "/v4/spreadsheets/sheet123/values/Sheet1!A:A:append")
            .match_query(Matcher::Any)
            .match_body(Matcher::Json(serde_json::json!({
                "majorDimension": "ROWS",
                "values": [["ID"], ["R1"]]
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        store(server.url())
            .append(&[RecordId::new("R1").unwrap()])
            .await
            .unwrap();

        append.assert_async().await;
    }

    #[tokio::test]
    async fn test_append_rejected_is_write_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v4/spreadsheets/sheet123/values/Sheet1!1:1")
            .with_status(200)
            .with_body(r#"{"values":[["ID"]]}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/v4/spreadsheets/sheet123/values/Sheet1!A:A:append")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = store(server.url())
            .append(&[RecordId::new("R1").unwrap()])
            .await
            .unwrap_err();
        assert!(matches!(err, TallyError::Ledger(LedgerError::WriteFailed(_))));
    }
}
