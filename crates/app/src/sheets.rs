//! Google Sheets v4 adapter for the engine's range store.

use engine::{CellRange, EngineError, Grid, MajorDimension, RangeStore};
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, Result},
    settings::Spreadsheet,
};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const VALUE_INPUT_OPTION: &str = "USER_ENTERED";

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a Grid,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: Url,
    spreadsheet_id: String,
    token: String,
}

/// `Sheet!B9:H12`, quoting sheet names that contain spaces.
fn qualified_range(sheet: &str, range: &CellRange) -> String {
    if sheet.contains(' ') {
        format!("'{}'!{range}", sheet.replace('\'', "''"))
    } else {
        format!("{sheet}!{range}")
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn remote(what: &str, err: impl std::fmt::Display) -> EngineError {
    EngineError::Remote(format!("{what}: {err}"))
}

async fn check(what: &str, response: Response) -> std::result::Result<Response, EngineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .json::<ErrorResponse>()
        .await
        .map(|body| body.error.message)
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(EngineError::Remote(format!("{what}: {status}: {message}")))
}

impl SheetsClient {
    pub fn new(settings: &Spreadsheet) -> Result<Self> {
        let base_url = settings.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url)
            .map_err(|err| AppError::Input(format!("invalid base_url: {err}")))?;
        Ok(Self {
            http: Client::builder().build()?,
            base_url,
            spreadsheet_id: settings.id.clone(),
            token: settings.token.clone(),
        })
    }

    /// `{base}/{spreadsheet}/values/{range}{suffix}`
    fn endpoint(&self, range: &str, suffix: &str) -> std::result::Result<Url, EngineError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| remote("endpoint", "base_url cannot hold a path"))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}{suffix}"));
        Ok(url)
    }
}

impl RangeStore for SheetsClient {
    async fn get(
        &self,
        sheet: &str,
        range: &CellRange,
        major: MajorDimension,
    ) -> std::result::Result<Grid, EngineError> {
        let range = qualified_range(sheet, range);
        let what = format!("get {range}");
        let response = self
            .http
            .get(self.endpoint(&range, "")?)
            .bearer_auth(&self.token)
            .query(&[("majorDimension", major.as_str())])
            .send()
            .await
            .map_err(|err| remote(&what, err))?;
        let body = check(&what, response)
            .await?
            .json::<ValueRange>()
            .await
            .map_err(|err| remote(&what, err))?;

        Ok(body
            .values
            .into_iter()
            .map(|line| line.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn set(
        &self,
        sheet: &str,
        range: &CellRange,
        data: Grid,
        major: MajorDimension,
    ) -> std::result::Result<(), EngineError> {
        let range = qualified_range(sheet, range);
        let what = format!("set {range}");
        let body = UpdateBody {
            range: &range,
            major_dimension: major.as_str(),
            values: &data,
        };
        let response = self
            .http
            .put(self.endpoint(&range, "")?)
            .bearer_auth(&self.token)
            .query(&[("valueInputOption", VALUE_INPUT_OPTION)])
            .json(&body)
            .send()
            .await
            .map_err(|err| remote(&what, err))?;
        check(&what, response).await?;
        Ok(())
    }

    async fn clear(&self, sheet: &str, range: &CellRange) -> std::result::Result<(), EngineError> {
        let range = qualified_range(sheet, range);
        let what = format!("clear {range}");
        let response = self
            .http
            .post(self.endpoint(&range, ":clear")?)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|err| remote(&what, err))?;
        check(&what, response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        SheetsClient::new(&Spreadsheet {
            id: "sheet-id".to_string(),
            token: "token".to_string(),
            base_url: None,
            locale: engine::Locale::Europe,
        })
        .unwrap()
    }

    #[test]
    fn ranges_quote_sheet_names_with_spaces() {
        let range = CellRange::from_a1("B8:G10").unwrap();
        assert_eq!(qualified_range("Transactions", &range), "Transactions!B8:G10");
        assert_eq!(
            qualified_range("Category Transfers", &range),
            "'Category Transfers'!B8:G10"
        );
        assert_eq!(qualified_range("Bob's Budget", &range), "'Bob''s Budget'!B8:G10");
    }

    #[test]
    fn endpoints_escape_the_range() {
        let client = client();
        let url = client.endpoint("'Category Transfers'!B8:G10", ":clear").unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/'Category%20Transfers'!B8:G10:clear"
        );
    }

    #[test]
    fn non_string_cells_become_text() {
        assert_eq!(cell_text(Value::String("x".to_string())), "x");
        assert_eq!(cell_text(Value::Null), "");
        assert_eq!(cell_text(serde_json::json!(3)), "3");
        assert_eq!(cell_text(serde_json::json!(true)), "true");
    }
}
