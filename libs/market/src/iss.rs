//
// MOEX ISS JSON tables
// https://iss.moex.com/iss/reference/
//
// Every block is `{ "columns": [...], "data": [[...], ...] }`. Cells are read
// by column name; numeric cells arrive either as numbers or numeric strings.
//
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::snapshot::StockInfo;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IssTable {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SecuritiesResponse {
    pub securities: IssTable,
    pub marketdata: IssTable,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RatesResponse {
    pub cbrf: IssTable,
}

impl IssTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.data.iter().map(move |cells| Row { table: self, cells })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a IssTable,
    cells: &'a [Value],
}

impl<'a> Row<'a> {
    fn cell(&self, column: &str) -> Option<&'a Value> {
        self.table.column(column).and_then(|i| self.cells.get(i))
    }

    pub fn str(&self, column: &str) -> Option<&'a str> {
        self.cell(column).and_then(Value::as_str)
    }

    pub fn f64(&self, column: &str) -> Option<f64> {
        match self.cell(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// First of `columns` holding a number.
    pub fn first_f64(&self, columns: &[&str]) -> Option<f64> {
        columns.iter().find_map(|c| self.f64(c))
    }
}

/// Current value of an index (`IMOEX`, `RTSI`) from the index market listing.
pub fn index_value(resp: &SecuritiesResponse, secid: &str) -> Option<f64> {
    resp.marketdata
        .rows()
        .find(|row| row.str("SECID") == Some(secid))
        .and_then(|row| row.first_f64(&["CURRENTVALUE", "LASTVALUE", "LAST"]))
}

/// Central bank USD and EUR rates from the first `cbrf` row.
pub fn cbrf_rates(resp: &RatesResponse) -> (Option<f64>, Option<f64>) {
    match resp.cbrf.rows().next() {
        Some(row) => (row.f64("CBRF_USD_LAST"), row.f64("CBRF_EUR_LAST")),
        None => (None, None),
    }
}

/// Main-board (`TQBR`) shares in listing order, deduplicated, at most `limit`.
pub fn top_shares(resp: &SecuritiesResponse, board: &str, limit: usize) -> Vec<StockInfo> {
    let quotes: HashMap<(&str, &str), Row<'_>> = resp
        .marketdata
        .rows()
        .filter_map(|row| Some(((row.str("SECID")?, row.str("BOARDID")?), row)))
        .collect();

    let mut out: Vec<StockInfo> = Vec::new();

    for sec in resp.securities.rows() {
        if out.len() == limit {
            break;
        }

        let (Some(ticker), Some(board_id)) = (sec.str("SECID"), sec.str("BOARDID")) else {
            continue;
        };
        if board_id != board || out.iter().any(|s| s.ticker == ticker) {
            continue;
        }

        let Some(quote) = quotes.get(&(ticker, board_id)) else {
            continue;
        };
        let Some(price) = quote.f64("LAST") else {
            continue;
        };

        out.push(StockInfo {
            ticker: ticker.to_string(),
            name: sec.str("SHORTNAME").unwrap_or(ticker).to_string(),
            price,
            change: quote
                .first_f64(&["LASTTOPREVPRICE", "CHANGE"])
                .unwrap_or_default(),
            currency: "RUB".to_string(),
        });
    }

    out
}
