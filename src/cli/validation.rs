use std::net::SocketAddr;

use crate::cli::args::CliArgs;

pub fn parse_bind(raw: &str) -> Result<SocketAddr, String> {
    raw.trim()
        .parse::<SocketAddr>()
        .map_err(|e| format!("invalid bind address '{raw}': {e}"))
}

pub fn validate_booking_url(raw: &str) -> Result<(), String> {
    let url = reqwest::Url::parse(raw.trim()).map_err(|e| format!("invalid URL '{raw}': {e}"))?;
    match url.scheme() {
        "http" | "https" | "mailto" => Ok(()),
        other => Err(format!("unsupported scheme '{other}' in '{raw}'")),
    }
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.bind.as_deref() {
        parse_bind(raw).map_err(|e| format!("invalid --bind: {e}"))?;
    }
    if args.rows_file.is_some() && args.spreadsheet_id.is_some() {
        return Err("use either --rows-file or --spreadsheet-id, not both".to_string());
    }
    if let Some(id) = args.spreadsheet_id.as_deref() {
        if id.trim().is_empty() {
            return Err("invalid --spreadsheet-id, expected non-empty id".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(rate) = args.refetch_rate {
        if rate == 0 {
            return Err("invalid refetch-rate, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.booking_url.as_deref() {
        validate_booking_url(raw).map_err(|e| format!("invalid --booking-url: {e}"))?;
    }
    if args.export_concurrency == 0 {
        return Err("invalid export-concurrency, expected positive integer".to_string());
    }
    Ok(())
}
