use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::models::Observation;

/// Paging header that precedes every World Bank v2 response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub total: u32,
}

fn as_u32(value: &Value) -> u32 {
    // The API sends some of these as strings ("per_page": "50")
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// Reads the `[metadata, [records...]]` header element.
pub fn parse_page_info(json: &Value) -> Result<PageInfo> {
    let meta = json
        .as_array()
        .and_then(|arr| arr.first())
        .filter(|m| m.is_object())
        .ok_or_else(|| EngineError::Payload("missing paging header".to_string()))?;

    if let Some(message) = meta.get("message") {
        // Error payloads look like [{"message": [{"id": "120", "value": "..."}]}]
        return Err(EngineError::Payload(format!("API returned an error: {}", message)));
    }

    Ok(PageInfo {
        page: as_u32(&meta["page"]),
        pages: as_u32(&meta["pages"]),
        per_page: as_u32(&meta["per_page"]),
        total: as_u32(&meta["total"]),
    })
}

fn parse_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        // Sometimes value is a string "123.45"
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Converts a World Bank indicator response into flat observations.
///
/// Null values are kept as `None`. Records without a country or a date are
/// skipped. Input order is preserved (the API returns newest first).
pub fn parse_observations(json: &Value) -> Result<Vec<Observation>> {
    // World Bank API returns an array: [Metadata, [Data...]]
    let data_array = match json.as_array().and_then(|arr| arr.get(1)) {
        Some(Value::Array(records)) => records,
        // "total": 0 responses carry null instead of an empty list
        Some(Value::Null) => return Ok(Vec::new()),
        _ => {
            parse_page_info(json)?;
            return Err(EngineError::Payload(
                "Invalid World Bank API response format".to_string(),
            ));
        }
    };

    let mut observations = Vec::with_capacity(data_array.len());
    for record in data_array {
        let entity = record["countryiso3code"]
            .as_str()
            .filter(|s| !s.is_empty())
            .or_else(|| record["country"]["id"].as_str());
        let date = record["date"].as_str();

        let (Some(entity), Some(date)) = (entity, date) else {
            debug!("Skipping World Bank record without country or date: {}", record);
            continue;
        };

        observations.push(Observation {
            entity: entity.to_string(),
            indicator: record["indicator"]["id"].as_str().unwrap_or_default().to_string(),
            period: date.to_string(),
            value: parse_value(&record["value"]),
        });
    }

    Ok(observations)
}

/// Parses a raw response body.
pub fn parse_payload(body: &str) -> Result<Vec<Observation>> {
    let json: Value = serde_json::from_str(body)?;
    parse_observations(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wb_response() {
        let json_data = json!([
            { "page": 1, "pages": 1, "per_page": 50, "total": 3 },
            [
                { "indicator": { "id": "NY.GDP.MKTP.KD", "value": "GDP" }, "country": { "id": "FI", "value": "Finland" }, "countryiso3code": "FIN", "date": "2023", "value": 3.0, "unit": "", "obs_status": "", "decimal": 1 },
                { "indicator": { "id": "NY.GDP.MKTP.KD", "value": "GDP" }, "country": { "id": "FI", "value": "Finland" }, "countryiso3code": "FIN", "date": "2022", "value": "2.5", "unit": "", "obs_status": "", "decimal": 1 },
                { "indicator": { "id": "NY.GDP.MKTP.KD", "value": "GDP" }, "country": { "id": "FI", "value": "Finland" }, "countryiso3code": "FIN", "date": "2021", "value": null, "unit": "", "obs_status": "", "decimal": 1 }
            ]
        ]);

        let points = parse_observations(&json_data).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].entity, "FIN");
        assert_eq!(points[0].indicator, "NY.GDP.MKTP.KD");
        assert_eq!(points[0].value, Some(3.0));
        assert_eq!(points[1].value, Some(2.5));
        assert_eq!(points[2].period, "2021");
        assert_eq!(points[2].value, None);
    }

    #[test]
    fn test_falls_back_to_country_id() {
        let json_data = json!([
            { "page": 1, "pages": 1, "per_page": 50, "total": 1 },
            [
                { "indicator": { "id": "SP.POP.TOTL" }, "country": { "id": "1A", "value": "Arab World" }, "countryiso3code": "", "date": "2020", "value": 1.0 }
            ]
        ]);
        let points = parse_observations(&json_data).unwrap();
        assert_eq!(points[0].entity, "1A");
    }

    #[test]
    fn test_empty_result_set() {
        let json_data = json!([{ "page": 0, "pages": 0, "per_page": 50, "total": 0 }, null]);
        assert!(parse_observations(&json_data).unwrap().is_empty());
    }

    #[test]
    fn test_error_payload() {
        let json_data = json!([{ "message": [{ "id": "120", "key": "Invalid value", "value": "The provided parameter value is not valid" }] }]);
        assert!(matches!(parse_observations(&json_data), Err(EngineError::Payload(_))));
        assert!(parse_payload("not json").is_err());
    }

    #[test]
    fn test_page_info_accepts_string_numbers() {
        let json_data = json!([{ "page": 1, "pages": 3, "per_page": "50", "total": 120 }, []]);
        let info = parse_page_info(&json_data).unwrap();
        assert_eq!(info.pages, 3);
        assert_eq!(info.per_page, 50);
    }
}
