//! Analytics side-channel for replayed exchanges.
//!
//! When `http_output.analytics` is set, every worker hands the replayed
//! request and its response to a [`ResponseAnalyzer`] after the round trip.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::http::proto;

/// Consumer of completed request/response exchanges.
pub trait ResponseAnalyzer: Send + Sync {
    fn analyze(&self, request: &[u8], response: &[u8], start: DateTime<Utc>, stop: DateTime<Utc>);
}

/// Flattened view of one exchange, in the shape analytics stores index.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExchangeRecord {
    #[serde(rename = "Req_Host")]
    pub req_host: String,
    #[serde(rename = "Req_Method")]
    pub req_method: String,
    #[serde(rename = "Req_URL")]
    pub req_url: String,
    #[serde(rename = "Req_Body")]
    pub req_body: String,
    #[serde(rename = "Req_User-Agent")]
    pub req_user_agent: String,
    #[serde(rename = "Req_X-Real-IP")]
    pub req_x_real_ip: String,
    #[serde(rename = "Req_X-Forwarded-For")]
    pub req_x_forwarded_for: String,
    #[serde(rename = "Req_Connection", skip_serializing_if = "String::is_empty")]
    pub req_connection: String,
    #[serde(rename = "Req_Cookies", skip_serializing_if = "String::is_empty")]
    pub req_cookies: String,
    #[serde(rename = "Resp_Status-Code")]
    pub resp_status_code: String,
    #[serde(rename = "Resp_Body")]
    pub resp_body: String,
    #[serde(rename = "Resp_Proto", skip_serializing_if = "String::is_empty")]
    pub resp_proto: String,
    #[serde(rename = "Resp_Content-Length", skip_serializing_if = "String::is_empty")]
    pub resp_content_length: String,
    #[serde(rename = "Resp_Content-Type", skip_serializing_if = "String::is_empty")]
    pub resp_content_type: String,
    #[serde(rename = "Resp_Set-Cookie", skip_serializing_if = "String::is_empty")]
    pub resp_set_cookie: String,
    #[serde(rename = "Round_Trip_Ms")]
    pub round_trip_ms: i64,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn header_text(data: &[u8], name: &str) -> String {
    proto::header(data, name).map(text).unwrap_or_default()
}

impl ExchangeRecord {
    /// Build a record; `None` for an empty response.
    pub fn new(request: &[u8], response: &[u8], start: DateTime<Utc>, stop: DateTime<Utc>) -> Option<Self> {
        if response.is_empty() {
            return None;
        }

        Some(Self {
            req_host: header_text(request, "Host"),
            req_method: text(proto::method(request)),
            req_url: text(proto::path(request)),
            req_body: text(proto::body(request)),
            req_user_agent: header_text(request, "User-Agent"),
            req_x_real_ip: header_text(request, "X-Real-IP"),
            req_x_forwarded_for: header_text(request, "X-Forwarded-For"),
            req_connection: header_text(request, "Connection"),
            req_cookies: header_text(request, "Cookie"),
            resp_status_code: proto::status(response).map(text).unwrap_or_default(),
            resp_body: text(proto::body(response)),
            resp_proto: text(proto::method(response)),
            resp_content_length: header_text(response, "Content-Length"),
            resp_content_type: header_text(response, "Content-Type"),
            resp_set_cookie: header_text(response, "Set-Cookie"),
            round_trip_ms: (stop - start).num_milliseconds(),
            timestamp: stop.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

/// Emits each exchange as a JSON document on the `traffic_replay::analytics` log target.
#[derive(Debug, Default)]
pub struct LogAnalyzer;

impl ResponseAnalyzer for LogAnalyzer {
    fn analyze(&self, request: &[u8], response: &[u8], start: DateTime<Utc>, stop: DateTime<Utc>) {
        let Some(record) = ExchangeRecord::new(request, response, start, stop) else {
            tracing::debug!("Empty response, skipping analytics export");
            return;
        };

        match serde_json::to_string(&record) {
            Ok(json) => tracing::info!(
                target: "traffic_replay::analytics",
                status = %record.resp_status_code,
                exchange = %json,
                "Replayed exchange"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize exchange record"),
        }
    }
}
