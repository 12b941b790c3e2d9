// Decoder for text frames relayed over the dashboard websocket
use crate::domain::connection::ControlStatus;
use crate::domain::telemetry::{Channel, MetricsBatch, Sample};
use serde_json::{Map, Value};
use thiserror::Error;

const CONTROL_TAG: char = '0';
const TAG_DELIMITER: char = ':';
const SECTION_SEPARATOR: char = ';';
const SAMPLE_SEPARATOR: char = ',';

/// Hub status ordinal for "device attached, not transmitting". The relay otherwise
/// reports `1`, clients connected without a device.
pub const HUB_ACTIVE_STATUS: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Control(ControlStatus),
    Metrics(MetricsBatch),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty frame")]
    Empty,
    #[error("control status {0:?} is not an integer")]
    InvalidControl(String),
    #[error("malformed metrics payload: {0}")]
    MalformedPayload(String),
    #[error("channel {0} does not carry a list of samples")]
    NotAList(Channel),
    #[error("sample {value:?} of channel {channel} is not a number")]
    NotANumber { channel: Channel, value: String },
}

/// Classifies and parses one raw frame.
///
/// The first character is the type tag, optionally followed by `:`. Tag `0` carries a
/// control status; any other tag carries metrics, either as a JSON object keyed by
/// channel or as the micro-controller's raw `temp;ph;orp` buffer of comma lists.
pub fn decode_frame(raw: &str) -> Result<Frame, DecodeError> {
    let mut chars = raw.chars();
    let tag = chars.next().ok_or(DecodeError::Empty)?;
    let rest = chars.as_str();
    let payload = rest.strip_prefix(TAG_DELIMITER).unwrap_or(rest);

    if tag == CONTROL_TAG {
        decode_control(payload).map(Frame::Control)
    } else {
        decode_metrics(payload).map(Frame::Metrics)
    }
}

fn decode_control(payload: &str) -> Result<ControlStatus, DecodeError> {
    let status: i64 = payload
        .trim()
        .parse()
        .map_err(|_| DecodeError::InvalidControl(payload.to_string()))?;

    if status == HUB_ACTIVE_STATUS {
        Ok(ControlStatus::DeviceIdle)
    } else {
        Ok(ControlStatus::DeviceAbsent)
    }
}

fn decode_metrics(payload: &str) -> Result<MetricsBatch, DecodeError> {
    let payload = payload.trim();
    if payload.starts_with('{') {
        decode_json_metrics(payload)
    } else {
        decode_buffer_metrics(payload)
    }
}

fn decode_json_metrics(payload: &str) -> Result<MetricsBatch, DecodeError> {
    let object: Map<String, Value> = serde_json::from_str(payload)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    let mut batch = MetricsBatch::new();
    for (key, value) in object {
        let Some(channel) = Channel::from_key(&key) else {
            tracing::debug!("Ignoring unknown metrics channel {}", key);
            continue;
        };

        let values = value.as_array().ok_or(DecodeError::NotAList(channel))?;
        let samples = values
            .iter()
            .map(|v| coerce_json(channel, v))
            .collect::<Result<Vec<_>, _>>()?;
        batch.extend(channel, samples);
    }

    Ok(batch)
}

fn decode_buffer_metrics(payload: &str) -> Result<MetricsBatch, DecodeError> {
    let sections: Vec<&str> = payload.split(SECTION_SEPARATOR).collect();
    if sections.len() > Channel::ALL.len() {
        return Err(DecodeError::MalformedPayload(format!(
            "expected at most {} sections, found {}",
            Channel::ALL.len(),
            sections.len()
        )));
    }

    let mut batch = MetricsBatch::new();
    for (channel, section) in Channel::ALL.into_iter().zip(sections) {
        if section.trim().is_empty() {
            continue;
        }

        let samples = section
            .split(SAMPLE_SEPARATOR)
            .map(|token| coerce_text(channel, token))
            .collect::<Result<Vec<_>, _>>()?;
        batch.extend(channel, samples);
    }

    Ok(batch)
}

fn coerce_json(channel: Channel, value: &Value) -> Result<Sample, DecodeError> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| not_a_number(channel, &n.to_string())),
        Value::String(s) => coerce_text(channel, s),
        other => Err(not_a_number(channel, &other.to_string())),
    }
}

fn coerce_text(channel: Channel, token: &str) -> Result<Sample, DecodeError> {
    token
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| not_a_number(channel, token))
}

fn not_a_number(channel: Channel, value: &str) -> DecodeError {
    DecodeError::NotANumber {
        channel,
        value: value.to_string(),
    }
}
