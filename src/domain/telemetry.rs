// Telemetry data domain models
use chrono::{DateTime, Local};
use std::fmt;

/// A single reading for one channel. Samples carry no timestamp on the wire.
pub type Sample = f64;

/// Format used to stamp displayed points at pop time.
pub const DISPLAY_TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Temperature,
    Ph,
    Orp,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Ph, Channel::Orp];

    /// Key used by the relay for this channel in JSON metrics payloads
    pub fn key(self) -> &'static str {
        match self {
            Channel::Temperature => "temp",
            Channel::Ph => "ph",
            Channel::Orp => "orp",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    pub fn index(self) -> usize {
        match self {
            Channel::Temperature => 0,
            Channel::Ph => 1,
            Channel::Orp => 2,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature",
            Channel::Ph => "pH",
            Channel::Orp => "ORP",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Channel::Temperature => "°C",
            Channel::Ph => "",
            Channel::Orp => "mV",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedPoint {
    pub time: String,
    pub amount: f64,
}

impl DisplayedPoint {
    pub fn new(time: String, amount: f64) -> Self {
        Self { time, amount }
    }

    pub fn stamped_at(at: DateTime<Local>, amount: f64) -> Self {
        Self::new(at.format(DISPLAY_TIME_FORMAT).to_string(), amount)
    }

    pub fn now(amount: f64) -> Self {
        Self::stamped_at(Local::now(), amount)
    }
}

/// One decoded metrics frame: an ordered run of samples per channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsBatch {
    samples: [Vec<Sample>; 3],
}

impl MetricsBatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn with_channel(mut self, channel: Channel, samples: Vec<Sample>) -> Self {
        self.samples[channel.index()] = samples;
        self
    }

    pub fn extend(&mut self, channel: Channel, samples: impl IntoIterator<Item = Sample>) {
        self.samples[channel.index()].extend(samples);
    }

    pub fn samples(&self, channel: Channel) -> &[Sample] {
        &self.samples[channel.index()]
    }

    pub fn first(&self, channel: Channel) -> Option<Sample> {
        self.samples(channel).first().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.iter().all(Vec::is_empty)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &[Sample])> {
        Channel::ALL.into_iter().map(|c| (c, self.samples(c)))
    }
}
