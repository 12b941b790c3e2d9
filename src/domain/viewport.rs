// Viewport size classes and the chart window they allow
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Breakpoint {
    Small,
    Medium,
    #[default]
    Large,
}

impl FromStr for Breakpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" | "sm" | "xs" => Ok(Breakpoint::Small),
            "medium" | "md" => Ok(Breakpoint::Medium),
            "large" | "lg" | "xl" => Ok(Breakpoint::Large),
            other => Err(format!("unknown viewport size: {}", other)),
        }
    }
}

/// Number of displayed points kept per chart for each breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowCaps {
    #[serde(default = "default_small")]
    pub small: usize,
    #[serde(default = "default_medium")]
    pub medium: usize,
    #[serde(default = "default_large")]
    pub large: usize,
}

fn default_small() -> usize {
    3
}

fn default_medium() -> usize {
    7
}

fn default_large() -> usize {
    11
}

impl Default for WindowCaps {
    fn default() -> Self {
        Self {
            small: default_small(),
            medium: default_medium(),
            large: default_large(),
        }
    }
}

impl WindowCaps {
    pub fn cap_for(&self, breakpoint: Breakpoint) -> usize {
        match breakpoint {
            Breakpoint::Small => self.small,
            Breakpoint::Medium => self.medium,
            Breakpoint::Large => self.large,
        }
    }
}
