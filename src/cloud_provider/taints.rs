use serde::Deserialize;
use std::fmt;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Deserialize)]
pub enum TaintEffect {
    NoSchedule,
    NoExecute,
    PreferNoSchedule,
}

impl TaintEffect {
    /// Whether the effect keeps intolerant pods off the node, as opposed to a soft preference.
    pub fn is_hard(self) -> bool {
        matches!(self, TaintEffect::NoSchedule | TaintEffect::NoExecute)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taint {
    pub key: String,
    pub value: String,
    pub effect: TaintEffect,
}

impl fmt::Display for Taint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.key, self.value, self.effect)
    }
}

/// Parses kubelet style `key=value:Effect,...` taints. Malformed entries are skipped.
pub fn parse_taints(taints: &str) -> Vec<Taint> {
    taints
        .split(',')
        .filter_map(|entry| {
            let key_value: Vec<&str> = entry.split('=').collect();
            let (key, value) = match key_value.as_slice() {
                [key, value] => (*key, *value),
                _ => return None,
            };

            let mut value_effect = value.splitn(2, ':');
            let value = value_effect.next()?;
            let effect = value_effect.next()?.parse().ok()?;

            Some(Taint {
                key: key.to_owned(),
                value: value.to_owned(),
                effect,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize)]
pub enum TolerationOperator {
    Equal,
    Exists,
}

impl Default for TolerationOperator {
    fn default() -> Self {
        TolerationOperator::Equal
    }
}

/// Pod toleration. An empty key with `Exists` tolerates every taint,
/// a missing effect matches all effects.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Toleration {
    pub key: String,
    pub operator: TolerationOperator,
    pub value: String,
    pub effect: Option<TaintEffect>,
}

impl Toleration {
    pub fn tolerates(&self, taint: &Taint) -> bool {
        if self.effect.map_or(false, |effect| effect != taint.effect) {
            return false;
        }

        if !self.key.is_empty() && self.key != taint.key {
            return false;
        }

        match self.operator {
            TolerationOperator::Exists => true,
            TolerationOperator::Equal => self.value == taint.value,
        }
    }
}
