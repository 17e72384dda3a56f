// Copyright (c) The harvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::get_num_cpus;
use crate::errors::CollectThreadsParseError;
use serde::Deserialize;
use std::{cmp::Ordering, fmt, str::FromStr};

/// Type for the `collect.threads` config key: the collector's worker thread count, and the
/// maximum number of artifact reads in flight across all nodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CollectThreads {
    /// Collect with a specified number of threads.
    Count(usize),

    /// Collect with a number of threads equal to the logical CPU count.
    NumCpus,
}

impl CollectThreads {
    /// Gets the actual number of collection threads computed at runtime.
    pub fn compute(self) -> usize {
        match self {
            Self::Count(threads) => threads,
            Self::NumCpus => get_num_cpus(),
        }
    }

    // Negative values are subtracted from the CPU count, with a floor of one thread.
    fn from_signed(n: i64) -> Option<Self> {
        match n.cmp(&0) {
            Ordering::Greater => Some(Self::Count(n as usize)),
            Ordering::Less => Some(Self::Count((get_num_cpus() as i64 + n).max(1) as usize)),
            Ordering::Equal => None,
        }
    }
}

impl FromStr for CollectThreads {
    type Err = CollectThreadsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "num-cpus" {
            return Ok(Self::NumCpus);
        }

        let n = s
            .parse::<i64>()
            .map_err(|e| CollectThreadsParseError::new(format!("{s} ({e})")))?;
        Self::from_signed(n).ok_or_else(|| CollectThreadsParseError::new("0 (may not be 0)"))
    }
}

impl fmt::Display for CollectThreads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(threads) => write!(f, "{threads}"),
            Self::NumCpus => write!(f, "num-cpus"),
        }
    }
}

impl<'de> Deserialize<'de> for CollectThreads {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;

        impl serde::de::Visitor<'_> for V {
            type Value = CollectThreads;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                write!(formatter, "a non-zero integer or the string \"num-cpus\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v == "num-cpus" {
                    Ok(CollectThreads::NumCpus)
                } else {
                    Err(serde::de::Error::invalid_value(
                        serde::de::Unexpected::Str(v),
                        &self,
                    ))
                }
            }

            // TOML integers are i64.
            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                CollectThreads::from_signed(v).ok_or_else(|| {
                    serde::de::Error::invalid_value(serde::de::Unexpected::Signed(v), &self)
                })
            }
        }

        deserializer.deserialize_any(V)
    }
}
