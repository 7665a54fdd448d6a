//! Canonical topic naming for the live event layer
//!
//! A topic is a named channel scoping which subscribers receive which
//! published events. Two namespaces exist: one topic per auction and one per
//! wallet. Wallet addresses are case-folded so that identical logical
//! entities always map to identical topic strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a topic string
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TopicError {
    #[error("malformed topic name: {0:?} (expected \"auction:<id>\" or \"wallet:<address>\")")]
    Malformed(String),

    #[error("empty {0} identifier in topic name")]
    EmptyIdentifier(&'static str),
}

/// A named channel for event fan-out.
///
/// `Auction` topics render as `auction:<id>`; `Wallet` topics render as
/// `wallet:<address>` with the address stored lowercase. Construct through
/// [`Topic::auction`] / [`Topic::wallet`] so the case-folding invariant holds
/// everywhere a topic is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// One auction's bid-lifecycle feed
    Auction(String),
    /// One wallet's bid-lifecycle feed (address lowercase)
    Wallet(String),
}

impl Topic {
    /// Topic for a single auction's events.
    pub fn auction(id: impl Into<String>) -> Self {
        Self::Auction(id.into())
    }

    /// Topic for a single wallet's events. The address is lowercased here;
    /// publishers and URL builders must go through this constructor.
    pub fn wallet(address: impl AsRef<str>) -> Self {
        Self::Wallet(address.as_ref().to_lowercase())
    }

    /// The identifier part of the topic (auction id or lowercased address).
    pub fn id(&self) -> &str {
        match self {
            Self::Auction(id) => id,
            Self::Wallet(addr) => addr,
        }
    }

    /// Parse a canonical topic string.
    ///
    /// Fails fast on anything that is not `auction:<id>` or
    /// `wallet:<address>` - a malformed topic at a publish call site is a
    /// programming error, not a runtime condition to paper over.
    pub fn parse(s: &str) -> Result<Self, TopicError> {
        let (namespace, id) = s
            .split_once(':')
            .ok_or_else(|| TopicError::Malformed(s.to_string()))?;

        match namespace {
            "auction" => {
                if id.is_empty() {
                    return Err(TopicError::EmptyIdentifier("auction"));
                }
                Ok(Self::auction(id))
            }
            "wallet" => {
                if id.is_empty() {
                    return Err(TopicError::EmptyIdentifier("wallet"));
                }
                Ok(Self::wallet(id))
            }
            _ => Err(TopicError::Malformed(s.to_string())),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auction(id) => write!(f, "auction:{}", id),
            Self::Wallet(addr) => write!(f, "wallet:{}", addr),
        }
    }
}
