//! # Identifier space and HTTP payloads
//!
//! The directory exposes a fixed base range of ids, [`BASE_MIN`]`..=base_max`,
//! plus an overflow set of custom ids added at runtime. Users browse the
//! available ids, add custom ones, and keep an ordered selection.
//!
//! Every type here is the JSON contract between `pickset-server` and
//! `pickset-client`. Field names are the wire names.

use core::fmt;
use serde::{Deserialize, Serialize};

/// Smallest id of the base range.
pub const BASE_MIN: u64 = 1;

/// Largest id of the base range unless configured otherwise.
pub const DEFAULT_BASE_MAX: u64 = 1_000_000;

/// Which list a page is cut from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Base range plus overflow, minus the selection.
    #[default]
    Available,
    /// The ordered selection.
    Selected,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Selected => "selected",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter and window of one page request.
///
/// A missing `limit` means the server's configured page size.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl PageQuery {
    pub fn new(filter: impl Into<String>, offset: usize, limit: Option<usize>) -> Self {
        Self {
            filter: filter.into(),
            offset,
            limit,
        }
    }
}

/// One slice of a filtered list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub items: Vec<u64>,
    /// Number of ids matching the filter, across all pages.
    pub total: usize,
}

/// Body of `POST /api/items`: raw tokens exactly as the user typed them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItems {
    pub ids: Vec<String>,
}

/// Why a candidate id was not added.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum RejectReason {
    /// Not a positive decimal integer.
    #[error("invalid format")]
    #[serde(rename = "invalid format")]
    InvalidFormat,

    /// Falls inside the base range, which is always present.
    #[error("already present in base set")]
    #[serde(rename = "already present in base set")]
    InBaseRange,

    /// Already in the overflow set.
    #[error("already added")]
    #[serde(rename = "already added")]
    AlreadyAdded,
}

/// A refused candidate and the reason it was refused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// The candidate in normalised form (`"007"` is reported as `"7"`).
    pub item: String,
    pub reason: RejectReason,
}

/// Response of `POST /api/items`, covering exactly the ids the caller sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOutcome {
    /// Newly added ids, ascending.
    pub accepted: Vec<u64>,
    pub rejected: Vec<Rejection>,
}

/// Body of `PUT /api/selection`: the full ordered selection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionUpdate {
    pub ids: Vec<u64>,
}

/// The selection as stored after a save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub ids: Vec<u64>,
}

/// JSON body of every error response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
