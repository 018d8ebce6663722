//! Append-only transaction records.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockledger_core::{Actor, DomainError, Quantity, RefCode, Sku, TransactionId};

/// Kind of stock movement a record documents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementKind {
    /// Receipt into stock.
    In,
    /// Direct issue of a stocked item.
    Out,
    /// Issue of a component caused by exploding an assembled product.
    OutBom,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::In => "IN",
            MovementKind::Out => "OUT",
            MovementKind::OutBom => "OUT_BOM",
        }
    }

    pub fn is_outgoing(self) -> bool {
        !matches!(self, MovementKind::In)
    }

    /// Signed change for a positive magnitude.
    pub fn signed(self, magnitude: Quantity) -> Quantity {
        if self.is_outgoing() { -magnitude } else { magnitude }
    }

    /// Prefix of reference codes generated for this kind of movement.
    pub fn ref_prefix(self) -> &'static str {
        match self {
            MovementKind::In => "RCV",
            MovementKind::Out => "DO",
            MovementKind::OutBom => "BOM",
        }
    }

    /// Fresh reference code: `{prefix}-{yymmddHHMM}-{suffix}`.
    ///
    /// The suffix comes from the random half of a UUIDv7, so codes stamped within
    /// the same minute stay distinct.
    pub fn new_ref_code(self, at: DateTime<Utc>) -> RefCode {
        let uuid = Uuid::now_v7().simple().to_string();
        let suffix = uuid[uuid.len() - 8..].to_uppercase();
        RefCode::compose(self.ref_prefix(), at.format("%y%m%d%H%M"), suffix)
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(MovementKind::In),
            "OUT" => Ok(MovementKind::Out),
            "OUT_BOM" => Ok(MovementKind::OutBom),
            other => Err(DomainError::validation(format!(
                "unknown movement kind '{other}'"
            ))),
        }
    }
}

/// A record ready to be appended (not yet assigned a sequence number).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: TransactionId,
    pub ref_code: RefCode,
    pub sku: Sku,
    pub kind: MovementKind,
    pub quantity_change: Quantity,
    pub user: Actor,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn into_record(self, sequence: u64) -> TransactionRecord {
        TransactionRecord {
            sequence,
            id: self.id,
            ref_code: self.ref_code,
            sku: self.sku,
            kind: self.kind,
            quantity_change: self.quantity_change,
            user: self.user,
            reason: self.reason,
            occurred_at: self.occurred_at,
        }
    }
}

/// An appended, immutable transaction record.
///
/// `sequence` is assigned by the log on append and increases monotonically across
/// the whole log; it is the ordering key for history queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub sequence: u64,
    pub id: TransactionId,
    pub ref_code: RefCode,
    pub sku: Sku,
    pub kind: MovementKind,
    pub quantity_change: Quantity,
    pub user: Actor,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Filter criteria for history queries. Every field is optional; an empty filter
/// matches the whole log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub sku: Option<Sku>,
    pub ref_code: Option<RefCode>,
    pub kind: Option<MovementKind>,
    /// Inclusive lower bound on `occurred_at`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `occurred_at`.
    pub to: Option<DateTime<Utc>>,
    /// Return at most this many records (newest first).
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn for_sku(sku: Sku) -> Self {
        Self {
            sku: Some(sku),
            ..Self::default()
        }
    }

    pub fn for_ref(ref_code: RefCode) -> Self {
        Self {
            ref_code: Some(ref_code),
            ..Self::default()
        }
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn matches(&self, record: &TransactionRecord) -> bool {
        self.sku.as_ref().is_none_or(|s| *s == record.sku)
            && self.ref_code.as_ref().is_none_or(|r| *r == record.ref_code)
            && self.kind.is_none_or(|k| k == record.kind)
            && self.from.is_none_or(|from| record.occurred_at >= from)
            && self.to.is_none_or(|to| record.occurred_at < to)
    }

    /// Apply the filter to records in append order, returning newest first.
    pub fn select<'a>(
        &self,
        records: impl DoubleEndedIterator<Item = &'a TransactionRecord>,
    ) -> Vec<TransactionRecord> {
        let matching = records.rev().filter(|r| self.matches(r)).cloned();
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}
