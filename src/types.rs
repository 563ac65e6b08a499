//! Shared types for the TradeNet pipeline.
//!
//! These types form the data model used across all modules: the booster
//! chain, the dispatcher, the persistent stores and the collaborator seams
//! all depend on them without depending on each other.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Upper bound for every confidence score.
pub const MAX_CONFIDENCE: u8 = 100;

/// Reason tag used when a signal carries no rationale at all.
pub const GENERIC_REASON_TAG: &str = "generic";

/// Separator used when flattening reason annotations into one text.
const REASON_SEPARATOR: &str = " | ";

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Trade direction carried by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
    Avoid,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "BUY"),
            Direction::Sell => write!(f, "SELL"),
            Direction::Hold => write!(f, "HOLD"),
            Direction::Avoid => write!(f, "AVOID"),
        }
    }
}

/// Case-insensitive parse of a direction label.
impl std::str::FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            "hold" => Ok(Direction::Hold),
            "avoid" => Ok(Direction::Avoid),
            other => Err(anyhow::anyhow!("Unknown direction: {other}")),
        }
    }
}

/// How dispatch decisions are confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Dispatch everything at or above the threshold.
    #[default]
    Auto,
    /// Dispatch only operator-approved symbols at or above the threshold.
    Manual,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Auto => write!(f, "auto"),
            ExecutionMode::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(ExecutionMode::Auto),
            "manual" => Ok(ExecutionMode::Manual),
            other => Err(anyhow::anyhow!("Unknown execution mode: {other}")),
        }
    }
}

/// Subscription tier gating the execution threshold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanTier {
    Free,
    Lite,
    Pro,
    Enterprise,
    /// Any label outside the known tiers. Resolved through the override.
    Unknown(String),
}

impl PlanTier {
    /// Parse a plan label. Never fails: unrecognised labels become `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "free" => PlanTier::Free,
            "lite" => PlanTier::Lite,
            "pro" => PlanTier::Pro,
            "enterprise" => PlanTier::Enterprise,
            _ => PlanTier::Unknown(label.trim().to_string()),
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanTier::Free => write!(f, "free"),
            PlanTier::Lite => write!(f, "lite"),
            PlanTier::Pro => write!(f, "pro"),
            PlanTier::Enterprise => write!(f, "enterprise"),
            PlanTier::Unknown(label) => write!(f, "unknown({label})"),
        }
    }
}

/// Effective dispatch threshold for a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    /// The tier may not dispatch anything.
    Blocked,
    /// Minimum final confidence required to dispatch.
    Min(u8),
}

impl Threshold {
    /// Whether a signal with this confidence clears the threshold.
    pub fn admits(&self, confidence: u8) -> bool {
        match self {
            Threshold::Blocked => false,
            Threshold::Min(min) => confidence >= *min,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Blocked => write!(f, "blocked"),
            Threshold::Min(min) => write!(f, "{min}%"),
        }
    }
}

/// Settlement state of an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Pending,
    Win,
    Loss,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pending => write!(f, "pending"),
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
        }
    }
}

/// Whether the order-placement collaborator accepted the trade intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Placed,
    Failed,
}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// A scored directional opinion for one symbol in one cycle.
///
/// Booster stages never mutate a signal; `boosted` returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    /// Always within `0..=MAX_CONFIDENCE`.
    pub confidence: u8,
    /// Ordered annotations. The first entry is the producer's rationale.
    pub reason: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Signal {
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        confidence: u8,
        reason: impl Into<String>,
    ) -> Self {
        let reason = reason.into();
        Self {
            symbol: normalise_symbol(&symbol.into()),
            direction,
            confidence: confidence.min(MAX_CONFIDENCE),
            reason: if reason.trim().is_empty() {
                Vec::new()
            } else {
                vec![reason]
            },
            timestamp: Utc::now(),
        }
    }

    /// Accumulated reason text (annotations joined in order).
    pub fn reason_text(&self) -> String {
        reason_text(&self.reason)
    }

    /// First whitespace-delimited token of the reason text, case-folded.
    pub fn reason_tag(&self) -> String {
        reason_tag(&self.reason)
    }

    /// A copy with `bonus` added (clamped to 100) and `annotation` appended.
    pub fn boosted(&self, bonus: u8, annotation: String) -> Self {
        let mut next = self.clone();
        next.confidence = self.confidence.saturating_add(bonus).min(MAX_CONFIDENCE);
        next.reason.push(annotation);
        next
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({}%) | {}",
            self.symbol,
            self.direction,
            self.confidence,
            self.reason_text()
        )
    }
}

/// Symbols are compared upper-case with surrounding whitespace removed.
pub fn normalise_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Flatten reason annotations into one text.
pub fn reason_text(reason: &[String]) -> String {
    reason.join(REASON_SEPARATOR)
}

/// Reason tag of a reason list; `generic` when there is no text.
pub fn reason_tag(reason: &[String]) -> String {
    reason_text(reason)
        .split_whitespace()
        .next()
        .map(|token| token.to_lowercase())
        .unwrap_or_else(|| GENERIC_REASON_TAG.to_string())
}

// ---------------------------------------------------------------------------
// Raw signal (producer shape)
// ---------------------------------------------------------------------------

/// One cycle's producer output: `symbol → raw record`, ordered by symbol.
pub type SignalBatch = BTreeMap<String, RawSignal>;

/// Loosely-typed signal record as produced by the external signal source.
///
/// Every field is optional and may hold the wrong JSON type; `normalise`
/// turns it into a typed [`Signal`], defaulting whatever is malformed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSignal {
    #[serde(default, alias = "signal", skip_serializing_if = "Option::is_none")]
    pub direction: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<serde_json::Value>,
}

impl RawSignal {
    /// Well-formed raw record (what a well-behaved producer emits).
    pub fn new(direction: Direction, confidence: i64, reason: &str) -> Self {
        Self {
            direction: Some(serde_json::Value::String(direction.to_string())),
            confidence: Some(serde_json::Value::from(confidence)),
            reason: Some(serde_json::Value::String(reason.to_string())),
            timestamp: None,
        }
    }

    /// Convert into a typed signal.
    ///
    /// Defaulting rules: confidence → 0 when missing or non-numeric, clamped
    /// into 0..=100 otherwise; direction → HOLD when missing or unknown;
    /// reason → empty when missing or not text. Each defaulted field is
    /// reported as a `PipelineError::Data` so the caller can log it.
    pub fn normalise(&self, symbol: &str) -> (Signal, Vec<PipelineError>) {
        let symbol = normalise_symbol(symbol);
        let mut issues = Vec::new();
        let mut issue = |message: String| {
            issues.push(PipelineError::Data {
                symbol: symbol.clone(),
                message,
            })
        };

        let confidence = match self.confidence.as_ref().map(parse_confidence) {
            Some(Ok(value)) => value,
            Some(Err(message)) => {
                issue(message);
                0
            }
            None => {
                issue("missing confidence".to_string());
                0
            }
        };

        let direction = match self.direction.as_ref() {
            Some(serde_json::Value::String(label)) => match label.parse::<Direction>() {
                Ok(direction) => direction,
                Err(e) => {
                    issue(e.to_string());
                    Direction::Hold
                }
            },
            Some(other) => {
                issue(format!("direction is not text: {other}"));
                Direction::Hold
            }
            None => {
                issue("missing direction".to_string());
                Direction::Hold
            }
        };

        let reason = match self.reason.as_ref() {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::String(text)) if text.trim().is_empty() => Vec::new(),
            Some(serde_json::Value::String(text)) => vec![text.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Some(other) => {
                issue(format!("reason is not text: {other}"));
                Vec::new()
            }
        };

        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let signal = Signal {
            symbol,
            direction,
            confidence,
            reason,
            timestamp,
        };
        (signal, issues)
    }
}

fn parse_confidence(value: &serde_json::Value) -> Result<u8, String> {
    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() && n < 0.0 => Err(format!("negative confidence: {n}")),
        Some(n) if n.is_finite() => Ok(n.round().min(f64::from(MAX_CONFIDENCE)) as u8),
        _ => Err(format!("confidence is not numeric: {value}")),
    }
}

// ---------------------------------------------------------------------------
// Execution records
// ---------------------------------------------------------------------------

/// Persisted log entry for a dispatched trade and its eventual outcome.
///
/// Created with `outcome = pending`; resolved exactly once. Unknown fields
/// in stored records are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub symbol: String,
    #[serde(alias = "signal")]
    pub direction: Direction,
    pub confidence: u8,
    pub reason: Vec<String>,
    pub mode: ExecutionMode,
    pub dispatched_at: DateTime<Utc>,
    #[serde(default)]
    pub outcome: Outcome,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// New pending record for a signal dispatched in `mode`.
    pub fn from_signal(signal: &Signal, mode: ExecutionMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            confidence: signal.confidence,
            reason: signal.reason.clone(),
            mode,
            dispatched_at: Utc::now(),
            outcome: Outcome::Pending,
            order_status: OrderStatus::Placed,
            resolved_at: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.outcome == Outcome::Pending
    }

    /// Pending and the order actually reached the broker, so settlement
    /// can be asked about it.
    pub fn is_awaiting_settlement(&self) -> bool {
        self.is_pending() && self.order_status == OrderStatus::Placed
    }

    pub fn reason_text(&self) -> String {
        reason_text(&self.reason)
    }

    pub fn reason_tag(&self) -> String {
        reason_tag(&self.reason)
    }
}

impl fmt::Display for ExecutionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} ({}%) | mode: {} | outcome: {}",
            self.symbol, self.direction, self.confidence, self.mode, self.outcome
        )
    }
}

/// A signal waiting for operator sign-off (manual mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalQueueEntry {
    pub symbol: String,
    #[serde(alias = "signal")]
    pub direction: Direction,
    pub confidence: u8,
    #[serde(default)]
    pub reason: Vec<String>,
    pub queued_at: DateTime<Utc>,
}

impl ApprovalQueueEntry {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            confidence: signal.confidence,
            reason: signal.reason.clone(),
            queued_at: Utc::now(),
        }
    }
}

/// What the order-placement collaborator receives for one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntent {
    pub symbol: String,
    pub direction: Direction,
    pub confidence: u8,
    pub reason: String,
    pub mode: ExecutionMode,
}

impl TradeIntent {
    pub fn from_signal(signal: &Signal, mode: ExecutionMode) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            confidence: signal.confidence,
            reason: signal.reason_text(),
            mode,
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch events and cycle report
// ---------------------------------------------------------------------------

/// Trace events emitted while gating and dispatching a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEvent {
    Dispatched { symbol: String, confidence: u8 },
    BelowThreshold { symbol: String, confidence: u8, threshold: u8 },
    NotApproved { symbol: String },
    /// Approved symbol with no signal in the current batch.
    StaleApproval { symbol: String },
    TierBlocked { plan: String, signals: usize },
    OrderFailed { symbol: String, error: String },
    NotifyFailed { symbol: String, error: String },
    Cancelled { remaining: usize },
}

/// Summary of one source → boost → gate → dispatch → resolve → learn pass.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mode: ExecutionMode,
    pub plan: PlanTier,
    pub threshold: Threshold,
    pub signals_in: usize,
    pub boosted: Vec<Signal>,
    pub dispatched: Vec<ExecutionRecord>,
    pub events: Vec<DispatchEvent>,
    pub queued_for_approval: usize,
    pub wins: usize,
    pub losses: usize,
    pub patterns_learned: usize,
    pub cancelled: bool,
}

impl CycleReport {
    pub fn resolved(&self) -> usize {
        self.wins + self.losses
    }

    /// Whether any event of the given kind was emitted.
    pub fn has_event(&self, pred: impl Fn(&DispatchEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cycle {}: mode={} plan={} threshold={} signals={} dispatched={} resolved={} (W{}/L{}) learned={}",
            self.cycle_id,
            self.mode,
            self.plan,
            self.threshold,
            self.signals_in,
            self.dispatched.len(),
            self.resolved(),
            self.wins,
            self.losses,
            self.patterns_learned,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("Persistence error ({resource}): {message}")]
    TransientIo { resource: String, message: String },

    #[error("Malformed signal ({symbol}): {message}")]
    Data { symbol: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collaborator error ({collaborator}): {message}")]
    Collaborator { collaborator: String, message: String },

    #[error("Collaborator {collaborator} timed out after {millis}ms")]
    Timeout { collaborator: String, millis: u64 },

    #[error("Execution record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Execution record already resolved: {0}")]
    AlreadyResolved(Uuid),

    #[error("Symbol not in approval queue: {0}")]
    NotQueued(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // -- Direction / mode / plan --

    #[test]
    fn test_direction_display_and_parse() {
        assert_eq!(format!("{}", Direction::Buy), "BUY");
        assert_eq!("sell".parse::<Direction>().unwrap(), Direction::Sell);
        assert_eq!(" Avoid ".parse::<Direction>().unwrap(), Direction::Avoid);
        assert!("moon".parse::<Direction>().is_err());
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::Hold).unwrap(), "\"HOLD\"");
        let d: Direction = serde_json::from_str("\"BUY\"").unwrap();
        assert_eq!(d, Direction::Buy);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("MANUAL".parse::<ExecutionMode>().unwrap(), ExecutionMode::Manual);
        assert!("semi".parse::<ExecutionMode>().is_err());
        assert_eq!(ExecutionMode::default(), ExecutionMode::Auto);
    }

    #[test]
    fn test_plan_parse() {
        assert_eq!(PlanTier::parse("Pro"), PlanTier::Pro);
        assert_eq!(PlanTier::parse("free"), PlanTier::Free);
        assert_eq!(PlanTier::parse("gold"), PlanTier::Unknown("gold".into()));
    }

    #[test]
    fn test_threshold_admits() {
        assert!(Threshold::Min(70).admits(70));
        assert!(!Threshold::Min(70).admits(69));
        assert!(!Threshold::Blocked.admits(100));
    }

    // -- Signal --

    #[test]
    fn test_signal_boosted_clamps_and_annotates() {
        let s = Signal::new("btcusdt", Direction::Buy, 98, "RSI oversold");
        let b = s.boosted(7, "OutcomeBoost 7%".into());
        assert_eq!(b.confidence, 100);
        assert_eq!(b.reason, vec!["RSI oversold", "OutcomeBoost 7%"]);
        // original untouched
        assert_eq!(s.confidence, 98);
        assert_eq!(s.reason.len(), 1);
        assert_eq!(s.symbol, "BTCUSDT");
    }

    #[test]
    fn test_reason_tag() {
        let s = Signal::new("ETHUSDT", Direction::Sell, 50, "MACD bullish crossover");
        assert_eq!(s.reason_tag(), "macd");
        let empty = Signal::new("ETHUSDT", Direction::Sell, 50, "");
        assert_eq!(empty.reason_tag(), GENERIC_REASON_TAG);
        assert_eq!(empty.reason_text(), "");
    }

    // -- RawSignal --

    #[test]
    fn test_normalise_well_formed() {
        let raw = RawSignal::new(Direction::Buy, 65, "RSI oversold");
        let (signal, issues) = raw.normalise("btcusdt");
        assert!(issues.is_empty());
        assert_eq!(signal.symbol, "BTCUSDT");
        assert_eq!(signal.direction, Direction::Buy);
        assert_eq!(signal.confidence, 65);
        assert_eq!(signal.reason, vec!["RSI oversold"]);
    }

    #[test]
    fn test_normalise_defaults_malformed_fields() {
        let raw: RawSignal = serde_json::from_value(json!({
            "signal": 42,
            "confidence": "high",
            "reason": {"nested": true}
        }))
        .unwrap();
        let (signal, issues) = raw.normalise("XRPUSDT");
        assert_eq!(signal.confidence, 0);
        assert_eq!(signal.direction, Direction::Hold);
        assert!(signal.reason.is_empty());
        assert_eq!(issues.len(), 3);
        assert!(matches!(issues[0], PipelineError::Data { .. }));
    }

    #[test]
    fn test_normalise_missing_fields() {
        let (signal, issues) = RawSignal::default().normalise("SOLUSDT");
        assert_eq!(signal.confidence, 0);
        assert_eq!(signal.direction, Direction::Hold);
        assert!(signal.reason.is_empty());
        // confidence + direction reported, missing reason is not an error
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_normalise_confidence_variants() {
        let cases = [
            (json!(72.6), 73),
            (json!("81"), 81),
            (json!("64%"), 64),
            (json!(140), 100),
            (json!(-5), 0),
        ];
        for (value, expected) in cases {
            let raw = RawSignal {
                confidence: Some(value.clone()),
                direction: Some(json!("BUY")),
                ..Default::default()
            };
            let (signal, _) = raw.normalise("X");
            assert_eq!(signal.confidence, expected, "input {value}");
        }
    }

    #[test]
    fn test_normalise_reason_list() {
        let raw: RawSignal = serde_json::from_value(json!({
            "direction": "sell",
            "confidence": 70,
            "reason": ["Volume spike", "", 3, "MACD bullish"]
        }))
        .unwrap();
        let (signal, issues) = raw.normalise("ADAUSDT");
        assert!(issues.is_empty());
        assert_eq!(signal.reason, vec!["Volume spike", "MACD bullish"]);
    }

    // -- ExecutionRecord --

    #[test]
    fn test_record_from_signal_is_pending() {
        let s = Signal::new("BTCUSDT", Direction::Buy, 73, "RSI oversold");
        let r = ExecutionRecord::from_signal(&s, ExecutionMode::Auto);
        assert_eq!(r.outcome, Outcome::Pending);
        assert_eq!(r.order_status, OrderStatus::Placed);
        assert!(r.is_awaiting_settlement());
        assert!(r.resolved_at.is_none());
    }

    #[test]
    fn test_record_tolerates_unknown_fields() {
        let id = Uuid::new_v4();
        let value = json!({
            "id": id,
            "symbol": "BTCUSDT",
            "signal": "BUY",
            "confidence": 73,
            "reason": ["RSI oversold"],
            "mode": "auto",
            "dispatched_at": "2026-01-01T00:00:00Z",
            "outcome": "win",
            "broker_payload": {"fill": 1.0}
        });
        let r: ExecutionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(r.id, id);
        assert_eq!(r.outcome, Outcome::Win);
        assert_eq!(r.order_status, OrderStatus::Placed);
    }

    #[test]
    fn test_error_display() {
        let e = PipelineError::Timeout {
            collaborator: "broker".into(),
            millis: 5000,
        };
        assert_eq!(e.to_string(), "Collaborator broker timed out after 5000ms");
    }
}
