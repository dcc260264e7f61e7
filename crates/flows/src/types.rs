//! Flow inputs, execution context, and reports.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use webpilot_core_types::ActionId;

use crate::errors::FlowError;

/// Validated BIP-39-shaped recovery phrase (12 or 24 words).
///
/// Validation here is structural only; whether the words are on the list
/// is the wallet's business, not the driver's.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SeedPhrase(String);

impl SeedPhrase {
    pub fn parse(raw: &str) -> Result<Self, FlowError> {
        let words: Vec<&str> = raw.split_whitespace().collect();
        if words.len() != 12 && words.len() != 24 {
            return Err(FlowError::InvalidSeedPhrase(format!(
                "expected 12 or 24 words, got {}",
                words.len()
            )));
        }
        if let Some(bad) = words
            .iter()
            .find(|w| !w.chars().all(|c| c.is_ascii_lowercase()))
        {
            return Err(FlowError::InvalidSeedPhrase(format!(
                "word '{bad}' is not lowercase ascii"
            )));
        }
        Ok(Self(words.join(" ")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }
}

/// Validated 32-byte hex private key, with or without a `0x` prefix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn parse(raw: &str) -> Result<Self, FlowError> {
        let hex = raw.trim().strip_prefix("0x").unwrap_or(raw.trim());
        if hex.len() != 64 {
            return Err(FlowError::InvalidPrivateKey(format!(
                "expected 64 hex chars, got {}",
                hex.len()
            )));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FlowError::InvalidPrivateKey(
                "non-hex character in key".to_string(),
            ));
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shorten a full address for display comparison: the first six characters
/// (including `0x`) and the last four, joined by an ellipsis.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}

/// Whether `display` looks like a shortened address: `0x`, four leading hex
/// chars, an ellipsis, four trailing hex chars.
pub fn is_shortened_address(display: &str) -> bool {
    let Some(rest) = display.strip_prefix("0x") else {
        return false;
    };
    let Some((lead, tail)) = rest.split_once('…') else {
        return false;
    };
    lead.len() == 4
        && tail.len() == 4
        && lead.chars().all(|c| c.is_ascii_hexdigit())
        && tail.chars().all(|c| c.is_ascii_hexdigit())
}

/// Execution context threaded through a flow run: deadline plus a
/// cancellation token checked at step boundaries.
#[derive(Clone)]
pub struct FlowCtx {
    pub deadline: Instant,
    pub cancel: CancellationToken,
    pub flow_id: ActionId,
}

impl FlowCtx {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel: CancellationToken::new(),
            flow_id: ActionId::new(),
        }
    }

    pub fn with_cancel(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel,
            flow_id: ActionId::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_timeout(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn check(&self, flow: &'static str) -> Result<(), FlowError> {
        if self.is_cancelled() {
            return Err(FlowError::Cancelled { flow });
        }
        if self.is_timeout() {
            return Err(FlowError::DeadlineExceeded { flow });
        }
        Ok(())
    }
}

/// Outcome of one flow step.
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    pub name: &'static str,
    pub ok: bool,
    pub latency_ms: u64,
}

/// Outcome of a whole flow run.
#[derive(Clone, Debug, Serialize)]
pub struct FlowReport {
    pub flow: &'static str,
    pub ok: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub finished_at: DateTime<Utc>,
    pub latency_ms: u64,
    pub steps: Vec<StepReport>,
    pub error: Option<String>,
}

impl FlowReport {
    pub fn begin(flow: &'static str) -> (Self, Instant) {
        let report = Self {
            flow,
            ok: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            latency_ms: 0,
            steps: Vec::new(),
            error: None,
        };
        (report, Instant::now())
    }

    pub fn push_step(&mut self, name: &'static str, ok: bool, latency: Duration) {
        self.steps.push(StepReport {
            name,
            ok,
            latency_ms: latency.as_millis() as u64,
        });
    }

    pub fn finish_ok(mut self, started: Instant) -> Self {
        self.ok = true;
        self.finished_at = Utc::now();
        self.latency_ms = started.elapsed().as_millis() as u64;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHRASE_12: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn seed_phrase_accepts_twelve_words() {
        let phrase = SeedPhrase::parse(PHRASE_12).unwrap();
        assert_eq!(phrase.word_count(), 12);
    }

    #[test]
    fn seed_phrase_normalizes_whitespace() {
        let phrase = SeedPhrase::parse("  a b c d e f g h i j k l  ").unwrap();
        assert_eq!(phrase.as_str(), "a b c d e f g h i j k l");
    }

    #[test]
    fn seed_phrase_rejects_wrong_word_count() {
        assert!(matches!(
            SeedPhrase::parse("one two three"),
            Err(FlowError::InvalidSeedPhrase(_))
        ));
    }

    #[test]
    fn private_key_accepts_prefixed_hex() {
        let key = PrivateKey::parse(&format!("0x{}", "ab".repeat(32))).unwrap();
        assert_eq!(key.as_str().len(), 64);
    }

    #[test]
    fn private_key_rejects_short_input() {
        assert!(matches!(
            PrivateKey::parse("0xdeadbeef"),
            Err(FlowError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn shortened_address_round_trips_the_checker() {
        let full = "0x52908400098527886e0f7030069857d2e4169ee7";
        let display = shorten_address(full);
        assert_eq!(display, "0x5290…9ee7");
        assert!(is_shortened_address(&display));
    }

    #[test]
    fn shortened_checker_rejects_malformed_displays() {
        assert!(!is_shortened_address("0x5290849ee7"));
        assert!(!is_shortened_address("5290…9ee7"));
        assert!(!is_shortened_address("0xzzzz…9ee7"));
        assert!(!is_shortened_address("0x529…9ee7"));
    }

    #[test]
    fn flow_ctx_deadline_trips_check() {
        let fctx = FlowCtx::new(Duration::ZERO);
        assert!(matches!(
            fctx.check("test-flow"),
            Err(FlowError::DeadlineExceeded { .. })
        ));
    }

    #[test]
    fn flow_ctx_cancellation_trips_check() {
        let fctx = FlowCtx::new(Duration::from_secs(60));
        fctx.cancel.cancel();
        assert!(matches!(
            fctx.check("test-flow"),
            Err(FlowError::Cancelled { .. })
        ));
    }
}
