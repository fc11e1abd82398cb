//! Compatibility Harness
//!
//! Drives both client roles across a matrix of value shapes:
//!
//! ```text
//!              consumer
//!              Typed     Bytes
//! producer  ┌─────────┬─────────┐
//!   Typed   │  case   │  case   │
//!   Bytes   │  case   │  case   │
//!           └─────────┴─────────┘
//!   (repeated for every scenario, each case on a fresh key)
//! ```
//!
//! Every case writes before it reads, so ordering never depends on the store.

use std::fmt;

use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use serde_json::json;

use crate::client::{ByteClient, TypedClient};
use crate::codec::{Flag, Numeric, Value};
use crate::error::Result;
use crate::store::Store;

/// PNG file signature; binary scenarios start with it
const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Kind of value a scenario exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Object,
    Number,
    Text,
    Binary,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Object => "object",
            Shape::Number => "number",
            Shape::Text => "text",
            Shape::Binary => "binary",
        };
        f.pad(name)
    }
}

/// Which client performs a write or a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Typed,
    Bytes,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Typed, Role::Bytes];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Role::Typed => "typed",
            Role::Bytes => "bytes",
        })
    }
}

/// One value to push through every producer/consumer pair
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub shape: Shape,
    pub value: Value,
}

impl Scenario {
    pub fn new(shape: Shape, value: Value) -> Self {
        Self { shape, value }
    }

    /// The four reference values
    pub fn fixed_matrix() -> Vec<Scenario> {
        let mut binary = PNG_SIGNATURE.to_vec();
        binary.extend(0..=255u8);
        binary.extend_from_slice(&[0x00, 0x00, 0xFF, 0x5C, 0x00]);

        vec![
            Scenario::new(
                Shape::Object,
                Value::Json(json!({"foo": "x1y2", "blah": {"bazz": ["a1", "b2"]}})),
            ),
            Scenario::new(Shape::Number, Value::Numeric(Numeric::from_decimal(425, 1))),
            Scenario::new(Shape::Text, Value::raw("hello world")),
            Scenario::new(Shape::Binary, Value::Binary(Bytes::from(binary))),
        ]
    }

    /// One random value of each shape
    pub fn random_matrix<R: Rng + ?Sized>(rng: &mut R) -> Vec<Scenario> {
        let object = json!({
            "foo": random_string(rng, 10),
            "blah": {
                "bazz": [random_string(rng, 10), random_string(rng, 10)]
            }
        });

        // At most three decimal places keeps the text form short
        let mantissa = rng.gen_range(-1_000_000..1_000_000);
        let number = Numeric::from_decimal(mantissa, rng.gen_range(0..=3));

        let mut binary = PNG_SIGNATURE.to_vec();
        let len = rng.gen_range(64..1024);
        binary.extend((0..len).map(|_| rng.gen::<u8>()));
        binary.extend_from_slice(&[0x00, 0xFF]);

        vec![
            Scenario::new(Shape::Object, Value::Json(object)),
            Scenario::new(Shape::Number, Value::Numeric(number)),
            Scenario::new(Shape::Text, Value::Raw(random_string(rng, 16))),
            Scenario::new(Shape::Binary, Value::Binary(Bytes::from(binary))),
        ]
    }
}

/// Random alphanumeric string of `len` characters
pub fn random_string<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len).map(|_| char::from(rng.sample(Alphanumeric))).collect()
}

/// Fresh key: `prefix` followed by eight random alphanumerics
pub fn random_key<R: Rng + ?Sized>(rng: &mut R, prefix: &str) -> String {
    format!("{}{}", prefix, random_string(rng, 8))
}

/// Result of one write/read case
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub shape: Shape,
    pub producer: Role,
    pub consumer: Role,
    pub key: String,

    /// Flag the value's type maps to
    pub expected_flags: u32,

    /// Flags as the byte client saw them; `None` for the typed consumer,
    /// which never exposes flags
    pub observed_flags: Option<u32>,

    /// Whether the stored bytes equal the consumer codec's own encoding
    /// (byte consumer only)
    pub raw_bytes_match: Option<bool>,

    pub passed: bool,

    /// Why the case failed
    pub detail: Option<String>,
}

impl fmt::Display for CaseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<7} {:>5} -> {:<5} {}",
            self.shape,
            self.producer,
            self.consumer,
            if self.passed { "ok" } else { "FAILED" }
        )?;
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}

/// Outcomes of a harness run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CompatReport {
    pub cases: Vec<CaseOutcome>,
}

impl CompatReport {
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseOutcome> {
        self.cases.iter().filter(|c| !c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Runs scenarios through both client roles
pub struct Harness<'a, A: Store, B: Store> {
    typed: &'a TypedClient<A>,
    bytes: &'a ByteClient<B>,
    key_prefix: String,
}

impl<'a, A: Store, B: Store> Harness<'a, A, B> {
    pub fn new(
        typed: &'a TypedClient<A>,
        bytes: &'a ByteClient<B>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            typed,
            bytes,
            key_prefix: key_prefix.into(),
        }
    }

    /// Run every scenario in all four producer × consumer combinations
    pub fn run(&self, scenarios: &[Scenario]) -> CompatReport {
        let mut rng = rand::thread_rng();
        let mut report = CompatReport::default();

        for scenario in scenarios {
            for producer in Role::ALL {
                for consumer in Role::ALL {
                    let key = random_key(&mut rng, &self.key_prefix);
                    let outcome = self.run_case(scenario, producer, consumer, &key);
                    if outcome.passed {
                        tracing::debug!("{}", outcome);
                    } else {
                        tracing::warn!("{}", outcome);
                    }
                    report.cases.push(outcome);
                }
            }
        }

        tracing::info!(
            "Compatibility run: {}/{} cases passed",
            report.passed_count(),
            report.len()
        );
        report
    }

    /// Write `scenario` via `producer` under `key`, read it back via `consumer`
    pub fn run_case(
        &self,
        scenario: &Scenario,
        producer: Role,
        consumer: Role,
        key: &str,
    ) -> CaseOutcome {
        let mut outcome = CaseOutcome {
            shape: scenario.shape,
            producer,
            consumer,
            key: key.to_string(),
            expected_flags: scenario.value.flag().bits(),
            observed_flags: None,
            raw_bytes_match: None,
            passed: false,
            detail: None,
        };

        if let Err(e) = self.write(producer, key, &scenario.value) {
            outcome.detail = Some(format!("write failed: {}", e));
            return outcome;
        }

        let decoded = match consumer {
            Role::Typed => self.typed.get(key),
            Role::Bytes => self.bytes.get(key).and_then(|item| {
                let expected = self.bytes.codec().encode(&scenario.value);
                outcome.observed_flags = Some(item.flags);
                outcome.raw_bytes_match = Some(item.bytes == expected.bytes);
                Ok(item.decode(self.bytes.codec())?)
            }),
        };

        match decoded {
            Ok(value) if value == scenario.value => outcome.passed = true,
            Ok(value) => {
                outcome.detail = Some(format!(
                    "decoded {} value differs from the written one",
                    value.flag().name()
                ))
            }
            Err(e) => outcome.detail = Some(format!("read failed: {}", e)),
        }

        if let Some(observed) = outcome.observed_flags {
            if observed != outcome.expected_flags && outcome.passed {
                outcome.passed = false;
                outcome.detail = Some(format!(
                    "stored flags {} do not match {}",
                    observed,
                    Flag::from_bits(outcome.expected_flags)
                        .map(|f| f.to_string())
                        .unwrap_or_default()
                ));
            }
        }

        outcome
    }

    fn write(&self, producer: Role, key: &str, value: &Value) -> Result<()> {
        match producer {
            Role::Typed => self.typed.set(key, value),
            Role::Bytes => self.bytes.set_value(key, value),
        }
    }
}
