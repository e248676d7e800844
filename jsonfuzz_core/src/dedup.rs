use serde_json::Value;
use std::collections::HashMap;

/// Insertion-ordered set of payloads keyed by structural equality.
///
/// Two payloads are the same when every object has the same keys with equal
/// values, regardless of member order, and every array has pairwise-equal
/// elements. Payloads are bucketed by an order-insensitive MD5 digest and
/// confirmed with a deep comparison, so a digest collision never drops a
/// distinct payload.
#[derive(Debug, Default)]
pub struct UniquePayloads {
    known_digests: HashMap<[u8; 16], Vec<usize>>,
    payloads: Vec<Value>,
}

impl UniquePayloads {
    pub fn new() -> Self {
        Self {
            known_digests: HashMap::new(),
            payloads: Vec::new(),
        }
    }

    /// Adds `payload` unless a structurally equal one is already present.
    /// Returns whether it was added.
    pub fn insert(&mut self, payload: Value) -> bool {
        let digest = structural_digest(&payload);
        let slots = self.known_digests.entry(digest).or_default();
        if slots.iter().any(|&slot| self.payloads[slot] == payload) {
            return false;
        }
        slots.push(self.payloads.len());
        self.payloads.push(payload);
        true
    }

    /// Inserts every payload in order and returns how many were new.
    pub fn insert_all(&mut self, payloads: impl IntoIterator<Item = Value>) -> usize {
        payloads
            .into_iter()
            .map(|payload| self.insert(payload))
            .filter(|added| *added)
            .count()
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// The retained payloads in first-seen order.
    pub fn into_vec(self) -> Vec<Value> {
        self.payloads
    }
}

/// MD5 digest of `value` that ignores object member order.
///
/// Structurally equal values always share a digest. Numbers are hashed by
/// their textual form, so `1` and `1.0` are distinct, matching `Value`'s own
/// equality.
pub fn structural_digest(value: &Value) -> [u8; 16] {
    let mut context = md5::Context::new();
    consume_value(&mut context, value);
    context.compute().0
}

fn consume_str(context: &mut md5::Context, text: &str) {
    context.consume((text.len() as u64).to_le_bytes());
    context.consume(text.as_bytes());
}

fn consume_value(context: &mut md5::Context, value: &Value) {
    match value {
        Value::Null => context.consume(b"n"),
        Value::Bool(flag) => context.consume(if *flag { b"t" } else { b"f" }),
        Value::Number(number) => {
            context.consume(b"#");
            consume_str(context, &number.to_string());
        }
        Value::String(text) => {
            context.consume(b"s");
            consume_str(context, text);
        }
        Value::Array(items) => {
            context.consume(b"[");
            context.consume((items.len() as u64).to_le_bytes());
            for item in items {
                consume_value(context, item);
            }
        }
        Value::Object(map) => {
            let mut members: Vec<(&String, &Value)> = map.iter().collect();
            members.sort_unstable_by(|left, right| left.0.cmp(right.0));

            context.consume(b"{");
            context.consume((members.len() as u64).to_le_bytes());
            for (key, member) in members {
                consume_str(context, key);
                consume_value(context, member);
            }
        }
    }
}
