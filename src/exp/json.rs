//! Labeled-object and positional-array builders over JSON values.
//!
//! Fields can hold effects of any serializable type, or nested builders, so
//! a whole document can be assembled from independent lookups. Nested
//! builders stay builders until the document is turned into an effect, which
//! lets `debug_each` label every part by its path, such as
//! `ObjExp.address.city` or `ArrExp[2]`.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{collect, reported, Exp, Mode};
use crate::debug::{Debugger, EventBuilder};
use crate::effect::Effect;
use crate::error::Error;

/// Anything that can become part of a JSON document.
pub trait IntoJson {
    /// Convert into a document part.
    fn into_json(self) -> JsonNode;
}

/// One part of a document: a serializable effect or a nested builder.
#[derive(Debug)]
pub struct JsonNode(Node);

#[derive(Debug)]
enum Node {
    Leaf(Effect<Value>),
    Object(ObjExp),
    Array(ArrExp),
}

impl JsonNode {
    /// The effect producing this part's value.
    pub fn into_effect(self) -> Effect<Value> {
        match self.0 {
            Node::Leaf(effect) => effect,
            Node::Object(object) => object.into_effect(),
            Node::Array(array) => array.into_effect(),
        }
    }

    fn debug_at(self, debugger: &Debugger, path: String) -> Self {
        JsonNode(match self.0 {
            Node::Leaf(effect) => Node::Leaf(effect.debug(debugger.expression(path))),
            Node::Object(object) => Node::Object(object.debug_at(debugger, path)),
            Node::Array(array) => Node::Array(array.debug_at(debugger, path)),
        })
    }
}

impl<T> IntoJson for Effect<T>
where
    T: Serialize + Send + 'static,
{
    fn into_json(self) -> JsonNode {
        let value = self.and_then(|value| Effect::from_result(serde_json::to_value(value).map_err(Error::from)));
        JsonNode(Node::Leaf(value))
    }
}

impl IntoJson for ObjExp {
    fn into_json(self) -> JsonNode {
        JsonNode(Node::Object(self))
    }
}

impl IntoJson for ArrExp {
    fn into_json(self) -> JsonNode {
        JsonNode(Node::Array(self))
    }
}

impl IntoJson for JsonNode {
    fn into_json(self) -> JsonNode {
        self
    }
}

/// Builds a JSON object from named effects.
///
/// Keys keep their insertion order.
///
/// ```rust
/// use serde_json::json;
/// use undertow::exp::{ArrExp, Exp, ObjExp};
/// use undertow::Effect;
///
/// let profile = ObjExp::par()
///     .field("name", Effect::succeed("Ada"))
///     .field("age", Effect::succeed(36))
///     .field("tags", ArrExp::seq().item(Effect::succeed("math")).item(Effect::succeed(true)));
///
/// assert_eq!(
///     profile.run_blocking().unwrap(),
///     json!({ "name": "Ada", "age": 36, "tags": ["math", true] })
/// );
/// ```
pub struct ObjExp {
    mode: Mode,
    fields: Vec<(String, JsonNode)>,
    report: Option<EventBuilder<Value>>,
}

impl ObjExp {
    /// Evaluate fields in order.
    pub fn seq() -> Self {
        Self::with_mode(Mode::Sequential)
    }

    /// Evaluate fields concurrently.
    pub fn par() -> Self {
        Self::with_mode(Mode::Parallel)
    }

    /// Empty object with an explicit mode.
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            fields: Vec::new(),
            report: None,
        }
    }

    /// Add a field.
    ///
    /// # Panics
    ///
    /// Panics if `key` was already added.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl IntoJson) -> Self {
        let key = key.into();
        assert!(
            !self.fields.iter().any(|(existing, _)| *existing == key),
            "duplicate field `{key}` in ObjExp"
        );
        self.fields.push((key, value.into_json()));
        self
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    /// Emit a debug event for the object, labelled `ObjExp`, and for every
    /// field, labelled `ObjExp.<key>`. Nested builders are labelled by path.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self {
        self.debug_at(debugger, "ObjExp".to_string())
    }

    fn debug_at(self, debugger: &Debugger, path: String) -> Self {
        let fields = self
            .fields
            .into_iter()
            .map(|(key, node)| {
                let node = node.debug_at(debugger, format!("{path}.{key}"));
                (key, node)
            })
            .collect();
        Self {
            mode: self.mode,
            fields,
            report: Some(debugger.expression(path)),
        }
    }
}

impl Exp for ObjExp {
    type Output = Value;

    fn into_effect(self) -> Effect<Value> {
        let mode = self.mode;
        let (keys, nodes): (Vec<_>, Vec<_>) = self.fields.into_iter().unzip();
        let keys: Arc<[String]> = keys.into();
        let effects: Arc<[Effect<Value>]> = nodes.into_iter().map(JsonNode::into_effect).collect();
        let object = Effect::composed(move || {
            let keys = keys.clone();
            let effects = effects.clone();
            async move {
                let values = collect(&effects, mode).await?;
                let object: Map<String, Value> = keys.iter().cloned().zip(values).collect();
                Ok(Value::Object(object))
            }
        });
        reported(object, self.report)
    }
}

impl fmt::Debug for ObjExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjExp")
            .field("mode", &self.mode)
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builds a JSON array from positional effects of any serializable type.
pub struct ArrExp {
    mode: Mode,
    items: Vec<JsonNode>,
    report: Option<EventBuilder<Value>>,
}

impl ArrExp {
    /// Evaluate items in order.
    pub fn seq() -> Self {
        Self::with_mode(Mode::Sequential)
    }

    /// Evaluate items concurrently.
    pub fn par() -> Self {
        Self::with_mode(Mode::Parallel)
    }

    /// Empty array with an explicit mode.
    pub fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            items: Vec::new(),
            report: None,
        }
    }

    /// Append an item.
    #[must_use]
    pub fn item(mut self, value: impl IntoJson) -> Self {
        self.items.push(value.into_json());
        self
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Emit a debug event for the array, labelled `ArrExp`, and for every
    /// item, labelled `ArrExp[index]`.
    #[must_use]
    pub fn debug_each(self, debugger: &Debugger) -> Self {
        self.debug_at(debugger, "ArrExp".to_string())
    }

    fn debug_at(self, debugger: &Debugger, path: String) -> Self {
        let items = self
            .items
            .into_iter()
            .enumerate()
            .map(|(i, node)| node.debug_at(debugger, format!("{path}[{i}]")))
            .collect();
        Self {
            mode: self.mode,
            items,
            report: Some(debugger.expression(path)),
        }
    }
}

impl Exp for ArrExp {
    type Output = Value;

    fn into_effect(self) -> Effect<Value> {
        let mode = self.mode;
        let items: Arc<[Effect<Value>]> = self.items.into_iter().map(JsonNode::into_effect).collect();
        let array = Effect::composed(move || {
            let items = items.clone();
            async move { Ok(Value::Array(collect(&items, mode).await?)) }
        });
        reported(array, self.report)
    }
}

impl fmt::Debug for ArrExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrExp")
            .field("mode", &self.mode)
            .field("items", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::RecordingSink;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio::time::Instant;

    #[derive(Clone, Serialize)]
    struct Address {
        city: &'static str,
        zip: u32,
    }

    #[test]
    fn test_keys_keep_insertion_order() {
        let obj = ObjExp::seq()
            .field("zeta", Effect::succeed(1))
            .field("alpha", Effect::succeed(2));
        let value = obj.run_blocking().unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_structs_and_maps_serialize() {
        let mut scores = BTreeMap::new();
        scores.insert("math", 90);
        let obj = ObjExp::par()
            .field("address", Effect::succeed(Address { city: "Oslo", zip: 150 }))
            .field("scores", Effect::succeed(scores));

        assert_eq!(
            obj.run_blocking().unwrap(),
            json!({ "address": { "city": "Oslo", "zip": 150 }, "scores": { "math": 90 } })
        );
    }

    #[test]
    #[should_panic(expected = "duplicate field `id` in ObjExp")]
    fn test_duplicate_key_panics_at_construction() {
        let _ = ObjExp::seq()
            .field("id", Effect::succeed(1))
            .field("id", Effect::succeed(2));
    }

    #[test]
    fn test_serialization_failure_is_effect_failure() {
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON keys");
        let error = ArrExp::seq()
            .item(Effect::succeed(bad))
            .run_blocking()
            .unwrap_err();
        assert!(error.downcast_ref::<serde_json::Error>().is_some());
    }

    #[test]
    fn test_nested_arrays_and_objects() {
        let doc = ArrExp::par()
            .item(ObjExp::seq().field("n", Effect::succeed(1)))
            .item(ArrExp::seq().item(Effect::succeed("x")))
            .item(Effect::succeed(Option::<i32>::None));

        assert_eq!(doc.run_blocking().unwrap(), json!([{ "n": 1 }, ["x"], null]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_par_object_fields_overlap() {
        let slow = |v: i32| Effect::sleep(Duration::from_secs(1)).map(move |_| v);
        let obj = ObjExp::par().field("a", slow(1)).field("b", slow(2));

        let start = Instant::now();
        assert_eq!(obj.into_effect().run().await.unwrap(), json!({ "a": 1, "b": 2 }));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_debug_each_labels_fields() {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone());

        ObjExp::seq()
            .field("id", Effect::succeed(7))
            .debug_each(&debugger)
            .run_blocking()
            .unwrap();

        let events = sink.events();
        assert_eq!(events[0].expression, "ObjExp.id");
        assert_eq!(events[0].detail, "Number(7)");
        assert_eq!(events[1].expression, "ObjExp");
        assert!(events[1].is_success());
    }

    #[test]
    fn test_debug_each_reaches_nested_builders() {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone());

        let doc = ObjExp::seq()
            .field("outer", ObjExp::seq().field("inner", Effect::succeed(1)))
            .field("tags", ArrExp::seq().item(Effect::succeed("a")))
            .debug_each(&debugger);

        assert_eq!(
            doc.run_blocking().unwrap(),
            json!({ "outer": { "inner": 1 }, "tags": ["a"] })
        );
        assert_eq!(
            sink.expressions(),
            vec![
                "ObjExp.outer.inner",
                "ObjExp.outer",
                "ObjExp.tags[0]",
                "ObjExp.tags",
                "ObjExp",
            ]
        );
    }

    #[test]
    fn test_array_debug_each_labels_by_position() {
        let sink = RecordingSink::new();
        let debugger = Debugger::new(sink.clone());

        ArrExp::seq()
            .item(ObjExp::seq().field("n", Effect::succeed(1)))
            .item(Effect::succeed(true))
            .debug_each(&debugger)
            .run_blocking()
            .unwrap();

        assert_eq!(
            sink.expressions(),
            vec!["ArrExp[0].n", "ArrExp[0]", "ArrExp[1]", "ArrExp"]
        );
    }

    #[test]
    fn test_empty_builders() {
        assert_eq!(ObjExp::par().run_blocking().unwrap(), json!({}));
        assert!(ArrExp::seq().is_empty());
        assert_eq!(ArrExp::seq().run_blocking().unwrap(), json!([]));
    }
}
