//! Structured events handed to an external logging sink.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::Level;

/// A property value: a scalar, or a nested list of named properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Scalar(Value),
    Structure(Vec<EventProperty>),
}

impl PropertyValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        PropertyValue::Scalar(value.into())
    }

    /// Build a structure from string pairs, keeping iteration order.
    pub fn structure<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        PropertyValue::Structure(
            pairs
                .into_iter()
                .map(|(k, v)| EventProperty::new(k.clone(), PropertyValue::scalar(v.clone())))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Scalar(v) => v.clone(),
            PropertyValue::Structure(props) => {
                let mut map = Map::new();
                for p in props {
                    map.insert(p.name.clone(), p.value.to_json());
                }
                Value::Object(map)
            }
        }
    }

    /// Text used when the value fills a template hole.
    pub fn render(&self) -> String {
        match self {
            PropertyValue::Scalar(Value::String(s)) => s.clone(),
            other => other.to_json().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventProperty {
    pub name: String,
    pub value: PropertyValue,
}

impl EventProperty {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Message template with `{Name}` holes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    text: String,
}

impl MessageTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names of the holes, in order of appearance.
    pub fn holes(&self) -> Vec<&str> {
        let mut holes = Vec::new();
        let mut rest = self.text.as_str();
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    holes.push(&after[..close]);
                    rest = &after[close + 1..];
                }
                None => break,
            }
        }
        holes
    }

    /// Substitute property values into the holes. Unknown holes are kept verbatim.
    pub fn render(&self, properties: &[EventProperty]) -> String {
        let mut out = String::with_capacity(self.text.len() + 32);
        let mut rest = self.text.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let name = &after[..close];
            match properties.iter().find(|p| p.name == name) {
                Some(p) => out.push_str(&p.value.render()),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// One event for the external sink: template, severity and ordered properties.
#[derive(Debug, Clone)]
pub struct StructuredEvent {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub template: MessageTemplate,
    pub properties: Vec<EventProperty>,
}

impl StructuredEvent {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn render(&self) -> String {
        self.template.render(&self.properties)
    }

    pub fn properties_json(&self) -> Value {
        PropertyValue::Structure(self.properties.clone()).to_json()
    }
}
