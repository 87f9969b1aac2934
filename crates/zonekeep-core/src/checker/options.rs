// ── Checker options: documentation and merging ──
//
// Option layers, lowest precedence first: checker defaults, admin,
// user, domain, service. Context auto-fill (`domain_name`, `subdomain`,
// `service_type`) overrides every stored layer; run-time overrides
// passed with the execution beat everything.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

use crate::model::CheckerOptions;

pub const AUTOFILL_DOMAIN_NAME: &str = "domain_name";
pub const AUTOFILL_SUBDOMAIN: &str = "subdomain";
pub const AUTOFILL_SERVICE_TYPE: &str = "service_type";

// ── Documentation ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OptionKind {
    String,
    Number,
    Bool,
    Choice,
}

/// Description of one option, as shown to users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDoc {
    pub id: String,
    pub label: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Filled from execution context instead of by the user.
    #[serde(default)]
    pub auto_fill: bool,
}

impl OptionDoc {
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
            kind: OptionKind::String,
            required: false,
            default: None,
            choices: Vec::new(),
            description: String::new(),
            auto_fill: false,
        }
    }

    pub fn number(mut self) -> Self {
        self.kind = OptionKind::Number;
        self
    }

    pub fn boolean(mut self) -> Self {
        self.kind = OptionKind::Bool;
        self
    }

    pub fn choices(mut self, choices: &[&str]) -> Self {
        self.kind = OptionKind::Choice;
        self.choices = choices.iter().map(|c| (*c).to_owned()).collect();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    pub fn auto_fill(mut self) -> Self {
        self.auto_fill = true;
        self
    }
}

/// Options a checker understands, grouped by the layer that sets them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsDocumentation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub run_opts: Vec<OptionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_opts: Vec<OptionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_opts: Vec<OptionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_opts: Vec<OptionDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub admin_opts: Vec<OptionDoc>,
}

impl OptionsDocumentation {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn run(mut self, doc: OptionDoc) -> Self {
        self.run_opts.push(doc);
        self
    }

    pub fn service(mut self, doc: OptionDoc) -> Self {
        self.service_opts.push(doc);
        self
    }

    pub fn domain(mut self, doc: OptionDoc) -> Self {
        self.domain_opts.push(doc);
        self
    }

    pub fn user(mut self, doc: OptionDoc) -> Self {
        self.user_opts.push(doc);
        self
    }

    pub fn admin(mut self, doc: OptionDoc) -> Self {
        self.admin_opts.push(doc);
        self
    }

    /// Every documented option with the layer it belongs to.
    pub fn all(&self) -> impl Iterator<Item = (&'static str, &OptionDoc)> {
        self.admin_opts
            .iter()
            .map(|d| ("admin", d))
            .chain(self.user_opts.iter().map(|d| ("user", d)))
            .chain(self.domain_opts.iter().map(|d| ("domain", d)))
            .chain(self.service_opts.iter().map(|d| ("service", d)))
            .chain(self.run_opts.iter().map(|d| ("run", d)))
    }

    /// Built-in default values.
    pub fn defaults(&self) -> CheckerOptions {
        self.all()
            .filter_map(|(_, d)| d.default.clone().map(|v| (d.id.clone(), v)))
            .collect()
    }
}

// ── Merging ─────────────────────────────────────────────────────────

/// Stored option layers for one checker and target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionLayers {
    pub admin: CheckerOptions,
    pub user: CheckerOptions,
    pub domain: CheckerOptions,
    pub service: CheckerOptions,
}

impl OptionLayers {
    fn in_order(&self) -> [&CheckerOptions; 4] {
        [&self.admin, &self.user, &self.domain, &self.service]
    }
}

/// Values taken from the execution context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoFill {
    pub domain_name: Option<String>,
    pub subdomain: Option<String>,
    pub service_type: Option<String>,
}

/// Effective options for one run.
pub fn merge_options(
    defaults: &CheckerOptions,
    layers: &OptionLayers,
    auto_fill: &AutoFill,
    run_opts: &CheckerOptions,
) -> CheckerOptions {
    let mut merged = defaults.clone();
    for layer in layers.in_order() {
        merged.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    for (key, value) in [
        (AUTOFILL_DOMAIN_NAME, &auto_fill.domain_name),
        (AUTOFILL_SUBDOMAIN, &auto_fill.subdomain),
        (AUTOFILL_SERVICE_TYPE, &auto_fill.service_type),
    ] {
        if let Some(value) = value {
            merged.insert(key.to_owned(), serde_json::Value::String(value.clone()));
        }
    }

    merged.extend(run_opts.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Stored values only, each from the last layer that set it.
pub fn stored_options_no_default(layers: &OptionLayers) -> CheckerOptions {
    let mut merged = CheckerOptions::new();
    for layer in layers.in_order() {
        merged.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use pretty_assertions::assert_eq;

    fn opts(value: serde_json::Value) -> CheckerOptions {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn layered_merge_for_a_service_target() {
        let layers = OptionLayers {
            user: opts(json!({ "timeout": 60, "verbose": true })),
            domain: opts(json!({ "timeout": 120 })),
            ..OptionLayers::default()
        };
        let auto_fill = AutoFill {
            domain_name: Some("example.com.".into()),
            subdomain: Some("www".into()),
            service_type: Some("abstract.Server".into()),
        };
        let merged = merge_options(
            &opts(json!({ "timeout": 30 })),
            &layers,
            &auto_fill,
            &opts(json!({ "verbose": false })),
        );
        assert_eq!(
            merged,
            opts(json!({
                "timeout": 120,
                "verbose": false,
                "domain_name": "example.com.",
                "subdomain": "www",
                "service_type": "abstract.Server",
            }))
        );
    }

    #[test]
    fn auto_fill_beats_stored_layers_but_not_run_opts() {
        let layers = OptionLayers {
            service: opts(json!({ "domain_name": "stale.example." })),
            ..OptionLayers::default()
        };
        let auto_fill = AutoFill {
            domain_name: Some("example.com.".into()),
            ..AutoFill::default()
        };
        let merged = merge_options(&CheckerOptions::new(), &layers, &auto_fill, &CheckerOptions::new());
        assert_eq!(merged["domain_name"], "example.com.");

        let run = opts(json!({ "domain_name": "override.example." }));
        let merged = merge_options(&CheckerOptions::new(), &layers, &auto_fill, &run);
        assert_eq!(merged["domain_name"], "override.example.");
    }

    #[test]
    fn highest_layer_wins_for_every_key() {
        let layers = OptionLayers {
            admin: opts(json!({ "a": 1, "b": 1, "c": 1, "d": 1 })),
            user: opts(json!({ "b": 2, "c": 2, "d": 2 })),
            domain: opts(json!({ "c": 3, "d": 3 })),
            service: opts(json!({ "d": 4 })),
        };
        let merged = merge_options(
            &opts(json!({ "z": 0, "a": 0 })),
            &layers,
            &AutoFill::default(),
            &CheckerOptions::new(),
        );
        assert_eq!(merged, opts(json!({ "z": 0, "a": 1, "b": 2, "c": 3, "d": 4 })));
    }

    #[test]
    fn stored_view_ignores_defaults() {
        let layers = OptionLayers {
            user: opts(json!({ "min_ttl": 600 })),
            ..OptionLayers::default()
        };
        assert_eq!(stored_options_no_default(&layers), opts(json!({ "min_ttl": 600 })));
    }

    #[test]
    fn documentation_collects_defaults() {
        let docs = OptionsDocumentation::builder()
            .domain(OptionDoc::new("min_ttl", "Minimum TTL").number().default_value(json!(300)))
            .run(OptionDoc::new("verbose", "Verbose").boolean())
            .admin(OptionDoc::new("mode", "Mode").choices(&["fast", "slow"]).default_value(json!("fast")));
        assert_eq!(docs.defaults(), opts(json!({ "min_ttl": 300, "mode": "fast" })));
        assert_eq!(docs.all().count(), 3);
    }
}
