//! Tool equivalence table used when a primary tool is unavailable.
//!
//! Each primary maps to an ordered list of alternates. A pair may carry an
//! argument adapter that rewrites the primary's arguments into the shape
//! the alternate requires; pairs without one pass arguments through.

use crate::config::FallbackRule;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

pub type ArgumentAdapter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone, Default)]
pub struct FallbackTable {
    alternates: HashMap<String, Vec<String>>,
    adapters: HashMap<(String, String), ArgumentAdapter>,
}

impl FallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in desktop pairs that have a dedicated adapter.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.set_alternates("browser", ["shell", "app"]);
        table.set_alternates("type", ["clipboard"]);
        table.add_adapter("browser", "shell", Arc::new(browser_to_shell));
        table.add_adapter("browser", "app", Arc::new(browser_to_app));
        table.add_adapter("type", "clipboard", Arc::new(type_to_clipboard));
        table
    }

    /// Defaults overlaid with configured rules. A configured primary replaces
    /// the built-in alternates for that primary.
    pub fn from_rules(rules: &[FallbackRule]) -> Self {
        let mut table = Self::with_defaults();
        for rule in rules {
            table.set_alternates(&rule.primary, rule.alternates.iter().map(String::as_str));
        }
        table
    }

    pub fn set_alternates<I, S>(&mut self, primary: &str, alternates: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.alternates.insert(
            key(primary),
            alternates.into_iter().map(|a| a.as_ref().to_string()).collect(),
        );
    }

    pub fn add_adapter(&mut self, primary: &str, alternate: &str, adapter: ArgumentAdapter) {
        self.adapters.insert((key(primary), key(alternate)), adapter);
    }

    pub fn alternates(&self, primary: &str) -> &[String] {
        self.alternates
            .get(&key(primary))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First alternate of `primary` not already present in `tried`.
    pub fn next_alternate(&self, primary: &str, tried: &[String]) -> Option<&str> {
        self.alternates(primary)
            .iter()
            .find(|candidate| !tried.iter().any(|t| t.eq_ignore_ascii_case(candidate)))
            .map(String::as_str)
    }

    pub fn adapt(&self, primary: &str, alternate: &str, arguments: &Value) -> Value {
        match self.adapters.get(&(key(primary), key(alternate))) {
            Some(adapter) => adapter(arguments),
            None => arguments.clone(),
        }
    }
}

fn key(tool: &str) -> String {
    tool.to_ascii_lowercase()
}

fn string_field<'a>(arguments: &'a Value, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| arguments.get(*name).and_then(Value::as_str))
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn browser_to_shell(arguments: &Value) -> Value {
    let command = match string_field(arguments, &["url"]) {
        Some(url) => format!("start chrome {url}"),
        None => "start chrome".to_string(),
    };
    json!({ "command": command })
}

fn browser_to_app(_arguments: &Value) -> Value {
    json!({ "action": "launch", "name": "chrome" })
}

fn type_to_clipboard(arguments: &Value) -> Value {
    let content = string_field(arguments, &["text", "content"]).unwrap_or_default();
    json!({ "action": "set", "content": content })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_url_becomes_shell_command() {
        let table = FallbackTable::with_defaults();
        let adapted = table.adapt("browser", "shell", &json!({ "url": "http://x" }));
        assert_eq!(adapted, json!({ "command": "start chrome http://x" }));
    }

    #[test]
    fn adapters_always_supply_their_fields() {
        let table = FallbackTable::with_defaults();
        let inputs = [json!({}), Value::Null, json!("loose"), json!({ "url": 42 }), json!({ "text": "" })];
        for input in &inputs {
            assert!(table.adapt("browser", "shell", input)["command"].is_string());
            let app = table.adapt("browser", "app", input);
            assert!(app["action"].is_string() && app["name"].is_string());
            let clip = table.adapt("type", "clipboard", input);
            assert_eq!(clip["action"], "set");
            assert!(clip["content"].is_string());
        }
    }

    #[test]
    fn alternates_are_tried_in_order_and_case_insensitively() {
        let table = FallbackTable::with_defaults();
        assert_eq!(table.next_alternate("Browser", &["browser".into()]), Some("shell"));
        assert_eq!(
            table.next_alternate("browser", &["browser".into(), "SHELL".into()]),
            Some("app")
        );
        assert_eq!(
            table.next_alternate("browser", &["browser".into(), "shell".into(), "app".into()]),
            None
        );
        assert_eq!(table.next_alternate("scroll", &[]), None);
    }

    #[test]
    fn configured_rules_override_defaults_and_pass_arguments_through() {
        let table = FallbackTable::from_rules(&[
            FallbackRule {
                primary: "browser".into(),
                alternates: vec!["shell".into()],
            },
            FallbackRule {
                primary: "click".into(),
                alternates: vec!["shortcut".into()],
            },
        ]);
        assert_eq!(table.alternates("browser"), &["shell".to_string()]);
        let args = json!({ "loc": [10, 20] });
        assert_eq!(table.adapt("click", "shortcut", &args), args);
    }
}
