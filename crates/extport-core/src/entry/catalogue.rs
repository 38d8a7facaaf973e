/*!
# Built-in Entries

Entries for the Ext JS class system: loader calls, class config properties
and the MVC application lists.

Only pure loader hints (`Ext.require`, `requires`, `uses`) are cut from the
source. The other properties also mean something to the framework at runtime
(store getters, controller instantiation) so they stay where they are and
only contribute load statements.
*/

use super::patterns::{class_names, CallPattern, ConfigPropertyPattern};
use super::{Action, AnyPattern, Entry, PatternEntry};
use crate::error::{Result, RewriteError};
use crate::syntax::Node;

const DEFINE: CallPattern = CallPattern::member("Ext", "define", 1);
const APPLICATION: CallPattern = CallPattern::member("Ext", "application", 0);

const CLASS_CONFIGS: &[CallPattern] = &[DEFINE, APPLICATION];
const APPLICATION_CONFIG: &[CallPattern] = &[APPLICATION];

/// Names accepted by the `entries` configuration key, in registration order
pub const ENTRY_NAMES: &[&str] = &[
    "require",
    "requires",
    "uses",
    "extend",
    "mixins",
    "model",
    "stores",
    "models",
    "views",
    "controllers",
    "autoCreateViewport",
    "create",
];

/// Every built-in entry, in registration order
pub fn base_entries() -> Vec<Box<dyn Entry>> {
    vec![
        Box::new(PatternEntry::new(
            "require",
            "Ext.require(...) and Ext.syncRequire(...) calls; the statement is removed",
            AnyPattern::new(
                CallPattern::member("Ext", "require", 0),
                CallPattern::member("Ext", "syncRequire", 0),
            ),
            process_require,
        )),
        Box::new(PatternEntry::new(
            "requires",
            "requires: [...] in a class or application config; the property is removed",
            ConfigPropertyPattern::new(&["requires"], CLASS_CONFIGS),
            process_requires,
        )),
        Box::new(PatternEntry::new(
            "uses",
            "uses: [...] in a class config; loaded deferred, the property is removed",
            ConfigPropertyPattern::new(&["uses"], CLASS_CONFIGS),
            process_uses,
        )),
        Box::new(PatternEntry::new(
            "extend",
            "extend: 'X' and override: 'X' in a class config",
            ConfigPropertyPattern::new(&["extend", "override"], &[DEFINE]),
            process_value,
        )),
        Box::new(PatternEntry::new(
            "mixins",
            "mixins: [...] or mixins: { name: 'X' } in a class config",
            ConfigPropertyPattern::new(&["mixins"], &[DEFINE]),
            process_value,
        )),
        Box::new(PatternEntry::new(
            "model",
            "model: 'X' in a store or proxy config",
            ConfigPropertyPattern::new(&["model"], &[DEFINE]),
            process_model,
        )),
        Box::new(PatternEntry::new(
            "stores",
            "stores: [...] in a controller or application config",
            ConfigPropertyPattern::new(&["stores"], CLASS_CONFIGS),
            process_stores,
        )),
        Box::new(PatternEntry::new(
            "models",
            "models: [...] in a controller or application config",
            ConfigPropertyPattern::new(&["models"], CLASS_CONFIGS),
            process_models,
        )),
        Box::new(PatternEntry::new(
            "views",
            "views: [...] in a controller or application config",
            ConfigPropertyPattern::new(&["views"], CLASS_CONFIGS),
            process_views,
        )),
        Box::new(PatternEntry::new(
            "controllers",
            "controllers: [...] in an application config",
            ConfigPropertyPattern::new(&["controllers"], CLASS_CONFIGS),
            process_controllers,
        )),
        Box::new(PatternEntry::new(
            "autoCreateViewport",
            "autoCreateViewport in an application config",
            ConfigPropertyPattern::new(&["autoCreateViewport"], APPLICATION_CONFIG),
            process_viewport,
        )),
        Box::new(PatternEntry::new(
            "create",
            "Ext.create('X', ...) instantiations; loaded deferred",
            CallPattern::member("Ext", "create", 0),
            process_create,
        )),
    ]
}

/// The built-in entries with the given names, in the order given
pub fn entries_by_name<S: AsRef<str>>(names: &[S]) -> Result<Vec<Box<dyn Entry>>> {
    let mut available = base_entries();
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let position = available
            .iter()
            .position(|entry| entry.name() == name)
            .ok_or_else(|| {
                RewriteError::config(format!(
                    "unknown entry '{name}' (available: {})",
                    ENTRY_NAMES.join(", ")
                ))
            })?;
        selected.push(available.remove(position));
    }
    Ok(selected)
}

fn process_require(_node: Node<'_>, root: Node<'_>) -> Option<Action> {
    // argument -> arguments -> call_expression -> expression_statement
    let action = Action::new().requires(class_names(root));
    let is_statement = root
        .ancestor(2)
        .parent()
        .is_some_and(|p| p.is_kind("expression_statement"));
    Some(if is_statement { action.remove(3) } else { action })
}

fn process_requires(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    let value = pair.child_by_field("value")?;
    Some(Action::new().requires(class_names(value)).remove_self())
}

fn process_uses(node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    process_requires(node, pair).map(Action::deferred)
}

fn process_value(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    let value = pair.child_by_field("value")?;
    Some(Action::new().requires(class_names(value)))
}

fn process_model(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    let name = pair.child_by_field("value")?.string_value()?;
    let namespace = app_namespace(pair);
    Some(Action::new().require(qualify(&name, "model", namespace.as_deref())))
}

fn process_list(pair: Node<'_>, kind: &str, weight: i32) -> Option<Action> {
    let value = pair.child_by_field("value")?;
    let namespace = app_namespace(pair);
    let names = class_names(value)
        .into_iter()
        .map(|name| qualify(&name, kind, namespace.as_deref()));
    Some(Action::new().requires(names).with_weight(weight))
}

fn process_stores(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    process_list(pair, "store", 1)
}

fn process_models(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    process_list(pair, "model", 1)
}

fn process_views(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    process_list(pair, "view", 1)
}

fn process_controllers(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    process_list(pair, "controller", 2)
}

fn process_viewport(_node: Node<'_>, pair: Node<'_>) -> Option<Action> {
    let value = pair.child_by_field("value")?;
    let name = match value.kind() {
        "true" => "Viewport".to_string(),
        _ => value.string_value()?,
    };
    let namespace = app_namespace(pair);
    Some(
        Action::new()
            .require(qualify(&name, "view", namespace.as_deref()))
            .with_weight(3),
    )
}

fn process_create(_node: Node<'_>, root: Node<'_>) -> Option<Action> {
    let name = root.string_value()?;
    Some(Action::new().require(name).deferred())
}

/// Application namespace for a config property: the `name` of an
/// `Ext.application` config, or the first segment of an `Ext.define` class
fn app_namespace(pair: Node<'_>) -> Option<String> {
    let object = pair.parent()?;
    let call = object.parent()?.parent()?;

    if APPLICATION.is_callee_of(call) {
        return object
            .significant_children()
            .filter(|member| member.is_kind("pair"))
            .find(|member| {
                member
                    .child_by_field("key")
                    .and_then(|key| key.name_value())
                    .is_some_and(|key| key == "name")
            })?
            .child_by_field("value")?
            .string_value();
    }

    if DEFINE.is_callee_of(call) {
        let class_name = CallPattern::member("Ext", "define", 0)
            .argument_of(call)?
            .string_value()?;
        return class_name.split('.').next().map(str::to_string);
    }

    None
}

/// Expand an MVC short name such as `Users` into `App.store.Users`
fn qualify(name: &str, kind: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(namespace) if !name.contains('.') => format!("{namespace}.{kind}.{name}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{JavaScriptParser, ParseTree, SourceParser, SourceType};

    /// Run every built-in entry over `source`, returning (entry, action) pairs
    fn actions(source: &str) -> Vec<(&'static str, Action)> {
        let syntax = JavaScriptParser::new()
            .unwrap()
            .parse(source, SourceType::Module)
            .unwrap();
        let tree = ParseTree::new(syntax, source);
        let entries = base_entries();
        let mut found = Vec::new();
        for node in tree.walk() {
            for entry in &entries {
                if let Some(root) = entry.test(node) {
                    if let Some(action) = entry.process(node, root) {
                        found.push((entry.name(), action));
                    }
                }
            }
        }
        found
    }

    #[test]
    fn test_entry_names_match_registration() {
        let names: Vec<_> = base_entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, ENTRY_NAMES);
    }

    #[test]
    fn test_entries_by_name() {
        let selected = entries_by_name(&["uses", "require"]).unwrap();
        let names: Vec<_> = selected.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["uses", "require"]);

        let err = entries_by_name(&["nope"]).err().unwrap();
        assert!(err.to_string().contains("unknown entry 'nope'"));
    }

    #[test]
    fn test_require_statement_is_removed() {
        let found = actions("Ext.require(['App.A', 'App.B']);");
        assert_eq!(found.len(), 1);
        let (name, action) = &found[0];
        assert_eq!(*name, "require");
        assert_eq!(action.requires, vec!["App.A", "App.B"]);
        assert_eq!(action.remove, Some(3));
    }

    #[test]
    fn test_sync_require_is_a_require() {
        let found = actions("Ext.syncRequire('App.A');");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "require");
        assert_eq!(found[0].1.remove, Some(3));
    }

    #[test]
    fn test_require_in_expression_is_kept() {
        let found = actions("var loaded = Ext.require('App.A');");
        assert_eq!(found[0].1.remove, None);
        assert_eq!(found[0].1.requires, vec!["App.A"]);
    }

    #[test]
    fn test_define_config_properties() {
        let source = r#"Ext.define('App.view.Main', {
    extend: 'Ext.panel.Panel',
    requires: ['App.view.Header'],
    uses: 'App.view.Footer',
    mixins: { observable: 'Ext.util.Observable' }
});"#;
        let found = actions(source);
        let by_name = |name: &str| {
            found
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, a)| a.clone())
                .unwrap()
        };

        assert_eq!(by_name("extend").requires, vec!["Ext.panel.Panel"]);
        assert_eq!(by_name("extend").remove, None);

        let requires = by_name("requires");
        assert_eq!(requires.requires, vec!["App.view.Header"]);
        assert_eq!(requires.remove, Some(0));

        let uses = by_name("uses");
        assert!(uses.is_async);
        assert_eq!(uses.remove, Some(0));

        assert_eq!(by_name("mixins").requires, vec!["Ext.util.Observable"]);
    }

    #[test]
    fn test_application_lists_are_qualified() {
        let source = r#"Ext.application({
    name: 'Shop',
    models: ['Product'],
    stores: ['Products', 'Other.store.Shared'],
    controllers: ['Cart'],
    autoCreateViewport: true
});"#;
        let found = actions(source);
        let get = |name: &str| found.iter().find(|(n, _)| *n == name).unwrap().1.clone();

        assert_eq!(get("models").requires, vec!["Shop.model.Product"]);
        assert_eq!(get("models").weight, 1);
        assert_eq!(
            get("stores").requires,
            vec!["Shop.store.Products", "Other.store.Shared"]
        );
        assert_eq!(get("controllers").requires, vec!["Shop.controller.Cart"]);
        assert_eq!(get("controllers").weight, 2);
        assert_eq!(get("autoCreateViewport").requires, vec!["Shop.view.Viewport"]);
        assert_eq!(get("autoCreateViewport").weight, 3);
    }

    #[test]
    fn test_store_model_uses_define_namespace() {
        let found = actions("Ext.define('Shop.store.Products', { extend: 'Ext.data.Store', model: 'Product' });");
        let model = found.iter().find(|(n, _)| *n == "model").unwrap();
        assert_eq!(model.1.requires, vec!["Shop.model.Product"]);
    }

    #[test]
    fn test_create_is_deferred() {
        let found = actions("var w = Ext.create('App.view.Window', { title: 'x' });");
        assert_eq!(found.len(), 1);
        assert!(found[0].1.is_async);
        assert_eq!(found[0].1.requires, vec!["App.view.Window"]);
    }
}
