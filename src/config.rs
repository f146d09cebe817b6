use serde::{Deserialize, Serialize};

/// Reserved key carrying a record's type name in projected output.
pub const TYPE_KEY: &str = "__type__";

/// How far `from_dict` checks required-field presence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredCheck {
    /// Every record built during the call, nested ones included.
    #[default]
    Deep,
    /// Only the top-level record.
    Shallow,
}

/// Conversion settings, carried by a `Registry`.
///
/// Schema documents may embed these under `"options"`; the CLI layers its
/// flags on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub required: RequiredCheck,
    /// Emit `__type__` in `to_dict` output.
    pub emit_type_tag: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { required: RequiredCheck::Deep, emit_type_tag: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_options_fill_in_defaults() {
        let o: Options = serde_json::from_value(serde_json::json!({"required": "shallow"})).unwrap();
        assert_eq!(o.required, RequiredCheck::Shallow);
        assert!(o.emit_type_tag);

        let o: Options = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(o, Options::default());

        assert!(serde_json::from_value::<Options>(serde_json::json!({"strict": true})).is_err());
    }
}
