//! Localized texts for notifications.

use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};

pub const REFRESH_NOT_POSSIBLE: &str = "refreshNotPossibleMessage";
pub const REFRESH_SUCCESS: &str = "refreshSuccessMessage";
pub const CHANGES_SENT: &str = "changesSentMessage";
pub const SORT_MESSAGE: &str = "sortMessage";
pub const DELETION_SUCCESS: &str = "deletionSuccessMessage";
pub const DELETION_RESTORED: &str = "deletionRestoredMessage";
pub const SOURCE_RESET_SUCCESS: &str = "sourceResetSuccessMessage";

const DEFAULT_TEXTS: &[(&str, &str)] = &[
    (
        REFRESH_NOT_POSSIBLE,
        "Before refreshing, please save or revert your changes",
    ),
    (REFRESH_SUCCESS, "Data refreshed"),
    (CHANGES_SENT, "Changes sent to the server"),
    (SORT_MESSAGE, "The list is now {0}"),
    ("sortNone", "not sorted"),
    ("sortAscending", "sorted ascending"),
    ("sortDescending", "sorted descending"),
    (DELETION_SUCCESS, "User {0} deleted"),
    (DELETION_RESTORED, "User {0} restored"),
    (
        SOURCE_RESET_SUCCESS,
        "Data source has been reset successfully",
    ),
];

pub trait TextProvider: Send + Sync {
    fn text(&self, id: &str, args: &[&str]) -> String;
}

/// Flat id -> pattern table. Patterns use `{0}`, `{1}`, ... placeholders.
#[derive(Debug, Clone)]
pub struct TextBundle {
    texts: HashMap<String, String>,
}

impl Default for TextBundle {
    fn default() -> Self {
        Self {
            texts: DEFAULT_TEXTS
                .iter()
                .map(|(id, text)| (id.to_string(), text.to_string()))
                .collect(),
        }
    }
}

impl TextBundle {
    /// Built-in texts overlaid with the entries of a toml table.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let overrides: HashMap<String, String> =
            toml::from_str(raw).context("text bundle is not a flat table of strings")?;
        let mut bundle = Self::default();
        bundle.texts.extend(overrides);
        Ok(bundle)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read text bundle '{}'", path.display()))?;
        Self::from_toml_str(&raw)
    }
}

impl TextProvider for TextBundle {
    fn text(&self, id: &str, args: &[&str]) -> String {
        let Some(pattern) = self.texts.get(id) else {
            return id.to_string();
        };
        args.iter()
            .enumerate()
            .fold(pattern.clone(), |text, (index, arg)| {
                text.replace(&format!("{{{index}}}"), arg)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholders_in_order() {
        let bundle = TextBundle::default();
        assert_eq!(bundle.text(DELETION_SUCCESS, &["jdoe"]), "User jdoe deleted");
        assert_eq!(
            bundle.text(SORT_MESSAGE, &[bundle.text("sortAscending", &[]).as_str()]),
            "The list is now sorted ascending"
        );
    }

    #[test]
    fn unknown_ids_render_as_the_id() {
        assert_eq!(TextBundle::default().text("noSuchText", &[]), "noSuchText");
    }

    #[test]
    fn toml_overrides_replace_defaults_only_where_given() {
        let bundle = TextBundle::from_toml_str(r#"refreshSuccessMessage = "Reloaded""#)
            .expect("bundle");
        assert_eq!(bundle.text(REFRESH_SUCCESS, &[]), "Reloaded");
        assert_eq!(bundle.text(CHANGES_SENT, &[]), "Changes sent to the server");
    }

    #[test]
    fn rejects_nested_tables() {
        assert!(TextBundle::from_toml_str("[section]\nkey = \"value\"").is_err());
    }
}
