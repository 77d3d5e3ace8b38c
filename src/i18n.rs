//! Localization bundles and key lookup.
//!
//! A bundle is one `<locale>.json` file holding a nested object. Keys are
//! dot-separated paths into it, conventionally namespaced as `columns.*`,
//! `common.*` and `cards.<id>.*`.

use std::path::Path;

use serde_json::Value;

use crate::fs::FileSystem;

/// The translated strings for one locale. Replaced wholesale on locale
/// switch, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizationBundle {
    pub locale: String,
    pub available_locales: Vec<String>,
    messages: Value,
}

impl LocalizationBundle {
    pub fn new(locale: impl Into<String>, available_locales: Vec<String>, messages: Value) -> Self {
        Self {
            locale: locale.into(),
            available_locales,
            messages,
        }
    }

    /// Parse a bundle from JSON text.
    pub fn from_json(
        locale: impl Into<String>,
        available_locales: Vec<String>,
        json: &str,
    ) -> Result<Self, serde_json::Error> {
        let messages = serde_json::from_str(json)?;
        Ok(Self::new(locale, available_locales, messages))
    }

    /// Look up `key` for the card identified by `card_id`.
    ///
    /// `card.<rest>` is shorthand for `cards.<card_id>.<rest>`; without an id
    /// such keys never match. Any missing or non-string segment yields `None`.
    pub fn resolve(&self, key: &str, card_id: Option<&str>) -> Option<&str> {
        let key = key.trim();
        match key.strip_prefix("card.") {
            Some(rest) => {
                let id = card_id?;
                let node = self.messages.get("cards")?.get(id)?;
                lookup(node, rest)
            }
            None => lookup(&self.messages, key),
        }
    }
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a str> {
    if path.is_empty() {
        return None;
    }
    path.split('.')
        .try_fold(root, |node, segment| node.get(segment))?
        .as_str()
}

/// Load the bundle for `locale` from `<dir>/<locale>.json`.
///
/// A missing or malformed bundle falls back to `default_locale`; if that
/// fails too, `None` is returned and templates fall back to raw CSV fields.
pub fn load_bundle(
    fs: &dyn FileSystem,
    dir: &Path,
    locale: &str,
    default_locale: &str,
    available_locales: Vec<String>,
) -> Option<LocalizationBundle> {
    match read_bundle(fs, dir, locale, available_locales.clone()) {
        Ok(bundle) => return Some(bundle),
        Err(e) => log::warn!("Locale '{locale}' unavailable: {e}"),
    }
    if locale == default_locale {
        return None;
    }
    match read_bundle(fs, dir, default_locale, available_locales) {
        Ok(bundle) => {
            log::warn!("Falling back to default locale '{default_locale}'");
            Some(bundle)
        }
        Err(e) => {
            log::warn!("Default locale '{default_locale}' unavailable: {e}");
            None
        }
    }
}

fn read_bundle(
    fs: &dyn FileSystem,
    dir: &Path,
    locale: &str,
    available_locales: Vec<String>,
) -> Result<LocalizationBundle, String> {
    let path = dir.join(format!("{locale}.json"));
    let text = fs.read_text(&path).map_err(|e| e.to_string())?;
    let bundle = LocalizationBundle::from_json(locale, available_locales, &text)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    if !bundle.messages.is_object() {
        return Err(format!("{}: top level must be an object", path.display()));
    }
    log::debug!("Loaded locale '{locale}' from {}", path.display());
    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use serde_json::json;

    fn bundle() -> LocalizationBundle {
        LocalizationBundle::new(
            "de",
            vec!["en".into(), "de".into()],
            json!({
                "columns": { "Cost": "Kosten" },
                "common": { "type": { "spell": "Zauber" }, "count": 3 },
                "cards": { "fire": { "Name": "Feuerball" } }
            }),
        )
    }

    #[test]
    fn resolves_nested_keys() {
        let b = bundle();
        assert_eq!(b.resolve("columns.Cost", None), Some("Kosten"));
        assert_eq!(b.resolve("common.type.spell", None), Some("Zauber"));
    }

    #[test]
    fn card_prefix_uses_card_id() {
        let b = bundle();
        assert_eq!(b.resolve("card.Name", Some("fire")), Some("Feuerball"));
        assert_eq!(b.resolve("card.Name", Some("ice")), None);
        assert_eq!(b.resolve("card.Name", None), None);
        assert_eq!(b.resolve("cards.fire.Name", None), Some("Feuerball"));
    }

    #[test]
    fn non_string_and_missing_segments_miss() {
        let b = bundle();
        assert_eq!(b.resolve("common.count", None), None);
        assert_eq!(b.resolve("common.type", None), None);
        assert_eq!(b.resolve("common.type.spell.extra", None), None);
        assert_eq!(b.resolve("nope", None), None);
        assert_eq!(b.resolve("", None), None);
    }

    #[test]
    fn load_falls_back_to_default_locale() {
        let fs = MemoryFileSystem::new();
        fs.add("/p/i18n/en.json", r#"{"common":{"hello":"Hello"}}"#);
        let b = load_bundle(&fs, Path::new("/p/i18n"), "fr", "en", vec!["en".into()]).unwrap();
        assert_eq!(b.locale, "en");
        assert_eq!(b.resolve("common.hello", None), Some("Hello"));
    }

    #[test]
    fn load_rejects_malformed_bundles() {
        let fs = MemoryFileSystem::new();
        fs.add("/p/i18n/en.json", "[1, 2]");
        assert!(load_bundle(&fs, Path::new("/p/i18n"), "en", "en", vec![]).is_none());
    }
}
