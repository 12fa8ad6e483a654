use std::collections::HashMap;

use tracing::{debug, warn};

use crate::asset::AssetSource;
use crate::error::AssetError;

pub const FALLBACK_LANG: &str = "en_us";

/// String lookup. An untranslated key comes back unchanged.
pub trait Translate {
    fn translate(&self, key: &str) -> String;
}

/// Flat key → text table loaded from `lang/<code>.json`.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    code: String,
    strings: HashMap<String, String>,
}

impl StringTable {
    pub fn new(code: impl Into<String>, strings: HashMap<String, String>) -> Self {
        Self {
            code: code.into(),
            strings,
        }
    }

    /// Loads the table for `lang` (`"auto"` picks one from the environment).
    /// A missing or unreadable table leaves every key untranslated.
    pub fn load(assets: &dyn AssetSource, lang: &str) -> Self {
        let code = resolve_lang(lang);
        let path = format!("lang/{code}.json");
        let strings = match assets.read(&path) {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, String>>(&bytes) {
                Ok(strings) => strings,
                Err(e) => {
                    warn!(%path, error = %e, "String table is not a flat JSON object");
                    HashMap::new()
                }
            },
            Err(AssetError::NotFound(_)) => {
                warn!(%path, "No string table for language");
                HashMap::new()
            }
            Err(e) => {
                warn!(%path, error = %e, "Failed to read string table");
                HashMap::new()
            }
        };
        debug!(%code, entries = strings.len(), "Loaded string table");
        Self { code, strings }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Translate for StringTable {
    fn translate(&self, key: &str) -> String {
        self.strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_owned())
    }
}

/// Maps a settings value to a table code. `"auto"` reads `LC_ALL`, then
/// `LANG` (`en_US.UTF-8` → `en_us`).
pub fn resolve_lang(lang: &str) -> String {
    if lang != "auto" {
        return lang.to_ascii_lowercase();
    }
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| normalize_locale(&value))
        .unwrap_or_else(|| FALLBACK_LANG.to_owned())
}

fn normalize_locale(value: &str) -> Option<String> {
    let base = value.split(['.', '@']).next()?.trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('-', "_").to_ascii_lowercase())
}

/// Collects `prefix.0`, `prefix.1`, ... until a key has no translation.
pub fn load_lines(translator: &dyn Translate, prefix: &str) -> Vec<String> {
    let mut lines = Vec::new();
    loop {
        let key = format!("{prefix}.{}", lines.len());
        let text = translator.translate(&key);
        if text == key {
            break;
        }
        lines.push(text);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::MemoryAssets;

    fn table(pairs: &[(&str, &str)]) -> StringTable {
        StringTable::new(
            "en_us",
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        )
    }

    #[test]
    fn untranslated_plot_yields_no_lines() {
        let t = table(&[]);
        assert_eq!(t.translate("room.start.plot.0"), "room.start.plot.0");
        assert!(load_lines(&t, "room.start.plot").is_empty());
    }

    #[test]
    fn lines_stop_at_first_gap() {
        let t = table(&[("cup.0", "A cup."), ("cup.1", "Still warm."), ("cup.3", "unreachable")]);
        assert_eq!(load_lines(&t, "cup"), vec!["A cup.", "Still warm."]);
    }

    #[test]
    fn locale_names_normalize() {
        assert_eq!(normalize_locale("en_US.UTF-8").as_deref(), Some("en_us"));
        assert_eq!(normalize_locale("zh-CN").as_deref(), Some("zh_cn"));
        assert_eq!(normalize_locale("C"), None);
        assert_eq!(resolve_lang("ZH_CN"), "zh_cn");
    }

    #[test]
    fn load_reads_table_or_falls_back_to_empty() {
        let assets = MemoryAssets::new().with("lang/en_us.json", br#"{"menu.start": "Start"}"#.to_vec());
        let t = StringTable::load(&assets, "en_us");
        assert_eq!(t.translate("menu.start"), "Start");
        assert_eq!(t.len(), 1);

        let missing = StringTable::load(&assets, "fr_fr");
        assert!(missing.is_empty());
        assert_eq!(missing.code(), "fr_fr");
        assert_eq!(missing.translate("menu.start"), "menu.start");
    }
}
