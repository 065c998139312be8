//! Translated strings
//!
//! Packages ship translations as `_locales/<lang>/<name>-strings.json`
//! files listed in their manifest. Both `<id>-jsdoc` and `<id>` files are
//! read, the latter overriding the former.

use indexmap::IndexMap;
use tracing::debug;

use sprig_core::error::SprigError;
use sprig_resolver::Project;

use crate::BuildResult;

/// Key -> translation
pub type Strings = IndexMap<String, String>;

/// Strings of one package for `lang`, falling back to the two-letter
/// language code when no file exists for the full tag
pub async fn package_localization_strings(
    project: &Project,
    id: &str,
    lang: &str,
) -> BuildResult<Strings> {
    let files = &project.config(id)?.files;
    let lang = lang.to_lowercase();
    let mut strings = Strings::new();

    for name in [format!("{}-jsdoc", id), id.to_string()] {
        let mut candidates = vec![locale_file(&lang, &name)];
        if let Some(short) = lang.get(..2).filter(|_| lang.len() > 2) {
            candidates.push(locale_file(short, &name));
        }

        let Some(file) = candidates.into_iter().find(|f| files.contains(f)) else {
            continue;
        };
        let text = project
            .read_file(id, &file)
            .await?
            .ok_or_else(|| SprigError::MissingFile {
                file: format!("{}/{}", id, file),
            })?;
        let parsed: Strings = serde_json::from_str(&text)
            .map_err(|e| SprigError::json(format!("invalid translations in {}", file), e))?;
        debug!("{} strings from {}/{}", parsed.len(), id, file);
        strings.extend(parsed);
    }

    Ok(strings)
}

/// Strings of every package for `lang`. The root is asked first and the
/// first non-empty translation of a key wins.
pub async fn localization_strings(project: &Project, lang: &str) -> BuildResult<Strings> {
    let mut merged = Strings::new();

    for node in project.graph().nodes() {
        if node.config.is_none() {
            continue;
        }
        let strings = package_localization_strings(project, &node.id, lang).await?;
        for (key, value) in strings {
            let entry = merged.entry(key).or_default();
            if entry.is_empty() {
                *entry = value;
            }
        }
    }

    Ok(merged)
}

fn locale_file(lang: &str, name: &str) -> String {
    format!("_locales/{}/{}-strings.json", lang, name)
}
