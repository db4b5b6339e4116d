use std::collections::BTreeMap;

use crate::errors::ConfigError;

/// Two-letter language code to the concrete locales built for it.
pub type LocaleMapping = BTreeMap<String, Vec<String>>;

pub fn expand(locale: &str, mapping: &LocaleMapping) -> Result<Vec<String>, ConfigError> {
    if locale.chars().count() > 2 {
        return Ok(vec![locale.to_string()]);
    }

    match mapping.get(locale) {
        None => Err(ConfigError::MissingLocaleMapping {
            locale: locale.to_string(),
        }),
        Some(locales) if locales.is_empty() => Err(ConfigError::EmptyLocaleMapping {
            locale: locale.to_string(),
        }),
        Some(locales) => Ok(locales.clone()),
    }
}
