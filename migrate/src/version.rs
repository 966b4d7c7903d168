//! Filename-derived migration versions (spec §4.4): the version is the stem
//! of the filename, split at the first of `"__"`, `"_"`, or `"-"` — checked
//! in that order. An empty stem is rejected.

use erm_core::ErmError;

pub fn parse_version(stem: &str) -> Result<String, ErmError> {
    if stem.is_empty() {
        return Err(ErmError::Other("migration filename stem is empty".to_string()));
    }
    for separator in ["__", "_", "-"] {
        if let Some((version, _rest)) = stem.split_once(separator) {
            if !version.is_empty() {
                return Ok(version.to_string());
            }
        }
    }
    Ok(stem.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_at_double_underscore_first() {
        assert_eq!(parse_version("0001__create_users").unwrap(), "0001");
    }

    #[test]
    fn falls_back_to_single_underscore() {
        assert_eq!(parse_version("0001_create_users").unwrap(), "0001");
    }

    #[test]
    fn falls_back_to_hyphen() {
        assert_eq!(parse_version("0001-create-users").unwrap(), "0001");
    }

    #[test]
    fn whole_stem_is_the_version_when_no_separator_present() {
        assert_eq!(parse_version("0001").unwrap(), "0001");
    }

    #[test]
    fn rejects_empty_stem() {
        assert!(parse_version("").is_err());
    }
}
