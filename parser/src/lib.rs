use nom::{
    bytes::complete::take_till1,
    character::complete::{char, i64, space0},
    combinator::{all_consuming, map},
    sequence::{delimited, separated_pair},
    IResult,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use modegen_types::{ModeSet, ModeValue};

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "yaml")]
    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[cfg(feature = "yaml")]
    #[error("'modes' in {} is not a mapping", path.display())]
    NotAMapping { path: PathBuf },

    #[cfg(feature = "yaml")]
    #[error("mode '{name}' in {} does not have an integer value", path.display())]
    BadEntry { path: PathBuf, name: String },
}

/// Load the mode definitions at `path`.
///
/// With the `yaml` feature (the default) the file is parsed as a full YAML
/// document and the top-level `modes` mapping is extracted. Without it,
/// [`parse_flat`] handles the flat subset the project actually uses.
pub fn load(path: &Path) -> Result<ModeSet, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_owned(),
        source,
    })?;

    #[cfg(feature = "yaml")]
    {
        log::debug!("parsing {} as a YAML document", path.display());
        parse_yaml(&text, path)
    }

    #[cfg(not(feature = "yaml"))]
    {
        log::debug!("parsing {} with the flat fallback parser", path.display());
        Ok(parse_flat(&text))
    }
}

#[cfg(feature = "yaml")]
pub fn parse_yaml(input: &str, path: &Path) -> Result<ModeSet, ParseError> {
    let doc: serde_yaml::Value = serde_yaml::from_str(input).map_err(|source| ParseError::Yaml {
        path: path.to_owned(),
        source,
    })?;

    // A document without a `modes` key (or with an empty one, which YAML
    // loads as null) yields an empty set; the emitter's non-empty
    // validation turns that into a failed run.
    let Some(modes) = doc.get("modes") else {
        return Ok(ModeSet::new());
    };
    if modes.is_null() {
        return Ok(ModeSet::new());
    }
    let mapping = modes.as_mapping().ok_or_else(|| ParseError::NotAMapping {
        path: path.to_owned(),
    })?;

    let mut set = ModeSet::new();
    for (key, value) in mapping {
        let name = key.as_str().ok_or_else(|| ParseError::BadEntry {
            path: path.to_owned(),
            name: format!("{key:?}"),
        })?;
        let value = value.as_i64().ok_or_else(|| ParseError::BadEntry {
            path: path.to_owned(),
            name: name.to_owned(),
        })?;
        set.insert(name, value);
    }
    Ok(set)
}

/// Line-oriented parser for the flat subset:
///
/// ```yaml
/// modes:
///   Production: 1
/// ```
///
/// Everything after the `modes:` marker line belongs to the block. Blank
/// lines and `#` comments are skipped; so is any candidate line that does
/// not parse as `name: <base-10 integer>` (logged at warn level).
pub fn parse_flat(input: &str) -> ModeSet {
    let mut modes = ModeSet::new();
    let mut in_modes = false;
    for line in input.lines() {
        let line = line.trim();
        if !in_modes {
            // everything before the marker is ignored
            in_modes = line == "modes:";
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match mode_entry(line) {
            Ok((_, (name, value))) => modes.insert(name, value),
            Err(_) => log::warn!("skipping malformed mode line: {line:?}"),
        }
    }
    modes
}

// `Name: <value>`, split at the first colon
fn mode_entry(input: &str) -> IResult<&str, (String, ModeValue)> {
    all_consuming(separated_pair(
        map(take_till1(|c| c == ':'), |name: &str| {
            name.trim_end().to_owned()
        }),
        char(':'),
        delimited(space0, i64, space0),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "modes:\n  Invalid: 0\n  Production: 1\n  Maintenance: 2\n";

    fn entries(set: &ModeSet) -> Vec<(&str, ModeValue)> {
        set.iter().collect()
    }

    #[test]
    fn flat_parses_fixture_in_order() {
        let set = parse_flat(FIXTURE);
        assert_eq!(
            entries(&set),
            [("Invalid", 0), ("Production", 1), ("Maintenance", 2)]
        );
    }

    #[test]
    fn flat_ignores_everything_before_marker() {
        let set = parse_flat("name: demo\nversion: 3\nmodes:\n  Production: 1\n");
        assert_eq!(entries(&set), [("Production", 1)]);
    }

    #[test]
    fn flat_without_marker_is_empty() {
        assert!(parse_flat("  Production: 1\n").is_empty());
    }

    #[test]
    fn flat_skips_comments_and_blank_lines() {
        let set = parse_flat("modes:\n\n  # idle modes\n  Idle: 0\n   \n  Held: 1\n");
        assert_eq!(entries(&set), [("Idle", 0), ("Held", 1)]);
    }

    #[test]
    fn flat_drops_non_integer_values() {
        let set = parse_flat("modes:\n  Production: 1\n  BadLine: notanumber\n");
        assert_eq!(set.get("BadLine"), None);
        assert_eq!(entries(&set), [("Production", 1)]);
    }

    #[test]
    fn flat_splits_at_first_colon_only() {
        // the value part here is "16:9", which is not an integer
        let set = parse_flat("modes:\n  Ratio: 16:9\n  Manual: 3\n");
        assert_eq!(entries(&set), [("Manual", 3)]);
    }

    #[test]
    fn flat_accepts_negative_values() {
        let set = parse_flat("modes:\n  Undefined: -1\n");
        assert_eq!(set.get("Undefined"), Some(-1));
    }

    #[test]
    fn flat_block_runs_to_end_of_input() {
        // there is no block-end marker; later sections still feed the block
        let set = parse_flat("modes:\n  Production: 1\nstate_masks:\n  Held: 2\n");
        assert_eq!(entries(&set), [("Production", 1), ("Held", 2)]);
    }

    #[test]
    fn flat_duplicate_key_last_one_wins() {
        let set = parse_flat("modes:\n  Production: 1\n  Manual: 3\n  Production: 5\n");
        assert_eq!(entries(&set), [("Production", 5), ("Manual", 3)]);
    }

    #[test]
    fn flat_trims_names_and_values() {
        let set = parse_flat("modes:\n  Dry Run :   4  \n");
        assert_eq!(entries(&set), [("Dry Run", 4)]);
    }

    #[cfg(feature = "yaml")]
    mod yaml {
        use super::*;
        use std::path::Path;

        fn parse(input: &str) -> Result<ModeSet, ParseError> {
            parse_yaml(input, Path::new("modes.yaml"))
        }

        #[test]
        fn parses_fixture_in_order() {
            let set = parse(FIXTURE).unwrap();
            assert_eq!(
                entries(&set),
                [("Invalid", 0), ("Production", 1), ("Maintenance", 2)]
            );
        }

        #[test]
        fn matches_flat_parser_on_supported_subset() {
            assert_eq!(parse(FIXTURE).unwrap(), parse_flat(FIXTURE));
        }

        #[test]
        fn ignores_inline_comments_and_other_sections() {
            let input = "modes:\n  Production: 1  # normal operation\nstate_masks:\n  Held: 2\n";
            let set = parse(input).unwrap();
            assert_eq!(entries(&set), [("Production", 1)]);
        }

        #[test]
        fn missing_modes_key_is_empty() {
            assert!(parse("state_masks:\n  Held: 2\n").unwrap().is_empty());
        }

        #[test]
        fn empty_modes_block_is_empty() {
            assert!(parse("modes:\n").unwrap().is_empty());
        }

        #[test]
        fn rejects_scalar_modes_value() {
            assert!(matches!(
                parse("modes: 3\n"),
                Err(ParseError::NotAMapping { .. })
            ));
        }

        #[test]
        fn rejects_non_integer_mode_value() {
            let err = parse("modes:\n  BadLine: notanumber\n").unwrap_err();
            match err {
                ParseError::BadEntry { name, .. } => assert_eq!(name, "BadLine"),
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn reports_yaml_syntax_errors() {
            assert!(matches!(
                parse("modes: [unclosed\n"),
                Err(ParseError::Yaml { .. })
            ));
        }
    }
}
