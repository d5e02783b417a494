use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use modegen_types::ModeSet;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("no modes found in {}", path.display())]
    NoModes { path: PathBuf },

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders the generated `packml_modes` constants header.
///
/// The artifact is assembled as an ordered list of lines so the template is
/// testable without touching the filesystem; [`HeaderGenerator::write`] adds
/// the validation and I/O around it.
pub struct HeaderGenerator<'a> {
    modes: &'a ModeSet,
    definition: &'a Path,
    output: &'a Path,
}

impl<'a> HeaderGenerator<'a> {
    pub fn new(modes: &'a ModeSet, definition: &'a Path, output: &'a Path) -> Self {
        Self {
            modes,
            definition,
            output,
        }
    }

    fn provenance(&self) -> String {
        format!(
            "// Auto-generated from {} -- do not edit manually",
            base_name(self.definition)
        )
    }

    fn constants(&self) -> impl Iterator<Item = String> + '_ {
        self.modes
            .iter()
            .map(|(name, value)| format!("constexpr packml_sm::ModeType {name} = {value};"))
    }

    /// The complete artifact text.
    pub fn out(&self) -> String {
        let guard = guard_token(self.output);
        let mut lines = vec![
            self.provenance(),
            format!("#ifndef {guard}"),
            format!("#define {guard}"),
            String::new(),
            r#"#include "packml_sm/common.hpp""#.to_owned(),
            String::new(),
            "namespace packml_modes {".to_owned(),
            String::new(),
        ];
        lines.extend(self.constants());
        lines.push(String::new());
        lines.push("}  // namespace packml_modes".to_owned());
        lines.push(String::new());
        lines.push(format!("#endif  // {guard}"));
        lines.join("\n") + "\n"
    }

    /// Validate the mode set and write the artifact, creating missing
    /// output directories. Nothing is written for an empty set.
    pub fn write(&self) -> Result<(), EmitError> {
        if self.modes.is_empty() {
            return Err(EmitError::NoModes {
                path: self.definition.to_owned(),
            });
        }
        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| EmitError::Io {
                path: self.output.to_owned(),
                source,
            })?;
        }
        log::debug!(
            "writing {} ({} modes)",
            self.output.display(),
            self.modes.len()
        );
        fs::write(self.output, self.out()).map_err(|source| EmitError::Io {
            path: self.output.to_owned(),
            source,
        })
    }
}

/// Include-guard token for an output path: the upper-cased base name with
/// `.` and `-` mapped to `_`, plus a trailing underscore.
pub fn guard_token(output: &Path) -> String {
    let mut guard = base_name(output).to_uppercase().replace(['.', '-'], "_");
    guard.push('_');
    guard
}

fn base_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}
