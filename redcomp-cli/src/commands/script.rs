//! Print the solver script generated for a model

use anyhow::{Context, Result};
use redcomp_core::ComponentModel;
use redcomp_solver::PropertyGroup;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Generate the script for `model` and write it to `output`, or stdout
pub fn script(model: &Path, target: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    let loaded = ComponentModel::from_path(model)
        .with_context(|| format!("Cannot load model {}", model.display()))?;
    let group = PropertyGroup::from_model(&loaded, target)?;
    match output {
        Some(path) => fs::write(&path, &group.script.text)
            .with_context(|| format!("Cannot write script {}", path.display()))?,
        None => io::stdout().write_all(group.script.text.as_bytes())?,
    }
    Ok(())
}
