//! Extract command: run the streaming extractor with an ad-hoc element path.

use anyhow::{Context, Result};
use metastore_storage::{DerivedField, ElementPath, RecordExtractor};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn run_extract(path: &str, file: &Path) -> Result<()> {
    let target = ElementPath::parse(path)
        .with_context(|| format!("Invalid element path '{}'", path))?;
    let value = extract_file(&target, file)?;

    match value {
        Some(text) => println!("{}", text),
        None => anyhow::bail!("'{}' does not occur in {}", target, file.display()),
    }
    Ok(())
}

fn extract_file(target: &ElementPath, file: &Path) -> Result<Option<String>> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let extractor = RecordExtractor::new(vec![DerivedField::new("value", target.clone())]);
    let mut fields = extractor
        .extract_from_reader(reader)
        .with_context(|| format!("Failed to parse {}", file.display()))?;
    Ok(fields.remove("value"))
}
