//! Normalize command implementation.

use anyhow::Result;
use dialog_core::TextNormalizer;
use text_normalizer::Normalizer;

use super::read_input;

/// Run the normalize command.
pub fn run(input: &str) -> Result<()> {
    let input = read_input(input)?;
    let normalizer = Normalizer::new();
    let result = normalizer.normalize(&input);

    println!("Input:      {input:?}");
    println!("Normalized: {:?}", result.as_str());
    println!("Rules:      {}", normalizer.rule_names().join(", "));

    Ok(())
}
