//! Chunk command implementation.

use std::path::Path;

use anyhow::Result;
use text_chunker::{CHAR_CAP, Chunker};

use super::read_input;

/// Run the chunk command.
pub fn run(input: &str, max_tokens: usize, tokenizer: Option<&Path>) -> Result<()> {
    let input = read_input(input)?;
    let chunker = Chunker::new(text_tokenizer::counter_from_path(tokenizer));
    let chunks = chunker.split_str(&input, max_tokens);

    println!(
        "{} chunk(s), budget {} tokens / {CHAR_CAP} chars, counter: {}",
        chunks.len(),
        chunker.effective_budget(max_tokens),
        chunker.counter_name()
    );
    for (i, chunk) in chunks.iter().enumerate() {
        println!(
            "[{:03}] {} tokens, {} chars: {}",
            i + 1,
            chunker.count_tokens(chunk.as_str()),
            chunk.char_len(),
            chunk
        );
    }

    Ok(())
}
