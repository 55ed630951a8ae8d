//! Info command implementation.

use dialog_core::{DEFAULT_MAX_SPEAKERS, DEFAULT_MAX_TOKENS};
use text_chunker::{CHAR_CAP, ENCODER_MAX_TOKENS, TOKEN_SAFETY};

/// Run the info command.
pub fn run() {
    println!("Dialogue synthesis pipeline");
    println!("===========================");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Limits:");
    println!("  Chunk budget:   {DEFAULT_MAX_TOKENS} tokens (default)");
    println!("  Safety ceiling: {TOKEN_SAFETY} tokens");
    println!("  Encoder limit:  {ENCODER_MAX_TOKENS} tokens");
    println!("  Character cap:  {CHAR_CAP}");
    println!("  Speaker slots:  {DEFAULT_MAX_SPEAKERS} (default)");
    println!();
    println!("Crates:");
    println!("  dialog-core: Core types, errors and configuration");
    println!("  text-normalizer: Text canonicalization");
    println!("  text-tokenizer: Token counting (tokenizer file or heuristic)");
    println!("  text-chunker: Token-budget-aware splitting");
    println!("  script-parser: Dialogue script grammar");
    println!("  audio-sfx: Sound effect processing");
    println!("  runtime: Batch execution, progress, logging and metrics");
    println!("  dialog-cli: This CLI tool");
}
