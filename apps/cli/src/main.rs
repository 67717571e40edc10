//! quizcards CLI: quiz bowl flashcards from "You Gotta Know" articles.
//!
//! Pairs each article topic with related past questions, asks a language
//! model for a flashcard table, and writes one CSV per category.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
