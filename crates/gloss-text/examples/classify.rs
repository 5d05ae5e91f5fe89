use std::env;

use anyhow::{Result, bail};
use gloss_catalog::Catalog;
use gloss_text::{classify, normalize, tokenize};
use gloss_types::{AnnotateConfig, Decision, DictionaryMode};

const USAGE: &str =
    "usage: cargo run -p gloss-text --example classify -- [--mode=<dictionary>] [--simple] <text>";

fn main() -> Result<()> {
    let mut config = AnnotateConfig::default();
    let mut text = None;
    for arg in env::args().skip(1) {
        if let Some(mode) = arg.strip_prefix("--mode=") {
            let Some(mode) = DictionaryMode::from_name(mode) else {
                bail!("unknown dictionary {mode:?}\n{USAGE}");
            };
            config.dictionary_mode = mode;
        } else if arg == "--simple" {
            config.simple_english = true;
        } else if text.is_none() {
            text = Some(arg);
        } else {
            bail!("too many arguments\n{USAGE}");
        }
    }
    let Some(text) = text else {
        bail!(USAGE);
    };

    let catalog = Catalog::builtin();
    println!("Dictionary: {}", config.dictionary_mode);

    for token in tokenize(&text) {
        if !token.is_word() {
            continue;
        }
        let normalized = normalize(token.text);
        let decision = classify(&token, &normalized, &config, |mode, term| {
            catalog.lookup(mode, term)
        });
        match decision {
            Decision::CatalogTerm { definition, dictionary } => {
                println!("  {:<16} [{}] {}", token.text, dictionary, definition)
            }
            other => println!("  {:<16} [{:?}]", token.text, other),
        }
    }

    Ok(())
}
