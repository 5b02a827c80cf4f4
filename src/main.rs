use dsl_reader::{DslReader, ReaderOptions};
use std::env;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <path-to-dsl-file> [--index <INDEX_FILE>] [--encoding <LABEL>] [word ...]",
            args[0]
        );
        std::process::exit(1);
    }

    let dsl_path = &args[1];
    let mut options = ReaderOptions::default();
    let mut words: Vec<&str> = Vec::new();

    let mut rest = args[2..].iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--index" | "--encoding" => {
                let Some(value) = rest.next() else {
                    eprintln!("ERROR: {} flag requires an argument.", arg);
                    std::process::exit(1);
                };
                if arg == "--index" {
                    options = options.with_index_path(value);
                } else {
                    options = options.with_encoding(value);
                }
            }
            word => words.push(word),
        }
    }

    println!("Reading DSL file: {}", dsl_path);
    println!("{}", "=".repeat(60));

    let reader = match DslReader::open(dsl_path, options) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("\nERROR: Failed to open DSL dictionary");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let props = reader.properties();
    println!("\nDictionary Information:");
    println!("  Name: {}", props.name.as_deref().unwrap_or("(unnamed)"));
    if let Some(lang) = &props.index_language {
        println!("  Index language: {}", lang);
    }
    if let Some(lang) = &props.contents_language {
        println!("  Contents language: {}", lang);
    }
    println!("  Encoding: {}", props.encoding.name());
    println!("  Source size: {} bytes", props.source_size);

    println!("\nStatistics:");
    println!("  Headwords: {}", reader.num_entries());
    println!("  Index keys: {}", reader.num_keys());

    if words.is_empty() {
        println!("\nSample Headwords (first 10):");
        for (i, headword) in reader.index().headwords().iter().take(10).enumerate() {
            println!("  {}. {}", i + 1, headword);
        }
        if reader.num_entries() > 10 {
            println!("  ... and {} more", reader.num_entries() - 10);
        }
        return;
    }

    for word in words {
        println!("\n{}", "=".repeat(60));
        match reader.lookup(word) {
            Ok(results) if results.is_empty() => println!("{}: not found", word),
            Ok(results) => {
                for result in results {
                    println!("{}", result.headword);
                    for line in result.article.plain_text().lines() {
                        println!("  {}", line.trim_end());
                    }
                    for diagnostic in result.article.diagnostics() {
                        println!("  (markup: {})", diagnostic);
                    }
                }
            }
            Err(e) => {
                eprintln!("ERROR: lookup of '{}' failed: {}", word, e);
                std::process::exit(1);
            }
        }
    }
}
