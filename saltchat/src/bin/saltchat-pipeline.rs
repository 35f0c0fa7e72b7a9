//! Walk one message through the cipher pipeline and report the results.
//!
//! ```bash
//! cargo run --bin saltchat-pipeline -- "hola" clave123
//! ```
//!
//! Prints the ciphertext and metadata, decodes with the right secret and
//! with `<secret>_wrong`, and exits non-zero if the message does not come
//! back unchanged or the wrong secret is accepted.

use std::process::ExitCode;

use clap::Parser;
use saltchat::crypto::Secret;
use saltchat::crypto::pipeline;

/// CLI arguments for the pipeline demo.
#[derive(Parser, Debug)]
#[command(version, about = "Encode and decode one message with the SaltChat pipeline")]
struct Args {
    /// Message to encode.
    message: String,
    /// Shared secret.
    secret: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let secret = match Secret::new(args.secret.as_str()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let wrong = match Secret::new(format!("{}_wrong", args.secret)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sealed = match pipeline::encode(&args.message, &secret) {
        Ok(sealed) => sealed,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!("--- encoded ---");
    println!("ciphertext: {}", sealed.ciphertext);
    println!("salt:       {}", sealed.metadata.salt);
    println!("hash:       {}", sealed.metadata.hash);

    let mut ok = true;

    println!("\n--- decode with the right secret ---");
    match pipeline::decode(&sealed.ciphertext, &secret, &sealed.metadata) {
        Ok(plaintext) => {
            println!("plaintext:  {plaintext}");
            if plaintext == args.message {
                println!("round trip: OK");
            } else {
                println!("round trip: MISMATCH");
                ok = false;
            }
        }
        Err(e) => {
            println!("round trip: FAILED ({e})");
            ok = false;
        }
    }

    println!("\n--- decode with a wrong secret ---");
    match pipeline::decode(&sealed.ciphertext, &wrong, &sealed.metadata) {
        Ok(plaintext) => {
            println!("plaintext:  {plaintext}");
            println!("wrong key:  ACCEPTED (this should not happen)");
            ok = false;
        }
        Err(e) => println!("wrong key:  rejected ({e})"),
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
