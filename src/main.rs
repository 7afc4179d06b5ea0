//! Minimal operator CLI for the authentication boundary. Commands are
//! intentionally small and auditable so operators can see exactly how
//! credentials and order tokens are handled. Key material is read from the
//! environment and never printed.

use std::env;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use storefront_auth::config::load_config;
use storefront_auth::crypto::credentials::{hash_password, verify_password};
use storefront_auth::crypto::order_tokens::{generate_key, OrderTokenCodec};
use storefront_auth::policy::is_valid_password;

fn print_usage() {
    eprintln!("Commands:\n  hash-password <plaintext>\n  verify-password <plaintext> <credential>\n  check-password-policy <plaintext>\n  encode-order <env_var_with_base64_key> <order_id>\n  decode-order <env_var_with_base64_key> <token>\n  generate-key\n  load-config <path>");
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    match args[1].as_str() {
        "hash-password" => {
            if args.len() != 3 {
                return print_usage();
            }
            println!("{}", hash_password(&args[2]).as_str());
        }
        "verify-password" => {
            if args.len() != 4 {
                return print_usage();
            }
            match verify_password(&args[2], args[3].as_bytes()) {
                Ok(true) => println!("match"),
                Ok(false) => println!("no-match"),
                Err(err) => eprintln!("credential unusable: {err}"),
            }
        }
        "check-password-policy" => {
            if args.len() != 3 {
                return print_usage();
            }
            println!(
                "{}",
                if is_valid_password(&args[2]) {
                    "acceptable"
                } else {
                    "too-weak"
                }
            );
        }
        "encode-order" => {
            if args.len() != 4 {
                return print_usage();
            }
            let codec = match OrderTokenCodec::from_env_var(&args[2]) {
                Ok(c) => c,
                Err(e) => return eprintln!("codec setup failed: {e}"),
            };
            let order_id: u64 = match args[3].parse() {
                Ok(id) => id,
                Err(_) => return eprintln!("order id must be a non-negative integer"),
            };
            match codec.encode(order_id) {
                Ok(token) => println!("{token}"),
                Err(err) => eprintln!("encoding failed: {err}"),
            }
        }
        "decode-order" => {
            if args.len() != 4 {
                return print_usage();
            }
            let codec = match OrderTokenCodec::from_env_var(&args[2]) {
                Ok(c) => c,
                Err(e) => return eprintln!("codec setup failed: {e}"),
            };
            match codec.decode(&args[3]) {
                Ok(order_id) => println!("{order_id}"),
                Err(err) => eprintln!("decoding failed: {err}"),
            }
        }
        "generate-key" => {
            println!("{}", STANDARD_NO_PAD.encode(generate_key()));
        }
        "load-config" => {
            if args.len() != 3 {
                return print_usage();
            }
            match load_config(&args[2]) {
                Ok(config) => {
                    // Prove the codec works end to end without echoing key bytes.
                    match config.order_tokens.encode(0) {
                        Ok(_) => println!("config ok; codec ready"),
                        Err(err) => eprintln!("codec unusable: {err}"),
                    }
                }
                Err(err) => eprintln!("config load failed: {err}"),
            }
        }
        _ => print_usage(),
    }
}
