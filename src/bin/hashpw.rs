use movielog::auth::hash_password;
use std::env;

/// Hash a password for the login gate.
///
/// The server never sees a plaintext password in its configuration; it
/// reads an Argon2 PHC string from `MOVIELOG_PASSWORD_HASH`. This utility
/// produces that string.
fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} <password>", args[0]);
        std::process::exit(1);
    }

    match hash_password(&args[1]) {
        Ok(hash) => {
            println!("{}", hash);
            eprintln!("\nPut this in your environment, e.g.");
            eprintln!("  MOVIELOG_PASSWORD_HASH='{}'", hash);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
