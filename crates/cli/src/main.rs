//! # CLI - interactive tuple shell
//!
//! A REPL that builds one tuple from commands read on stdin and renders it
//! as JSON through a session schema. Works interactively or scripted
//! (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! INSERT col type value   Append an occurrence (arrays: comma-separated items)
//! UPSERT col type value   Replace every occurrence of the field
//! ERASE col type          Remove every occurrence of the field
//! NAME col type name      Name a field in the session schema
//! ENUM col value label    Label an enum value ("-" = empty label, boolean sugar)
//! CLEAR                   Drop all fields
//! JSON                    Print the tuple as JSON
//! SCHEMA                  Print the session schema as JSON
//! CHECK                   Validate the tuple
//! HEX                     Print the raw tuple bytes
//! SAVE path               Write the tuple bytes to a file
//! LOAD path               Replace the tuple with one read from a file
//! STATS                   Field count, bytes used, junk bytes
//! EXIT / QUIT             Leave the shell
//! ```
//!
//! Types are named as in the JSON schema output (`uint16`, `int32[]`,
//! `cstr`, ...) plus `bool`, `enum`, `enum[]` and `str`. Binary values are
//! hex, datetimes are RFC 3339 or `now`.
//!
//! Settings come from the environment, see the `config` crate. Logs go to
//! stderr, filtered by `FPTU_LOG`.
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! fptu shell (max_fields=1024, max_bytes=65536)
//! > NAME 1 cstr greeting
//! OK
//! > INSERT 1 cstr hello
//! OK
//! > JSON
//! {greeting:"hello"}
//! > EXIT
//! bye
//! ```

mod session;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use config::{Config, DEFAULT_LOG_FILTER};
use session::{Outcome, Session};
use tracing_subscriber::EnvFilter;

fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let config = Config::from_env();
    init_logging(&config.log_filter);

    println!(
        "fptu shell (max_fields={}, max_bytes={})",
        config.max_fields, config.max_bytes
    );
    println!("Commands: INSERT | UPSERT | ERASE | NAME | ENUM | CLEAR | JSON | SCHEMA");
    println!("          CHECK | HEX | SAVE | LOAD | STATS | EXIT");

    let mut session = Session::new(config)?;
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        match session.execute(&line) {
            Outcome::Reply(reply) if reply.is_empty() => {}
            Outcome::Reply(reply) => println!("{reply}"),
            Outcome::Exit => {
                println!("bye");
                break;
            }
        }
        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
