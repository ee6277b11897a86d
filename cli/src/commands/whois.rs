use std::path::Path;

use colored::*;

use crate::commands::Session;
use crate::terminal::{colors, print};

pub async fn whois(settings_path: &Path, name: &str) -> anyhow::Result<()> {
    let session = Session::start(settings_path)?;
    let result = session.orchestrator.directory_resolver().query(name).await;

    let outcome = match result {
        Ok(answer) => {
            print::header(&format!("whois {name}"));
            for line in answer.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
                if line.starts_with('%') || line.starts_with('#') {
                    print::print(&line.color(colors::SEPARATOR).to_string());
                } else {
                    print::print(line);
                }
            }
            session.orchestrator.autocomplete().record(name);
            session.save()
        }
        Err(e) => Err(e),
    };

    session.finish();
    print::end_of_program();
    outcome
}
