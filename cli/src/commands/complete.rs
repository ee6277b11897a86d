use std::path::Path;

use crate::commands::Session;
use crate::terminal::print;

const SUGGESTION_LIMIT: usize = 10;

pub fn complete(settings_path: &Path, prefix: &str) -> anyhow::Result<()> {
    let session = Session::start(settings_path)?;
    let suggestions = session
        .orchestrator
        .autocomplete()
        .suggest(prefix, SUGGESTION_LIMIT);

    if suggestions.is_empty() {
        print::no_results("suggestions");
    }
    for (idx, entry) in suggestions.iter().enumerate() {
        print::tree_head(idx, entry);
    }

    session.finish();
    Ok(())
}
