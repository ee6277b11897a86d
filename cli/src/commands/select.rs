use std::path::Path;

use tracing::info;

use vtrace_common::Purpose;

use crate::commands::{SelectPurpose, Session, status};
use crate::terminal::print;

pub fn select(settings_path: &Path, purpose: SelectPurpose, index: usize) -> anyhow::Result<()> {
    let mut session = Session::start(settings_path)?;
    let purpose = Purpose::from(purpose);

    let result = session
        .orchestrator
        .select_device(purpose, index, &mut session.settings);
    if let Err(e) = result {
        session.finish();
        return Err(e.into());
    }
    session.save()?;
    info!(%purpose, index, "selection saved");

    status::print_selection(&session);
    session.finish();
    print::end_of_program();
    Ok(())
}
