use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::workspace_io;

pub fn cmd_init(start: &Path, args: InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Warn about an enclosing workspace; the new one shadows it from here down
    if let Some(parent) = start.parent()
        && let Ok(outer) = workspace_io::discover_workspace(parent)
    {
        eprintln!(
            "Note: enclosing workspace found at {}/",
            outer.join(workspace_io::STORE_DIR).display()
        );
    }

    let store_dir = workspace_io::init_workspace(start, args.force)?;
    println!("Initialized tstack workspace in {}/", store_dir.display());
    Ok(())
}
