mod init;
pub use init::cmd_init;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::kv::FileKv;
use crate::io::lock::FileLock;
use crate::io::recovery;
use crate::io::watcher::{StoreEvent, StoreWatcher};
use crate::io::workspace_io;
use crate::model::item::{Item, ItemDraft, ItemPatch, normalize_links};
use crate::model::settings::{Settings, SettingsPatch};
use crate::model::workspace::Workspace;
use crate::ops::stack_ops::LookupError;
use crate::store::StackStore;

type CmdResult = Result<(), Box<dyn Error>>;

/// How long `watch` blocks per loop iteration before checking for edits.
const WATCH_POLL: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let start = start_dir(cli.dir.as_deref())?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::Init(args) => cmd_init(&start, args),

        // Read commands
        Commands::List => cmd_list(&start, json),
        Commands::Show(args) => cmd_show(&start, args, json),
        Commands::Recovery => cmd_recovery(&start),

        // Write commands
        Commands::Push(args) => cmd_push(&start, args),
        Commands::Pop => cmd_pop(&start),
        Commands::Up(args) => cmd_move(&start, args, Direction::Up),
        Commands::Down(args) => cmd_move(&start, args, Direction::Down),
        Commands::Delete(args) => cmd_delete(&start, args),
        Commands::Edit(args) => cmd_edit(&start, args),
        Commands::Select(args) => cmd_select(&start, args),
        Commands::Settings(args) => cmd_settings(&start, args, json),
        Commands::Sweep => cmd_sweep(&start, json),
        Commands::Watch(args) => cmd_watch(&start, args),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start_dir(dir: Option<&str>) -> Result<PathBuf, Box<dyn Error>> {
    match dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

fn load_workspace(start: &Path) -> Result<Workspace, Box<dyn Error>> {
    let root = workspace_io::discover_workspace(start)?;
    Ok(workspace_io::load_workspace(&root)?)
}

/// An open store plus the lock guarding it. Opening sweeps and may write,
/// so even read commands hold the lock.
struct Session {
    ws: Workspace,
    // dropped before the lock
    store: StackStore<FileKv>,
    _lock: FileLock,
}

fn open_session(start: &Path) -> Result<Session, Box<dyn Error>> {
    let ws = load_workspace(start)?;
    let lock = FileLock::acquire_default(&ws.store_dir)?;
    let store = ws.open_store()?;
    Ok(Session {
        ws,
        store,
        _lock: lock,
    })
}

/// The id named on the command line, or the selected item's id.
fn target_id(store: &StackStore<FileKv>, id: Option<&str>) -> Result<String, LookupError> {
    match id {
        Some(prefix) => store.resolve(prefix),
        None => store
            .selected_item()
            .map(|item| item.id.clone())
            .ok_or(LookupError::NoSelection),
    }
}

/// 1-based position from the bottom.
fn position_of(items: &[Item], id: &str) -> usize {
    items.iter().position(|i| i.id == id).map_or(0, |p| p + 1)
}

fn print_stack(ws: &Workspace, store: &StackStore<FileKv>) {
    print!(
        "{}",
        render_stack(
            store.items(),
            store.settings(),
            store.now(),
            ws.config.ui.title_width
        )
    );
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list(start: &Path, json: bool) -> CmdResult {
    let session = open_session(start)?;
    let store = &session.store;
    if json {
        let out = stack_to_json(
            store.items(),
            store.settings(),
            store.selected_id(),
            store.now(),
        );
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print_stack(&session.ws, store);
    }
    Ok(())
}

fn cmd_show(start: &Path, args: ItemArg, json: bool) -> CmdResult {
    let session = open_session(start)?;
    let store = &session.store;
    let id = target_id(store, args.id.as_deref())?;
    let item = store
        .get(&id)
        .ok_or_else(|| LookupError::NotFound(id.clone()))?;
    let position = position_of(store.items(), &id);
    let len = store.len();

    if json {
        let out = item_to_json(item, position, len, store.settings(), store.now());
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!(
            "{}",
            render_item(item, position, len, store.settings(), store.now())
        );
    }
    Ok(())
}

fn cmd_recovery(start: &Path) -> CmdResult {
    let ws = load_workspace(start)?;
    match recovery::read_recovery_log(&ws.store_dir) {
        Some(log) => print!("{}", log),
        None => println!("recovery log is empty"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_push(start: &Path, args: PushArgs) -> CmdResult {
    let mut session = open_session(start)?;
    if args.title.trim().is_empty() {
        return Err("title cannot be empty".into());
    }
    let draft = ItemDraft::new(args.title)
        .with_description(args.description)
        .with_links(args.links);
    let id = session.store.push(draft)?;
    println!("{}", id);
    Ok(())
}

fn cmd_pop(start: &Path) -> CmdResult {
    let mut session = open_session(start)?;
    match session.store.pop()? {
        Some(item) => println!("{}  {}", item.id, item.title),
        None => println!("stack is empty"),
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

fn cmd_move(start: &Path, args: ItemArg, direction: Direction) -> CmdResult {
    let mut session = open_session(start)?;
    let id = target_id(&session.store, args.id.as_deref())?;
    let moved = match direction {
        Direction::Up => session.store.move_up(&id)?,
        Direction::Down => session.store.move_down(&id)?,
    };
    match (moved, direction) {
        (true, _) => print_stack(&session.ws, &session.store),
        (false, Direction::Up) => println!("already at the top"),
        (false, Direction::Down) => println!("already at the bottom"),
    }
    Ok(())
}

fn cmd_delete(start: &Path, args: ItemArg) -> CmdResult {
    let mut session = open_session(start)?;
    let id = target_id(&session.store, args.id.as_deref())?;
    if let Some(item) = session.store.delete(&id)? {
        println!("deleted {}  {}", short_id(&item.id), item.title);
    }
    Ok(())
}

fn cmd_edit(start: &Path, args: EditArgs) -> CmdResult {
    let mut session = open_session(start)?;
    let id = target_id(&session.store, args.id.as_deref())?;

    let links = if args.clear_links || !args.links.is_empty() || !args.rm_links.is_empty() {
        let mut links = if args.clear_links {
            Vec::new()
        } else {
            session
                .store
                .get(&id)
                .map(|item| item.links.clone())
                .unwrap_or_default()
        };
        links.retain(|l| !args.rm_links.iter().any(|rm| rm.trim() == l.as_str()));
        links.extend(args.links);
        Some(normalize_links(links))
    } else {
        None
    };

    if args.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err("title cannot be empty".into());
    }

    let patch = ItemPatch {
        title: args.title,
        description: args.description,
        links,
    };
    if patch.is_empty() {
        return Err("nothing to edit: pass --title, --description, or a link option".into());
    }

    if session.store.update(&id, patch)? {
        println!("updated {}", short_id(&id));
    } else {
        println!("unchanged");
    }
    Ok(())
}

fn cmd_select(start: &Path, args: SelectArgs) -> CmdResult {
    let mut session = open_session(start)?;
    let id = session.store.resolve(&args.id)?;
    match session.store.toggle_selection(&id)? {
        Some(selected) => println!("selected {}", short_id(selected)),
        None => println!("deselected {}", short_id(&id)),
    }
    Ok(())
}

fn cmd_settings(start: &Path, args: SettingsArgs, json: bool) -> CmdResult {
    let mut session = open_session(start)?;
    let patch = SettingsPatch {
        max_items: args.max_items.map(|n| n as usize),
        max_time_ms: args
            .max_hours
            .and_then(|h| SettingsPatch::max_hours(h).max_time_ms),
    };
    if !patch.is_empty() {
        session.store.update_settings(patch)?;
    }

    let settings: &Settings = session.store.settings();
    if json {
        println!("{}", serde_json::to_string_pretty(&settings_to_json(settings))?);
    } else {
        print!("{}", render_settings(settings));
        if session.store.len() > settings.max_items {
            println!(
                "note: stack holds {} items; the oldest are evicted on the next push",
                session.store.len()
            );
        }
    }
    Ok(())
}

fn cmd_sweep(start: &Path, json: bool) -> CmdResult {
    // Opening already sweeps; report what that removed.
    let ws = load_workspace(start)?;
    let _lock = FileLock::acquire_default(&ws.store_dir)?;
    let before = read_ids(&ws);
    let store = ws.open_store()?;
    let removed: Vec<&String> = before
        .iter()
        .filter(|id| store.get(id).is_none())
        .collect();

    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!(
            "removed {} expired item{}",
            removed.len(),
            if removed.len() == 1 { "" } else { "s" }
        );
    }
    Ok(())
}

/// Ids currently on disk, without sweeping.
fn read_ids(ws: &Workspace) -> Vec<String> {
    use crate::io::kv::{KvStore, STACK_KEY};
    ws.kv()
        .get(STACK_KEY)
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str::<Vec<Item>>(&raw).ok())
        .map(|items| items.into_iter().map(|i| i.id).collect())
        .unwrap_or_default()
}

fn cmd_watch(start: &Path, args: WatchArgs) -> CmdResult {
    let ws = load_workspace(start)?;
    let secs = args.interval.unwrap_or(ws.config.sweep.interval_secs).max(1);

    let mut store = {
        let _lock = FileLock::acquire_default(&ws.store_dir)?;
        ws.open_store()?
    };
    let watcher = StoreWatcher::start(&ws.store_dir)?;
    store.start_sweeper(Duration::from_secs(secs))?;
    tracing::info!(root = %ws.root.display(), interval_secs = secs, "watching stack");

    print_stack(&ws, &store);
    let mut shown = (store.items().to_vec(), *store.settings());
    let mut ticks = 0usize;

    loop {
        let ticked = store.wait_for_tick(WATCH_POLL);
        let mut changed_on_disk = false;
        for StoreEvent::Changed(paths) in watcher.poll() {
            tracing::debug!(?paths, "records changed on disk");
            changed_on_disk = true;
        }

        if ticked {
            let _lock = FileLock::acquire_default(&ws.store_dir)?;
            store.reload()?;
            for item in store.sweep()? {
                println!("expired {}  {}", short_id(&item.id), item.title);
            }
            ticks += 1;
        } else if changed_on_disk {
            store.reload()?;
        }

        let current = (store.items().to_vec(), *store.settings());
        if current != shown {
            println!();
            print_stack(&ws, &store);
            shown = current;
        }

        if args.ticks.is_some_and(|limit| ticks >= limit) {
            break;
        }
    }

    store.stop_sweeper();
    Ok(())
}
