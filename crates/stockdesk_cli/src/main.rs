//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `stockdesk_core` linkage without the Flutter runtime.
//! - Print the persisted app state found in one state database.
//!
//! Usage: `stockdesk_cli [DB_PATH]`. Without an argument the path comes from
//! `STOCKDESK_DB_PATH` or the default temp location.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use stockdesk_core::{init_logging, snapshot, CoreConfig, RouteGuard, Session, SqliteKvStore};

fn main() -> ExitCode {
    let config = CoreConfig::from_env();
    if let Some(log_dir) = config.log_dir.as_ref() {
        if let Err(err) = init_logging(&config.log_level, &log_dir.to_string_lossy()) {
            eprintln!("logging disabled: {err}");
        }
    }

    let db_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or(config.db_path);

    println!("stockdesk_core ping={}", stockdesk_core::ping());
    println!("stockdesk_core version={}", stockdesk_core::core_version());
    println!("state_db={}", db_path.display());

    let store = match SqliteKvStore::open(&db_path) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open state db: {err}");
            return ExitCode::FAILURE;
        }
    };
    let session = Session::new(Arc::new(store));

    let state = match snapshot(&session) {
        Ok(state) => state,
        Err(err) => {
            eprintln!("failed to read state: {err}");
            return ExitCode::FAILURE;
        }
    };

    if state.branch.is_selected() {
        println!("branch={} ({})", state.branch.id, state.branch.label);
    } else {
        println!("branch=none");
    }
    if state.warehouse.is_selected() {
        println!("warehouse={} ({})", state.warehouse.id, state.warehouse.label);
    } else {
        println!("warehouse=none");
    }
    println!(
        "user={} name={} role={} all_access={}",
        state.user.id, state.user.name, state.user.role, state.user.permissions.all
    );
    println!("api_url={}", state.api_url);
    println!("lsu={}", state.lsu);

    let guard = RouteGuard::default();
    match guard.evaluate(guard.landing_path(), "/login", session.store().as_ref()) {
        Ok(decision) => println!("landing_guard={decision:?}"),
        Err(err) => eprintln!("landing_guard error: {err}"),
    }

    ExitCode::SUCCESS
}
