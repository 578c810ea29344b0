use tracing_subscriber::EnvFilter;

use parley::app::ChatApp;
use parley::settings::SettingsStore;

/// Application entry point.
///
/// 1. Load settings (defaults, then the JSON file, then `PARLEY_` variables)
/// 2. Install tracing with the configured filter; `RUST_LOG` wins when set
/// 3. Build the single store and wire the views to it
/// 4. Read one message per stdin line until EOF; `/name <first name>` saves a
///    new author name
fn main() {
    let settings = SettingsStore::open_default();
    let log_filter = settings.current().log_filter.clone();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!(
        path = ?settings.path(),
        "settings loaded"
    );

    let mut app = ChatApp::new(settings);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(error) = app.run(stdin.lock(), stdout.lock()) {
        tracing::error!("{}", error);
        std::process::exit(1);
    }
}
