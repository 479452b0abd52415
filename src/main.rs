use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};

use ram_probe::config::{validate_config, ConfigLoader};
use ram_probe::process::mock::MockProcess;
use ram_probe::{
    Address, CompareOp, Representation, ScanConfig, SearchMode, SearchRequest, SearchSession,
    Watcher, WatcherSet, Width,
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("ram-probe v{}", env!("CARGO_PKG_VERSION"));

    let config = ConfigLoader::new("config.toml").load_or_default();
    validate_config(&config)?;
    let scan = config.scan.to_scan_config()?;

    #[cfg(windows)]
    if let Some(pid) = std::env::args().nth(1).and_then(|a| a.parse::<u32>().ok()) {
        use ram_probe::process::live::LiveProcess;
        let process = Arc::new(LiveProcess::open(pid)?);
        let session = SearchSession::new(process);
        let outcome = session.reset(&scan);
        info!(
            candidates = outcome.candidates,
            regions = outcome.regions,
            "attached to PID {pid}"
        );
        return Ok(());
    }

    // no target given: walk a simulated process through a search
    info!("no target PID given, running against a simulated process");
    let process = Arc::new(MockProcess::with_page(
        Address::new(0x0040_0000),
        (0u8..64).collect(),
    ));
    let session = SearchSession::new(process.clone());

    let outcome = session.reset(&scan);
    info!(
        candidates = outcome.candidates,
        regions = outcome.regions,
        "candidate set primed"
    );

    // the simulated player loses some health
    process.poke(Address::new(0x0040_0010), &[99]);
    session.tick(&scan);

    let byte_view = ScanConfig {
        width: Width::W8,
        representation: Representation::Unsigned,
        require_alignment: scan.require_alignment,
    };
    let outcome = session.search(
        &byte_view,
        &SearchRequest::new(SearchMode::Relative, CompareOp::NotEqual),
    )?;
    info!(candidates = outcome.candidates, "after change search");

    for i in 0..outcome.candidates {
        if let Some(c) = session.candidate(&byte_view, i) {
            info!(
                address = %c.address,
                value = %c.value.format(byte_view.width, byte_view.representation),
                previous = %c.previous.format(byte_view.width, byte_view.representation),
                changes = c.changes,
                "candidate"
            );
        }
    }

    // pin the survivor into the watch list
    let mut watches = WatcherSet::new();
    if let Some(c) = session.candidate(&byte_view, 0) {
        watches.insert(
            Watcher::new(c.address, byte_view.width, byte_view.representation)
                .with_description("found by demo search"),
            process.as_ref(),
        )?;
    }
    let changed = watches.update_all(process.as_ref());
    info!(watchers = watches.len(), changed, "watch list updated");

    if config.watch.autosave && !watches.is_empty() {
        watches.save(&config.watch.file)?;
        info!(file = %config.watch.file, "watch list saved");
    }

    Ok(())
}
