mod cli;
mod logging;
mod scenario;
mod session;
mod sim;

use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use join_gate::{GateTiming, ManualScheduler, PolicyConfig};
use settings::{Settings, SettingsStore};
use tokio::task::LocalSet;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::scenario::Scenario;
use crate::session::{Clock, Session, SessionConfig};

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.log_level.map(Into::into), cli.log_file.as_deref())?;

    let HostSettings {
        store,
        failsafe_delay,
    } = load_settings(&cli.settings)?;
    let scenario = match &cli.scenario {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin()?,
    };
    info!(
        target = "join_gate_host",
        "replaying {} step(s), failsafe after {:?}",
        scenario.steps.len(),
        failsafe_delay
    );

    let clock = if cli.realtime {
        Clock::Tokio
    } else {
        Clock::Virtual(ManualScheduler::new())
    };
    let config = SessionConfig {
        policy: store,
        failsafe_delay,
        api: cli.api.exposed(),
        host: !cli.client,
        clock,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .wrap_err("building tokio runtime")?;
    let report = LocalSet::new().block_on(&runtime, async move {
        let mut session = Session::new(config);
        session.run(&scenario).await;
        session.report()
    });

    println!("{report}");
    Ok(())
}

struct HostSettings {
    store: Rc<SettingsStore>,
    failsafe_delay: Duration,
}

/// Load the settings file. Only an unreadable or unparseable file is fatal.
///
/// A malformed `[join_policy]` stays unregistered, so the gate reports
/// `ConfigurationMissing` and denies joins. A malformed `[join_timing]` falls
/// back to the default delay.
fn load_settings(path: &Path) -> Result<HostSettings> {
    let store = SettingsStore::builder()
        .with_settings_file(path)
        .build()
        .wrap_err_with(|| format!("loading settings from {}", path.display()))?;

    match store.register::<PolicyConfig>() {
        Ok(()) if !store.is_present::<PolicyConfig>() => warn!(
            target = "join_gate_host",
            "no [{}] section in {}, joins stay denied",
            PolicyConfig::SECTION,
            path.display()
        ),
        Ok(()) => {}
        Err(err) => warn!(
            target = "join_gate_host",
            "ignoring [{}] in {}: {err}; joins stay denied",
            PolicyConfig::SECTION,
            path.display()
        ),
    }

    let failsafe_delay = match store
        .register::<GateTiming>()
        .and_then(|()| store.get_or_default::<GateTiming>())
        .and_then(|timing| timing.failsafe_delay())
    {
        Ok(delay) => delay,
        Err(err) => {
            warn!(
                target = "join_gate_host",
                "ignoring [{}] in {}: {err}; using {:?}",
                GateTiming::SECTION,
                path.display(),
                GateTiming::DEFAULT_FAILSAFE_DELAY
            );
            GateTiming::DEFAULT_FAILSAFE_DELAY
        }
    };

    Ok(HostSettings {
        store: Rc::new(store),
        failsafe_delay,
    })
}
