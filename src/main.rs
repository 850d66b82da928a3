use ble_bind_sample::domain::gatt::{AdvertiseRequest, ServiceDescriptor};
use ble_bind_sample::domain::models::{Adapter, SessionEvent};
use ble_bind_sample::domain::session::PeripheralSession;
use ble_bind_sample::domain::settings::SettingsService;
use ble_bind_sample::infrastructure::bluetooth::simulated::SimulatedStack;
use ble_bind_sample::infrastructure::bluetooth::PeripheralService;
use ble_bind_sample::infrastructure::logging;
use ble_bind_sample::presentation::console;
use ble_bind_sample::presentation::display::ConsoleDisplay;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;

    let _logging_guard = logging::init_logger(&settings_service.get().log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting BLE bind sample peripheral");

    if settings_service.should_write_defaults() {
        match settings_service.save() {
            Ok(()) => info!(
                "Wrote default settings to {}",
                settings_service.path().display()
            ),
            Err(e) => warn!("Could not write default settings: {}", e),
        }
    }
    let settings = settings_service.get().clone();

    let service = ServiceDescriptor::sample();
    let adapter = Adapter::enabled(settings.device_name.clone());
    let session = PeripheralSession::new(
        service,
        AdvertiseRequest::for_service(&service, settings.advertise.clone()),
        adapter.clone(),
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let stack = SimulatedStack::new(event_tx.clone(), settings.simulation.clone());
    let mut peripheral = PeripheralService::new(session, stack, ConsoleDisplay::default());

    println!("{}", console::HELP);
    let quit = console::spawn_command_reader(
        std::io::BufReader::new(std::io::stdin()),
        event_tx.clone(),
        adapter.name,
    )?;

    if settings.simulation.auto_start {
        event_tx.send(SessionEvent::StartRequested)?;
    }

    let shutdown = async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
            }
            _ = console::quit_requested(quit) => {}
        }
    };

    peripheral.run(event_rx, shutdown).await;
    Ok(())
}
