// Netzwerk-Task - treibt einen embassy-net Stack
use embassy_net::Runner;
use esp_radio::wifi::WifiDevice;

/// Network Task
///
/// Prozessiert die Pakete eines Interfaces. Läuft zweimal:
/// einmal für Station, einmal für Access Point.
#[embassy_executor::task(pool_size = 2)]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}
