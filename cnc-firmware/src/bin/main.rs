// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Heap Allocator (WiFi benötigt dynamischen Speicher)
extern crate alloc;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{Config as NetConfig, Ipv4Cidr, StackResources, StaticConfigV4};
use embassy_time::{Delay, Duration, Timer};

// ESP32-C3 HAL
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Input, InputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::rng::Rng;
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_storage::FlashStorage;
use static_cell::StaticCell;

use defmt::{error, info, warn};
// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

use cnc_core::config_store::load_config;
use cnc_core::display::TextDisplay;
use cnc_core::{Board, DeviceConfig};

// Projekt-Module und Konfiguration
use cnc_monitor::config::{
    AP_ADDRESS, AP_SOCKET_COUNT, DISPLAY_I2C_KHZ, DISPLAY_SCL_PIN, DISPLAY_SDA_PIN,
    DNS_UDP_BUFFER_SIZE, DNS_UDP_METADATA_COUNT, EXTRA_HEAP_SIZE, MQTT_SOCKET_BUFFER_SIZE,
    PANIC_RESTART_DELAY_MS, STA_SOCKET_COUNT, STATUS_GPIO_PIN, SUBNET_PREFIX_LEN,
    TCP_RX_BUFFER_SIZE, TCP_TX_BUFFER_SIZE, WIFI_HEAP_SIZE, factory_defaults,
};
use cnc_monitor::hal::{
    DisplayBackend, EspSystem, EspWifi, FlashConfigStorage, HttpServer, LogRenderer,
    OledRenderer, TcpMqttLink, UdpDnsSocket,
};
use cnc_monitor::tasks::{dhcp_server_task, net_task};
use cnc_monitor::{CncSupervisor, EspPlatform, web};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Legt einen Wert in einer eigenen StaticCell ab und liefert `&'static mut`
macro_rules! mk_static {
    ($t:ty, $val:expr) => {{
        static CELL: StaticCell<$t> = StaticCell::new();
        CELL.uninit().write($val)
    }};
}

/// Panic-Handler Ende: kurz warten, dann neu starten
///
/// Wird von esp-backtrace (Feature `custom-halt`) nach der Backtrace-Ausgabe
/// aufgerufen.
#[unsafe(no_mangle)]
pub extern "Rust" fn custom_halt() -> ! {
    esp_hal::delay::Delay::new().delay_millis(PANIC_RESTART_DELAY_MS);
    esp_hal::system::software_reset()
}

/// Netzwerk-Konfiguration der Station: statisch oder DHCP
fn station_net_config(config: &DeviceConfig) -> NetConfig {
    let Some(address) = config.static_address() else {
        return NetConfig::dhcpv4(Default::default());
    };

    // Gateway und DNS: .1 im selben /24
    let [a, b, c, _] = address.octets();
    let gateway = core::net::Ipv4Addr::new(a, b, c, 1);
    let mut static_config = StaticConfigV4 {
        address: Ipv4Cidr::new(address, SUBNET_PREFIX_LEN),
        gateway: Some(gateway),
        dns_servers: Default::default(),
    };
    let _ = static_config.dns_servers.push(gateway);

    info!("WiFi: Static address {}", defmt::Debug2Format(&address));
    NetConfig::ipv4_static(static_config)
}

/// Main Entry Point
///
/// Initialisiert Hardware und Netzwerk-Stacks, übergibt dann alles an den
/// Supervisor. Dessen Loop kehrt nie zurück.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C3 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap Allocator initialisieren (WiFi braucht dynamischen Speicher!)
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    info!("CNC Monitor starting...");

    // ========================================================================
    // Konfiguration aus dem Flash
    // ========================================================================

    let mut storage = FlashConfigStorage::new(FlashStorage::new(peripherals.FLASH));
    let device_config = load_config(&mut storage, &factory_defaults());

    // ========================================================================
    // WiFi + Netzwerk-Stacks
    // ========================================================================

    static RADIO_INIT: StaticCell<esp_radio::Controller> = StaticCell::new();
    let radio_init =
        RADIO_INIT.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));

    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");

    let hardware_id = interfaces.sta.mac_address();

    // Random seed für TCP/IP Stack (von Hardware RNG)
    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let (sta_stack, sta_runner) = embassy_net::new(
        interfaces.sta,
        station_net_config(&device_config),
        mk_static!(StackResources<STA_SOCKET_COUNT>, StackResources::new()),
        seed,
    );

    // Access Point: feste Adresse, Clients bekommen ihre per DHCP-Server
    let ap_net_config = NetConfig::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(AP_ADDRESS, SUBNET_PREFIX_LEN),
        gateway: Some(AP_ADDRESS),
        dns_servers: Default::default(),
    });
    let (ap_stack, ap_runner) = embassy_net::new(
        interfaces.ap,
        ap_net_config,
        mk_static!(StackResources<AP_SOCKET_COUNT>, StackResources::new()),
        seed.wrapping_add(1),
    );

    spawner.spawn(net_task(sta_runner)).unwrap();
    spawner.spawn(net_task(ap_runner)).unwrap();
    spawner.spawn(dhcp_server_task(ap_stack)).unwrap();

    // ========================================================================
    // Sockets (statische Buffer, leben so lange wie das Gerät)
    // ========================================================================

    let http_sta = TcpSocket::new(
        sta_stack,
        mk_static!([u8; TCP_RX_BUFFER_SIZE], [0; TCP_RX_BUFFER_SIZE]),
        mk_static!([u8; TCP_TX_BUFFER_SIZE], [0; TCP_TX_BUFFER_SIZE]),
    );
    let http_ap = TcpSocket::new(
        ap_stack,
        mk_static!([u8; TCP_RX_BUFFER_SIZE], [0; TCP_RX_BUFFER_SIZE]),
        mk_static!([u8; TCP_TX_BUFFER_SIZE], [0; TCP_TX_BUFFER_SIZE]),
    );
    let listener = HttpServer::new(http_sta, http_ap);

    let mqtt = TcpMqttLink::new(
        sta_stack,
        mk_static!([u8; MQTT_SOCKET_BUFFER_SIZE], [0; MQTT_SOCKET_BUFFER_SIZE]),
        mk_static!([u8; MQTT_SOCKET_BUFFER_SIZE], [0; MQTT_SOCKET_BUFFER_SIZE]),
    );

    let dns_socket = UdpDnsSocket::bind(UdpSocket::new(
        ap_stack,
        mk_static!(
            [PacketMetadata; DNS_UDP_METADATA_COUNT],
            [PacketMetadata::EMPTY; DNS_UDP_METADATA_COUNT]
        ),
        mk_static!([u8; DNS_UDP_BUFFER_SIZE], [0; DNS_UDP_BUFFER_SIZE]),
        mk_static!(
            [PacketMetadata; DNS_UDP_METADATA_COUNT],
            [PacketMetadata::EMPTY; DNS_UDP_METADATA_COUNT]
        ),
        mk_static!([u8; DNS_UDP_BUFFER_SIZE], [0; DNS_UDP_BUFFER_SIZE]),
    ));

    // ========================================================================
    // Display + Status-Eingang
    // ========================================================================

    info!(
        "Display: I2C SDA=GPIO{} SCL=GPIO{} @ {} kHz",
        DISPLAY_SDA_PIN, DISPLAY_SCL_PIN, DISPLAY_I2C_KHZ
    );
    let i2c_config = I2cConfig::default().with_frequency(Rate::from_khz(DISPLAY_I2C_KHZ));
    let renderer = match I2c::new(peripherals.I2C0, i2c_config) {
        Ok(i2c) => {
            let i2c = i2c.with_sda(peripherals.GPIO4).with_scl(peripherals.GPIO5);
            match OledRenderer::new(i2c) {
                Some(oled) => DisplayBackend::Oled(oled),
                None => DisplayBackend::Log(LogRenderer),
            }
        }
        Err(e) => {
            warn!("Display: I2C config rejected: {}", defmt::Debug2Format(&e));
            DisplayBackend::Log(LogRenderer)
        }
    };

    info!("Status: Input GPIO{} (pull-down)", STATUS_GPIO_PIN);
    let status_pin = Input::new(
        peripherals.GPIO21,
        InputConfig::default().with_pull(Pull::Down),
    );

    // ========================================================================
    // Supervisor
    // ========================================================================

    let board: Board<EspPlatform> = Board {
        wifi: EspWifi::new(wifi_controller, sta_stack),
        mqtt,
        status_pin,
        display: TextDisplay::new(renderer),
        delay: Delay,
        listener,
        dns_socket,
        storage,
        system: EspSystem::new(),
        hardware_id,
        config_page: web::CONFIG_PAGE,
    };

    match CncSupervisor::boot(board, device_config).await {
        Ok(supervisor) => supervisor.run().await,
        Err(fault) => {
            error!("Boot failed: {}", fault);
            Timer::after(Duration::from_millis(u64::from(PANIC_RESTART_DELAY_MS))).await;
            esp_hal::system::software_reset()
        }
    }
}
