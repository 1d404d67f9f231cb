#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_net::StackResources;
use embassy_time::Instant;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::info;
use static_cell::StaticCell;

use wifitherm_core::control_loop::{ControlLoop, Devices};
use wifitherm_core::display::{DisplayPresenter, Palette};
use wifitherm_core::sensors::SHT40Sensor;
use wifitherm_firmware::display::init_panel;
use wifitherm_firmware::hardware::{
    create_display_spi, create_i2c_bus, init_sd_storage, init_trigger,
};
use wifitherm_firmware::network::{TcpConnector, address_logger, connection, net_task};
use wifitherm_firmware::time::EmbassyClock;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("wifitherm {} starting", env!("CARGO_PKG_VERSION"));

    // Radio and network stacks
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio_init = RADIO.init(
        esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"),
    );
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    static STA_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
    let (sta_stack, sta_runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STA_RESOURCES.init(StackResources::new()),
        seed,
    );

    if let Err(e) = spawner.spawn(connection(wifi_controller)) {
        log::error!("Failed to spawn Wi-Fi connection task: {:?}", e);
    }
    if let Err(e) = spawner.spawn(net_task(sta_runner)) {
        log::error!("Failed to spawn station network task: {:?}", e);
    }
    if let Err(e) = spawner.spawn(address_logger(sta_stack)) {
        log::error!("Failed to spawn address logger: {:?}", e);
    }

    #[cfg(feature = "portal")]
    let portal = {
        use wifitherm_firmware::portal::{SoftApPortal, dhcp_server, dns_server, portal_net_config};

        static AP_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();
        let (ap_stack, ap_runner) = embassy_net::new(
            interfaces.ap,
            portal_net_config(),
            AP_RESOURCES.init(StackResources::new()),
            seed.rotate_left(17),
        );
        if let Err(e) = spawner.spawn(net_task(ap_runner)) {
            log::error!("Failed to spawn portal network task: {:?}", e);
        }
        if let Err(e) = spawner.spawn(dhcp_server(ap_stack)) {
            log::error!("Failed to spawn portal DHCP task: {:?}", e);
        }
        if let Err(e) = spawner.spawn(dns_server(ap_stack)) {
            log::error!("Failed to spawn portal DNS task: {:?}", e);
        }
        SoftApPortal::new(ap_stack)
    };
    #[cfg(not(feature = "portal"))]
    let portal = wifitherm_firmware::portal::DisabledPortal;

    // Sensor
    let i2c = create_i2c_bus(peripherals.I2C0, peripherals.GPIO12, peripherals.GPIO11);
    let sensor = SHT40Sensor::new(i2c);

    // Display
    let spi_bus = create_display_spi(peripherals.SPI2, peripherals.GPIO36, peripherals.GPIO37);
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());
    static SPI_BUFFER: StaticCell<[u8; 512]> = StaticCell::new();
    let surface = init_panel(spi_bus, cs, dc, SPI_BUFFER.init([0; 512]));

    // Config storage and trigger
    let storage = init_sd_storage(
        peripherals.SPI3,
        peripherals.GPIO40,
        peripherals.GPIO41,
        peripherals.GPIO42,
        peripherals.GPIO39,
    );
    let trigger = init_trigger(peripherals.GPIO0);

    let devices = Devices {
        trigger,
        portal,
        storage,
        sensor,
        display: DisplayPresenter::new(surface, Palette::default()),
        connector: TcpConnector::new(sta_stack),
    };

    let mut control = ControlLoop::boot(devices, Instant::now());
    match control.run(&EmbassyClock, &mut embassy_time::Delay).await {}
}
