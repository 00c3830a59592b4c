use clap::Parser;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::{CdevPin, Delay};
use onewire_devices::{Device, DeviceParams, Registry, scan};
use onewire_gpio::OneWireGpio;

/// Scan a bit-banged 1-Wire bus and read its temperature sensors
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the GPIO character device (e.g., /dev/gpiochip0)
    #[arg(short, long, default_value = "/dev/gpiochip0")]
    chip: String,

    /// GPIO line the 1-Wire bus is wired to
    #[arg(short, long, default_value_t = 4)]
    line: u32,

    /// Temperature resolution in bits (9-12)
    #[arg(short, long)]
    resolution: Option<u8>,

    /// Number of measurement rounds; 0 keeps going
    #[arg(short = 'n', long, default_value_t = 0)]
    count: u32,
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    // Request the bus line open-drain; driving high releases it to the pullup
    let mut chip = Chip::new(&args.chip).expect("Failed to open GPIO chip");
    let handle = chip
        .get_line(args.line)
        .expect("Failed to get GPIO line")
        .request(
            LineRequestFlags::OPEN_DRAIN | LineRequestFlags::OUTPUT,
            1,
            "onewire",
        )
        .expect("Failed to request GPIO line");
    let pin = CdevPin::new(handle).expect("Failed to wrap GPIO line");
    let mut bus = OneWireGpio::new(pin, Delay);

    // Each driver installs its constructor before anything is resolved
    let mut registry = Registry::new();
    ds18x20::register(&mut registry);

    let records = scan(&mut bus).expect("Failed to scan the bus");
    log::info!("Found {} devices", records.len());
    let params = DeviceParams {
        resolution: args.resolution,
    };
    for record in &records {
        let info = registry.resolve(record.rom, &params).info();
        log::info!("{}: {} [{}]", record.w1_name, info.description, record.hex);
    }

    let resolution = args
        .resolution
        .and_then(ds18x20::Resolution::from_bits)
        .unwrap_or_default();
    let sensors: Vec<ds18x20::Ds18x20> = records
        .iter()
        .filter(|record| record.family == ds18x20::FAMILY)
        .map(|record| ds18x20::Ds18x20::new(record.rom).with_resolution(resolution))
        .collect();
    if sensors.is_empty() {
        log::info!("No temperature sensors on the bus");
        return;
    }

    let mut delay = Delay;
    let mut round = 0;
    loop {
        // Trigger every sensor at once, then collect the readings
        if let Err(e) = ds18x20::convert_all(&mut bus, &mut delay, resolution) {
            log::warn!("Conversion trigger failed: {e:?}");
        } else {
            for sensor in &sensors {
                match sensor.read_scratchpad(&mut bus) {
                    Ok(scratchpad) => {
                        let temperature =
                            ds18x20::Temperature::from_le_bytes([scratchpad[0], scratchpad[1]]);
                        log::info!("{}: {} C", sensor.rom(), temperature);
                    }
                    Err(e) => log::warn!("{}: read failed: {e:?}", sensor.rom()),
                }
            }
        }
        round += 1;
        if args.count != 0 && round >= args.count {
            break;
        }
    }
}
