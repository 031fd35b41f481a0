use cfg_if::cfg_if;
use std::io::{stdout, Write};

cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        use crossterm::{cursor, ExecutableCommand};
        use linux_embedded_hal::I2cdev;
        use emc2101::*;
        use argh::FromArgs;
        // no_std crates don't have access to the Error trait. However, because emc2101
        // error types impl Display, we can use the eyre crate to ad-hoc convert our error types
        // to ones that impl Error via the eyre! macro.
        use eyre::{eyre, Result};
        use log::info;
        use std::convert::TryFrom;
        use std::thread::sleep;
        use std::time::Duration;

        #[derive(FromArgs)]
        #[argh(description = "walk a forced temperature through an emc2101 look-up table")]
        struct InputArgs {
            #[argh(positional)]
            bus: String,
            #[argh(positional, from_str_fn(from_base_16))]
            addr: u8,
        }

        fn from_base_16(val: &str) -> Result<u8, String> {
            match u8::from_str_radix(val.trim_start_matches("0x"), 16) {
                Ok(v) => Ok(v),
                Err(_) => {
                    Err("Unable to convert address from base 16".into())
                }
            }
        }

        const TABLE: &[(u8, u8)] = &[(30, 20), (40, 40), (50, 60), (60, 80), (70, 100)];
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() -> Result<()> {
    let args: InputArgs = argh::from_env();

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let i2c: I2cdev = I2cdev::new(args.bus)?;
    let mut emc = Emc2101::open(i2c, args.addr)
        .map_err(|e| eyre!("failed to open emc2101: {}", e))?;

    let lut = Lut::try_from(TABLE).map_err(|e| eyre!("bad LUT: {:?}", e))?;
    emc.program_lut(&lut)
        .map_err(|e| eyre!("failed to program LUT: {}", e))?;
    emc.set_lut_hysteresis(2)
        .map_err(|e| eyre!("failed to set hysteresis: {}", e))?;

    for (i, entry) in lut.entries().iter().enumerate() {
        info!("LUT[{}]: above {} C drive {}%", i, entry.threshold(), entry.duty_percent());
    }

    emc.set_forced_temperature_enabled(true)
        .map_err(|e| eyre!("failed to force temperature: {}", e))?;
    emc.set_lut_enabled(true)
        .map_err(|e| eyre!("failed to enable LUT: {}", e))?;

    let mut stdout = stdout();

    for forced in (20i8..=80).step_by(5) {
        emc.set_forced_temperature(forced)
            .map_err(|e| eyre!("failed to set forced temperature: {}", e))?;

        // Give the fan time to follow the new LUT entry.
        for _ in 0..10 {
            let rpm = emc.fan_rpm().map_err(|e| eyre!("failed to read fan speed: {}", e))?;

            stdout.execute(cursor::SavePosition)?;
            stdout.write(format!("Forced {} C, fan at {} RPM.    \r", forced, rpm).as_bytes())?;
            stdout.execute(cursor::RestorePosition)?;
            stdout.flush()?;

            sleep(Duration::from_millis(200u64));
        }

        println!();
    }

    emc.set_forced_temperature_enabled(false)
        .map_err(|e| eyre!("failed to release forced temperature: {}", e))?;

    println!("\nLUT demo done! The LUT now follows the external diode.");

    let _i2c_old = emc.free();

    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {}
