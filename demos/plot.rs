use cfg_if::cfg_if;

cfg_if! {
    if #[cfg(any(target_os = "linux", target_os = "android"))] {
        use linux_embedded_hal::{I2cdev, I2CError, i2cdev::linux::LinuxI2CError};
        use emc2101::*;
        use argh::FromArgs;
        use textplots::{Chart, Plot, Shape};
        use std::thread::sleep;
        use std::time::Duration;
        use indicatif::{ProgressBar, ProgressStyle};
        use serde_json::json;
        use std::fs::File;
        use std::io::Write;
        use std::error::Error as ErrorTrait;
        use std::iter;

        #[derive(FromArgs)]
        #[argh(description = "plot emc2101 temperature and fan speed")]
        struct InputArgs {
            #[argh(positional)]
            bus: String,
            #[argh(positional, from_str_fn(from_base_16))]
            addr: u8,
            #[argh(option, short='n', default = "default_num_samples()", description = "number of samples to take")]
            num: u32,
            #[argh(option, short='d', description = "fan duty cycle (percent) while sampling")]
            duty: Option<u8>,
            #[argh(option, short='o', description = "out json file")]
            out_file: Option<String>
        }

        #[derive(Debug)]
        #[allow(dead_code)]
        enum PlotError {
            I2c(LinuxI2CError),
            Emc2101(emc2101::Error<I2CError>),
            OutputError(Box<dyn ErrorTrait>)
        }

        impl From<LinuxI2CError> for PlotError {
            fn from(i2c_err: LinuxI2CError) -> PlotError {
                PlotError::I2c(i2c_err)
            }
        }

        impl From<emc2101::Error<I2CError>> for PlotError {
            fn from(emc_err: emc2101::Error<I2CError>) -> PlotError {
                PlotError::Emc2101(emc_err)
            }
        }

        fn default_num_samples() -> u32 {
            100
        }

        fn from_base_16(val: &str) -> Result<u8, String> {
            let no_prefix = val.trim_start_matches("0x");

            match u8::from_str_radix(no_prefix, 16) {
                Ok(v) => Ok(v),
                Err(_) => {
                    Err("Unable to convert address from base 16".into())
                }
            }
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() -> Result<(), PlotError> {
    let args: InputArgs = argh::from_env();

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
    .map_err(|e| PlotError::OutputError(Box::new(e)))?;

    let i2c: I2cdev = I2cdev::new(args.bus)?;
    let mut emc = Emc2101::open(i2c, args.addr)?;
    let mut temp_points: Vec<(f32, f32)> = Vec::new();
    let mut rpm_points: Vec<(f32, f32)> = Vec::new();
    let mut data = Vec::new();

    if let Some(duty) = args.duty {
        emc.set_duty_cycle(duty)?;
    }

    let bar = ProgressBar::new(args.num as u64);
    bar.set_style(ProgressStyle::default_bar().progress_chars("#>-"));

    // open() selects 32 Hz conversions.
    let sample_time: u16 = 32;
    println!(
        "Capturing data (1 sample every {} milliseconds)",
        sample_time
    );

    (0..args.num)
        .zip(iter::repeat_with(|| {
            let temp = emc.external_temperature()?;
            let rpm = emc.fan_rpm()?;
            Ok::<_, PlotError>((f32::from(temp), rpm))
        }))
        .try_for_each(|(i, sample)| {
            let (temp, rpm) = sample?;

            temp_points.push((i as f32, temp));
            rpm_points.push((i as f32, rpm as f32));
            data.push(json!({ "temperature": temp, "rpm": rpm }));

            sleep(Duration::from_millis((sample_time - 2).into())); // ~2 millis for i2c reads.
            bar.inc(1);

            Ok::<_, PlotError>(())
        })?;

    bar.finish();

    println!(
        "\ny = {} external temperature samples (1 every {} milliseconds)",
        args.num, sample_time
    );
    Chart::new(120, 60, 0.0, args.num as f32)
        .lineplot(&Shape::Steps(&temp_points))
        .display();

    println!("\ny = {} fan speed samples (RPM)", args.num);
    Chart::new(120, 60, 0.0, args.num as f32)
        .lineplot(&Shape::Steps(&rpm_points))
        .display();

    let json_str = serde_json::to_string(&data).map_err(|e| PlotError::OutputError(Box::new(e)))?;

    if let Some(out) = args.out_file {
        let mut file = File::create(out).map_err(|e| PlotError::OutputError(Box::new(e)))?;
        file.write_all(json_str.as_bytes())
            .map_err(|e| PlotError::OutputError(Box::new(e)))?;
    } else {
        println!("\n{}", json_str);
    }

    let _i2c_old = emc.free();

    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {}
