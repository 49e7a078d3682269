use std::error::Error;
use std::path::Path;

use clap::{App, Arg};
use colored::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use orbnet::antenna::Antenna;
use orbnet::clock::SimulationClock;
use orbnet::config::{
    AntennaConfig, ConfigError, ConstellationConfig, ProcessorKind, ScenarioConfig, SensorKind,
};
use orbnet::logging::DataLog;
use orbnet::modem::Modem;
use orbnet::platform::{load_tle_file, Platform};
use orbnet::processor::{DataProcessor, SinkProcessor, SourceMode, SourceProcessor, TemplateProcessor};
use orbnet::scheduler::Scheduler;
use orbnet::sensor::Sensor;
use orbnet::subsystems::{Battery, CommSubsystem, PowerSubsystem, SensingSubsystem, SolarPanel};
use orbnet::sun::Sun;
use orbnet::system::ObservingSystem;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let matches = App::new("orbnet")
        .version("0.1.0")
        .about("Collaborative Earth-observation constellation simulator")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .help("Scenario configuration file")
                .takes_value(true)
                .default_value("config/scenario.json"),
        )
        .arg(
            Arg::with_name("ticks")
                .short("t")
                .long("ticks")
                .value_name("N")
                .help("Override the configured tick count")
                .takes_value(true),
        )
        .get_matches();

    let config_path = matches.value_of("config").unwrap_or("config/scenario.json");
    let mut config = ScenarioConfig::load(Path::new(config_path))?;
    if let Some(ticks) = matches.value_of("ticks") {
        config.num_ticks = ticks
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bad tick count '{}'", ticks)))?;
    }

    println!("{}", "orbnet - observing-system simulation".bold());
    println!("  scenario: {}", config.name.cyan());
    println!(
        "  span: {} ticks x {} s",
        config.num_ticks, config.seconds_per_tick
    );

    run(&config)?;

    println!("{}", "done".green().bold());
    Ok(())
}

fn run(config: &ScenarioConfig) -> Result<(), Box<dyn Error>> {
    let start = &config.start;
    let mut clock = SimulationClock::from_ymd_hms(
        start.year,
        start.month,
        start.day,
        start.hour,
        start.minute,
        start.second,
    )
    .ok_or_else(|| ConfigError::Invalid("start epoch is not a valid date".into()))?;
    let mut sun = Sun::new();
    let mut log = DataLog::create(&config.output_dir)?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let tle_sets = load_tle_file(&config.tle_path)?;
    let mut system = ObservingSystem::new(Scheduler::new(config.scheduler));

    for block in &config.constellations {
        let seed_tle = tle_sets.get(block.tle_index).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "constellation {} references TLE record {} of {}",
                block.constellation,
                block.tle_index,
                tle_sets.len()
            ))
        })?;
        let platforms = seed_tle
            .duplicate(&block.duplication)
            .iter()
            .map(|tle| tle.platform())
            .collect::<Result<Vec<Platform>, _>>()?;

        let comm = CommSubsystem::new(build_antenna(&block.comm_antenna), Modem::uhf_deploy());
        let sensing =
            SensingSubsystem::new(build_antenna(&block.sensing_antenna), build_sensor(block));
        let battery = Battery::new(0.9333, 6.0, 12.9, 85.0);
        let panel = SolarPanel::new(29.0, 0.06, 0.0, 0.0, 0.0);
        let power = PowerSubsystem::new(battery, vec![panel.clone(), panel], 6.2425);

        let make_processor: Box<dyn Fn() -> Box<dyn DataProcessor>> = match block.processor {
            ProcessorKind::Source => {
                Box::new(|| Box::new(SourceProcessor::new(SourceMode::Windowed)))
            }
            ProcessorKind::SourceSingleSample => {
                Box::new(|| Box::new(SourceProcessor::new(SourceMode::SingleSample)))
            }
            ProcessorKind::Sink => Box::new(|| Box::new(SinkProcessor)),
            ProcessorKind::Template => Box::new(|| Box::<TemplateProcessor>::default()),
        };

        system.launch(
            platforms,
            block.constellation,
            false,
            &comm,
            &sensing,
            &power,
            make_processor.as_ref(),
            &clock,
        );
        info!(
            "launched constellation {} with {} nodes",
            block.constellation,
            system.nodes().len()
        );
    }

    let span_s = config.span_s();
    for block in &config.constellations {
        if block.seed_measurements {
            system.seed_many(span_s, block.constellation, &clock, &mut rng);
        }
    }

    for _ in 0..config.num_ticks {
        system.update(&clock, &mut sun, &mut log)?;
        clock.tick(config.seconds_per_tick);
    }
    system.complete(&mut log)?;

    println!(
        "  nodes: {}  planned samples: {}",
        system.nodes().len(),
        system.num_samples()
    );
    Ok(())
}

fn build_antenna(config: &AntennaConfig) -> Antenna {
    Antenna::new(
        config.kind,
        config.max_gain_db,
        config.roll_rad,
        config.pitch_rad,
        config.yaw_rad,
    )
}

fn build_sensor(block: &ConstellationConfig) -> Sensor {
    match block.sensor {
        SensorKind::CloudRadar => Sensor::cloud_radar(block.sensor_duration_s),
        SensorKind::RainRadar => Sensor::rain_radar(block.sensor_duration_s),
    }
}
