//! End-to-end smoke runs of the observing system on real orbital
//! geometry.

use std::fs;

use rand::rngs::StdRng;
use rand::SeedableRng;

use orbnet::antenna::{Antenna, AntennaKind};
use orbnet::clock::SimulationClock;
use orbnet::logging::DataLog;
use orbnet::modem::Modem;
use orbnet::platform::{DuplicationPattern, Platform, TleSet};
use orbnet::processor::{DataProcessor, SinkProcessor, SourceMode, SourceProcessor};
use orbnet::scheduler::{Scheduler, SchedulerConfig};
use orbnet::sensor::Sensor;
use orbnet::subsystems::{Battery, CommSubsystem, PowerSubsystem, SensingSubsystem, SolarPanel};
use orbnet::sun::Sun;
use orbnet::system::ObservingSystem;

const LINE1: &str = "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
const LINE2: &str = "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

fn seed_tle() -> TleSet {
    TleSet {
        name: "CUBESAT".to_string(),
        line1: LINE1.to_string(),
        line2: LINE2.to_string(),
    }
}

fn platforms(count: u16) -> Vec<Platform> {
    seed_tle()
        .duplicate(&DuplicationPattern {
            orbit_planes: 1,
            groups_per_plane: count,
            sats_in_train: 1,
            sats_in_tandem: 1,
            train_angle_deg: 0,
            tandem_angle_deg: 0,
        })
        .iter()
        .map(|tle| tle.platform().unwrap())
        .collect()
}

fn comm_prototype() -> CommSubsystem {
    CommSubsystem::new(
        Antenna::new(AntennaKind::Dipole, 30.0, 0.0, 0.0, 0.0),
        Modem::uhf_deploy(),
    )
}

fn power_prototype() -> PowerSubsystem {
    let panel = SolarPanel::new(29.0, 0.06, 0.0, 0.0, 0.0);
    PowerSubsystem::new(
        Battery::new(0.9333, 6.0, 12.9, 85.0),
        vec![panel.clone(), panel],
        6.2425,
    )
}

fn output_dir(label: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("orbnet-{}-{}", label, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn mixed_constellations_run_without_invariant_errors() {
    let mut clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    let dir = output_dir("mixed");
    let mut log = DataLog::create(&dir).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    let mut system = ObservingSystem::new(Scheduler::new(SchedulerConfig::default()));
    let sensing_antenna = Antenna::new(AntennaKind::Helical, 30.0, 0.0, 0.0, 0.0);
    let make_source: Box<dyn Fn() -> Box<dyn DataProcessor>> =
        Box::new(|| Box::new(SourceProcessor::new(SourceMode::Windowed)));
    system.launch(
        platforms(3),
        0,
        false,
        &comm_prototype(),
        &SensingSubsystem::new(sensing_antenna, Sensor::cloud_radar(60)),
        &power_prototype(),
        make_source.as_ref(),
        &clock,
    );
    let make_sink: Box<dyn Fn() -> Box<dyn DataProcessor>> = Box::new(|| Box::new(SinkProcessor));
    system.launch(
        platforms(3),
        1,
        false,
        &comm_prototype(),
        &SensingSubsystem::new(sensing_antenna, Sensor::rain_radar(20)),
        &power_prototype(),
        make_sink.as_ref(),
        &clock,
    );
    assert_eq!(system.nodes().len(), 6);

    system.seed_many(600, 0, &clock, &mut rng);
    assert!(system.num_samples() > 0);

    for _ in 0..120 {
        system.update(&clock, &mut sun, &mut log).unwrap();
        clock.tick(5);
    }
    system.complete(&mut log).unwrap();

    // Batteries drained or were recharged, never out of range.
    for node in system.nodes() {
        let battery = node.power().battery();
        assert!(battery.energy_w_hr() >= 0.0);
        assert!(battery.energy_w_hr() <= battery.capacity_w_hr());
    }
    // Logs landed on disk.
    assert!(fs::metadata(dir.join("nodes.csv")).unwrap().len() > 0);
    assert!(fs::metadata(dir.join("network.csv")).is_ok());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn sensing_produces_suggestions_for_the_scheduler() {
    let mut clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    let dir = output_dir("sense");
    let mut log = DataLog::create(&dir).unwrap();

    let mut system = ObservingSystem::new(Scheduler::new(SchedulerConfig::default()));
    let sensing_antenna = Antenna::new(AntennaKind::Helical, 30.0, 0.0, 0.0, 0.0);
    let make_source: Box<dyn Fn() -> Box<dyn DataProcessor>> =
        Box::new(|| Box::new(SourceProcessor::new(SourceMode::SingleSample)));
    system.launch(
        platforms(1),
        0,
        false,
        &comm_prototype(),
        &SensingSubsystem::new(sensing_antenna, Sensor::cloud_radar(30)),
        &power_prototype(),
        make_source.as_ref(),
        &clock,
    );
    // One integration starting right away; no sinks exist, so the
    // scheduler consumes the suggestions without dispatching.
    system.nodes_mut()[0].plan_measurement(0, u16::MAX);

    let mut sensed = false;
    for _ in 0..40 {
        system.update(&clock, &mut sun, &mut log).unwrap();
        sensed |= system.nodes()[0].sensing().active();
        clock.tick(1);
    }
    assert!(sensed, "the planned integration never started");
    // The suggestion lists were consumed by the scheduling pass.
    assert!(system.nodes()[0].min_suggestions().is_empty());
    assert!(system.nodes()[0].max_suggestions().is_empty());
    let _ = fs::remove_dir_all(&dir);
}
