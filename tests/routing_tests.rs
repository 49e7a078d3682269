//! Route-search and visitor-prediction scenarios against engineered
//! geometries: equatorial relay chains at 600 km where mutual visibility
//! ends near 48 degrees of separation.

use orbnet::antenna::{Antenna, AntennaKind};
use orbnet::clock::SimulationClock;
use orbnet::earth::Geodetic;
use orbnet::modem::Modem;
use orbnet::node::Node;
use orbnet::platform::{GroundPlatform, Platform};
use orbnet::processor::TemplateProcessor;
use orbnet::scheduler::{Scheduler, SchedulerConfig};
use orbnet::subsystems::{Battery, CommSubsystem, PowerSubsystem, SensingSubsystem};
use orbnet::sensor::Sensor;
use orbnet::sun::Sun;

const RELAY_ALTITUDE_M: f64 = 600_000.0;

fn relay_node(index: u16, constellation: u16, lon_deg: f64, clock: &SimulationClock) -> Node {
    let platform = Platform::Ground(GroundPlatform::new(
        format!("R{}", index),
        Geodetic::new(0.0, lon_deg.to_radians(), RELAY_ALTITUDE_M),
    ));
    let comm = CommSubsystem::new(Antenna::isotropic(30.0), Modem::uhf_deploy());
    let sensing = SensingSubsystem::new(
        Antenna::new(AntennaKind::Helical, 30.0, 0.0, 0.0, 0.0),
        Sensor::rain_radar(50),
    );
    let power = PowerSubsystem::new(Battery::new(0.9333, 6.0, 12.9, 85.0), Vec::new(), 6.2425);
    Node::new(
        format!("R{}", index),
        index,
        constellation,
        platform,
        comm,
        sensing,
        power,
        Box::new(TemplateProcessor),
        clock,
    )
}

fn relay_chain(longitudes_deg: &[f64], clock: &SimulationClock) -> Vec<Node> {
    longitudes_deg
        .iter()
        .enumerate()
        .map(|(index, &lon)| relay_node(index as u16, 0, lon, clock))
        .collect()
}

fn scheduler() -> Scheduler {
    Scheduler::new(SchedulerConfig::default())
}

#[test]
fn route_search_prefers_the_shorter_of_two_routes() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    sun.update(&clock, 0);
    // 0 and 3 are the endpoints. Both a three-hop chain (0-1-2-3) and a
    // four-hop chain through 4 (0-4-1-2-3) fit inside the deadline; the
    // height shrink must emit the three-hop route.
    let mut nodes = relay_chain(&[0.0, 40.0, 80.0, 120.0, 20.0], &clock);
    let route = scheduler().find_route(&mut nodes, &clock, &sun, 0, 3, 4, 1500);
    let hops: Vec<u16> = route.iter().map(|transfer| transfer.node).collect();
    assert_eq!(hops, vec![1, 2, 3]);
}

#[test]
fn route_transfer_times_step_by_the_contact_duration() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    sun.update(&clock, 0);
    let mut nodes = relay_chain(&[0.0, 40.0, 80.0, 120.0, 20.0], &clock);
    let contact_s = 4;
    let limit_s = 1500;
    let route = scheduler().find_route(&mut nodes, &clock, &sun, 0, 3, contact_s, limit_s);
    assert!(!route.is_empty());
    for pair in route.windows(2) {
        assert!(pair[1].start_s >= pair[0].start_s + contact_s);
    }
    let last = route.last().unwrap();
    assert!(last.start_s + contact_s <= clock.elapsed_s() + limit_s);
}

#[test]
fn route_search_restores_every_node_state() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    sun.update(&clock, 0);
    let mut nodes = relay_chain(&[0.0, 40.0, 80.0, 120.0, 20.0], &clock);
    let before: Vec<_> = nodes
        .iter()
        .map(|node| (*node.state().position_m(), *node.state().velocity_m_per_s()))
        .collect();
    scheduler().find_route(&mut nodes, &clock, &sun, 0, 3, 4, 1500);
    for (node, (position, velocity)) in nodes.iter().zip(before) {
        assert_eq!(*node.state().position_m(), position);
        assert_eq!(*node.state().velocity_m_per_s(), velocity);
    }
}

#[test]
fn unreachable_destination_yields_an_empty_route() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    sun.update(&clock, 0);
    // The far node sits beyond every relay's horizon.
    let mut nodes = relay_chain(&[0.0, 40.0, 180.0], &clock);
    let route = scheduler().find_route(&mut nodes, &clock, &sun, 0, 2, 4, 1500);
    assert!(route.is_empty());
}

#[test]
fn deadline_shorter_than_the_contact_yields_an_empty_route() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    sun.update(&clock, 0);
    let mut nodes = relay_chain(&[0.0, 40.0], &clock);
    let route = scheduler().find_route(&mut nodes, &clock, &sun, 0, 1, 10, 5);
    assert!(route.is_empty());
}

#[test]
fn no_visitor_before_the_cutoff_returns_none_and_restores_offsets() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    sun.update(&clock, 0);
    // One sink whose nadir boresight stays near longitude zero; the
    // destination is the geographic antipode.
    let mut nodes = vec![relay_node(0, 1, 0.0, &clock)];
    let before = (*nodes[0].state().position_m(), *nodes[0].state().velocity_m_per_s());
    let antipode = Geodetic::new(0.0, std::f64::consts::PI, 0.0);
    let visitor = scheduler().next_visitor(&mut nodes, &clock, &sun, &[antipode], 1);
    assert!(visitor.is_none());
    assert_eq!(*nodes[0].state().position_m(), before.0);
    assert_eq!(*nodes[0].state().velocity_m_per_s(), before.1);
}

#[test]
fn overflown_destination_is_found_with_its_offset() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut sun = Sun::new();
    sun.update(&clock, 0);
    // A fixed sink stares straight down forever, so its boresight ground
    // point is its own sub-point at every offset; the destination is that
    // sub-point. The earliest probed offset must win.
    let mut nodes = vec![relay_node(0, 1, 10.0, &clock)];
    let destination = Geodetic::new(0.0, 10.0_f64.to_radians(), 0.0);
    let visitor = scheduler().next_visitor(&mut nodes, &clock, &sun, &[destination], 1);
    let (node, offset_s) = visitor.expect("the staring sink always sees its sub-point");
    assert_eq!(node, 0);
    assert_eq!(offset_s, 300);
}
