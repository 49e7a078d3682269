//! Forward and return packet addressing: relays re-queue toward the next
//! hop, endpoints fulfil the packet locally.

use orbnet::antenna::{Antenna, AntennaKind};
use orbnet::clock::SimulationClock;
use orbnet::earth::Geodetic;
use orbnet::modem::Modem;
use orbnet::node::Node;
use orbnet::packet::{route_from_hops, ForwardPacket, ReturnPacket, SensingEvent};
use orbnet::platform::{GroundPlatform, Platform};
use orbnet::processor::TemplateProcessor;
use orbnet::sensor::Sensor;
use orbnet::subsystems::{Battery, CommSubsystem, PowerSubsystem, SensingSubsystem};

fn node(index: u16, clock: &SimulationClock) -> Node {
    let platform = Platform::Ground(GroundPlatform::new(
        format!("N{}", index),
        Geodetic::new(0.0, f64::from(index) * 0.2, 500_000.0),
    ));
    let comm = CommSubsystem::new(Antenna::isotropic(30.0), Modem::uhf_deploy());
    let sensing = SensingSubsystem::new(
        Antenna::new(AntennaKind::Helical, 30.0, 0.0, 0.0, 0.0),
        Sensor::cloud_radar(300),
    );
    let power = PowerSubsystem::new(Battery::new(0.9333, 6.0, 12.9, 85.0), Vec::new(), 6.2425);
    Node::new(
        format!("N{}", index),
        index,
        0,
        platform,
        comm,
        sensing,
        power,
        Box::new(TemplateProcessor),
        clock,
    )
}

fn forward_packet() -> ForwardPacket {
    ForwardPacket::new(
        route_from_hops(&[(0, 0), (1, 100), (2, 200)]).unwrap(),
        SensingEvent {
            target: 3,
            elapsed_s: 500,
        },
        0,
    )
}

#[test]
fn relay_requeues_toward_the_next_hop() {
    let mut clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    clock.tick(120);
    let mut relay = node(1, &clock);
    relay.set_comm_buffer(forward_packet().encode());
    relay.address_comm_buffer(&clock).unwrap();
    // Node 1 sits mid-route: the packet is re-queued toward hop (2, 200).
    let outbox = relay.comm().outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].recipient, 2);
    assert_eq!(outbox[0].earliest_s, 200);
    assert!(relay.comm().data_buffer().is_empty());

    // The event matures strictly after 200 s and re-emits the packet.
    clock.tick(81);
    let target = relay.comm_mut().poll_outbox(&clock);
    assert_eq!(target, Some(2));
    assert_eq!(relay.comm().data_buffer(), forward_packet().encode());
}

#[test]
fn final_hop_schedules_the_measurement() {
    let mut clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    clock.tick(210);
    let mut visitor = node(2, &clock);
    visitor.set_comm_buffer(forward_packet().encode());
    visitor.address_comm_buffer(&clock).unwrap();
    // Node 2 is the last hop: it schedules the measurement at the event
    // time with the feedback origin as informer.
    assert_eq!(visitor.measurements(), &[(500, 0)]);
    assert_eq!(visitor.comm().outbox_len(), 0);
}

#[test]
fn off_route_node_requeues_toward_the_first_hop() {
    let mut clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    clock.tick(10);
    let mut stray = node(7, &clock);
    stray.set_comm_buffer(forward_packet().encode());
    stray.address_comm_buffer(&clock).unwrap();
    let outbox = stray.comm().outbox();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].recipient, 0);
    assert_eq!(outbox[0].earliest_s, 0);
}

#[test]
fn return_packet_relays_and_terminates() {
    let mut clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    clock.tick(50);
    let packet = ReturnPacket::new(route_from_hops(&[(1, 40), (0, 90)]).unwrap(), true, 1);

    let mut relay = node(1, &clock);
    relay.set_comm_buffer(packet.encode());
    relay.address_comm_buffer(&clock).unwrap();
    let feedback_outbox = relay.comm().feedback_outbox();
    assert_eq!(feedback_outbox.len(), 1);
    assert_eq!(feedback_outbox[0].recipient, 0);
    assert_eq!(feedback_outbox[0].earliest_s, 90);

    // The origin consumes the packet without re-queueing anything.
    let mut origin = node(0, &clock);
    origin.set_comm_buffer(packet.encode());
    origin.address_comm_buffer(&clock).unwrap();
    assert_eq!(origin.comm().outbox_len(), 0);
    assert!(origin.comm().data_buffer().is_empty());
}

#[test]
fn unrecognised_buffer_length_is_a_typed_error() {
    let clock = SimulationClock::from_ymd_hms(2020, 7, 13, 0, 0, 0).unwrap();
    let mut stray = node(0, &clock);
    stray.set_comm_buffer(vec![0u8; 100]);
    assert!(stray.address_comm_buffer(&clock).is_err());
}
