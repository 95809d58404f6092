mod common;

use std::net::{TcpListener, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{
    answer_all, canned_payload, frame, read_request, FakeFc, Reply, Script, SharedDisplay,
};
use mspview_frame::command::{
    ANALOG, API_VERSION, BOARD_INFO, BUILD_INFO, DEBUGMSG, FC_VARIANT, FC_VERSION, IDENT,
    INAV_ANALOG, INAV_STATUS, MISC2, NAME, RAW_GPS, WP_GETINFO,
};
use mspview_frame::MspVersion;
use mspview_session::{
    Field, Outcome, Phase, SessionConfig, SessionError, Supervisor, TelemetryPoller,
};
use mspview_transport::DeviceDescriptor;

const STARTUP: [u16; 8] = [
    IDENT,
    NAME,
    API_VERSION,
    FC_VARIANT,
    FC_VERSION,
    BUILD_INFO,
    BOARD_INFO,
    WP_GETINFO,
];

fn no_ports() -> Option<String> {
    None
}

fn fast_config(version: MspVersion) -> SessionConfig {
    SessionConfig {
        version,
        backoff: Duration::from_millis(50),
        once: true,
        ..SessionConfig::default()
    }
}

fn supervisor(
    address: &str,
    config: SessionConfig,
    display: &SharedDisplay,
) -> Supervisor<TelemetryPoller<SharedDisplay>, fn() -> Option<String>> {
    let poller = TelemetryPoller::new(config.version, display.clone());
    Supervisor::new(
        DeviceDescriptor::parse(address),
        config,
        poller,
        no_ports as fn() -> Option<String>,
    )
}

fn commands(requests: &[(MspVersion, u16)]) -> Vec<u16> {
    requests.iter().map(|(_, command)| *command).collect()
}

#[test]
fn once_runs_startup_and_one_v2_cycle() {
    let fc = FakeFc::spawn(vec![answer_all()]);
    let port = fc.port;
    let display = SharedDisplay::default();
    let mut sup = supervisor(&fc.address(), fast_config(MspVersion::V2), &display);

    assert_eq!(sup.run().unwrap(), Outcome::Completed);
    assert_eq!(sup.phase(), Phase::Disconnected);

    let log = fc.join();
    assert_eq!(log.len(), 1);
    let mut expected = STARTUP.to_vec();
    expected.extend([MISC2, INAV_STATUS, INAV_ANALOG, RAW_GPS]);
    assert_eq!(commands(&log[0]), expected);
    assert!(log[0].iter().all(|(version, _)| *version == MspVersion::V2));

    assert_eq!(display.value(Field::Name).as_deref(), Some("\"testquad\""));
    assert_eq!(display.value(Field::Board).as_deref(), Some("MATEKF405"));
    assert_eq!(
        display.value(Field::Build).as_deref(),
        Some("Jan 01 2024 12:34:56 (abc1234)")
    );
    assert_eq!(
        display.value(Field::Arming).as_deref(),
        Some("Not level (0x100)")
    );
    assert!(display.value(Field::Gps).unwrap().starts_with("fix 2, sats 12"));
    assert!(display
        .value(Field::Rate)
        .unwrap()
        .starts_with("12 messages in "));
    assert_eq!(display.events(), vec![format!("connected 127.0.0.1:{port}")]);
}

#[test]
fn legacy_session_polls_in_v1_frames() {
    let fc = FakeFc::spawn(vec![answer_all()]);
    let display = SharedDisplay::default();
    let mut sup = supervisor(&fc.address(), fast_config(MspVersion::V1), &display);

    assert_eq!(sup.run().unwrap(), Outcome::Completed);

    let log = fc.join();
    let mut expected = STARTUP.to_vec();
    expected.extend([ANALOG, RAW_GPS]);
    assert_eq!(commands(&log[0]), expected);
    assert!(log[0].iter().all(|(version, _)| *version == MspVersion::V1));
    assert_eq!(
        display.value(Field::Ident).as_deref(),
        Some("231 (msp protocol v1)")
    );
    assert_eq!(
        display.value(Field::Power).as_deref(),
        Some("v: 12.6, psum: 12, amps: 1.53, rssi: 1000")
    );
}

#[test]
fn reconnects_after_peer_hangs_up() {
    let mut answered = answer_all();
    let flaky: Script = Box::new(move |version, command| {
        if command == NAME {
            Reply::Hangup
        } else {
            answered(version, command)
        }
    });
    let fc = FakeFc::spawn(vec![flaky, answer_all()]);
    let display = SharedDisplay::default();
    let mut sup = supervisor(&fc.address(), fast_config(MspVersion::V2), &display);

    assert_eq!(sup.run().unwrap(), Outcome::Completed);

    let log = fc.join();
    assert_eq!(log.len(), 2);
    assert_eq!(commands(&log[0]), vec![IDENT, NAME]);
    assert_eq!(commands(&log[1])[0], IDENT);
    assert_eq!(*commands(&log[1]).last().unwrap(), RAW_GPS);

    let events = display.events();
    assert_eq!(events.len(), 3);
    assert!(events[0].starts_with("connected"));
    assert_eq!(events[1], "disconnected link failed");
    assert!(events[2].starts_with("connected"));
}

#[test]
fn unanswered_request_is_sent_again() {
    let mut ignored_once = false;
    let mut answered = answer_all();
    let shy: Script = Box::new(move |version, command| {
        if command == IDENT && !ignored_once {
            ignored_once = true;
            Reply::Ignore
        } else {
            answered(version, command)
        }
    });
    let fc = FakeFc::spawn(vec![shy]);
    let display = SharedDisplay::default();
    let config = SessionConfig {
        response_timeout: Duration::from_millis(200),
        ..fast_config(MspVersion::V2)
    };
    let mut sup = supervisor(&fc.address(), config, &display);

    assert_eq!(sup.run().unwrap(), Outcome::Completed);

    let log = fc.join();
    let seen = commands(&log[0]);
    assert_eq!(&seen[..3], &[IDENT, IDENT, NAME]);
}

#[test]
fn corrupt_and_unsolicited_frames_do_not_stall_the_cadence() {
    let mut answered = answer_all();
    let noisy: Script = Box::new(move |version, command| match command {
        IDENT => {
            let mut bytes = frame(version, DEBUGMSG, b"booting\0");
            bytes.extend(frame(version, IDENT, &canned_payload(IDENT)));
            Reply::Bytes(bytes)
        }
        NAME => {
            let mut bytes = frame(version, NAME, b"testquad");
            let last = bytes.len() - 1;
            bytes[last] ^= 0x5a;
            Reply::Bytes(bytes)
        }
        _ => answered(version, command),
    });
    let fc = FakeFc::spawn(vec![noisy]);
    let display = SharedDisplay::default();
    let mut sup = supervisor(&fc.address(), fast_config(MspVersion::V2), &display);

    assert_eq!(sup.run().unwrap(), Outcome::Completed);
    fc.join();

    assert_eq!(display.value(Field::Debug).as_deref(), Some("booting"));
    assert_eq!(display.value(Field::Name).as_deref(), Some("n/a"));
    assert!(display.value(Field::Rate).is_some());
}

#[test]
fn polls_over_udp() {
    let fc = UdpSocket::bind("127.0.0.1:0").unwrap();
    let port = fc.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let mut buf = [0u8; 512];
        loop {
            let (n, peer) = fc.recv_from(&mut buf).unwrap();
            let (version, command) = read_request(&mut &buf[..n]).unwrap();
            let reply = frame(version, command, &canned_payload(command));
            fc.send_to(&reply, peer).unwrap();
            if command == RAW_GPS {
                break;
            }
        }
    });

    let display = SharedDisplay::default();
    let mut sup = supervisor(
        &format!("udp://127.0.0.1:{port}"),
        fast_config(MspVersion::V2),
        &display,
    );
    assert_eq!(sup.run().unwrap(), Outcome::Completed);
    server.join().unwrap();
    assert!(display.value(Field::Gps).is_some());
}

#[test]
fn open_failures_retry_until_stopped() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let display = SharedDisplay::default();
    let config = SessionConfig {
        once: false,
        ..fast_config(MspVersion::V2)
    };
    let mut sup = supervisor(&format!("tcp://127.0.0.1:{port}"), config, &display);

    let running = sup.running_flag();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(400));
        running.store(false, Ordering::Release);
    });

    assert_eq!(sup.run().unwrap(), Outcome::Stopped);
    stopper.join().unwrap();

    let events = display.events();
    assert!(events.len() >= 2, "expected repeated attempts: {events:?}");
    assert!(events.iter().all(|e| e.starts_with("disconnected")));
}

#[test]
fn auto_without_candidates_waits_for_a_port() {
    let display = SharedDisplay::default();
    let running = Arc::new(AtomicBool::new(true));
    let mut sup = supervisor("auto", fast_config(MspVersion::V2), &display)
        .with_running_flag(Arc::clone(&running));

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        running.store(false, Ordering::Release);
    });

    assert_eq!(sup.run().unwrap(), Outcome::Stopped);
    stopper.join().unwrap();
    let events = display.events();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e == "disconnected no candidate port"));
}

#[test]
fn misconfiguration_is_fatal() {
    let display = SharedDisplay::default();

    let mut sup = supervisor("ftp://example", fast_config(MspVersion::V2), &display);
    assert!(matches!(sup.run(), Err(SessionError::InvalidDescriptor(_))));

    let mut sup = supervisor("00:11:22:33:44:55", fast_config(MspVersion::V2), &display);
    assert!(matches!(sup.run(), Err(SessionError::Unsupported(_))));

    assert!(display.events().is_empty());
}
