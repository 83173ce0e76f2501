use enocean_gateway::{Capability, Device, Dongle, DongleState, EepResolver, ValueChange};
use enocean_transport::{
    MockCommunicator, Packet, PacketKind, RadioFrame, ResponseFrame, ReturnCode,
};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

const SENDER: [u8; 4] = [0x01, 0x02, 0x03, 0x04];
const WAIT: Duration = Duration::from_secs(2);

fn running() -> anyhow::Result<(Arc<MockCommunicator>, Arc<Dongle>)> {
    let mock = Arc::new(MockCommunicator::new("mock0", [0xFF, 0x80, 0x00, 0x00]));
    let dongle = Dongle::connect(mock.clone(), Arc::new(EepResolver))?;
    assert_eq!(dongle.state(), DongleState::Running);
    Ok((mock, dongle))
}

fn listen(
    dongle: &Arc<Dongle>,
    label: &str,
    capability: Capability,
) -> anyhow::Result<(Device, Receiver<ValueChange>)> {
    let (tx, rx) = mpsc::channel();
    let tx = std::sync::Mutex::new(tx);
    let dev = Device::register(
        dongle,
        label,
        capability,
        &SENDER,
        Arc::new(move |change: ValueChange| {
            if let Ok(tx) = tx.lock() {
                let _ = tx.send(change);
            }
        }),
    )?;
    Ok((dev, rx))
}

fn radio(data: &[u8]) -> anyhow::Result<Packet> {
    radio_with_status(data, 0x00)
}

fn radio_with_status(data: &[u8], status: u8) -> anyhow::Result<Packet> {
    let mut full = data.to_vec();
    full.extend_from_slice(&SENDER);
    full.push(status);
    Ok(Packet::Radio(RadioFrame::from_erp1(full, vec![])?))
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn switch_status_reaches_matching_channel_only() -> anyhow::Result<()> {
    let (mock, dongle) = running()?;
    let (_five, rx5) = listen(&dongle, "relay_ch5", Capability::Switch { channel: 5 })?;
    let (_six, rx6) = listen(&dongle, "relay_ch6", Capability::Switch { channel: 6 })?;

    // data[2] = 0x65 -> channel 5, data[3] = 0xE4 -> on
    mock.inject(radio(&[0xD1, 0x04, 0x65, 0xE4])?);

    assert_eq!(rx5.recv_timeout(WAIT)?, ValueChange::new(Some(1)));
    assert!(rx6.recv_timeout(Duration::from_millis(200)).is_err());
    Ok(())
}

#[test]
fn power_event_fans_out() -> anyhow::Result<()> {
    let (mock, dongle) = running()?;
    let (_meter, meter_rx) = listen(&dongle, "meter", Capability::PowerSensor)?;
    let (_relay, relay_rx) = listen(&dongle, "relay", Capability::Switch { channel: 0 })?;

    // data[4] = 0x0C, value = 0x0F + (0x00 << 8) = 15
    mock.inject(radio(&[0xA5, 0x00, 0x00, 0x0F, 0x0C])?);

    assert_eq!(meter_rx.recv_timeout(WAIT)?, ValueChange::new(Some(15)));
    assert_eq!(relay_rx.recv_timeout(WAIT)?, ValueChange::new(Some(1)));
    Ok(())
}

#[test]
fn duplicate_registrations_both_fire() -> anyhow::Result<()> {
    let (mock, dongle) = running()?;
    let (_a, rx_a) = listen(&dongle, "dimmer_a", Capability::Dimmer)?;
    let (_b, rx_b) = listen(&dongle, "dimmer_b", Capability::Dimmer)?;

    mock.inject(radio(&[0xA5, 0x02, 0x40, 0x01, 0x09])?);

    assert_eq!(rx_a.recv_timeout(WAIT)?, ValueChange::new(Some(0x40)));
    assert_eq!(rx_b.recv_timeout(WAIT)?, ValueChange::new(Some(0x40)));
    Ok(())
}

#[test]
fn base_address_follows_successful_four_byte_response() -> anyhow::Result<()> {
    let (mock, dongle) = running()?;
    let (early, _rx) = listen(&dongle, "early", Capability::Cover)?;

    mock.inject(Packet::Response(ResponseFrame {
        kind: PacketKind::Response,
        status: ReturnCode::Ok,
        response_data: vec![0xFF, 0x80, 0x00, 0x02],
    }));
    assert!(wait_until(|| dongle.base_address() == [0xFF, 0x80, 0x00, 0x02]));
    // devices keep the address they saw at registration
    assert_eq!(early.base_address(), [0xFF, 0x80, 0x00, 0x00]);

    mock.inject(Packet::Response(ResponseFrame {
        kind: PacketKind::Response,
        status: ReturnCode::Ok,
        response_data: vec![0x11, 0x22],
    }));
    mock.inject(Packet::Response(ResponseFrame {
        kind: PacketKind::Response,
        status: ReturnCode::Error,
        response_data: vec![0x11, 0x22, 0x33, 0x44],
    }));
    assert!(wait_until(|| dongle.metrics().gw.rx_packets.get() >= 3));
    assert_eq!(dongle.base_address(), [0xFF, 0x80, 0x00, 0x02]);
    Ok(())
}

#[test]
fn handler_can_send_while_dispatching() -> anyhow::Result<()> {
    let (mock, dongle) = running()?;
    let slot: Arc<OnceLock<Device>> = Arc::new(OnceLock::new());
    let inner = Arc::clone(&slot);
    let dev = Device::register(
        &dongle,
        "echo_rocker",
        Capability::Listener,
        &SENDER,
        Arc::new(move |change: ValueChange| {
            if let (Some(dev), Some(value)) = (inner.get(), change.value) {
                let level = u8::try_from(value).unwrap_or(0);
                let _ = dev.send_command(vec![0xF6, level], vec![], PacketKind::RadioErp1);
            }
        }),
    )?;
    let _ = slot.set(dev);

    // rocker pressed: status 0x30 lands at data[6]
    mock.inject(radio_with_status(&[0xF6, 0x50], 0x30)?);
    assert!(wait_until(|| !mock.sent().is_empty()));
    assert_eq!(mock.sent()[0].data, vec![0xF6, 0x01]);
    Ok(())
}

#[test]
fn profile_failure_drops_only_that_frame() -> anyhow::Result<()> {
    let (mock, dongle) = running()?;
    let (_blind, rx) = listen(&dongle, "blind", Capability::Cover)?;

    // VLD with an empty payload cannot be decoded
    mock.inject(radio(&[0xD2])?);
    mock.inject(radio(&[0xD2, 0x2A, 0x00, 0x00, 0x04])?);

    assert_eq!(rx.recv_timeout(WAIT)?, ValueChange::new(Some(42)));
    assert_eq!(dongle.metrics().gw.frames_dropped.get(), 1);
    Ok(())
}
