//! End-to-end scenarios over real sockets: bind handshake, submit_sm with
//! delivery receipt, HTTP-injected MT deliveries, and session teardown.

use std::sync::Arc;
use std::time::Duration;

use smsc3::config::Config;
use smsc3::connection::{self, FrameReader, FrameWriter};
use smsc3::datatypes::{
    Bind, BindKind, CommandStatus, DeliverSm, DeliverSmResponse, EnquireLink, InterfaceVersion,
    NumericPlanIndicator, SubmitSm, TypeOfNumber, Unbind, UnbindResponse, tags,
};
use smsc3::frame::Frame;
use smsc3::http::HttpServer;
use smsc3::registry::Registry;
use smsc3::server::SmppServer;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn test_config(username: &str, password: &str) -> Config {
    Config {
        smpp_addr: "127.0.0.1:0".parse().unwrap(),
        http_addr: "127.0.0.1:0".parse().unwrap(),
        system_id: "smsc3".into(),
        username: username.into(),
        password: password.into(),
    }
}

async fn start_smpp(username: &str, password: &str) -> (std::net::SocketAddr, Arc<Registry>) {
    let registry = Arc::new(Registry::new());
    let server = SmppServer::bind(&test_config(username, password), Arc::clone(&registry))
        .await
        .expect("bind smpp listener");
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    (addr, registry)
}

async fn connect(addr: std::net::SocketAddr) -> (FrameReader, FrameWriter) {
    let socket = TcpStream::connect(addr).await.expect("connect");
    connection::split(socket)
}

fn bind_frame(system_id: &str, password: &str, sequence: u32) -> Frame {
    Frame::Bind(Bind {
        kind: BindKind::Transceiver,
        sequence_number: sequence,
        system_id: system_id.into(),
        password: Some(password.into()),
        system_type: String::new(),
        interface_version: InterfaceVersion::SmppV34,
        addr_ton: TypeOfNumber::Unknown,
        addr_npi: NumericPlanIndicator::Unknown,
        address_range: String::new(),
    })
}

async fn read(reader: &mut FrameReader) -> Frame {
    timeout(WAIT, reader.read_frame())
        .await
        .expect("read timed out")
        .expect("read failed")
        .expect("stream closed")
}

/// Connects and completes the bind handshake.
async fn bind(addr: std::net::SocketAddr, system_id: &str, password: &str) -> (FrameReader, FrameWriter) {
    let (mut reader, mut writer) = connect(addr).await;
    writer
        .write_frame(&bind_frame(system_id, password, 1))
        .await
        .unwrap();

    match read(&mut reader).await {
        Frame::BindResp(resp) => {
            assert_eq!(resp.command_status, CommandStatus::Ok);
            assert_eq!(resp.sequence_number, 1);
            assert_eq!(resp.system_id, "smsc3");
            let tlv = resp.sc_interface_version.expect("sc_interface_version TLV");
            assert_eq!(tlv.tag, tags::SC_INTERFACE_VERSION);
            assert_eq!(tlv.value.as_ref(), &[0x34]);
        }
        other => panic!("expected bind_resp, got {other}"),
    }

    (reader, writer)
}

fn submit_frame(sequence: u32, registered_delivery: u8) -> Frame {
    Frame::SubmitSm(Box::new(SubmitSm {
        sequence_number: sequence,
        service_type: String::new(),
        source_addr_ton: TypeOfNumber::International,
        source_addr_npi: NumericPlanIndicator::Isdn,
        source_addr: "+33111".into(),
        dest_addr_ton: TypeOfNumber::International,
        dest_addr_npi: NumericPlanIndicator::Isdn,
        destination_addr: "+33222".into(),
        esm_class: 0,
        protocol_id: 0,
        priority_flag: 0,
        schedule_delivery_time: String::new(),
        validity_period: String::new(),
        registered_delivery,
        replace_if_present_flag: 0,
        data_coding: 0,
        sm_default_msg_id: 0,
        short_message: Bytes::from_static(b"Hello World"),
        tlvs: Vec::new(),
    }))
}

#[tokio::test]
async fn bind_transceiver_and_heartbeat() {
    let (addr, _registry) = start_smpp("kannel", "pw").await;
    let (mut reader, mut writer) = bind(addr, "kannel", "pw").await;

    writer
        .write_frame(&Frame::EnquireLink(EnquireLink::new(9)))
        .await
        .unwrap();

    match read(&mut reader).await {
        Frame::EnquireLinkResp(resp) => assert_eq!(resp.sequence_number, 9),
        other => panic!("expected enquire_link_resp, got {other}"),
    }
}

#[tokio::test]
async fn bind_with_wrong_password_is_rejected() {
    let (addr, registry) = start_smpp("kannel", "pw").await;
    let (mut reader, mut writer) = connect(addr).await;

    writer
        .write_frame(&bind_frame("kannel", "nope", 1))
        .await
        .unwrap();

    match read(&mut reader).await {
        Frame::BindResp(resp) => {
            assert_eq!(resp.command_status, CommandStatus::InvalidPassword);
            assert_eq!(resp.sequence_number, 1);
        }
        other => panic!("expected bind_resp, got {other}"),
    }

    // The server closes the connection and never registers the session.
    let eof = timeout(WAIT, reader.read_frame()).await.expect("read timed out");
    assert!(matches!(eof, Ok(None)));
    assert!(registry.get("kannel").is_none());
}

#[tokio::test]
async fn first_pdu_must_be_a_bind() {
    let (addr, _registry) = start_smpp("", "").await;
    let (mut reader, mut writer) = connect(addr).await;

    writer
        .write_frame(&Frame::EnquireLink(EnquireLink::new(1)))
        .await
        .unwrap();

    let eof = timeout(WAIT, reader.read_frame()).await.expect("read timed out");
    assert!(matches!(eof, Ok(None)));
}

#[tokio::test]
async fn submit_sm_gets_response_and_delivery_receipt() {
    let (addr, _registry) = start_smpp("kannel", "pw").await;
    let (mut reader, mut writer) = bind(addr, "kannel", "pw").await;

    writer.write_frame(&submit_frame(2, 0x01)).await.unwrap();

    let message_id = match read(&mut reader).await {
        Frame::SubmitSmResp(resp) => {
            assert_eq!(resp.command_status, CommandStatus::Ok);
            assert_eq!(resp.sequence_number, 2);
            assert!(!resp.message_id.is_empty());
            resp.message_id
        }
        other => panic!("expected submit_sm_resp, got {other}"),
    };

    // The DELIVRD receipt arrives about a second later.
    match read(&mut reader).await {
        Frame::DeliverSm(dlr) => {
            assert_eq!(dlr.source_addr, "+33222");
            assert_eq!(dlr.destination_addr, "+33111");
            assert_eq!(dlr.source_addr_ton, TypeOfNumber::International);
            assert_eq!(dlr.esm_class, 0b0000_0100);

            let text = String::from_utf8(dlr.short_message.to_vec()).unwrap();
            assert!(text.starts_with(&format!("id:{message_id} sub:001 dlvrd:001")));
            assert!(text.contains("stat:DELIVRD"));
            assert!(text.ends_with("err:000"));

            let receipted = dlr
                .tlvs
                .iter()
                .find(|tlv| tlv.tag == tags::RECEIPTED_MESSAGE_ID)
                .expect("receipted_message_id TLV");
            assert_eq!(receipted.as_cstring(), Some(message_id.as_str()));

            writer
                .write_frame(&Frame::DeliverSmResp(DeliverSmResponse::new(
                    dlr.sequence_number,
                )))
                .await
                .unwrap();
        }
        other => panic!("expected deliver_sm receipt, got {other}"),
    }
}

#[tokio::test]
async fn submit_sm_without_registered_delivery_gets_no_receipt() {
    let (addr, _registry) = start_smpp("kannel", "pw").await;
    let (mut reader, mut writer) = bind(addr, "kannel", "pw").await;

    writer.write_frame(&submit_frame(2, 0x00)).await.unwrap();

    match read(&mut reader).await {
        Frame::SubmitSmResp(_) => {}
        other => panic!("expected submit_sm_resp, got {other}"),
    }

    // No DLR should follow; give it clearly longer than the DLR delay.
    let extra = timeout(Duration::from_millis(2500), reader.read_frame()).await;
    assert!(extra.is_err(), "no further PDU expected, got {extra:?}");
}

#[tokio::test]
async fn unsupported_command_gets_generic_nack() {
    let (addr, _registry) = start_smpp("kannel", "pw").await;
    let (mut reader, mut writer) = bind(addr, "kannel", "pw").await;

    // query_sm is not implemented by this SMSC.
    writer
        .write_frame(&Frame::Unknown {
            command_id: 0x0000_0003,
            sequence_number: 11,
        })
        .await
        .unwrap();

    match read(&mut reader).await {
        Frame::GenericNack(nack) => {
            assert_eq!(nack.command_status, CommandStatus::InvalidCommandId);
            assert_eq!(nack.sequence_number, 11);
        }
        other => panic!("expected generic_nack, got {other}"),
    }
}

#[tokio::test]
async fn unbind_closes_the_session() {
    let (addr, registry) = start_smpp("kannel", "pw").await;
    let (mut reader, mut writer) = bind(addr, "kannel", "pw").await;
    assert!(registry.get("kannel").is_some());

    writer
        .write_frame(&Frame::Unbind(Unbind::new(12)))
        .await
        .unwrap();

    match read(&mut reader).await {
        Frame::UnbindResp(resp) => {
            assert_eq!(resp.command_status, CommandStatus::Ok);
            assert_eq!(resp.sequence_number, 12);
        }
        other => panic!("expected unbind_resp, got {other}"),
    }

    let eof = timeout(WAIT, reader.read_frame()).await.expect("read timed out");
    assert!(matches!(eof, Ok(None)));

    // The listen loop unregisters on exit.
    timeout(WAIT, async {
        while registry.get("kannel").is_some() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("session still registered");
}

#[tokio::test]
async fn registry_stop_unbinds_sessions() {
    let (addr, registry) = start_smpp("kannel", "pw").await;
    let (mut reader, mut writer) = bind(addr, "kannel", "pw").await;

    let stopper = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.stop().await })
    };

    match read(&mut reader).await {
        Frame::Unbind(unbind) => {
            writer
                .write_frame(&Frame::UnbindResp(UnbindResponse::new(unbind.sequence_number)))
                .await
                .unwrap();
        }
        other => panic!("expected unbind, got {other}"),
    }

    timeout(WAIT, stopper).await.expect("stop timed out").unwrap();
}

/// Spawns an ESME task that acknowledges every deliver_sm and forwards it
/// for assertions.
fn spawn_responder(
    mut reader: FrameReader,
    mut writer: FrameWriter,
) -> tokio::sync::mpsc::UnboundedReceiver<DeliverSm> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok(Some(frame)) = reader.read_frame().await {
            if let Frame::DeliverSm(pdu) = frame {
                writer
                    .write_frame(&Frame::DeliverSmResp(DeliverSmResponse::new(
                        pdu.sequence_number,
                    )))
                    .await
                    .ok();
                if tx.send(*pdu).is_err() {
                    break;
                }
            }
        }
    });
    rx
}

async fn start_http(registry: Arc<Registry>) -> std::net::SocketAddr {
    let server = HttpServer::bind(&test_config("", ""), registry)
        .await
        .expect("bind http listener");
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

#[tokio::test]
async fn http_delivery_reaches_the_bound_session() {
    let (addr, registry) = start_smpp("kannel", "pw").await;
    let http_addr = start_http(Arc::clone(&registry)).await;

    let (reader, writer) = bind(addr, "kannel", "pw").await;
    let mut deliveries = spawn_responder(reader, writer);

    let response = reqwest::Client::new()
        .post(format!("http://{http_addr}/deliver"))
        .json(&serde_json::json!({
            "session": "kannel",
            "from": "SHOP",
            "to": "+33600000001",
            "message": "Hi",
        }))
        .send()
        .await
        .expect("http request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], 200);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("OK "), "{message}");

    let delivered = timeout(WAIT, deliveries.recv())
        .await
        .expect("no deliver_sm")
        .unwrap();
    assert_eq!(delivered.source_addr, "SHOP");
    assert_eq!(delivered.source_addr_ton, TypeOfNumber::Alphanumeric);
    assert_eq!(delivered.destination_addr, "+33600000001");
    assert_eq!(delivered.dest_addr_ton, TypeOfNumber::International);
    assert_eq!(delivered.dest_addr_npi, NumericPlanIndicator::Isdn);
    assert_eq!(delivered.service_type, "kannel");
    assert_eq!(delivered.data_coding, 0x00);
    assert_eq!(delivered.short_message.as_ref(), b"Hi");
    assert!(
        delivered
            .tlvs
            .iter()
            .any(|tlv| tlv.tag == tags::RECEIPTED_MESSAGE_ID)
    );
}

#[tokio::test]
async fn http_delivery_validates_input() {
    let (_addr, registry) = start_smpp("", "").await;
    let http_addr = start_http(Arc::clone(&registry)).await;
    let client = reqwest::Client::new();

    // Unknown session.
    let response = client
        .post(format!("http://{http_addr}/deliver"))
        .json(&serde_json::json!({
            "session": "ghost", "from": "a", "to": "b", "message": "c",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "session not found");

    // Missing field.
    let response = client
        .post(format!("http://{http_addr}/deliver"))
        .json(&serde_json::json!({
            "session": "kannel", "to": "b", "message": "c",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "missing from");
}

#[tokio::test]
async fn multipart_delivery_carries_a_udh_per_segment() {
    let (addr, registry) = start_smpp("kannel", "pw").await;
    let (reader, writer) = bind(addr, "kannel", "pw").await;
    let mut deliveries = spawn_responder(reader, writer);

    let session = registry.get("kannel").expect("bound session");

    let text = "a".repeat(200); // GSM7, 2 segments
    let mut message = smsc3::Message::new("SHOP", "+33600000001", &text);
    assert_eq!(message.segments, 2);
    message.registered_delivery = 0;

    let sequence = session
        .send(&message, &DeliverSm::new())
        .await
        .expect("send");

    let first = timeout(WAIT, deliveries.recv()).await.unwrap().unwrap();
    let second = timeout(WAIT, deliveries.recv()).await.unwrap().unwrap();
    assert_eq!(second.sequence_number, sequence);

    let reference = first.short_message[3];
    for (i, pdu) in [&first, &second].into_iter().enumerate() {
        // UDHI set on every segment.
        assert_eq!(pdu.esm_class & 0x40, 0x40);

        let payload = pdu.short_message.as_ref();
        assert_eq!(&payload[..3], &[0x05, 0x00, 0x03]);
        assert_eq!(payload[3], reference);
        assert_eq!(payload[4], 2, "total segments");
        assert_eq!(payload[5], (i + 1) as u8, "segment index");
    }

    let first_text = String::from_utf8(first.short_message[6..].to_vec()).unwrap();
    let second_text = String::from_utf8(second.short_message[6..].to_vec()).unwrap();
    assert_eq!(first_text.len(), 153);
    assert_eq!(format!("{first_text}{second_text}"), text);
}
