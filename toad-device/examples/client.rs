use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use toad_device::client::Client;
use toad_device::config::Config;
use toad_device::listener::DataMessageListener;
use toad_device::msg::code::Dotted;
use toad_device::msg::{self, code, observe, opt, Message, MessageExt, Method, Type};
use toad_device::resource::{ResourceName, DISCOVERY};
use toad_device::time::Timeout;
use toad_device_data::actuator::COMMAND_ON;
use toad_device_data::{codec, ActuatorData, SensorData};

const GATEWAY_PORT: u16 = 5699;

struct Printer;

impl DataMessageListener for Printer {
  fn handle_sensor_message(&self, data: &SensorData) {
    log::info!("sensor message: {:?}", data);
  }

  fn handle_actuator_command_message(&self, data: &ActuatorData) {
    log::info!("actuator command: {} -> {}", data.base.name, data.command);
  }
}

/// A pretend gateway: answers every request with a piggybacked ACK,
/// and follows observe registrations with a few notifications.
fn spawn_gateway() -> thread::JoinHandle<()> {
  let sock = UdpSocket::bind(("127.0.0.1", GATEWAY_PORT)).unwrap();

  thread::spawn(move || {
    let mut buf = [0u8; 1152];
    let mut cmd = ActuatorData::new("hvac", 3);
    cmd.command = COMMAND_ON;
    cmd.value = 21.5;
    let cmd = codec::encode(&cmd).unwrap();

    loop {
      let (n, from) = sock.recv_from(&mut buf).unwrap();
      let req = match msg::parse(&buf[..n]) {
        | Ok(req) if req.code.class == 0 && req.code.detail != 0 => req,
        | _ => continue,
      };

      let path = req.uri_path();
      let registering = req.observe_value() == Some(observe::REGISTER);
      log::info!("gateway: {} {}", Dotted(req.code), path);

      let ty = if req.ty == Type::Con { Type::Ack } else { Type::Non };
      let mut rep = Message::new(ty, code::CONTENT, req.id, req.token);

      if req.code != Method::Get.code() {
        rep.code = code::CHANGED;
      } else if path == DISCOVERY {
        let links = ResourceName::ALL.iter()
                                     .map(|r| format!("</{}>", r.path()))
                                     .collect::<Vec<_>>()
                                     .join(",");
        rep.set_payload_bytes(links.as_bytes());
      } else {
        rep.set_payload_bytes(cmd.as_bytes());
        if registering {
          rep.set_uint_opt(opt::OBSERVE, 1);
        }
      }

      sock.send_to(&msg::to_bytes(&rep).unwrap(), from).unwrap();

      if registering {
        (2..4u32).for_each(|seq| {
                   thread::sleep(Duration::from_millis(200));
                   let id = msg::Id(rep.id.0.wrapping_add(seq as u16));
                   let mut n = Message::new(Type::Non, code::CONTENT, id, req.token);
                   n.set_uint_opt(opt::OBSERVE, seq);
                   n.set_payload_bytes(cmd.as_bytes());
                   sock.send_to(&msg::to_bytes(&n).unwrap(), from).unwrap();
                 });
      }
    }
  })
}

fn main() {
  simple_logger::init_with_level(log::Level::Info).unwrap();

  spawn_gateway();

  let config = Config { host: "127.0.0.1".into(),
                        port: GATEWAY_PORT,
                        ..Config::default() };
  let client = Client::new_std(config);
  let timeout = client.config().timeout;

  let printer = Arc::new(Printer);
  client.set_data_message_listener(&printer);

  client.send_discovery_request(timeout).ok();

  client.send_get_request(Some(ResourceName::CdaActuatorCmd), None, false, timeout)
        .ok();

  let mut reading = SensorData::new("temp", 1);
  reading.value = 19.25;
  let reading = codec::encode(&reading).unwrap();
  client.send_post_request(Some(ResourceName::CdaSensorMsg),
                           None,
                           true,
                           Some(&reading),
                           timeout)
        .ok();

  client.start_observer(Some(ResourceName::CdaActuatorCmd), None, client.config().ttl);
  thread::sleep(Duration::from_secs(1));
  client.stop_observer(Some(ResourceName::CdaActuatorCmd), None, timeout);

  thread::sleep(Duration::from_millis(250));
}
