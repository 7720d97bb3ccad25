use super::{TelemetryRecord, TelemetrySink};
use crate::error::TelemetryError;
use crate::sensor::SensorReadings;
use itertools::Itertools;
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::fmt;
use std::str::FromStr;
use std::thread::JoinHandle;
use std::time::Duration;

/// Requests queued between the sink and the network thread.
const REQUEST_CAPACITY: usize = 64;

/// Well known message broker endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerPreset {
    /// A broker on the local machine.
    Local,
    /// A broker reached through the container bridge network.
    Bridge,
}

impl BrokerPreset {
    /// The `host:port` address of the broker.
    pub fn address(self) -> &'static str {
        match self {
            BrokerPreset::Local => "127.0.0.1:1883",
            BrokerPreset::Bridge => "172.17.0.1:1883",
        }
    }
}

impl FromStr for BrokerPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(BrokerPreset::Local),
            "bridge" => Ok(BrokerPreset::Bridge),
            other => Err(format!("unknown broker preset `{}`", other)),
        }
    }
}

impl fmt::Display for BrokerPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerPreset::Local => f.write_str("local"),
            BrokerPreset::Bridge => f.write_str("bridge"),
        }
    }
}

/// Sends messages to topics on a message broker.
pub trait Publisher {
    /// Sends one message.
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), TelemetryError>;

    /// Ends the session. No messages are sent afterwards.
    fn close(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }
}

/// Publishes over MQTT, driving the connection on a background thread.
pub struct MqttPublisher {
    client: Client,
    events: Option<JoinHandle<()>>,
}

impl MqttPublisher {
    /// Connects to the broker at `address` (`host:port`) and waits for it to accept.
    pub fn connect(address: &str, client_id: &str) -> Result<Self, TelemetryError> {
        let (host, port) = split_address(address)?;
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(30));
        let (client, mut connection) = Client::new(options, REQUEST_CAPACITY);

        for notification in connection.iter() {
            if let Event::Incoming(Packet::ConnAck(ack)) = notification? {
                log::debug!("Broker accepted connection: {:?}", ack.code);
                break;
            }
        }
        let events = std::thread::spawn(move || drive(connection));
        Ok(Self {
            client,
            events: Some(events),
        })
    }
}

/// Polls the connection until it closes.
fn drive(mut connection: Connection) {
    for notification in connection.iter() {
        match notification {
            Ok(event) => log::trace!("Broker event {:?}", event),
            Err(err) => {
                log::debug!("Broker connection closed: {}", err);
                break;
            }
        }
    }
}

impl Publisher for MqttPublisher {
    fn publish(&mut self, topic: &str, payload: String) -> Result<(), TelemetryError> {
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.into_bytes())?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TelemetryError> {
        if let Some(events) = self.events.take() {
            self.client.disconnect()?;
            if events.join().is_err() {
                log::warn!("Broker connection thread panicked");
            }
        }
        Ok(())
    }
}

/// Splits `host:port` into its parts.
fn split_address(address: &str) -> Result<(&str, u16), TelemetryError> {
    let invalid = || TelemetryError::InvalidAddress(address.to_string());
    let (host, port) = address.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse().map_err(|_| invalid())?;
    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host, port))
}

/// Publishes one message per tick to a message broker.
///
/// Each message goes to the topic `bus/<id>`, and its payload is a space
/// separated list of fields.
pub struct BrokerSink<P: Publisher> {
    publisher: P,
}

impl BrokerSink<MqttPublisher> {
    /// Connects to the MQTT broker at `address`.
    pub fn connect(address: &str) -> Result<Self, TelemetryError> {
        log::info!("Connecting to broker at {}", address);
        let client_id = format!("bus-sim-{}", std::process::id());
        Ok(Self::new(MqttPublisher::connect(address, &client_id)?))
    }
}

impl<P: Publisher> BrokerSink<P> {
    /// Publishes messages through `publisher`.
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// Returns the publisher.
    pub fn into_inner(self) -> P {
        self.publisher
    }
}

impl<P: Publisher> TelemetrySink for BrokerSink<P> {
    fn emit(&mut self, record: &TelemetryRecord) -> Result<(), TelemetryError> {
        self.publisher.publish(&topic(record), payload(record))
    }

    fn finish(&mut self) -> Result<(), TelemetryError> {
        self.publisher.close()
    }
}

/// The topic a bus publishes to.
fn topic(record: &TelemetryRecord) -> String {
    format!("bus/{}", record.bus_id)
}

/// Formats the message payload of a record.
fn payload(record: &TelemetryRecord) -> String {
    let r = record.readings.unwrap_or(SensorReadings {
        co: 0.0,
        no2: 0.0,
        pm1: 0.0,
        pm25: 0.0,
        pm10: 0.0,
        temperature: 0.0,
        pressure: 0.0,
        humidity: 0.0,
    });
    let head = [
        record.tick.to_string(),
        record.timestamp.format("%Y-%m-%d").to_string(),
        record.timestamp.format("%H:%M:%S").to_string(),
        format!("{:.6}", record.position.latitude),
        format!("{:.6}", record.position.longitude),
    ];
    // Each gas and particle reading is sent twice, once per sensor channel
    let measurements = [
        r.co,
        r.co,
        r.no2,
        r.no2,
        r.pm1,
        r.pm25,
        r.pm10,
        r.pm1,
        r.pm25,
        r.pm10,
        r.temperature,
        r.pressure,
        r.humidity,
    ]
    .map(|value| format!("{:.2}", value));
    let tail = ["-1", "-1", "0", "0", "0", "0"].map(String::from);

    head.iter().chain(&measurements).chain(&tail).join(" ")
}
