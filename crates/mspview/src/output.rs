use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mspview_session::{Field, TelemetryDisplay};
use mspview_transport::{DeviceDescriptor, PortSummary};
use serde::Serialize;

/// Versioned record kinds; bumped when a field changes meaning.
const TELEMETRY_SCHEMA: &str = "mspview.cli.v1.telemetry-event";
const DESCRIPTOR_SCHEMA: &str = "mspview.cli.v1.device-descriptor";
const PORTS_SCHEMA: &str = "mspview.cli.v1.serial-ports";

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct TelemetryEvent<'a> {
    schema_id: &'a str,
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    value: &'a str,
    timestamp: String,
}

/// Renders telemetry on stdout in the selected format.
///
/// The table format keeps the latest value of every field and prints one
/// table per completed cycle, which arrives with the rate line.
pub struct TerminalDisplay {
    format: OutputFormat,
    values: BTreeMap<Field, String>,
}

impl TerminalDisplay {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            values: BTreeMap::new(),
        }
    }

    fn emit(&self, event: &str, field: Option<Field>, value: &str) {
        println!("{}", event_json(event, field, value));
    }

    fn render_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["FIELD", "VALUE"]);
        for (field, value) in &self.values {
            table.add_row(vec![field.label().to_string(), value.clone()]);
        }
        table
    }
}

impl TelemetryDisplay for TerminalDisplay {
    fn update(&mut self, field: Field, value: &str) {
        match self.format {
            OutputFormat::Json => self.emit("update", Some(field), value),
            OutputFormat::Table => {
                self.values.insert(field, value.to_string());
                if field == Field::Rate {
                    println!("{}", self.render_table());
                }
            }
            OutputFormat::Pretty => println!("{}: {value}", field.label()),
        }
    }

    fn connected(&mut self, port: &str) {
        match self.format {
            OutputFormat::Json => self.emit("connected", None, port),
            OutputFormat::Table | OutputFormat::Pretty => {
                self.values.clear();
                println!("Opened {port}");
            }
        }
    }

    fn disconnected(&mut self, reason: &str) {
        match self.format {
            OutputFormat::Json => self.emit("disconnected", None, reason),
            OutputFormat::Table | OutputFormat::Pretty => println!("Disconnected: {reason}"),
        }
    }
}

#[derive(Serialize)]
struct DescriptorOutput<'a> {
    schema_id: &'a str,
    input: &'a str,
    class: &'a str,
    address: String,
}

pub fn print_descriptor(input: &str, descriptor: &DeviceDescriptor, format: OutputFormat) {
    let class = descriptor.class();
    match format {
        OutputFormat::Json => {
            let out = DescriptorOutput {
                schema_id: DESCRIPTOR_SCHEMA,
                input,
                class: class.as_str(),
                address: descriptor.to_string(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INPUT", "CLASS", "ADDRESS"])
                .add_row(vec![
                    input.to_string(),
                    class.to_string(),
                    descriptor.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("class={class} address={descriptor}"),
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    usb_id: Option<String>,
    product: Option<&'a str>,
    candidate: bool,
}

#[derive(Serialize)]
struct PortsOutput<'a> {
    schema_id: &'a str,
    ports: Vec<PortOutput<'a>>,
}

/// Print enumerated ports; `candidate` marks the allow-listed ones.
pub fn print_ports(ports: &[(PortSummary, bool)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PortsOutput {
                schema_id: PORTS_SCHEMA,
                ports: ports
                    .iter()
                    .map(|(port, candidate)| PortOutput {
                        name: &port.name,
                        usb_id: port.usb_id.map(usb_id_text),
                        product: port.product.as_deref(),
                        candidate: *candidate,
                    })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "USB ID", "PRODUCT", "CANDIDATE"]);
            for (port, candidate) in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.usb_id.map(usb_id_text).unwrap_or_else(|| "-".to_string()),
                    port.product.clone().unwrap_or_else(|| "-".to_string()),
                    if *candidate { "yes" } else { "no" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("no serial ports");
            }
            for (port, candidate) in ports {
                let marker = if *candidate { "*" } else { " " };
                match port.usb_id {
                    Some(id) => println!("{marker} {} [{}]", port.name, usb_id_text(id)),
                    None => println!("{marker} {}", port.name),
                }
            }
        }
    }
}

fn event_json(event: &str, field: Option<Field>, value: &str) -> String {
    let out = TelemetryEvent {
        schema_id: TELEMETRY_SCHEMA,
        event,
        field: field.map(Field::key),
        label: field.map(Field::label),
        value,
        timestamp: now_unix_seconds(),
    };
    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
}

fn usb_id_text((vid, pid): (u16, u16)) -> String {
    format!("{vid:04x}:{pid:04x}")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
