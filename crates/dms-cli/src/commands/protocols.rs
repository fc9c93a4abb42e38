//! Protocol command handlers.

use serde::Serialize;
use tabled::Tabled;

use dms_core::{Dms, DmsProtocol};

use crate::cli::{GlobalOpts, ProtocolsArgs, ProtocolsCommand};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ConnectionView {
    name: String,
    kind: String,
}

#[derive(Debug, Serialize)]
struct ProtocolView {
    name: String,
    version: String,
    production: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referenced_version: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    connections: Vec<ConnectionView>,
}

impl ProtocolView {
    /// Summary of a handle; the detail fields are filled only when loaded.
    fn from_protocol(protocol: &DmsProtocol) -> Result<Self, CliError> {
        let mut view = Self {
            name: protocol.name().to_owned(),
            version: protocol.version().to_owned(),
            production: protocol.is_production_version(),
            device_type: None,
            referenced_version: None,
            connections: Vec::new(),
        };
        if protocol.is_loaded() {
            view.device_type = Some(protocol.device_type()?.to_owned());
            view.referenced_version = protocol.referenced_version()?.map(str::to_owned);
            view.connections = protocol
                .connections()?
                .iter()
                .map(|c| ConnectionView {
                    name: c.name.clone(),
                    kind: c.kind.to_string(),
                })
                .collect();
        }
        Ok(view)
    }
}

#[derive(Tabled)]
struct ProtocolRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
}

impl From<&ProtocolView> for ProtocolRow {
    fn from(p: &ProtocolView) -> Self {
        Self {
            name: p.name.clone(),
            version: p.version.clone(),
        }
    }
}

fn detail(p: &ProtocolView) -> String {
    let mut out = output::detail_lines(&[
        ("Name", p.name.clone()),
        ("Version", p.version.clone()),
        (
            "Device type",
            p.device_type.clone().unwrap_or_else(|| "-".into()),
        ),
        (
            "Resolves to",
            p.referenced_version.clone().unwrap_or_else(|| "-".into()),
        ),
    ]);
    if !p.connections.is_empty() {
        out.push_str("\n\nConnections");
        for (index, c) in p.connections.iter().enumerate() {
            out.push_str(&format!("\n  {index}: {} ({})", c.name, c.kind));
        }
    }
    out
}

pub async fn handle(dms: &Dms, args: ProtocolsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ProtocolsCommand::List => {
            let protocols = dms
                .protocols()
                .await?
                .iter()
                .map(ProtocolView::from_protocol)
                .collect::<Result<Vec<_>, _>>()?;
            let out = output::render_list(&global.output, &protocols, |p| ProtocolRow::from(p), |p| {
                format!("{} {}", p.name, p.version)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProtocolsCommand::Show { name, version } => {
            let mut protocol = dms.protocol(&name, &version)?;
            protocol.load().await?;
            let view = ProtocolView::from_protocol(&protocol)?;
            let out = output::render_single(&global.output, &view, detail, |p| {
                format!("{} {}", p.name, p.version)
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
