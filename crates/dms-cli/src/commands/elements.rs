//! Element command handlers.

use std::collections::BTreeMap;

use serde::Serialize;
use tabled::Tabled;

use dms_core::{Dms, DmsElement, DmsElementId, ElementState, ParameterValue};

use crate::cli::{ElementsArgs, ElementsCommand, GlobalOpts};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

// ── Views ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ElementView {
    id: DmsElementId,
    name: String,
    description: String,
    protocol: String,
    protocol_version: String,
    state: ElementState,
    alarm_template: Option<String>,
    trend_template: Option<String>,
    views: Vec<i32>,
    properties: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    connections: Vec<String>,
}

impl ElementView {
    fn from_element(element: &DmsElement) -> Result<Self, CliError> {
        let protocol = element.protocol()?;
        let connections = element
            .connections()
            .map(|c| c.iter().map(|conn| conn.kind().to_string()).collect())
            .unwrap_or_default();
        Ok(Self {
            id: element.id(),
            name: element.name()?.to_owned(),
            description: element.description()?.to_owned(),
            protocol: protocol.name.clone(),
            protocol_version: protocol.version.clone(),
            state: element.state()?,
            alarm_template: element.alarm_template()?.map(str::to_owned),
            trend_template: element.trend_template()?.map(str::to_owned),
            views: element.views()?.iter().copied().collect(),
            properties: element
                .properties()?
                .iter()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect(),
            connections,
        })
    }
}

#[derive(Tabled)]
struct ElementRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Protocol")]
    protocol: String,
    #[tabled(rename = "State")]
    state: String,
}

fn row(e: &ElementView, color: bool) -> ElementRow {
    ElementRow {
        id: e.id.to_string(),
        name: e.name.clone(),
        protocol: format!("{} {}", e.protocol, e.protocol_version),
        state: output::paint_state(e.state, color),
    }
}

fn detail(e: &ElementView, color: bool) -> String {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    let mut lines = output::detail_lines(&[
        ("ID", e.id.to_string()),
        ("Name", e.name.clone()),
        ("Description", e.description.clone()),
        ("Protocol", format!("{} {}", e.protocol, e.protocol_version)),
        ("State", output::paint_state(e.state, color)),
        ("Alarm template", or_dash(&e.alarm_template)),
        ("Trend template", or_dash(&e.trend_template)),
        (
            "Views",
            e.views
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        ("Connections", e.connections.join(", ")),
    ]);
    if !e.properties.is_empty() {
        lines.push_str("\n\nProperties");
        for (name, value) in &e.properties {
            lines.push_str(&format!("\n  {name}: {value}"));
        }
    }
    lines
}

#[derive(Debug, Serialize)]
struct ParameterReading {
    element: DmsElementId,
    parameter_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    value: ParameterValue,
}

fn render_value(value: &ParameterValue) -> String {
    match value {
        ParameterValue::Empty => String::new(),
        ParameterValue::Number(n) => n.to_string(),
        ParameterValue::Text(t) => t.clone(),
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(dms: &Dms, args: ElementsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        ElementsCommand::List { agent } => {
            let elements = match agent {
                Some(agent_id) => dms.agent(agent_id)?.elements().await?,
                None => dms.elements().await?,
            };
            let views = elements
                .iter()
                .map(ElementView::from_element)
                .collect::<Result<Vec<_>, _>>()?;
            let out = output::render_list(
                &global.output,
                &views,
                |e| row(e, color),
                |e| e.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ElementsCommand::Show { element } => {
            let mut element = util::resolve_element(dms, &element).await?;
            element.load_on_demand().await?;
            if element.connections().is_err() {
                element.load_connections().await?;
            }
            let view = ElementView::from_element(&element)?;
            let out = output::render_single(
                &global.output,
                &view,
                |e| detail(e, color),
                |e| e.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ElementsCommand::Start { element } => {
            let mut element = util::resolve_element(dms, &element).await?;
            element.start().await?;
            report(global, "Started", &element);
            Ok(())
        }

        ElementsCommand::Stop { element } => {
            let mut element = util::resolve_element(dms, &element).await?;
            element.stop().await?;
            report(global, "Stopped", &element);
            Ok(())
        }

        ElementsCommand::Pause { element } => {
            let mut element = util::resolve_element(dms, &element).await?;
            element.pause().await?;
            report(global, "Paused", &element);
            Ok(())
        }

        ElementsCommand::Restart { element } => {
            let mut element = util::resolve_element(dms, &element).await?;
            element.restart().await?;
            report(global, "Restarted", &element);
            Ok(())
        }

        ElementsCommand::Delete { element } => {
            util::confirm(&format!("delete element {element}"), global.yes)?;
            let mut element = util::resolve_element(dms, &element).await?;
            element.delete().await?;
            report(global, "Deleted", &element);
            Ok(())
        }

        ElementsCommand::SetDescription {
            element,
            description,
        } => {
            let mut element = util::resolve_element(dms, &element).await?;
            element.load_on_demand().await?;
            element.set_description(description)?;
            element.update().await?;
            report(global, "Updated", &element);
            Ok(())
        }

        ElementsCommand::Param {
            element,
            parameter,
            key,
        } => {
            let mut element = util::resolve_element(dms, &element).await?;
            let value = match key.as_deref() {
                Some(key) => element.get_table_cell(parameter, key).await?,
                None => element.get_standalone_parameter(parameter).await?,
            };
            let reading = ParameterReading {
                element: element.id(),
                parameter_id: parameter,
                key,
                value,
            };
            let out = output::render_single(
                &global.output,
                &reading,
                |r| render_value(&r.value),
                |r| render_value(&r.value),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

fn report(global: &GlobalOpts, verb: &str, element: &DmsElement) {
    if !global.quiet {
        eprintln!("{verb} element {}", element.id());
    }
}
