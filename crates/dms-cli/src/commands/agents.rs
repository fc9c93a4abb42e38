//! Agent command handlers.

use serde::Serialize;
use tabled::Tabled;

use dms_core::{Dma, Dms};

use crate::cli::{AgentsArgs, AgentsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct AgentView {
    id: i32,
    name: String,
    host_name: String,
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl AgentView {
    fn from_agent(agent: &Dma, version: Option<String>) -> Result<Self, CliError> {
        Ok(Self {
            id: agent.id(),
            name: agent.name()?.to_owned(),
            host_name: agent.host_name()?.to_owned(),
            state: agent.state()?.to_string(),
            version,
        })
    }
}

#[derive(Tabled)]
struct AgentRow {
    #[tabled(rename = "ID")]
    id: i32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&AgentView> for AgentRow {
    fn from(a: &AgentView) -> Self {
        Self {
            id: a.id,
            name: a.name.clone(),
            host: a.host_name.clone(),
            state: a.state.clone(),
        }
    }
}

fn detail(a: &AgentView) -> String {
    output::detail_lines(&[
        ("ID", a.id.to_string()),
        ("Name", a.name.clone()),
        ("Host", a.host_name.clone()),
        ("State", a.state.clone()),
        ("Version", a.version.clone().unwrap_or_else(|| "-".into())),
    ])
}

pub async fn handle(dms: &Dms, args: AgentsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        AgentsCommand::List => {
            let agents = dms
                .agents()
                .await?
                .iter()
                .map(|a| AgentView::from_agent(a, None))
                .collect::<Result<Vec<_>, _>>()?;
            let out = output::render_list(
                &global.output,
                &agents,
                |a| AgentRow::from(a),
                |a| a.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AgentsCommand::Show { id } => {
            let mut agent = dms.agent(id)?;
            agent.load().await?;
            let version = agent.version().await?.to_string();
            let view = AgentView::from_agent(&agent, Some(version))?;
            let out = output::render_single(&global.output, &view, detail, |a| a.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
