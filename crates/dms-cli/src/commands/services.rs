//! Service command handlers.

use serde::Serialize;
use tabled::Tabled;

use dms_core::{Dms, DmsService, DmsServiceId, ServiceTarget};

use crate::cli::{GlobalOpts, ServicesArgs, ServicesCommand};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct InclusionView {
    kind: &'static str,
    target: String,
    alias: String,
    excluded: bool,
    alarm_cap: Option<String>,
}

#[derive(Debug, Serialize)]
struct ServiceView {
    id: DmsServiceId,
    name: String,
    description: String,
    views: Vec<i32>,
    inclusions: Vec<InclusionView>,
}

impl ServiceView {
    fn from_service(service: &DmsService) -> Result<Self, CliError> {
        let inclusions = service
            .params()?
            .iter()
            .map(|inc| {
                let (kind, target) = match inc.target {
                    ServiceTarget::Element(id) => ("element", id.to_string()),
                    ServiceTarget::Service(id) => ("service", id.to_string()),
                };
                InclusionView {
                    kind,
                    target,
                    alias: inc.alias.clone(),
                    excluded: inc.is_excluded,
                    alarm_cap: inc.alarm_cap.map(|level| level.to_string()),
                }
            })
            .collect();
        Ok(Self {
            id: service.id(),
            name: service.name()?.to_owned(),
            description: service.description()?.to_owned(),
            views: service.views()?.iter().copied().collect(),
            inclusions,
        })
    }
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Inclusions")]
    inclusions: usize,
}

impl From<&ServiceView> for ServiceRow {
    fn from(s: &ServiceView) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.clone(),
            inclusions: s.inclusions.len(),
        }
    }
}

fn detail(s: &ServiceView) -> String {
    let mut out = output::detail_lines(&[
        ("ID", s.id.to_string()),
        ("Name", s.name.clone()),
        ("Description", s.description.clone()),
        (
            "Views",
            s.views
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
    ]);
    if !s.inclusions.is_empty() {
        out.push_str("\n\nInclusions");
        for inc in &s.inclusions {
            let mut line = format!("\n  {} {}", inc.kind, inc.target);
            if !inc.alias.is_empty() {
                line.push_str(&format!(" as '{}'", inc.alias));
            }
            if inc.excluded {
                line.push_str(" (excluded)");
            }
            if let Some(ref cap) = inc.alarm_cap {
                line.push_str(&format!(" cap={cap}"));
            }
            out.push_str(&line);
        }
    }
    out
}

pub async fn handle(dms: &Dms, args: ServicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ServicesCommand::List { agent } => {
            let services = match agent {
                Some(agent_id) => dms.agent(agent_id)?.services().await?,
                None => dms.services().await?,
            };
            let views = services
                .iter()
                .map(ServiceView::from_service)
                .collect::<Result<Vec<_>, _>>()?;
            let out = output::render_list(&global.output, &views, |s| ServiceRow::from(s), |s| {
                s.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ServicesCommand::Show { id } => {
            let id: DmsServiceId = id.parse()?;
            let mut service = dms.service(id);
            service.load().await?;
            let view = ServiceView::from_service(&service)?;
            let out =
                output::render_single(&global.output, &view, detail, |s| s.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
